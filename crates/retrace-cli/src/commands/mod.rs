pub mod auth_cmd;
pub mod common;
pub mod completions;
pub mod config;
pub mod run;
pub mod stats;
pub mod status;
pub mod sync;
