use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "retrace")]
#[command(about = "Sync browser history to a PocketBase record store")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the sync daemon: one cycle at startup, then one per interval
    Run {
        /// Seconds between sync cycles
        #[arg(long, default_value = "60", value_name = "SECS")]
        interval: u64,
        /// Browser whose history is synced
        #[arg(long, value_enum, default_value_t = BrowserKind::Chrome)]
        browser: BrowserKind,
        /// Optional path to the browser history database
        #[arg(long, value_name = "PATH")]
        history_db: Option<PathBuf>,
        /// Skip the immediate cycle normally run at startup
        #[arg(long)]
        no_initial_sync: bool,
    },
    /// Run a single sync cycle and exit
    Sync {
        /// Browser whose history is synced
        #[arg(long, value_enum, default_value_t = BrowserKind::Chrome)]
        browser: BrowserKind,
        /// Optional path to the browser history database
        #[arg(long, value_name = "PATH")]
        history_db: Option<PathBuf>,
    },
    /// Inspect or update the sync configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Show sync state and probe the record store
    Status,
    /// Derived statistics over synced records
    Stats {
        /// Only include records synced for this user email
        #[arg(long, value_name = "EMAIL")]
        user: Option<String>,
        /// Number of top sites to list
        #[arg(long, default_value = "20", value_name = "N")]
        top: usize,
        /// Output the raw records as CSV instead of statistics
        #[arg(long)]
        csv: bool,
        /// Optional output path for --csv (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
        /// Record store identity (email or username) for this invocation
        #[arg(long, value_name = "IDENTITY")]
        identity: Option<String>,
        /// Record store password for this invocation
        #[arg(long, value_name = "PASSWORD")]
        password: Option<String>,
    },
    /// Manage the record store session
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Create or update the sync configuration
    Init {
        /// Record store base URL, e.g. https://records.example:8001
        #[arg(long, value_name = "URL")]
        api_url: Option<String>,
        /// Record collection written by the sync engine
        #[arg(long, value_name = "NAME")]
        collection: Option<String>,
        /// Email attached to synced records
        #[arg(long, value_name = "EMAIL")]
        email: Option<String>,
    },
    /// Print the effective configuration
    Show,
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Log in with identity and password, storing the session token
    Login {
        /// Record store identity (email or username)
        #[arg(long, value_name = "IDENTITY")]
        identity: String,
        /// Record store password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Show whether a session token is stored
    Status,
    /// Clear the stored session token
    Logout,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum BrowserKind {
    Chrome,
    Firefox,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
