use retrace_core::store::StateStore;
use retrace_core::transport::PocketBaseClient;

use crate::cli::AuthCommands;
use crate::commands::common::build_state_store;
use crate::error::CliError;
use crate::session::SessionStore;

pub async fn run_auth(command: AuthCommands) -> Result<(), CliError> {
    match command {
        AuthCommands::Login { identity, password } => {
            let store = build_state_store()?;
            let settings = store.load_settings().await?;
            let Some(api_url) = settings.api_url.as_deref().filter(|url| !url.is_empty()) else {
                return Err(CliError::NotConfigured);
            };

            let client = PocketBaseClient::new(api_url)?;
            let session = client.auth_with_password(&identity, &password).await?;
            let label = session
                .email
                .clone()
                .unwrap_or_else(|| session.user_id.clone());
            SessionStore::new().save(&session)?;
            println!("Signed in as {label}");
            Ok(())
        }
        AuthCommands::Status => {
            match SessionStore::new().load()? {
                Some(session) => {
                    let label = session.email.unwrap_or(session.user_id);
                    println!("Signed in as {label}");
                }
                None => println!("Not signed in."),
            }
            Ok(())
        }
        AuthCommands::Logout => {
            SessionStore::new().clear()?;
            println!("Signed out.");
            Ok(())
        }
    }
}
