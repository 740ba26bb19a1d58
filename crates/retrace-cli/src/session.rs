//! Record store session persistence backed by the OS keychain.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;

use retrace_core::transport::AuthSession;

use crate::error::CliError;

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "retrace-cli";
const SESSION_USERNAME: &str = "pocketbase_session";

/// Keychain slot holding the serialized [`AuthSession`].
#[derive(Clone)]
pub struct SessionStore {
    username: String,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            username: SESSION_USERNAME.to_string(),
        }
    }

    #[cfg(test)]
    fn with_username(username: &str) -> Self {
        Self {
            username: username.to_string(),
        }
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> Result<Entry, CliError> {
        Entry::new(KEYRING_SERVICE_NAME, &self.username)
            .map_err(|error| CliError::Auth(error.to_string()))
    }

    #[cfg(not(test))]
    pub fn load(&self) -> Result<Option<AuthSession>, CliError> {
        let entry = self.entry()?;
        match entry.get_password() {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(CliError::Auth(error.to_string())),
        }
    }

    #[cfg(test)]
    pub fn load(&self) -> Result<Option<AuthSession>, CliError> {
        let guard = Self::test_store()
            .lock()
            .map_err(|error| CliError::Auth(error.to_string()))?;
        if let Some(raw) = guard.get(&self.username) {
            Ok(Some(serde_json::from_str(raw)?))
        } else {
            Ok(None)
        }
    }

    #[cfg(not(test))]
    pub fn save(&self, session: &AuthSession) -> Result<(), CliError> {
        let raw = serde_json::to_string(session)?;
        self.entry()?
            .set_password(&raw)
            .map_err(|error| CliError::Auth(error.to_string()))?;
        Ok(())
    }

    #[cfg(test)]
    pub fn save(&self, session: &AuthSession) -> Result<(), CliError> {
        let raw = serde_json::to_string(session)?;
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| CliError::Auth(error.to_string()))?;
        guard.insert(self.username.clone(), raw);
        Ok(())
    }

    #[cfg(not(test))]
    pub fn clear(&self) -> Result<(), CliError> {
        let entry = self.entry()?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(CliError::Auth(error.to_string())),
        }
    }

    #[cfg(test)]
    pub fn clear(&self) -> Result<(), CliError> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| CliError::Auth(error.to_string()))?;
        guard.remove(&self.username);
        Ok(())
    }
}
