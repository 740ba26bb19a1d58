//! Per-install user identity.
//!
//! Records are attributed to an install id of the form
//! `user_<unix ms>_<9 random base-36 chars>`. The id is generated once and
//! persisted into the settings; when persistence is unavailable a fresh id
//! is used for the current run only.

use rand::Rng;

use crate::store::StateStore;
use crate::util::unix_timestamp_ms_now;

const ID_PREFIX: &str = "user_";
const SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a fresh install identifier.
///
/// Practically unique per install, not cryptographically so.
#[must_use]
pub fn generate_user_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{ID_PREFIX}{}_{suffix}", unix_timestamp_ms_now())
}

/// Return the persisted install id, creating and persisting one on first
/// call.
///
/// Never fails: when the store cannot be read or written the generated id
/// is returned ephemeral and a new one will be minted next run.
pub async fn get_or_create_user_id<P: StateStore>(store: &P) -> String {
    match store.load_settings().await {
        Ok(mut settings) => {
            if let Some(id) = settings.user_id.clone().filter(|id| !id.is_empty()) {
                return id;
            }
            let id = generate_user_id();
            settings.user_id = Some(id.clone());
            if let Err(error) = store.save_settings(&settings).await {
                tracing::warn!("Failed to persist generated user id: {error}");
            }
            id
        }
        Err(error) => {
            tracing::warn!("Failed to load settings while resolving user id: {error}");
            generate_user_id()
        }
    }
}
