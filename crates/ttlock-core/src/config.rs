// ── Runtime session configuration ──
//
// Describes how to reach the TTLock cloud and how the session behaves.
// Carries credentials but never touches disk; the CLI builds a
// `ControllerConfig` (usually via ttlock-config) and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::model::LockId;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file, for corporate proxies.
    CustomCa(std::path::PathBuf),
}

/// Configuration for one account session.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// API base URL, e.g. `https://euapi.ttlock.com/v3/`.
    pub api_url: Url,
    /// OAuth application client id.
    pub client_id: String,
    /// Bearer token obtained out of band.
    pub access_token: SecretString,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Background poll period. Zero disables the background poll.
    pub poll_interval: Duration,
    /// Schedule re-locks after observed unlock events.
    pub auto_lock: bool,
    /// Track only these locks. Empty tracks every connectable lock.
    pub lock_ids: Vec<LockId>,
}

impl ControllerConfig {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15 * 60);

    /// A config with default tuning for the given endpoint and credentials.
    pub fn new(api_url: Url, client_id: impl Into<String>, access_token: SecretString) -> Self {
        Self {
            api_url,
            client_id: client_id.into(),
            access_token,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            auto_lock: true,
            lock_ids: Vec::new(),
        }
    }

    /// Whether `id` passes the allow-list.
    pub fn tracks(&self, id: LockId) -> bool {
        self.lock_ids.is_empty() || self.lock_ids.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn config() -> ControllerConfig {
        let url = Url::parse(ttlock_api::client::DEFAULT_BASE_URL).unwrap();
        ControllerConfig::new(url, "id", SecretString::from("t".to_owned()))
    }

    #[test]
    fn defaults() {
        let config = config();
        assert_eq!(config.api_url.as_str(), "https://euapi.ttlock.com/v3/");
        assert_eq!(config.poll_interval, Duration::from_secs(900));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.auto_lock);
    }

    #[test]
    fn empty_allow_list_tracks_everything() {
        let mut config = config();
        assert!(config.tracks(LockId(1)));
        config.lock_ids = vec![LockId(2)];
        assert!(!config.tracks(LockId(1)));
        assert!(config.tracks(LockId(2)));
    }
}
