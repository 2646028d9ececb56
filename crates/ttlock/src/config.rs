//! CLI glue over ttlock-config: applies global flag overrides on top of
//! the resolved profile.
//!
//! Core never sees these types; it receives a pre-built `ControllerConfig`.

use std::time::Duration;

use secrecy::SecretString;

use ttlock_config::{Config, Profile};
use ttlock_core::ControllerConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use ttlock_config::{config_path, load_config, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.profile_name(global.profile.as_deref())
}

/// Build a `ControllerConfig` from the config file, profile, and flags.
///
/// Flags win over the profile. Without a profile the flags alone must
/// carry a client id and an access token.
pub fn build_controller_config(global: &GlobalOpts) -> Result<ControllerConfig, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    match cfg.profiles.get(&profile_name) {
        Some(profile) => resolve_profile(profile, &profile_name, &cfg, global),
        None if global.profile.is_some() => Err(CliError::ProfileNotFound {
            name: profile_name,
            available: available_profiles(&cfg),
        }),
        None => from_flags(global, &profile_name, &cfg),
    }
}

fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<ControllerConfig, CliError> {
    // A flag-supplied token wins over env, keyring and plaintext.
    let effective = Profile {
        api_url: global
            .api_url
            .clone()
            .unwrap_or_else(|| profile.api_url.clone()),
        client_id: global.client_id.clone().or_else(|| profile.client_id.clone()),
        access_token: global
            .access_token
            .clone()
            .or_else(|| profile.access_token.clone()),
        access_token_env: if global.access_token.is_some() {
            None
        } else {
            profile.access_token_env.clone()
        },
        ca_cert: profile.ca_cert.clone(),
        timeout: global.timeout.or(profile.timeout),
        poll_interval: profile.poll_interval,
        auto_lock: profile.auto_lock,
        locks: profile.locks.clone(),
    };

    let mut config =
        ttlock_config::profile_to_controller_config(&effective, profile_name, &cfg.defaults)?;
    if let Some(ref token) = global.access_token {
        config.access_token = SecretString::from(token.clone());
    }
    Ok(config)
}

fn from_flags(
    global: &GlobalOpts,
    profile_name: &str,
    cfg: &Config,
) -> Result<ControllerConfig, CliError> {
    let client_id = global.client_id.clone().ok_or_else(|| CliError::NoConfig {
        path: config_path().display().to_string(),
    })?;
    let token = global
        .access_token
        .clone()
        .ok_or_else(|| CliError::NoCredentials {
            profile: profile_name.into(),
        })?;
    let url = ttlock_config::parse_api_url(
        global
            .api_url
            .as_deref()
            .unwrap_or(ttlock_config::DEFAULT_API_URL),
    )?;

    let mut config = ControllerConfig::new(url, client_id, SecretString::from(token));
    config.timeout = Duration::from_secs(global.timeout.unwrap_or(cfg.defaults.timeout));
    config.poll_interval = Duration::from_secs(cfg.defaults.poll_interval);
    Ok(config)
}

fn available_profiles(cfg: &Config) -> String {
    let mut names: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort_unstable();
    names.join(", ")
}
