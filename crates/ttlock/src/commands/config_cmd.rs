//! Config subcommand handlers.

use std::io::BufRead;

use ttlock_config::{Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, active_profile_name};
use crate::error::CliError;
use crate::output;

use super::notify;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "poll_interval = {}", cfg.defaults.poll_interval);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "api_url = \"{}\"", p.api_url);
        if let Some(ref id) = p.client_id {
            let _ = writeln!(out, "client_id = \"{id}\"");
        }
        if p.access_token.is_some() {
            let _ = writeln!(out, "access_token = \"****\"");
        }
        if let Some(ref env) = p.access_token_env {
            let _ = writeln!(out, "access_token_env = \"{env}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(interval) = p.poll_interval {
            let _ = writeln!(out, "poll_interval = {interval}");
        }
        if let Some(auto_lock) = p.auto_lock {
            let _ = writeln!(out, "auto_lock = {auto_lock}");
        }
        if !p.locks.is_empty() {
            let ids: Vec<String> = p.locks.iter().map(ToString::to_string).collect();
            let _ = writeln!(out, "locks = [{}]", ids.join(", "));
        }
    }

    out
}

fn read_token_from_stdin() -> Result<String, CliError> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let token = line.trim().to_owned();
    if token.is_empty() {
        return Err(CliError::Validation {
            field: "token".into(),
            reason: "no token on stdin".into(),
        });
    }
    Ok(token)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), false);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            output::print_output(format_config_redacted(&cfg).trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Init => {
            let mut cfg = config::load_config()?;
            let name = active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(name.clone()).or_insert_with(|| Profile {
                api_url: ttlock_config::DEFAULT_API_URL.into(),
                ..Profile::default()
            });

            if let Some(ref url) = global.api_url {
                ttlock_config::parse_api_url(url)?;
                profile.api_url.clone_from(url);
            }
            if let Some(ref id) = global.client_id {
                profile.client_id = Some(id.clone());
            }
            if let Some(timeout) = global.timeout {
                profile.timeout = Some(timeout);
            }
            if profile.client_id.is_none() {
                return Err(CliError::Validation {
                    field: "--client-id".into(),
                    reason: format!("profile '{name}' needs a client id"),
                });
            }
            if let Some(ref token) = global.access_token {
                ttlock_config::store_access_token(&name, token)?;
            }
            if cfg.default_profile.is_none() {
                cfg.default_profile = Some(name.clone());
            }

            config::save_config(&cfg)?;
            notify(
                global,
                &format!(
                    "Profile '{name}' saved to {}",
                    config::config_path().display()
                ),
            );
            Ok(())
        }

        ConfigCommand::SetToken { token } => {
            let cfg = config::load_config()?;
            let name = active_profile_name(global, &cfg);
            let token = match token {
                Some(token) => token,
                None => read_token_from_stdin()?,
            };
            ttlock_config::store_access_token(&name, &token)?;
            notify(global, &format!("Access token stored in keyring for profile '{name}'"));
            Ok(())
        }
    }
}
