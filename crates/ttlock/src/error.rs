//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use ttlock_config::ConfigError;
use ttlock_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the TTLock API")]
    #[diagnostic(
        code(ttlock::connection_failed),
        help(
            "Check network access and the API URL of your profile.\n\
             Details: {reason}"
        )
    )]
    ConnectionFailed { reason: String },

    // ── Vendor ───────────────────────────────────────────────────────
    #[error("TTLock API error ({code}): {message}")]
    #[diagnostic(
        code(ttlock::api_error),
        help("Codes 10003/10004 usually mean the access token is invalid or expired.")
    )]
    ApiError { code: i64, message: String },

    #[error("The lock did not accept the {action} command")]
    #[diagnostic(
        code(ttlock::command_failed),
        help("Run again with -v for the vendor's reason. The gateway may be offline or busy.")
    )]
    CommandFailed { action: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("No access token configured for profile '{profile}'")]
    #[diagnostic(
        code(ttlock::no_credentials),
        help(
            "Store one with: ttlock config set-token --profile {profile}\n\
             Or pass --access-token / set TTLOCK_ACCESS_TOKEN."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("Lock {id} is not tracked")]
    #[diagnostic(
        code(ttlock::not_found),
        help(
            "The lock is not in the account, has neither gateway nor wifi,\n\
             is excluded by the profile's `locks` list, or could not be polled.\n\
             Run: ttlock status"
        )
    )]
    LockNotFound { id: i64 },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(ttlock::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(ttlock::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: ttlock config init --profile {name} --client-id <ID>"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No profile configured and no --client-id given")]
    #[diagnostic(
        code(ttlock::no_config),
        help(
            "Create a profile with: ttlock config init --client-id <ID>\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(ttlock::config))]
    Config(ConfigError),

    #[error("Internal error: {0}")]
    #[diagnostic(code(ttlock::internal))]
    Internal(String),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::NoCredentials { .. } => exit_code::AUTH,
            Self::ApiError { code, .. } if matches!(code, 10003 | 10004) => exit_code::AUTH,
            Self::LockNotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NoConfig { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Transport { message } => CliError::ConnectionFailed { reason: message },
            CoreError::Vendor { code, message } => CliError::ApiError { code, message },
            CoreError::UnknownLock { lock_id } => CliError::LockNotFound { id: lock_id },
            CoreError::Validation { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::Config { message } => CliError::Validation {
                field: "configuration".into(),
                reason: message,
            },
            CoreError::Parse { message } | CoreError::Internal(message) => {
                CliError::Internal(message)
            }
            CoreError::Disconnected => CliError::Internal("session already closed".into()),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}
