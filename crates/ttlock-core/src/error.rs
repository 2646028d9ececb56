// ── Core error types ──
//
// Consumers never see HTTP status codes or raw JSON failures directly.
// The `From<ttlock_api::Error>` impl sorts transport-layer errors into
// the recoverable/vendor/parse taxonomy the reconcilers act on.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Remote API errors ────────────────────────────────────────────
    /// The cloud API could not be reached or answered with an HTTP error.
    #[error("Cannot reach the TTLock API: {message}")]
    Transport { message: String },

    /// The API answered with a non-zero `errcode`.
    #[error("TTLock API rejected the request ({code}): {message}")]
    Vendor { code: i64, message: String },

    /// A device or event payload was malformed or missing required fields.
    #[error("Malformed payload: {message}")]
    Parse { message: String },

    // ── Lookup errors ────────────────────────────────────────────────
    #[error("Lock {lock_id} is not tracked")]
    UnknownLock { lock_id: i64 },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Controller is not connected")]
    Disconnected,

    #[error("Invalid request: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Transport failures are retried on the next scheduled poll; nothing
    /// else is.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<ttlock_api::Error> for CoreError {
    fn from(err: ttlock_api::Error) -> Self {
        match err {
            ttlock_api::Error::Transport(e) => CoreError::Transport {
                message: e.to_string(),
            },
            ttlock_api::Error::Http { status, body } => CoreError::Transport {
                message: format!("HTTP {status}: {body}"),
            },
            ttlock_api::Error::Tls(message) => CoreError::Config {
                message: format!("TLS: {message}"),
            },
            ttlock_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ttlock_api::Error::Vendor { code, message } => CoreError::Vendor { code, message },
            ttlock_api::Error::Deserialization { message, body: _ } => {
                CoreError::Parse { message }
            }
        }
    }
}

impl From<crate::model::InvalidEventError> for CoreError {
    fn from(err: crate::model::InvalidEventError) -> Self {
        CoreError::Parse {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_errors_keep_their_code() {
        let err = CoreError::from(ttlock_api::Error::Vendor {
            code: -3003,
            message: "Gateway is busy".into(),
        });
        assert!(matches!(err, CoreError::Vendor { code: -3003, .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn http_failures_are_recoverable() {
        let err = CoreError::from(ttlock_api::Error::Http {
            status: 502,
            body: String::new(),
        });
        assert!(err.is_recoverable());
    }

    #[test]
    fn decoding_failures_are_parse_errors() {
        let err = CoreError::from(ttlock_api::Error::Deserialization {
            message: "missing field `lockMac`".into(),
            body: "{}".into(),
        });
        assert!(matches!(err, CoreError::Parse { .. }));
    }
}
