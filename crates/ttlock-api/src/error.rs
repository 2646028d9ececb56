use thiserror::Error;

/// Top-level error type for the `ttlock-api` crate.
///
/// Covers every failure mode of the cloud API surface: transport,
/// HTTP status, the vendor `errcode` envelope, and payload decoding.
/// `ttlock-core` maps these into its own recoverable/command taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake, certificate, or client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Non-success HTTP status with the raw body for debugging.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    // ── Vendor ──────────────────────────────────────────────────────
    /// The API answered with a non-zero `errcode`.
    #[error("TTLock API error {code}: {message}")]
    Vendor { code: i64, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying on the
    /// next scheduled cycle.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Extract the vendor error code, if available.
    pub fn vendor_code(&self) -> Option<i64> {
        match self {
            Self::Vendor { code, .. } => Some(*code),
            _ => None,
        }
    }
}
