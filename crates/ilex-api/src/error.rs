use thiserror::Error;

/// Top-level error type for the `ilex-api` crate.
///
/// Covers every failure mode of the i-Lex Connect API: login rejection,
/// session renewal exhaustion, HTTP status failures, transport, and
/// payload decoding. `ilex-core` classifies these into cycle outcomes.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login was rejected (non-200 status) or the response lacked the
    /// session marker. Both cases share one kind; the message differs.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The session expired, a fresh login succeeded, and the retried
    /// request was still unauthorized. Stored credentials are no longer
    /// usable and must be re-collected.
    #[error("Session expired and re-authentication failed")]
    ReauthRequired,

    // ── HTTP ────────────────────────────────────────────────────────
    /// Non-success, non-401 HTTP status on a data request.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if stored credentials must be re-collected.
    pub fn is_reauth_required(&self) -> bool {
        matches!(self, Self::ReauthRequired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reauth_required_is_tagged() {
        assert!(Error::ReauthRequired.is_reauth_required());
        assert!(
            !Error::Authentication {
                message: "Login failed".into()
            }
            .is_reauth_required()
        );
    }
}
