// ── Core error types ──
//
// Host-facing errors from ilex-core. A refresh cycle only ever fails with
// one of two kinds: `UpdateFailed` (temporary, retry on the next tick) or
// `ReauthRequired` (stored credentials are dead, stop and re-collect them).
// Setup adds configuration and initial-login failures.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Cycle outcomes ───────────────────────────────────────────────
    /// The session could not be renewed with the stored credentials.
    #[error("Authentication failed -- please re-authenticate")]
    ReauthRequired,

    /// The cycle was aborted; the previous snapshot is still published.
    #[error("Update failed: {message}")]
    UpdateFailed { message: String },

    // ── Setup ────────────────────────────────────────────────────────
    /// The initial login was rejected.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Returns `true` if the host must prompt for new credentials.
    pub fn is_reauth_required(&self) -> bool {
        matches!(self, Self::ReauthRequired)
    }

    /// Classify a client error raised while fetching the device list.
    ///
    /// Only a tagged re-authentication failure is fatal for the cycle;
    /// every other error, authentication included, is temporary.
    pub fn from_cycle_error(err: ilex_api::Error) -> Self {
        match err {
            ilex_api::Error::ReauthRequired => Self::ReauthRequired,
            ilex_api::Error::Authentication { message } => Self::UpdateFailed {
                message: format!("Authentication error: {message}"),
            },
            other => Self::UpdateFailed {
                message: format!("Error communicating with API: {other}"),
            },
        }
    }
}

// ── Conversion from transport-layer errors (setup path) ─────────────

impl From<ilex_api::Error> for CoreError {
    fn from(err: ilex_api::Error) -> Self {
        match err {
            ilex_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            ilex_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ilex_api::Error::Tls(message) => CoreError::Config {
                message: format!("TLS error: {message}"),
            },
            other => CoreError::from_cycle_error(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_tagged_reauth_is_fatal() {
        assert!(CoreError::from_cycle_error(ilex_api::Error::ReauthRequired).is_reauth_required());

        let err = CoreError::from_cycle_error(ilex_api::Error::Authentication {
            message: "login failed (HTTP 500 Internal Server Error)".into(),
        });
        assert!(matches!(err, CoreError::UpdateFailed { .. }));
        assert!(err.to_string().contains("Authentication error"));
    }

    #[test]
    fn status_failures_are_temporary() {
        let err = CoreError::from_cycle_error(ilex_api::Error::Status {
            status: 502,
            url: "https://i-lexconnect.com/api/devices".into(),
        });
        match err {
            CoreError::UpdateFailed { message } => assert!(message.contains("502")),
            other => panic!("expected UpdateFailed, got: {other:?}"),
        }
    }

    #[test]
    fn setup_login_rejection_maps_to_authentication_failed() {
        let err: CoreError = ilex_api::Error::Authentication {
            message: "login failed (HTTP 403 Forbidden)".into(),
        }
        .into();
        assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
    }
}
