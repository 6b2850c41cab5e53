use std::fmt;

use secrecy::SecretString;

/// Username/password pair for the i-Lex Connect portal.
///
/// Immutable for the lifetime of a configured connection. The password
/// is a [`SecretString`], so `Debug` output never reveals it.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Server-side session status as seen by the client.
///
/// There is no expiry timer: a session is only discovered to be stale
/// when a data request comes back `401 Unauthorized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No login has succeeded yet.
    #[default]
    Unauthenticated,
    /// The last login succeeded and no request has been rejected since.
    Authenticated,
    /// A data request was rejected with 401; a re-login is pending.
    Stale,
}

impl SessionState {
    /// State after a successful login.
    pub fn on_login(self) -> Self {
        Self::Authenticated
    }

    /// State after a data request was answered with 401.
    pub fn on_unauthorized(self) -> Self {
        Self::Stale
    }

    pub fn is_authenticated(self) -> bool {
        self == Self::Authenticated
    }
}
