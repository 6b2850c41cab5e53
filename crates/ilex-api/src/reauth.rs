// Transparent re-authentication protocol
//
// A data request is tried at most twice. The first 401 triggers exactly
// one login followed by one retry; a second 401 means the credentials
// themselves are bad. Any other failure status ends the call at once.

use reqwest::StatusCode;

/// Which request attempt a response belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    First,
    Retry,
}

/// What the client does next after seeing a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Decode the body and return it.
    Accept,
    /// Log in again, then retry the same request.
    Relogin,
    /// Give up: the session cannot be renewed with the stored credentials.
    ReauthRequired,
    /// Give up with a plain HTTP failure; no login, no retry.
    Fail(StatusCode),
}

/// Pure transition function driving [`crate::IlexClient`]'s data calls.
pub fn next_step(attempt: Attempt, status: StatusCode) -> Step {
    match (attempt, status) {
        (_, s) if s.is_success() => Step::Accept,
        (Attempt::First, StatusCode::UNAUTHORIZED) => Step::Relogin,
        (Attempt::Retry, StatusCode::UNAUTHORIZED) => Step::ReauthRequired,
        (_, s) => Step::Fail(s),
    }
}
