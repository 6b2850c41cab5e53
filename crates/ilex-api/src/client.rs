// i-Lex Connect HTTP client
//
// Wraps `reqwest::Client` with the portal's cookie session, URL
// construction, and the transparent re-authentication protocol. Endpoint
// methods live in `devices.rs`; login lives here because every data call
// may need it.

use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{Credentials, SessionState};
use crate::error::Error;
use crate::reauth::{self, Attempt, Step};
use crate::transport::TransportConfig;

/// Production portal root.
pub const DEFAULT_BASE_URL: &str = "https://i-lexconnect.com";

const LOGIN_PATH: &str = "/login";

/// Key whose presence in the login response confirms a server-side session.
const LOGIN_MARKER: &str = "redirect";

/// Raw HTTP client for the i-Lex Connect API.
///
/// Owns the session state: callers never log in explicitly before a data
/// call, a rejected request re-authenticates once on its own.
pub struct IlexClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
    session: watch::Sender<SessionState>,
    /// Serializes logins so a renewal is never interleaved with another.
    login_lock: Mutex<()>,
}

impl IlexClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(
        base_url: Url,
        credentials: Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, credentials))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    ///
    /// The client must keep cookies between requests for the session to
    /// survive past login.
    pub fn with_client(http: reqwest::Client, base_url: Url, credentials: Credentials) -> Self {
        let (session, _) = watch::channel(SessionState::Unauthenticated);
        Self {
            http,
            base_url,
            credentials,
            session,
            login_lock: Mutex::new(()),
        }
    }

    /// The portal base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The account this client logs in as.
    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// Current session state.
    pub fn session_state(&self) -> SessionState {
        *self.session.borrow()
    }

    /// Watch session state transitions.
    pub fn subscribe_session(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    // ── Authentication ───────────────────────────────────────────────

    /// Authenticate with the portal.
    ///
    /// Succeeds only on HTTP 200 with a JSON body carrying the `redirect`
    /// key. Any other status, a non-JSON body, or a missing marker fails
    /// with [`Error::Authentication`] and leaves the session state as it was.
    pub async fn login(&self) -> Result<(), Error> {
        let _guard = self.login_lock.lock().await;

        let url = self.base_url.join(LOGIN_PATH).map_err(Error::InvalidUrl)?;
        debug!(%url, username = %self.credentials.username, "logging in");

        let body = json!({
            "username": self.credentials.username,
            "password": self.credentials.password.expose_secret(),
        });

        let resp = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {status})"),
            });
        }

        let payload: Value = resp.json().await.map_err(|e| Error::Authentication {
            message: format!("unexpected login response: {e}"),
        })?;
        if payload.get(LOGIN_MARKER).is_none() {
            return Err(Error::Authentication {
                message: format!("unexpected login response: no '{LOGIN_MARKER}' field"),
            });
        }

        self.session.send_modify(|s| *s = s.on_login());
        info!("login successful");
        Ok(())
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/{segments...}` with each segment percent-encoded.
    pub(crate) fn segments_url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .clear()
            .extend(segments);
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET under the re-authentication protocol and decode the body.
    ///
    /// At most two requests and one login per call: a first 401 marks the
    /// session stale, logs in, and retries; a second 401 yields
    /// [`Error::ReauthRequired`]. Other failure statuses are returned as
    /// [`Error::Status`] without retrying.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        let mut attempt = Attempt::First;
        loop {
            debug!(%url, ?attempt, "GET");

            let resp = self
                .http
                .get(url.clone())
                .send()
                .await
                .map_err(Error::Transport)?;

            match reauth::next_step(attempt, resp.status()) {
                Step::Accept => return decode(resp).await,
                Step::Relogin => {
                    debug!(%url, "session expired, re-authenticating");
                    self.session.send_modify(|s| *s = s.on_unauthorized());
                    self.login().await?;
                    attempt = Attempt::Retry;
                }
                Step::ReauthRequired => {
                    warn!(%url, "still unauthorized after fresh login");
                    self.session.send_modify(|s| *s = s.on_unauthorized());
                    return Err(Error::ReauthRequired);
                }
                Step::Fail(status) => {
                    return Err(Error::Status {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }
            }
        }
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let body = resp.text().await.map_err(Error::Transport)?;
    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.clone(),
        }
    })
}
