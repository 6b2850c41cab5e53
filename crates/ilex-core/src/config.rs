// ── Runtime bridge configuration ──
//
// These types describe *how* to reach the i-Lex Connect portal and how
// often to poll it. They carry credential data but never touch disk;
// the host constructs a `BridgeConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// Default polling interval.
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(30);

/// Smallest polling interval a host may configure.
pub const MIN_SCAN_INTERVAL: Duration = Duration::from_secs(5);

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store.
    #[default]
    SystemDefaults,
    /// Additional CA certificate file.
    CustomCa(PathBuf),
}

/// Configuration for one configured portal account.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Portal root (e.g., `https://i-lexconnect.com`).
    pub base_url: Url,
    pub username: String,
    pub password: SecretString,
    /// How often a refresh cycle runs.
    pub scan_interval: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
    pub tls: TlsVerification,
}

impl BridgeConfig {
    /// Config for the production portal with default tuning.
    pub fn new(username: impl Into<String>, password: SecretString) -> Result<Self, url::ParseError> {
        Ok(Self {
            base_url: Url::parse(ilex_api::DEFAULT_BASE_URL)?,
            username: username.into(),
            password,
            scan_interval: DEFAULT_SCAN_INTERVAL,
            timeout: Duration::from_secs(30),
            tls: TlsVerification::default(),
        })
    }

    pub(crate) fn transport(&self) -> ilex_api::TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => ilex_api::TlsMode::System,
            TlsVerification::CustomCa(path) => ilex_api::TlsMode::CustomCa(path.clone()),
        };
        ilex_api::TransportConfig {
            tls,
            timeout: self.timeout,
            cookie_jar: None,
        }
        .with_cookie_jar()
    }
}
