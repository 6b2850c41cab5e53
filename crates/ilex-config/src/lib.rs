//! Host-side configuration for the i-Lex Connect bridge.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `ilex_core::BridgeConfig`. The CLI layers its
//! flag overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ilex_core::{BridgeConfig, DEFAULT_BASE_URL, MIN_SCAN_INTERVAL, TlsVerification};

/// Keyring service name; entries are keyed `{profile}/password`.
pub const KEYRING_SERVICE: &str = "ilex";

pub const ENV_USERNAME: &str = "ILEX_USERNAME";
pub const ENV_PASSWORD: &str = "ILEX_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{0}' not found")]
    UnknownProfile(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named portal accounts.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use: an explicit choice wins, then the
    /// configured default, then `"default"`.
    pub fn active_profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_string)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile(name.into()))
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Seconds between refresh cycles.
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            scan_interval: default_scan_interval(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_scan_interval() -> u64 {
    30
}
fn default_timeout() -> u64 {
    30
}

/// One portal account.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Portal base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    pub username: Option<String>,

    /// Password (plaintext -- prefer keyring or env var).
    pub password: Option<String>,

    /// Override refresh interval (seconds).
    pub scan_interval: Option<u64>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// Path to an extra CA certificate.
    pub ca_cert: Option<PathBuf>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            username: None,
            password: None,
            scan_interval: None,
            timeout: None,
            ca_cert: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "ilex", "ilex").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("ilex");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path`, merged with `ILEX_`-prefixed environment.
///
/// Nested keys use a double underscore, e.g.
/// `ILEX_PROFILES__HOME__USERNAME`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ILEX_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_key(profile_name: &str) -> String {
    format!("{profile_name}/password")
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_key(profile_name))?;
    entry.set_password(password)?;
    Ok(())
}

fn keyring_password(profile_name: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, &keyring_key(profile_name))
        .ok()?
        .get_password()
        .ok()
}

/// Resolve username + password for a profile.
///
/// Username: profile, then `ILEX_USERNAME`. Password: `ILEX_PASSWORD`,
/// then the system keyring, then plaintext in the profile.
pub fn resolve_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Result<(String, SecretString), ConfigError> {
    resolve_credentials_with(
        profile,
        profile_name,
        |name| std::env::var(name).ok(),
        keyring_password,
    )
}

fn resolve_credentials_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<(String, SecretString), ConfigError> {
    let no_credentials = || ConfigError::NoCredentials {
        profile: profile_name.into(),
    };

    let username = profile
        .username
        .clone()
        .or_else(|| env(ENV_USERNAME))
        .ok_or_else(no_credentials)?;

    let password = env(ENV_PASSWORD)
        .or_else(|| keyring(profile_name))
        .or_else(|| profile.password.clone())
        .ok_or_else(no_credentials)?;

    Ok((username, SecretString::from(password)))
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `BridgeConfig` from a profile, falling back to `defaults`.
pub fn profile_to_bridge_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<BridgeConfig, ConfigError> {
    let base_url: url::Url = profile
        .base_url
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("invalid URL: {}", profile.base_url),
        })?;

    let scan_interval =
        Duration::from_secs(profile.scan_interval.unwrap_or(defaults.scan_interval));
    if scan_interval < MIN_SCAN_INTERVAL {
        return Err(ConfigError::Validation {
            field: "scan_interval".into(),
            reason: format!(
                "must be at least {} seconds, got {}",
                MIN_SCAN_INTERVAL.as_secs(),
                scan_interval.as_secs()
            ),
        });
    }

    let (username, password) = resolve_credentials(profile, profile_name)?;

    let tls = profile
        .ca_cert
        .clone()
        .map_or(TlsVerification::SystemDefaults, TlsVerification::CustomCa);

    Ok(BridgeConfig {
        base_url,
        username,
        password,
        scan_interval,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        tls,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn profile() -> Profile {
        Profile {
            username: Some("owner@example.com".into()),
            password: Some("plain".into()),
            ..Profile::default()
        }
    }

    fn none(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn env_password_wins() {
        let env = |name: &str| (name == ENV_PASSWORD).then(|| "from-env".to_string());
        let keyring = |_: &str| Some("from-keyring".to_string());

        let (user, pw) = resolve_credentials_with(&profile(), "home", env, keyring).unwrap();
        assert_eq!(user, "owner@example.com");
        assert_eq!(pw.expose_secret(), "from-env");
    }

    #[test]
    fn keyring_beats_plaintext() {
        let keyring = |name: &str| (name == "home").then(|| "from-keyring".to_string());

        let (_, pw) = resolve_credentials_with(&profile(), "home", none, keyring).unwrap();
        assert_eq!(pw.expose_secret(), "from-keyring");
    }

    #[test]
    fn plaintext_is_last_resort() {
        let (_, pw) = resolve_credentials_with(&profile(), "home", none, none).unwrap();
        assert_eq!(pw.expose_secret(), "plain");
    }

    #[test]
    fn username_falls_back_to_env() {
        let p = Profile {
            username: None,
            ..profile()
        };
        let env = |name: &str| (name == ENV_USERNAME).then(|| "env-user".to_string());

        let (user, _) = resolve_credentials_with(&p, "home", env, none).unwrap();
        assert_eq!(user, "env-user");
    }

    #[test]
    fn missing_password_is_reported() {
        let p = Profile {
            password: None,
            ..profile()
        };
        let err = resolve_credentials_with(&p, "home", none, none).unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { profile } if profile == "home"));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let p = Profile {
            base_url: "not a url".into(),
            ..profile()
        };
        let err = profile_to_bridge_config(&p, "home", &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { field, .. } if field == "base_url"));
    }

    #[test]
    fn scan_interval_floor_is_enforced() {
        let p = Profile {
            scan_interval: Some(2),
            ..profile()
        };
        let err = profile_to_bridge_config(&p, "home", &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { field, .. } if field == "scan_interval"));
    }

    #[test]
    fn active_profile_selection() {
        let mut cfg = Config::default();
        assert_eq!(cfg.active_profile_name(None), "default");
        assert_eq!(cfg.active_profile_name(Some("cabin")), "cabin");

        cfg.default_profile = Some("home".into());
        assert_eq!(cfg.active_profile_name(None), "home");
        assert!(matches!(
            cfg.profile("home"),
            Err(ConfigError::UnknownProfile(_))
        ));
    }

    #[test]
    fn save_then_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                username: Some("owner@example.com".into()),
                scan_interval: Some(60),
                ..Profile::default()
            },
        );
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        let profile = loaded.profile("default").unwrap();
        assert_eq!(profile.username.as_deref(), Some("owner@example.com"));
        assert_eq!(profile.scan_interval, Some(60));
        assert_eq!(profile.base_url, DEFAULT_BASE_URL);
        assert_eq!(loaded.defaults.timeout, 30);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert!(loaded.profiles.is_empty());
        assert_eq!(loaded.defaults.output, "table");
    }
}
