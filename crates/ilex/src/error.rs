//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use ilex_config::ConfigError;
use ilex_core::CoreError;

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
    #[error("Could not refresh data from i-Lex Connect: {message}")]
    #[diagnostic(
        code(ilex::update_failed),
        help(
            "The portal could not be reached or answered with an error.\n\
             This is usually temporary -- try again in a moment.\n\
             Increase the timeout with --timeout if the portal is slow."
        )
    )]
    UpdateFailed { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Login rejected for profile '{profile}': {message}")]
    #[diagnostic(
        code(ilex::auth_failed),
        help(
            "Verify the username and password for this account.\n\
             Run: ilex config set-password --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("Session for profile '{profile}' expired and could not be renewed")]
    #[diagnostic(
        code(ilex::reauth_required),
        help(
            "The stored credentials no longer work.\n\
             Run: ilex config set-password --profile {profile}"
        )
    )]
    ReauthRequired { profile: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(ilex::no_credentials),
        help(
            "Configure credentials with: ilex config init\n\
             Or set ILEX_USERNAME and ILEX_PASSWORD environment variables."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(ilex::not_found),
        help("Run: ilex {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(ilex::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(ilex::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: ilex config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(ilex::config))]
    Config(Box<figment::Error>),

    #[error("Keyring error: {message}")]
    #[diagnostic(
        code(ilex::keyring),
        help("Store the password in the profile or ILEX_PASSWORD instead.")
    )]
    Keyring { message: String },

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(ilex::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(ilex::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to write config: {0}")]
    #[diagnostic(code(ilex::toml))]
    Toml(#[from] toml::ser::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UpdateFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::ReauthRequired { .. } | Self::NoCredentials { .. } => {
                exit_code::AUTH
            }
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the active profile name to a core error.
    pub fn from_core(err: CoreError, profile: &str) -> Self {
        match err {
            CoreError::ReauthRequired => Self::ReauthRequired {
                profile: profile.into(),
            },
            CoreError::UpdateFailed { message } => Self::UpdateFailed { message },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed {
                profile: profile.into(),
                message,
            },
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::UnknownProfile(name) => Self::ProfileNotFound {
                name,
                available: "(none)".into(),
            },
            ConfigError::Serialization(e) => Self::Toml(e),
            ConfigError::Figment(e) => Self::Config(e),
            ConfigError::Io(e) => Self::Io(e),
            ConfigError::Keyring(e) => Self::Keyring {
                message: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reauth_and_login_failures_exit_with_auth_code() {
        let reauth = CliError::from_core(CoreError::ReauthRequired, "home");
        assert_eq!(reauth.exit_code(), exit_code::AUTH);
        assert!(reauth.to_string().contains("home"));

        let login = CliError::from_core(
            CoreError::AuthenticationFailed {
                message: "HTTP 403".into(),
            },
            "home",
        );
        assert_eq!(login.exit_code(), exit_code::AUTH);
    }

    #[test]
    fn temporary_failures_exit_with_connection_code() {
        let err = CliError::from_core(
            CoreError::UpdateFailed {
                message: "HTTP 502".into(),
            },
            "home",
        );
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
    }

    #[test]
    fn config_validation_is_a_usage_error() {
        let err: CliError = ConfigError::Validation {
            field: "scan_interval".into(),
            reason: "too small".into(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
