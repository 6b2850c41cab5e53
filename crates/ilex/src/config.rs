//! CLI configuration -- thin wrapper around `ilex_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--profile, --base-url, --timeout).

use ilex_core::BridgeConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use ilex_config::{Config, Defaults, Profile, config_path, load_config_or_default, save_config};

/// A bridge configuration plus the profile it came from.
pub struct Resolved {
    pub profile_name: String,
    pub bridge: BridgeConfig,
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Look up a profile by name, producing a helpful error when absent.
pub fn require_profile<'a>(config: &'a Config, name: &str) -> Result<&'a Profile, CliError> {
    config.profiles.get(name).ok_or_else(|| CliError::ProfileNotFound {
        name: name.into(),
        available: available_profiles(config),
    })
}

/// Build a `BridgeConfig` from the config file, profile, and CLI overrides.
///
/// Without a matching profile the bridge can still run from environment
/// alone (`ILEX_USERNAME` / `ILEX_PASSWORD`), unless a profile was
/// named explicitly.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(p) => p.clone(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&cfg),
            });
        }
        None => Profile::default(),
    };

    if let Some(ref url) = global.base_url {
        profile.base_url.clone_from(url);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }

    let bridge = ilex_config::profile_to_bridge_config(&profile, &profile_name, &cfg.defaults)?;
    Ok(Resolved {
        profile_name,
        bridge,
    })
}
