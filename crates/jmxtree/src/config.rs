//! CLI configuration: thin wrapper around `jmxtree_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--gateway, --username, etc.).

use std::time::Duration;

use secrecy::SecretString;

use jmxtree_core::{Credentials, TlsVerification, WorkspaceConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use jmxtree_config::{
    Config, Profile, config_path, load_config_or_default, preferences_path, save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.default_profile_name().to_string())
}

/// Comma-separated profile names for diagnostics.
pub fn available_profiles(config: &Config) -> String {
    let mut names: Vec<_> = config.profiles.keys().cloned().collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort();
    names.join(", ")
}

/// Build a `WorkspaceConfig` from the config file, profile, and CLI overrides.
pub fn build_workspace_config(global: &GlobalOpts) -> Result<WorkspaceConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    // A profile exists: apply flag overrides on top of it
    if let Some(profile) = cfg.profiles.get(&profile_name) {
        return resolve_profile(profile, &profile_name, global);
    }

    // An explicitly requested profile must exist
    if global.profile.is_some() {
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: available_profiles(&cfg),
        });
    }

    // No profile: build from flags / env vars alone
    let url_str = global.gateway.as_deref().ok_or_else(|| CliError::NoConfig {
        path: config_path().display().to_string(),
    })?;
    let mut config = WorkspaceConfig::new(parse_url(url_str)?);

    config.credentials = match (&global.username, &global.password) {
        (None, _) => Credentials::None,
        (Some(username), Some(password)) => Credentials::Basic {
            username: username.clone(),
            password: SecretString::from(password.clone()),
        },
        (Some(_), None) => {
            return Err(CliError::NoCredentials {
                profile: profile_name,
            });
        }
    };
    config.tls = if global.insecure || cfg.defaults.insecure {
        TlsVerification::DangerAcceptInvalid
    } else {
        TlsVerification::SystemDefaults
    };
    config.timeout = Duration::from_secs(global.timeout);
    Ok(config)
}

/// Translate a `Profile` + global flags into a `WorkspaceConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    global: &GlobalOpts,
) -> Result<WorkspaceConfig, CliError> {
    // 1. Credentials (flag > env > keyring > profile)
    let username = global.username.clone().or_else(|| profile.username.clone());
    let credentials = match username {
        None => Credentials::None,
        Some(username) => {
            let password = match global.password {
                Some(ref pw) => SecretString::from(pw.clone()),
                None => jmxtree_config::resolve_password(profile, profile_name)?,
            };
            Credentials::Basic { username, password }
        }
    };
    let mut config = jmxtree_config::profile_with_credentials(profile, credentials)?;

    // 2. Gateway URL (flag > env > profile)
    if let Some(ref url_str) = global.gateway {
        config.url = parse_url(url_str)?;
    }

    // 3. TLS verification
    if global.insecure {
        config.tls = TlsVerification::DangerAcceptInvalid;
    }

    // 4. Timeout (profile wins over the flag default)
    if profile.timeout.is_none() {
        config.timeout = Duration::from_secs(global.timeout);
    }

    Ok(config)
}

fn parse_url(url_str: &str) -> Result<url::Url, CliError> {
    url_str.parse().map_err(|_| CliError::Validation {
        field: "gateway".into(),
        reason: format!("invalid URL: {url_str}"),
    })
}
