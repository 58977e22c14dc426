//! Config subcommand handlers.

use std::io::BufRead;

use jmxtree_config::KEYRING_SERVICE;
use jmxtree_core::config::DEFAULT_GATEWAY_URL;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Profile};
use crate::error::CliError;
use crate::output;

const SETTABLE_KEYS: &str = "gateway, username, password_env, ca_cert, insecure, timeout, \
                             auto_refresh, update_rate_ms, refresh_max_depth";

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let out = output::render_single(
                global.output,
                &cfg,
                |c| format!("{c:#?}"),
                |_| "config".into(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);

            let profile = cfg
                .profiles
                .entry(profile_name.clone())
                .or_insert_with(|| Profile {
                    gateway: DEFAULT_GATEWAY_URL.into(),
                    ..Profile::default()
                });
            set_profile_value(profile, &key, value)?;

            config::save_config(&cfg)?;
            eprintln!("✓ Set {key} on profile '{profile_name}'");
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile_name();
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: jmxtree config set gateway <URL>");
            } else {
                let mut names: Vec<_> = cfg.profiles.keys().collect();
                names.sort();
                for name in names {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();

            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        // ── SetPassword ─────────────────────────────────────────────
        ConfigCommand::SetPassword { profile } => {
            let cfg = config::load_config_or_default();
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));

            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name: profile_name,
                });
            }

            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            let password = line.trim_end_matches(['\r', '\n']);
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "password read from stdin is empty".into(),
                });
            }

            let keyring_err = |e: keyring::Error| CliError::Validation {
                field: "keyring".into(),
                reason: format!("failed to store password in keyring: {e}"),
            };
            keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
                .map_err(keyring_err)?
                .set_password(password)
                .map_err(keyring_err)?;

            eprintln!("✓ Password for '{profile_name}' stored in system keyring");
            Ok(())
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn set_profile_value(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    let invalid = |field: &str, reason: &str| CliError::Validation {
        field: field.into(),
        reason: reason.into(),
    };

    match key {
        "gateway" => {
            url::Url::parse(&value)
                .map_err(|_| invalid("gateway", "must be a URL"))?;
            profile.gateway = value;
        }
        "username" => profile.username = Some(value),
        "password_env" | "password-env" => profile.password_env = Some(value),
        "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
        "insecure" => {
            profile.insecure =
                Some(value.parse().map_err(|_| invalid("insecure", "must be 'true' or 'false'"))?);
        }
        "timeout" => {
            profile.timeout =
                Some(value.parse().map_err(|_| invalid("timeout", "must be a number (seconds)"))?);
        }
        "auto_refresh" | "auto-refresh" => {
            profile.auto_refresh = Some(
                value
                    .parse()
                    .map_err(|_| invalid("auto_refresh", "must be 'true' or 'false'"))?,
            );
        }
        "update_rate_ms" | "update-rate-ms" => {
            profile.update_rate_ms = Some(
                value
                    .parse()
                    .map_err(|_| invalid("update_rate_ms", "must be a number (milliseconds)"))?,
            );
        }
        "refresh_max_depth" | "refresh-max-depth" => {
            profile.refresh_max_depth = Some(
                value
                    .parse()
                    .map_err(|_| invalid("refresh_max_depth", "must be a positive number"))?,
            );
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!("unknown config key '{other}'. Valid keys: {SETTABLE_KEYS}"),
            });
        }
    }
    Ok(())
}
