//! Config file discovery and layered loading.
//!
//! 1. Parse `defaults.toml` → base
//! 2. Merge one config file: the explicit path if given, else `./btl.toml`,
//!    else `~/.btl/config.toml`
//! 3. Apply env var fallbacks for unset fields
//! 4. Deserialize merged tree → `Config`
//! 5. Validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_leaves};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Name of the config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "btl.toml";

/// A loaded configuration and where its values came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final merged configuration.
    pub config: Config,
    /// Dotted field path → which layer set the value.
    pub field_sources: FieldSources,
    /// The config file that was merged, if any.
    pub loaded_file: Option<PathBuf>,
}

/// Load configuration from the process environment and filesystem.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the config file is unreadable or malformed,
/// or if the merged configuration fails validation.
pub fn load(explicit: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    let cwd = std::env::current_dir().map_err(|e| ConfigError::ReadError {
        path: ".".to_owned(),
        source: e,
    })?;
    // The home directory only matters when no explicit file is given.
    let home = match explicit {
        Some(_) => None,
        None => Some(home_directory()?),
    };
    load_with(explicit, &cwd, home.as_deref(), &collect_env_vars())
}

/// Load configuration with every input supplied by the caller.
///
/// `home` is consulted only when `explicit` is `None` and `cwd` holds no
/// [`LOCAL_CONFIG_FILE`].
///
/// # Errors
///
/// Returns a [`ConfigError`] if the config file is unreadable or malformed,
/// or if the merged configuration fails validation. A missing explicit file
/// is a [`ConfigError::ReadError`].
pub fn load_with<S: ::std::hash::BuildHasher>(
    explicit: Option<&Path>,
    cwd: &Path,
    home: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<ResolvedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let mut field_sources = FieldSources::new();
    record_leaves(&merged, "", &ConfigLayer::Defaults, &mut field_sources);

    let file = match explicit {
        Some(path) => Some((load_required(path)?, path.to_path_buf())),
        None => discover(cwd, home)?,
    };

    let loaded_file = if let Some((overlay, path)) = file {
        let layer = ConfigLayer::File(path.display().to_string());
        deep_merge_tracking(&mut merged, &overlay, "", &layer, &mut field_sources);
        info!(path = %path.display(), "loaded config file");
        Some(path)
    } else {
        debug!("no config file found, using defaults");
        None
    };

    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_file,
    })
}

/// First existing file of `./btl.toml` and `~/.btl/config.toml`.
fn discover(cwd: &Path, home: Option<&Path>) -> ConfigResult<Option<(toml::Value, PathBuf)>> {
    let local = cwd.join(LOCAL_CONFIG_FILE);
    if let Some(overlay) = try_load_file(&local)? {
        return Ok(Some((overlay, local)));
    }

    if let Some(home) = home {
        let user = home.join(".btl").join("config.toml");
        if let Some(overlay) = try_load_file(&user)? {
            return Ok(Some((overlay, user)));
        }
    }

    Ok(None)
}

fn load_required(path: &Path) -> ConfigResult<toml::Value> {
    match try_load_file(path)? {
        Some(value) => Ok(value),
        None => Err(ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }),
    }
}

/// Try to load a file, returning `None` if the file doesn't exist.
///
/// Uses a single read operation to avoid TOCTOU races (no separate
/// exists/metadata checks before reading).
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}

/// Determine the user's home directory.
fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}
