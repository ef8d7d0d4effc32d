//! # Runtime Configuration Loading
//!
//! Layers, later wins:
//!
//! 1. `DigestConfig::default()`
//! 2. Properties file (`AD_CONFIG_FILE`, default `config.properties`,
//!    skipped when absent). `key = value` lines with `#` comments are read
//!    as TOML, so numbers stay bare and strings are quoted.
//! 3. `AD_*` environment variables named after the fields, e.g.
//!    `AD_SHARD_COUNT` or `AD_MALFORMED_PAYLOAD_POLICY=fatal`
//!
//! The file is extracted on its own before the environment is merged, so a
//! legacy key in the file and its canonical name in the environment never
//! meet in one map.

use alarm_digest::{ConfigError, DigestConfig};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;
use tracing::{debug, info};

/// Environment variable naming the properties file.
pub const CONFIG_FILE_ENV: &str = "AD_CONFIG_FILE";

/// Properties file used when `AD_CONFIG_FILE` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "config.properties";

/// Prefix of the environment overrides.
pub const ENV_PREFIX: &str = "AD_";

/// Load configuration from the file named by `AD_CONFIG_FILE` and the
/// process environment.
///
/// # Errors
///
/// `Load` when a source cannot be read or a value has the wrong type,
/// `Zero` when validation fails.
pub fn load_config() -> Result<DigestConfig, ConfigError> {
    let path = std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
    load_config_from(path)
}

/// Load configuration from `path` and the process environment.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<DigestConfig, ConfigError> {
    let path = path.as_ref();
    if path.exists() {
        info!(path = %path.display(), "Loading properties file");
    } else {
        debug!(path = %path.display(), "No properties file, using defaults");
    }

    let from_file: DigestConfig = Figment::new()
        .merge(Toml::file(path))
        .extract()
        .map_err(load_error)?;

    let config: DigestConfig = Figment::from(Serialized::defaults(from_file))
        .merge(Env::prefixed(ENV_PREFIX))
        .extract()
        .map_err(load_error)?;

    config.validate()?;
    Ok(config)
}

fn load_error(err: figment::Error) -> ConfigError {
    ConfigError::Load(err.to_string())
}
