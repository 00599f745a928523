//! # Config
//!
//! Configuration model and loader for herald.
//!
//! Settings come from a required file (any format the `config` crate understands, selected by
//! extension) overlaid by environment variables prefixed with `HERALD__`. Nested keys use a
//! double underscore: `HERALD__CENTER__COALESCE_INTERVAL_MS=50` maps to
//! `center.coalesce_interval_ms`.

mod error;
mod model;

pub use error::{ConfigError, ConfigErrorExt};
pub use model::{CenterConfig, HeraldConfig, LoggingConfig};

use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::info;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "HERALD";

const DEFAULT_CONFIG_FILE: &str = "herald";

/// Loads `T` from a configuration file with `HERALD__` environment overrides on top.
///
/// When `path` is `None` the `herald` file (any supported extension) in the working
/// directory is used.
///
/// # Errors
/// Returns [`ConfigError::Config`] if the file cannot be found or parsed, or if the merged
/// values do not match the shape of `T`.
///
/// # Example
/// ```rust,no_run
/// use herald_config::{load_config, HeraldConfig};
///
/// let cfg: HeraldConfig = load_config(Some("config/herald")).unwrap_or_default();
/// assert!(cfg.center.coalesce_interval().as_millis() >= 1);
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    load(path, Environment::with_prefix(ENV_PREFIX))
}

/// Like [`load_config`], but reads overrides from `vars` instead of the process environment.
///
/// Keys use the same `HERALD__SECTION__KEY` shape as real environment variables.
///
/// # Errors
/// Same as [`load_config`].
pub fn load_config_with_env<T, K, V>(
    path: Option<impl AsRef<Path>>,
    vars: impl IntoIterator<Item = (K, V)>,
) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
    K: Into<String>,
    V: Into<String>,
{
    let vars = vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
    load(path, Environment::with_prefix(ENV_PREFIX).source(Some(vars)))
}

fn load<T>(path: Option<impl AsRef<Path>>, environment: Environment) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let effective_path =
        path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), |p| p.as_ref().to_path_buf());

    let builder = Config::builder()
        .add_source(File::from(effective_path.as_path()).required(true))
        .add_source(environment.separator("__").try_parsing(true));

    info!(path = %effective_path.display(), "Loading configuration");

    let config = builder
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}
