//! Configuration management for Faultline services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`FAULTLINE__<SECTION>__<KEY>`)
//! 2. Config file (`faultline.toml`, prefix overridable)
//! 3. Defaults

use serde::de::DeserializeOwned;

use crate::error::FaultlineError;

/// Default config file prefix.
pub const DEFAULT_CONFIG_PREFIX: &str = "faultline";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "FAULTLINE";

/// Load one section of the layered configuration.
///
/// A missing section yields `T::default()`; a present but malformed section
/// is an error.
pub fn load_section<T>(file_prefix: &str, section: &str) -> Result<T, FaultlineError>
where
    T: DeserializeOwned + Default,
{
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    match cfg.get::<T>(section) {
        Ok(value) => Ok(value),
        Err(config::ConfigError::NotFound(_)) => {
            tracing::debug!(section, "Config section not found, using defaults");
            Ok(T::default())
        }
        Err(e) => Err(e.into()),
    }
}
