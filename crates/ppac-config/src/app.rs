//! Global, lazily-initialized configuration cache.
//!
//! Loads configuration once from the environment (including overrides) and
//! shares the resulting `PpacConfig` across all callers. This avoids repeated
//! env/file parsing throughout the process and centralizes configuration
//! injection at startup.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;

use crate::PpacConfig;

static GLOBAL_CONFIG: OnceCell<PpacConfig> = OnceCell::new();

/// Load configuration from the environment and cache it for subsequent calls.
///
/// The first caller populates the cache; later callers get the same instance.
pub fn load_from_env() -> Result<&'static PpacConfig> {
    GLOBAL_CONFIG.get_or_try_init(|| {
        let config = PpacConfig::from_env().context("Failed to load configuration")?;
        config.validate().context("Configuration is not valid")?;
        Ok(config)
    })
}

/// Get the cached configuration, assuming it has been loaded via
/// `load_from_env`. Panics if called before initialization.
pub fn get() -> &'static PpacConfig {
    GLOBAL_CONFIG
        .get()
        .expect("Config not initialized; call load_from_env first")
}
