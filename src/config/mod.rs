//! Engine Configuration Module
//!
//! Provides farm configuration loaded from TOML files, covering every
//! empirical threshold used by the adjustment model, the FCR blend and the
//! projection cap.
//!
//! ## Loading Order
//!
//! 1. `PONDFEED_CONFIG` environment variable (path to TOML file)
//! 2. `pondfeed.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! Library entry points take `&EngineConfig` explicitly. Binaries call
//! `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! // In main():
//! config::init(EngineConfig::load());
//!
//! // Anywhere in the binary:
//! let cap = config::get().projection.max_days;
//! ```

mod engine_config;
pub mod defaults;
pub mod validation;

pub use engine_config::*;

use std::sync::OnceLock;

/// Global engine configuration, initialized once at startup.
static ENGINE_CONFIG: OnceLock<EngineConfig> = OnceLock::new();

/// Initialize the global engine configuration.
///
/// Later calls are ignored with a warning.
pub fn init(config: EngineConfig) {
    if ENGINE_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Get a reference to the global engine configuration.
///
/// Panics if `init()` has not been called. A missing config is a fatal
/// startup error, not a recoverable condition.
#[allow(clippy::expect_used)]
pub fn get() -> &'static EngineConfig {
    ENGINE_CONFIG
        .get()
        .expect("config::get() called before config::init(); this is a startup bug")
}

/// Check whether the config has been initialized.
pub fn is_initialized() -> bool {
    ENGINE_CONFIG.get().is_some()
}
