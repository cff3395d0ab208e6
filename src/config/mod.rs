//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables use the `TRIPSYNC` prefix and
//! `__` between nested keys. Every section has defaults, so an empty
//! environment yields a runnable in-memory setup.
//!
//! # Example
//!
//! ```no_run
//! use tripsync::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod fanout;
mod logging;
mod mutation;
mod notifier;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use fanout::FanoutConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use mutation::MutationConfig;
pub use notifier::NotifierConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Compare-and-swap retry policy
    #[serde(default)]
    pub mutation: MutationConfig,

    /// Profile fan-out worker
    #[serde(default)]
    pub fanout: FanoutConfig,

    /// Change notifier rooms and reaper
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// PostgreSQL connection (optional)
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `TRIPSYNC` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// - `TRIPSYNC__MUTATION__MAX_ATTEMPTS=8` -> `mutation.max_attempts = 8`
    /// - `TRIPSYNC__DATABASE__URL=...` -> `database.url = Some(...)`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("TRIPSYNC")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Loads and validates in one step.
    pub fn load_validated() -> Result<Self, ConfigError> {
        let config = Self::load()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.mutation.validate()?;
        self.fanout.validate()?;
        self.notifier.validate()?;
        self.database.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "TRIPSYNC__MUTATION__MAX_ATTEMPTS",
        "TRIPSYNC__FANOUT__MAX_CONCURRENCY",
        "TRIPSYNC__NOTIFIER__CHANNEL_CAPACITY",
        "TRIPSYNC__DATABASE__URL",
        "TRIPSYNC__LOGGING__FORMAT",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();

        let config = AppConfig::load().unwrap();

        assert_eq!(config.mutation.max_attempts, 5);
        assert_eq!(config.fanout.max_concurrency, 8);
        assert!(!config.database.is_configured());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn nested_values_override_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("TRIPSYNC__MUTATION__MAX_ATTEMPTS", "9");
        env::set_var("TRIPSYNC__NOTIFIER__CHANNEL_CAPACITY", "32");
        env::set_var("TRIPSYNC__LOGGING__FORMAT", "json");
        env::set_var("TRIPSYNC__DATABASE__URL", "postgresql://u@localhost/trips");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.mutation.max_attempts, 9);
        assert_eq!(config.notifier.channel_capacity, 32);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(
            config.database.url.as_deref(),
            Some("postgresql://u@localhost/trips")
        );
    }

    #[test]
    fn load_validated_rejects_bad_values() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("TRIPSYNC__FANOUT__MAX_CONCURRENCY", "0");
        let result = AppConfig::load_validated();
        clear_env();

        assert!(matches!(result, Err(ConfigError::ValidationFailed(_))));
    }
}
