//! # Configuration
//!
//! [`OrchestratorConfig`] is layered from, in increasing priority:
//!
//! 1. Built-in defaults
//! 2. An optional TOML file
//! 3. `SHIPMENT__*` environment variables (`SHIPMENT__WORKER_POOL_SIZE=8`,
//!    `SHIPMENT__ROUTER__EXCLUDE_TEST_MODE=true`)
//!
//! ```toml
//! worker_pool_size = 8
//! ship_timeout_ms = 3000
//!
//! [router]
//! cost_factor = 2.0
//! ```
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const ENV_PREFIX: &str = "SHIPMENT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Multiplier on each carrier's `cost_weight`.
    pub cost_factor: f64,
    /// Multiplier on each carrier's `reliability_weight`.
    pub reliability_factor: f64,
    /// Keep sandbox carriers out of smart routing.
    pub exclude_test_mode: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            cost_factor: 1.0,
            reliability_factor: 1.0,
            exclude_test_mode: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Concurrent dispatches per bulk job.
    pub worker_pool_size: usize,
    /// Request channel capacity of each record store.
    pub actor_buffer_size: usize,
    pub ship_timeout_ms: u64,
    pub status_timeout_ms: u64,
    pub label_timeout_ms: u64,
    /// Retries after the first `ship` call, for transient errors only.
    pub max_ship_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_backoff_multiplier: f64,
    pub retry_max_delay_ms: u64,
    pub router: RouterConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: 5,
            actor_buffer_size: 64,
            ship_timeout_ms: 5_000,
            status_timeout_ms: 5_000,
            label_timeout_ms: 5_000,
            max_ship_retries: 2,
            retry_base_delay_ms: 200,
            retry_backoff_multiplier: 2.0,
            retry_max_delay_ms: 2_000,
            router: RouterConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Loads defaults, then `path` if given, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let loaded: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_pool_size == 0 {
            return Err(ConfigError::Invalid("worker_pool_size must be at least 1".into()));
        }
        if self.actor_buffer_size == 0 {
            return Err(ConfigError::Invalid("actor_buffer_size must be at least 1".into()));
        }
        for (name, value) in [
            ("ship_timeout_ms", self.ship_timeout_ms),
            ("status_timeout_ms", self.status_timeout_ms),
            ("label_timeout_ms", self.label_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be non-zero", name)));
            }
        }
        if self.retry_backoff_multiplier.is_nan() || self.retry_backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "retry_backoff_multiplier must be >= 1.0".into(),
            ));
        }
        if self.retry_max_delay_ms < self.retry_base_delay_ms {
            return Err(ConfigError::Invalid(
                "retry_max_delay_ms must not be below retry_base_delay_ms".into(),
            ));
        }
        if !self.router.cost_factor.is_finite() || !self.router.reliability_factor.is_finite() {
            return Err(ConfigError::Invalid("router factors must be finite".into()));
        }
        Ok(())
    }

    pub fn ship_timeout(&self) -> Duration {
        Duration::from_millis(self.ship_timeout_ms)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }

    pub fn label_timeout(&self) -> Duration {
        Duration::from_millis(self.label_timeout_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = OrchestratorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ship_timeout(), Duration::from_secs(5));
        assert_eq!(config.max_ship_retries, 2);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!(
            "shipment-config-{}.toml",
            uuid::Uuid::new_v4()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "worker_pool_size = 9\nship_timeout_ms = 1500\n\n[router]\nexclude_test_mode = true"
        )
        .unwrap();

        let config = OrchestratorConfig::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.worker_pool_size, 9);
        assert_eq!(config.ship_timeout(), Duration::from_millis(1500));
        assert!(config.router.exclude_test_mode);
        // Untouched keys keep their defaults
        assert_eq!(config.label_timeout_ms, 5_000);
        assert_eq!(config.router.cost_factor, 1.0);
    }

    #[test]
    fn test_zero_pool_is_rejected() {
        let config = OrchestratorConfig {
            worker_pool_size: 0,
            ..OrchestratorConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
