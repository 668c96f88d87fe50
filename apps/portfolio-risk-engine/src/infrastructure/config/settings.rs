//! Engine Configuration Settings
//!
//! Configuration types for the risk engine, loaded from environment
//! variables. Every setting has a default; a variable that is present but
//! unparsable is an error rather than silently ignored.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::application::services::{DEFAULT_DELIVERY_TIMEOUT, SchedulerConfig};
use crate::domain::greeks::DefaultPolicy;
use crate::domain::portfolio::{DEFAULT_ACTIVITY_CAPACITY, RiskThresholds, ThresholdBand};
use crate::domain::position::{Exchange, PerExchange};

/// Scheduler timing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Tick interval while every exchange is live.
    pub refresh_interval: Duration,
    /// Tick interval in degraded or synthetic mode.
    pub synthetic_refresh_interval: Duration,
    /// Bound on a single source fetch.
    pub fetch_timeout: Duration,
    /// Bound on a single subscriber delivery.
    pub subscriber_timeout: Duration,
    /// Ignore live sources.
    pub force_synthetic: bool,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        let scheduler = SchedulerConfig::default();
        Self {
            refresh_interval: scheduler.live_interval,
            synthetic_refresh_interval: scheduler.degraded_interval,
            fetch_timeout: scheduler.fetch_timeout,
            subscriber_timeout: DEFAULT_DELIVERY_TIMEOUT,
            force_synthetic: scheduler.force_synthetic,
        }
    }
}

/// Position source settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSettings {
    /// JSON position file per exchange.
    pub position_files: PerExchange<Option<PathBuf>>,
    /// Seed of the synthetic position generator.
    pub synthetic_seed: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            position_files: PerExchange::default(),
            synthetic_seed: 42,
        }
    }
}

/// Server port settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerSettings {
    /// Prometheus metrics port (0 = disabled).
    pub metrics_port: u16,
    /// Capacity of the snapshot broadcast channel.
    pub broadcast_capacity: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            metrics_port: 9091,
            broadcast_capacity: 16,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Scheduler timing.
    pub scheduler: SchedulerSettings,
    /// Defaults for missing option inputs.
    pub pricing: DefaultPolicy,
    /// Classification bands.
    pub thresholds: RiskThresholds,
    /// Activity log capacity.
    pub activity_capacity: usize,
    /// Position sources.
    pub sources: SourceSettings,
    /// Server ports.
    pub server: ServerSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerSettings::default(),
            pricing: DefaultPolicy::default(),
            thresholds: RiskThresholds::default(),
            activity_capacity: DEFAULT_ACTIVITY_CAPACITY,
            sources: SourceSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or the resulting
    /// configuration is inconsistent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be parsed or the resulting
    /// configuration is inconsistent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Lookup(&lookup);
        let defaults = Self::default();

        let scheduler = SchedulerSettings {
            refresh_interval: env.duration_secs(
                "REFRESH_INTERVAL_SECS",
                defaults.scheduler.refresh_interval,
            )?,
            synthetic_refresh_interval: env.duration_secs(
                "SYNTHETIC_REFRESH_INTERVAL_SECS",
                defaults.scheduler.synthetic_refresh_interval,
            )?,
            fetch_timeout: env.duration_millis(
                "SOURCE_FETCH_TIMEOUT_MS",
                defaults.scheduler.fetch_timeout,
            )?,
            subscriber_timeout: env.duration_millis(
                "SUBSCRIBER_TIMEOUT_MS",
                defaults.scheduler.subscriber_timeout,
            )?,
            force_synthetic: env.bool("FORCE_SYNTHETIC_MODE", defaults.scheduler.force_synthetic)?,
        };

        let pricing = DefaultPolicy {
            default_volatility: env.parse("DEFAULT_VOLATILITY", defaults.pricing.default_volatility)?,
            default_risk_free_rate: env.parse(
                "RISK_FREE_RATE",
                defaults.pricing.default_risk_free_rate,
            )?,
        };

        let thresholds = RiskThresholds {
            delta_exposure: ThresholdBand::new(
                env.parse("DELTA_SAFE_BAND", defaults.thresholds.delta_exposure.safe)?,
                env.parse("DELTA_WARNING_BAND", defaults.thresholds.delta_exposure.warning)?,
            ),
            ..defaults.thresholds
        };

        let sources = SourceSettings {
            position_files: PerExchange::from_fn(|exchange| {
                env.get(position_file_key(exchange))
                    .filter(|path| !path.trim().is_empty())
                    .map(PathBuf::from)
            }),
            synthetic_seed: env.parse("SYNTHETIC_SEED", defaults.sources.synthetic_seed)?,
        };

        let server = ServerSettings {
            metrics_port: env.parse("RISK_ENGINE_METRICS_PORT", defaults.server.metrics_port)?,
            broadcast_capacity: env.parse(
                "SNAPSHOT_BROADCAST_CAPACITY",
                defaults.server.broadcast_capacity,
            )?,
        };

        let config = Self {
            scheduler,
            pricing,
            thresholds,
            activity_capacity: env.parse("ACTIVITY_LOG_CAPACITY", defaults.activity_capacity)?,
            sources,
            server,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for inconsistent values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Inconsistent`] describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let inconsistent =
            |message: String| -> Result<(), ConfigError> { Err(ConfigError::Inconsistent(message)) };

        if self.scheduler.refresh_interval.is_zero()
            || self.scheduler.synthetic_refresh_interval.is_zero()
        {
            return inconsistent("refresh intervals must be positive".to_string());
        }
        if self.scheduler.fetch_timeout.is_zero() || self.scheduler.subscriber_timeout.is_zero() {
            return inconsistent("timeouts must be positive".to_string());
        }
        if self.pricing.default_volatility < Decimal::ZERO {
            return inconsistent(format!(
                "DEFAULT_VOLATILITY must be non-negative, got {}",
                self.pricing.default_volatility
            ));
        }
        if let Some(band) = self.thresholds.first_unordered() {
            return inconsistent(format!("{band} band: warning bound is below safe bound"));
        }
        if self.activity_capacity == 0 {
            return inconsistent("ACTIVITY_LOG_CAPACITY must be at least 1".to_string());
        }
        if self.server.broadcast_capacity == 0 {
            return inconsistent("SNAPSHOT_BROADCAST_CAPACITY must be at least 1".to_string());
        }
        Ok(())
    }

    /// Scheduler configuration.
    #[must_use]
    pub const fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            live_interval: self.scheduler.refresh_interval,
            degraded_interval: self.scheduler.synthetic_refresh_interval,
            fetch_timeout: self.scheduler.fetch_timeout,
            force_synthetic: self.scheduler.force_synthetic,
        }
    }
}

const fn position_file_key(exchange: Exchange) -> &'static str {
    match exchange {
        Exchange::Binance => "BINANCE_POSITIONS_FILE",
        Exchange::Bybit => "BYBIT_POSITIONS_FILE",
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable could not be parsed.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Raw value.
        value: String,
    },
    /// Values are individually valid but inconsistent together.
    #[error("inconsistent configuration: {0}")]
    Inconsistent(String),
}

struct Lookup<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Lookup<'_, F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    fn parse<T: FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
        }
    }

    fn bool(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => match raw.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" | "" => Ok(false),
                _ => Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: raw,
                }),
            },
        }
    }

    fn duration_secs(&self, key: &str, default: Duration) -> Result<Duration, ConfigError> {
        self.parse(key, default.as_secs()).map(Duration::from_secs)
    }

    fn duration_millis(&self, key: &str, default: Duration) -> Result<Duration, ConfigError> {
        self.parse(key, default.as_millis() as u64)
            .map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rust_decimal_macros::dec;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<EngineConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        EngineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_variables() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.scheduler.refresh_interval, Duration::from_secs(10));
        assert_eq!(config.scheduler.synthetic_refresh_interval, Duration::from_secs(5));
        assert_eq!(config.scheduler.fetch_timeout, Duration::from_millis(5000));
        assert_eq!(config.scheduler.subscriber_timeout, Duration::from_millis(1000));
        assert!(!config.scheduler.force_synthetic);
        assert_eq!(config.pricing.default_volatility, dec!(0.80));
        assert_eq!(config.pricing.default_risk_free_rate, dec!(0.05));
        assert_eq!(config.thresholds, RiskThresholds::default());
        assert_eq!(config.activity_capacity, 5);
        assert_eq!(config.sources.synthetic_seed, 42);
        assert!(config.sources.position_files.binance.is_none());
        assert_eq!(config.server.metrics_port, 9091);
    }

    #[test]
    fn overrides_from_variables() {
        let config = config_from(&[
            ("REFRESH_INTERVAL_SECS", "30"),
            ("SOURCE_FETCH_TIMEOUT_MS", "250"),
            ("DEFAULT_VOLATILITY", "0.65"),
            ("RISK_FREE_RATE", "0.04"),
            ("DELTA_SAFE_BAND", "0.5"),
            ("DELTA_WARNING_BAND", "1.0"),
            ("ACTIVITY_LOG_CAPACITY", "20"),
            ("FORCE_SYNTHETIC_MODE", "true"),
            ("BYBIT_POSITIONS_FILE", "/tmp/bybit.json"),
            ("SYNTHETIC_SEED", "7"),
            ("RISK_ENGINE_METRICS_PORT", "0"),
        ])
        .unwrap();

        assert_eq!(config.scheduler.refresh_interval, Duration::from_secs(30));
        assert_eq!(config.scheduler.fetch_timeout, Duration::from_millis(250));
        assert_eq!(config.pricing.default_volatility, dec!(0.65));
        assert_eq!(config.pricing.default_risk_free_rate, dec!(0.04));
        assert_eq!(config.thresholds.delta_exposure, ThresholdBand::new(dec!(0.5), dec!(1.0)));
        assert_eq!(config.activity_capacity, 20);
        assert!(config.scheduler.force_synthetic);
        assert_eq!(
            config.sources.position_files.bybit,
            Some(PathBuf::from("/tmp/bybit.json"))
        );
        assert_eq!(config.sources.synthetic_seed, 7);
        assert_eq!(config.server.metrics_port, 0);

        let scheduler = config.scheduler_config();
        assert_eq!(scheduler.live_interval, Duration::from_secs(30));
        assert!(scheduler.force_synthetic);
    }

    #[test]
    fn unparsable_value_is_an_error() {
        let err = config_from(&[("DEFAULT_VOLATILITY", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "DEFAULT_VOLATILITY"));

        let err = config_from(&[("FORCE_SYNTHETIC_MODE", "maybe")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn inconsistent_values_are_errors() {
        assert!(matches!(
            config_from(&[("DELTA_SAFE_BAND", "0.2"), ("DELTA_WARNING_BAND", "0.1")]),
            Err(ConfigError::Inconsistent(_))
        ));
        assert!(matches!(
            config_from(&[("REFRESH_INTERVAL_SECS", "0")]),
            Err(ConfigError::Inconsistent(_))
        ));
        assert!(matches!(
            config_from(&[("ACTIVITY_LOG_CAPACITY", "0")]),
            Err(ConfigError::Inconsistent(_))
        ));
        assert!(matches!(
            config_from(&[("DEFAULT_VOLATILITY", "-0.1")]),
            Err(ConfigError::Inconsistent(_))
        ));
    }

    #[test]
    fn blank_position_file_is_ignored() {
        let config = config_from(&[("BINANCE_POSITIONS_FILE", "  ")]).unwrap();
        assert!(config.sources.position_files.binance.is_none());
    }
}
