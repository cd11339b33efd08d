//! Application configuration.
//!
//! Parameters come from a TOML file; credentials come exclusively from
//! the `MM_API_KEY` / `MM_API_SECRET` environment variables so they
//! never land in a config file or shell history via the file path.

use mm_engine::StrategyConfig;
use mm_exchange::{ApiCredentials, ExchangeConfig};
use mm_risk::RiskConfig;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Strategy(#[from] mm_engine::EngineError),
    #[error(transparent)]
    Risk(#[from] mm_risk::config::RiskConfigError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub strategy: Option<StrategyConfig>,
    #[serde(default)]
    pub risk: Option<RiskConfig>,
}

/// Fully normalized configuration ready for wiring.
pub struct AppConfig {
    pub exchange: ExchangeConfig,
    pub strategy: StrategyConfig,
    pub risk: RiskConfig,
}

impl BotConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&raw)?)
    }

    /// Normalize all sections; missing ones get defaults.
    pub fn into_app_config(self) -> Result<AppConfig, ConfigError> {
        Ok(AppConfig {
            exchange: self.exchange,
            strategy: self.strategy.unwrap_or_default().normalize()?,
            risk: self.risk.unwrap_or_default().normalize()?,
        })
    }
}

/// Read credentials from the environment; empty values are accepted
/// here and rejected by the startup connectivity check with guidance.
pub fn credentials_from_env() -> ApiCredentials {
    let key = std::env::var("MM_API_KEY").unwrap_or_default();
    let secret = std::env::var("MM_API_SECRET").unwrap_or_default();
    ApiCredentials::new(&key, &secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let cfg: BotConfig = toml::from_str(
            r#"
            [exchange]
            base_url = "https://api.example.com/api/v2"
            symbol = "MEWC/USDT"
            "#,
        )
        .unwrap();
        let app = cfg.into_app_config().unwrap();
        assert_eq!(app.exchange.timeout_secs, 15);
        assert_eq!(app.strategy.num_levels, 3);
        assert_eq!(app.risk.max_open_orders, 20);
    }

    #[test]
    fn test_full_config_parses_and_normalizes() {
        let cfg: BotConfig = toml::from_str(
            r#"
            [exchange]
            base_url = "https://api.example.com/api/v2"
            symbol = "MEWC/USDT"
            timeout_secs = 10

            [strategy]
            spread_pct = "2"
            num_levels = 2
            base_quantity = "500"

            [risk]
            max_quote_exposure = "300"
            max_balance_usage_pct = "80"
            "#,
        )
        .unwrap();
        let app = cfg.into_app_config().unwrap();
        // Whole percentages normalized to fractions.
        assert_eq!(app.strategy.spread_pct, dec!(0.02));
        assert_eq!(app.risk.max_balance_usage_pct, dec!(0.8));
        assert_eq!(app.risk.max_quote_exposure, dec!(300));
    }

    #[test]
    fn test_invalid_strategy_rejected() {
        let cfg: BotConfig = toml::from_str(
            r#"
            [exchange]
            base_url = "https://api.example.com/api/v2"
            symbol = "MEWC/USDT"

            [strategy]
            num_levels = 0
            "#,
        )
        .unwrap();
        assert!(cfg.into_app_config().is_err());
    }

    #[test]
    fn test_unknown_strategy_key_rejected() {
        let result: Result<BotConfig, _> = toml::from_str(
            r#"
            [exchange]
            base_url = "https://api.example.com/api/v2"
            symbol = "MEWC/USDT"

            [strategy]
            spred_pct = "0.02"
            "#,
        );
        assert!(result.is_err());
    }
}
