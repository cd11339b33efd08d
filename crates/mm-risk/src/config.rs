//! Risk limit configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RiskConfigError {
    #[error("invalid risk config: {0}")]
    Invalid(String),
}

/// Risk limits. All fractional fields accept whole-percentage input
/// (values above 1 are divided by 100 during normalization), a guard
/// against the common "80" vs "0.80" entry error.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiskConfig {
    /// Max base-asset units committed to open sell orders.
    #[serde(default = "default_max_base_exposure")]
    pub max_base_exposure: Decimal,
    /// Max quote-asset notional committed to open buy orders.
    #[serde(default = "default_max_quote_exposure")]
    pub max_quote_exposure: Decimal,
    /// Scale applied to the raw inventory skew, 0 disables skewing.
    #[serde(default = "default_inventory_skew_factor")]
    pub inventory_skew_factor: Decimal,
    /// Neutral base-asset value fraction of the portfolio.
    #[serde(default = "default_inventory_target_ratio")]
    pub inventory_target_ratio: Decimal,
    /// Sells are disabled at or below this inventory ratio.
    #[serde(default)]
    pub inventory_band_low: Option<Decimal>,
    /// Buys are disabled at or above this inventory ratio.
    #[serde(default)]
    pub inventory_band_high: Option<Decimal>,
    /// Fraction of the free balance usable per cycle.
    #[serde(default = "default_max_balance_usage_pct")]
    pub max_balance_usage_pct: Decimal,
    /// Unrealized P&L (quote units, negative) that triggers a halt.
    #[serde(default = "default_stop_loss")]
    pub stop_loss: Decimal,
    #[serde(default = "default_max_open_orders")]
    pub max_open_orders: usize,
    /// Realized daily P&L (quote units, negative) that triggers a halt.
    #[serde(default = "default_daily_loss_limit")]
    pub daily_loss_limit: Decimal,
}

fn default_max_base_exposure() -> Decimal {
    dec!(50000)
}

fn default_max_quote_exposure() -> Decimal {
    dec!(500)
}

fn default_inventory_skew_factor() -> Decimal {
    dec!(0.5)
}

fn default_inventory_target_ratio() -> Decimal {
    dec!(0.5)
}

fn default_max_balance_usage_pct() -> Decimal {
    dec!(0.80)
}

fn default_stop_loss() -> Decimal {
    dec!(-50)
}

fn default_max_open_orders() -> usize {
    20
}

fn default_daily_loss_limit() -> Decimal {
    dec!(-100)
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_base_exposure: default_max_base_exposure(),
            max_quote_exposure: default_max_quote_exposure(),
            inventory_skew_factor: default_inventory_skew_factor(),
            inventory_target_ratio: default_inventory_target_ratio(),
            inventory_band_low: None,
            inventory_band_high: None,
            max_balance_usage_pct: default_max_balance_usage_pct(),
            stop_loss: default_stop_loss(),
            max_open_orders: default_max_open_orders(),
            daily_loss_limit: default_daily_loss_limit(),
        }
    }
}

impl RiskConfig {
    /// Normalize percentage-like fields and validate limits.
    pub fn normalize(mut self) -> Result<Self, RiskConfigError> {
        self.max_balance_usage_pct = normalize_pct(self.max_balance_usage_pct);
        self.inventory_target_ratio = normalize_pct(self.inventory_target_ratio);
        self.inventory_band_low = self.inventory_band_low.map(normalize_pct);
        self.inventory_band_high = self.inventory_band_high.map(normalize_pct);

        if self.max_balance_usage_pct <= Decimal::ZERO {
            return Err(RiskConfigError::Invalid(
                "max_balance_usage_pct must be positive".into(),
            ));
        }
        if self.inventory_target_ratio < Decimal::ZERO
            || self.inventory_target_ratio > Decimal::ONE
        {
            return Err(RiskConfigError::Invalid(
                "inventory_target_ratio must be within [0, 1]".into(),
            ));
        }
        if self.max_open_orders == 0 {
            return Err(RiskConfigError::Invalid(
                "max_open_orders must be at least 1".into(),
            ));
        }
        if self.max_base_exposure <= Decimal::ZERO || self.max_quote_exposure <= Decimal::ZERO {
            return Err(RiskConfigError::Invalid(
                "exposure limits must be positive".into(),
            ));
        }
        Ok(self)
    }

    /// Lower allocation band, defaulting to `target - 0.2` clamped to [0, 1].
    pub fn band_low(&self) -> Decimal {
        let low = self
            .inventory_band_low
            .unwrap_or(self.inventory_target_ratio - dec!(0.2));
        clamp01(low)
    }

    /// Upper allocation band, defaulting to `target + 0.2` clamped to [0, 1].
    pub fn band_high(&self) -> Decimal {
        let high = self
            .inventory_band_high
            .unwrap_or(self.inventory_target_ratio + dec!(0.2));
        clamp01(high)
    }
}

fn normalize_pct(value: Decimal) -> Decimal {
    if value > Decimal::ONE {
        value / dec!(100)
    } else {
        value
    }
}

fn clamp01(value: Decimal) -> Decimal {
    value.clamp(Decimal::ZERO, Decimal::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = RiskConfig::default().normalize().unwrap();
        assert_eq!(cfg.max_balance_usage_pct, dec!(0.80));
        assert_eq!(cfg.band_low(), dec!(0.3));
        assert_eq!(cfg.band_high(), dec!(0.7));
    }

    #[test]
    fn test_whole_percentage_normalized() {
        let cfg = RiskConfig {
            max_balance_usage_pct: dec!(80),
            inventory_target_ratio: dec!(60),
            ..RiskConfig::default()
        }
        .normalize()
        .unwrap();
        assert_eq!(cfg.max_balance_usage_pct, dec!(0.8));
        assert_eq!(cfg.inventory_target_ratio, dec!(0.6));
    }

    #[test]
    fn test_bands_clamped_near_extremes() {
        let cfg = RiskConfig {
            inventory_target_ratio: dec!(0.9),
            ..RiskConfig::default()
        }
        .normalize()
        .unwrap();
        assert_eq!(cfg.band_low(), dec!(0.7));
        assert_eq!(cfg.band_high(), Decimal::ONE);
    }

    #[test]
    fn test_explicit_bands_respected() {
        let cfg = RiskConfig {
            inventory_band_low: Some(dec!(0.25)),
            inventory_band_high: Some(dec!(75)),
            ..RiskConfig::default()
        }
        .normalize()
        .unwrap();
        assert_eq!(cfg.band_low(), dec!(0.25));
        assert_eq!(cfg.band_high(), dec!(0.75));
    }

    #[test]
    fn test_rejects_zero_max_open_orders() {
        let cfg = RiskConfig {
            max_open_orders: 0,
            ..RiskConfig::default()
        };
        assert!(cfg.normalize().is_err());
    }

    #[test]
    fn test_deserializes_from_toml_style_json() {
        let cfg: RiskConfig = serde_json::from_str(
            r#"{"max_quote_exposure":"500","daily_loss_limit":"-100","max_open_orders":10}"#,
        )
        .unwrap();
        let cfg = cfg.normalize().unwrap();
        assert_eq!(cfg.max_quote_exposure, dec!(500));
        assert_eq!(cfg.max_open_orders, 10);
    }
}
