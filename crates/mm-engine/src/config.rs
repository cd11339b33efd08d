//! Strategy parameters.

use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

/// Quote-shaping parameters. Fractional fields accept whole-percentage
/// input (values above 1 are divided by 100 during normalization).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyConfig {
    /// Base half-spread as a fraction of mid.
    #[serde(default = "default_spread_pct")]
    pub spread_pct: Decimal,
    /// Price levels quoted per side.
    #[serde(default = "default_num_levels")]
    pub num_levels: u32,
    /// Additional offset per level beyond the first.
    #[serde(default = "default_level_step_pct")]
    pub level_step_pct: Decimal,
    /// Order quantity at level 0, in base units.
    #[serde(default = "default_base_quantity")]
    pub base_quantity: Decimal,
    /// Quantity growth factor per level.
    #[serde(default = "default_quantity_multiplier")]
    pub quantity_multiplier: Decimal,
    /// Hard floor for the effective spread.
    #[serde(default = "default_min_spread_pct")]
    pub min_spread_pct: Decimal,
    /// Bids below this price are dropped; 0 disables the floor.
    #[serde(default)]
    pub min_bid_price: Decimal,
    /// Orders below this quote-unit notional get their quantity bumped.
    #[serde(default = "default_min_order_notional")]
    pub min_order_notional: Decimal,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    /// Fractional price move required to cancel/replace a resting order.
    #[serde(default = "default_reprice_threshold_pct")]
    pub reprice_threshold_pct: Decimal,
    #[serde(default = "default_true")]
    pub adaptive_spread_enabled: bool,
    /// Mid-price samples used for the volatility estimate.
    #[serde(default = "default_volatility_lookback")]
    pub volatility_lookback: usize,
    /// Mid-price samples used for the trend estimate.
    #[serde(default = "default_trend_lookback")]
    pub trend_lookback: usize,
    #[serde(default = "default_true")]
    pub imbalance_skew_enabled: bool,
}

fn default_spread_pct() -> Decimal {
    dec!(0.02)
}

fn default_num_levels() -> u32 {
    3
}

fn default_level_step_pct() -> Decimal {
    dec!(0.005)
}

fn default_base_quantity() -> Decimal {
    dec!(1000)
}

fn default_quantity_multiplier() -> Decimal {
    dec!(1.5)
}

fn default_min_spread_pct() -> Decimal {
    dec!(0.01)
}

fn default_min_order_notional() -> Decimal {
    dec!(5)
}

fn default_refresh_interval_secs() -> u64 {
    30
}

fn default_reprice_threshold_pct() -> Decimal {
    dec!(0.002)
}

fn default_true() -> bool {
    true
}

fn default_volatility_lookback() -> usize {
    10
}

fn default_trend_lookback() -> usize {
    10
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            spread_pct: default_spread_pct(),
            num_levels: default_num_levels(),
            level_step_pct: default_level_step_pct(),
            base_quantity: default_base_quantity(),
            quantity_multiplier: default_quantity_multiplier(),
            min_spread_pct: default_min_spread_pct(),
            min_bid_price: Decimal::ZERO,
            min_order_notional: default_min_order_notional(),
            refresh_interval_secs: default_refresh_interval_secs(),
            reprice_threshold_pct: default_reprice_threshold_pct(),
            adaptive_spread_enabled: true,
            volatility_lookback: default_volatility_lookback(),
            trend_lookback: default_trend_lookback(),
            imbalance_skew_enabled: true,
        }
    }
}

impl StrategyConfig {
    /// Normalize percentage-like fields and validate.
    pub fn normalize(mut self) -> Result<Self> {
        self.spread_pct = normalize_pct(self.spread_pct);
        self.level_step_pct = normalize_pct(self.level_step_pct);
        self.min_spread_pct = normalize_pct(self.min_spread_pct);
        self.reprice_threshold_pct = normalize_pct(self.reprice_threshold_pct);

        if self.num_levels == 0 {
            return Err(EngineError::Config("num_levels must be at least 1".into()));
        }
        if self.base_quantity <= Decimal::ZERO {
            return Err(EngineError::Config("base_quantity must be positive".into()));
        }
        if self.quantity_multiplier <= Decimal::ZERO {
            return Err(EngineError::Config(
                "quantity_multiplier must be positive".into(),
            ));
        }
        if self.spread_pct <= Decimal::ZERO {
            return Err(EngineError::Config("spread_pct must be positive".into()));
        }
        if self.refresh_interval_secs == 0 {
            return Err(EngineError::Config(
                "refresh_interval_secs must be at least 1".into(),
            ));
        }
        Ok(self)
    }

    /// Reprice threshold floored so a zero config never repricing-storms.
    pub fn reprice_threshold(&self) -> Decimal {
        self.reprice_threshold_pct.max(dec!(0.0001))
    }
}

fn normalize_pct(value: Decimal) -> Decimal {
    if value > Decimal::ONE {
        value / dec!(100)
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_normalize_cleanly() {
        let cfg = StrategyConfig::default().normalize().unwrap();
        assert_eq!(cfg.spread_pct, dec!(0.02));
        assert_eq!(cfg.reprice_threshold(), dec!(0.002));
    }

    #[test]
    fn test_whole_percentages_divided() {
        let cfg = StrategyConfig {
            spread_pct: dec!(2),
            min_spread_pct: dec!(1),
            ..StrategyConfig::default()
        }
        .normalize()
        .unwrap();
        assert_eq!(cfg.spread_pct, dec!(0.02));
        // Exactly 1 is ambiguous; treat as a fraction, not 1%.
        assert_eq!(cfg.min_spread_pct, dec!(1));
    }

    #[test]
    fn test_reprice_threshold_floor() {
        let cfg = StrategyConfig {
            reprice_threshold_pct: Decimal::ZERO,
            ..StrategyConfig::default()
        }
        .normalize()
        .unwrap();
        assert_eq!(cfg.reprice_threshold(), dec!(0.0001));
    }

    #[test]
    fn test_rejects_zero_levels() {
        let cfg = StrategyConfig {
            num_levels: 0,
            ..StrategyConfig::default()
        };
        assert!(cfg.normalize().is_err());
    }
}
