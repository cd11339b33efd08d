//! Adaptive spread from recent mid-price history.

use crate::config::StrategyConfig;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;

/// History window; enough for the default lookbacks with headroom.
const MAX_SAMPLES: usize = 60;

/// Rolling mid-price samples, one per cycle.
#[derive(Debug, Default)]
pub struct MidHistory {
    samples: VecDeque<Decimal>,
}

impl MidHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mid: Decimal) {
        if self.samples.len() == MAX_SAMPLES {
            self.samples.pop_front();
        }
        self.samples.push_back(mid);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn last_n(&self, n: usize) -> impl Iterator<Item = Decimal> + '_ {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip).copied()
    }

    /// Effective spread for the current cycle.
    ///
    /// `base = max(spread, minSpread)`, widened by recent volatility
    /// (range over the lookback divided by mid, weight 8, cap 1.5) and
    /// by trend magnitude (weight 2, cap 0.5). Widening when price
    /// action is noisy or directional reduces adverse selection.
    pub fn effective_spread(&self, cfg: &StrategyConfig, mid: Decimal) -> Decimal {
        let base = cfg.spread_pct.max(cfg.min_spread_pct);
        if !cfg.adaptive_spread_enabled {
            return base;
        }

        let vol_lookback = cfg.volatility_lookback.max(4);
        let trend_lookback = cfg.trend_lookback.max(2);
        if self.samples.len() < vol_lookback || mid <= Decimal::ZERO {
            return base;
        }

        let mut hi = Decimal::MIN;
        let mut lo = Decimal::MAX;
        for s in self.last_n(vol_lookback) {
            hi = hi.max(s);
            lo = lo.min(s);
        }
        let volatility = (hi - lo) / mid;

        let trend_slice: Vec<Decimal> = self.last_n(trend_lookback).collect();
        let earliest = trend_slice[0];
        let latest = trend_slice[trend_slice.len() - 1];
        let trend = if earliest > Decimal::ZERO {
            (latest - earliest) / earliest
        } else {
            Decimal::ZERO
        };

        let widening = Decimal::ONE
            + (volatility * dec!(8)).min(dec!(1.5))
            + (trend.abs() * dec!(2)).min(dec!(0.5));
        (base * widening).max(cfg.min_spread_pct)
    }
}
