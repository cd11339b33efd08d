//! Inventory and P&L state.

use rust_decimal::Decimal;

/// Current inventory and P&L, mutated only through [`RiskManager`]
/// update methods.
///
/// Invariant: `available + held` per asset equals the exchange-reported
/// total; skew and exposure checks are only meaningful while that holds.
///
/// [`RiskManager`]: crate::RiskManager
#[derive(Debug, Clone, Default)]
pub struct PositionState {
    pub base_available: Decimal,
    pub base_held: Decimal,
    pub quote_available: Decimal,
    pub quote_held: Decimal,
    /// Base total at the start of the current 24h window.
    pub initial_base: Decimal,
    /// Quote total at the start of the current 24h window.
    pub initial_quote: Decimal,
    /// Realized P&L in quote units since the window started.
    pub daily_pnl: Decimal,
    /// Start of the rolling 24h window, Unix ms.
    pub day_start_ms: i64,
    pub last_mid_price: Decimal,
}

impl PositionState {
    pub fn base_total(&self) -> Decimal {
        self.base_available + self.base_held
    }

    pub fn quote_total(&self) -> Decimal {
        self.quote_available + self.quote_held
    }

    /// Base holdings valued in quote units at the last observed mid.
    pub fn base_value(&self) -> Decimal {
        self.base_total() * self.last_mid_price
    }

    pub fn portfolio_value(&self) -> Decimal {
        self.base_value() + self.quote_total()
    }

    /// Mark-to-market P&L against the window-start baseline.
    pub fn unrealized_pnl(&self) -> Decimal {
        (self.base_total() - self.initial_base) * self.last_mid_price
            + (self.quote_total() - self.initial_quote)
    }
}
