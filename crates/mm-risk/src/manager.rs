//! Risk limit enforcement and halt state.

use crate::config::RiskConfig;
use crate::position::PositionState;
use mm_core::{Fill, OrderSide, Price, Size};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{error, info, warn};

const DAY_MS: i64 = 86_400_000;
/// Guards skew denominators against a target ratio of exactly 0 or 1.
const EPSILON: Decimal = dec!(0.000000001);

/// Halt is sticky: only an explicit `resume()` clears it. A breach
/// indicates an abnormal market condition that must not be auto-retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltState {
    Normal,
    Halted { reason: String },
}

impl HaltState {
    pub fn is_halted(&self) -> bool {
        matches!(self, Self::Halted { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Normal => None,
            Self::Halted { reason } => Some(reason),
        }
    }
}

/// Enforces exposure and loss limits and computes inventory skew.
#[derive(Debug)]
pub struct RiskManager {
    cfg: RiskConfig,
    position: PositionState,
    halt: HaltState,
    baseline_seeded: bool,
}

impl RiskManager {
    pub fn new(cfg: RiskConfig) -> Self {
        Self {
            cfg,
            position: PositionState::default(),
            halt: HaltState::Normal,
            baseline_seeded: false,
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.cfg
    }

    pub fn position(&self) -> &PositionState {
        &self.position
    }

    pub fn is_halted(&self) -> bool {
        self.halt.is_halted()
    }

    pub fn halt_reason(&self) -> Option<&str> {
        self.halt.reason()
    }

    pub fn halt(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        error!(%reason, "RISK HALT");
        self.halt = HaltState::Halted { reason };
    }

    /// Manual intervention only; nothing in the manager calls this.
    pub fn resume(&mut self) {
        info!("risk halt cleared, resuming");
        self.halt = HaltState::Normal;
    }

    // ------------------------------------------------------------------
    // State updates
    // ------------------------------------------------------------------

    /// Overwrite position state from exchange balances.
    pub fn update_balances(
        &mut self,
        base_available: Decimal,
        base_held: Decimal,
        quote_available: Decimal,
        quote_held: Decimal,
        mid_price: Price,
    ) {
        self.update_balances_at(
            base_available,
            base_held,
            quote_available,
            quote_held,
            mid_price,
            chrono::Utc::now().timestamp_millis(),
        );
    }

    /// Same as [`update_balances`](Self::update_balances) with an explicit
    /// timestamp, exposed for deterministic window handling.
    pub fn update_balances_at(
        &mut self,
        base_available: Decimal,
        base_held: Decimal,
        quote_available: Decimal,
        quote_held: Decimal,
        mid_price: Price,
        now_ms: i64,
    ) {
        self.position.base_available = base_available;
        self.position.base_held = base_held;
        self.position.quote_available = quote_available;
        self.position.quote_held = quote_held;
        self.position.last_mid_price = mid_price.inner();

        if !self.baseline_seeded {
            // First observation seeds the baseline without resetting P&L.
            self.baseline_seeded = true;
            self.position.day_start_ms = now_ms;
            self.position.initial_base = self.position.base_total();
            self.position.initial_quote = self.position.quote_total();
            return;
        }

        // Rolling 24h window, not a calendar-day boundary.
        if now_ms - self.position.day_start_ms > DAY_MS {
            info!(previous_pnl = %self.position.daily_pnl, "daily P&L window reset");
            self.position.daily_pnl = Decimal::ZERO;
            self.position.day_start_ms = now_ms;
            self.position.initial_base = self.position.base_total();
            self.position.initial_quote = self.position.quote_total();
        }
    }

    /// Record an executed fill and re-check the daily loss limit.
    pub fn record_fill(&mut self, fill: &Fill) {
        let notional = fill.quantity.notional(fill.price);
        match fill.side {
            OrderSide::Buy => self.position.daily_pnl -= notional + fill.fee,
            OrderSide::Sell => self.position.daily_pnl += notional - fill.fee,
        }
        info!(
            side = %fill.side,
            quantity = %fill.quantity,
            price = %fill.price,
            fee = %fill.fee,
            daily_pnl = %self.position.daily_pnl,
            "fill recorded"
        );
        self.check_daily_loss();
    }

    // ------------------------------------------------------------------
    // Pre-order checks
    // ------------------------------------------------------------------

    /// Whether placing `new_count` more orders stays within the open
    /// order limit. Always false while halted.
    pub fn check_can_place_orders(&self, new_count: usize, existing_count: usize) -> bool {
        if self.is_halted() {
            warn!(reason = ?self.halt_reason(), "order placement blocked, halted");
            return false;
        }
        let total = existing_count + new_count;
        if total > self.cfg.max_open_orders {
            warn!(
                existing = existing_count,
                new = new_count,
                max = self.cfg.max_open_orders,
                "open order limit reached"
            );
            return false;
        }
        true
    }

    /// Whether a proposed order keeps held exposure within limits.
    /// Boundary inclusive: an order landing exactly at the limit passes.
    pub fn check_exposure(&self, side: OrderSide, quantity: Size, price: Price) -> bool {
        if self.is_halted() {
            return false;
        }
        match side {
            OrderSide::Buy => {
                let total = self.position.quote_held + quantity.notional(price);
                if total > self.cfg.max_quote_exposure {
                    warn!(
                        held = %self.position.quote_held,
                        proposed = %quantity.notional(price),
                        max = %self.cfg.max_quote_exposure,
                        "quote exposure limit"
                    );
                    return false;
                }
            }
            OrderSide::Sell => {
                let total = self.position.base_held + quantity.inner();
                if total > self.cfg.max_base_exposure {
                    warn!(
                        held = %self.position.base_held,
                        proposed = %quantity,
                        max = %self.cfg.max_base_exposure,
                        "base exposure limit"
                    );
                    return false;
                }
            }
        }
        true
    }

    /// Quote units spendable on buys this cycle.
    pub fn available_buy_budget(&self) -> Decimal {
        self.position.quote_available * self.cfg.max_balance_usage_pct
    }

    /// Base units sellable this cycle.
    pub fn available_sell_inventory(&self) -> Decimal {
        self.position.base_available * self.cfg.max_balance_usage_pct
    }

    // ------------------------------------------------------------------
    // Inventory skew
    // ------------------------------------------------------------------

    /// Base-asset value fraction of the portfolio, 0 when unpriced.
    pub fn inventory_ratio(&self) -> Decimal {
        if self.position.last_mid_price <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let total = self.position.portfolio_value();
        if total <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.position.base_value() / total
    }

    /// Inventory skew in [-factor, factor].
    ///
    /// Positive means over-exposed to the base asset: the bid side must
    /// widen and the ask side tighten to encourage rebalancing sells.
    pub fn compute_inventory_skew(&self) -> Decimal {
        if self.cfg.inventory_skew_factor.is_zero() {
            return Decimal::ZERO;
        }
        if self.position.last_mid_price <= Decimal::ZERO
            || self.position.portfolio_value() <= Decimal::ZERO
        {
            return Decimal::ZERO;
        }

        let ratio = self.inventory_ratio();
        let target = self
            .cfg
            .inventory_target_ratio
            .clamp(Decimal::ZERO, Decimal::ONE);
        // Normalize by the furthest reachable distance so the raw skew
        // spans [-1, 1] regardless of where the target sits.
        let denom = (Decimal::ONE - target).max(target).max(EPSILON);
        let raw = ((ratio - target) / denom).clamp(dec!(-1), dec!(1));
        raw * self.cfg.inventory_skew_factor
    }

    // ------------------------------------------------------------------
    // Loss limits
    // ------------------------------------------------------------------

    fn check_daily_loss(&mut self) {
        if self.is_halted() {
            return;
        }
        if self.position.daily_pnl < self.cfg.daily_loss_limit {
            self.halt(format!(
                "daily loss limit breached: {} < {}",
                self.position.daily_pnl, self.cfg.daily_loss_limit
            ));
        }
    }

    fn check_stop_loss(&mut self) {
        if self.is_halted() || self.position.last_mid_price <= Decimal::ZERO {
            return;
        }
        let unrealized = self.position.unrealized_pnl();
        if unrealized < self.cfg.stop_loss {
            self.halt(format!(
                "stop-loss triggered: unrealized P&L {} < {}",
                unrealized, self.cfg.stop_loss
            ));
        }
    }

    /// Run loss-limit checks; called once per engine cycle.
    pub fn periodic_check(&mut self) {
        self.check_daily_loss();
        self.check_stop_loss();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(cfg: RiskConfig) -> RiskManager {
        RiskManager::new(cfg.normalize().unwrap())
    }

    fn fill(side: OrderSide, quantity: Decimal, price: Decimal, fee: Decimal) -> Fill {
        Fill {
            side,
            quantity: Size::new(quantity),
            price: Price::new(price),
            fee,
        }
    }

    #[test]
    fn test_skew_scenario_overweight_base() {
        // ratio 0.8 vs target 0.6: raw (0.8-0.6)/0.6 = 0.333, scaled 0.1667.
        let mut mgr = manager(RiskConfig {
            inventory_target_ratio: dec!(0.6),
            inventory_skew_factor: dec!(0.5),
            ..RiskConfig::default()
        });
        mgr.update_balances_at(dec!(80), dec!(0), dec!(20), dec!(0), Price::new(dec!(1)), 1_000);

        let skew = mgr.compute_inventory_skew();
        assert!(skew > Decimal::ZERO);
        assert!((skew - dec!(0.1667)).abs() < dec!(0.0001), "skew = {skew}");
    }

    #[test]
    fn test_skew_bounded_by_factor() {
        let mut mgr = manager(RiskConfig {
            inventory_target_ratio: dec!(0.5),
            inventory_skew_factor: dec!(0.5),
            ..RiskConfig::default()
        });
        // All base, no quote: raw skew clamps to 1.
        mgr.update_balances_at(dec!(100), dec!(0), dec!(0), dec!(0), Price::new(dec!(1)), 1_000);
        assert_eq!(mgr.compute_inventory_skew(), dec!(0.5));

        // All quote, no base: raw skew clamps to -1.
        mgr.update_balances_at(dec!(0), dec!(0), dec!(100), dec!(0), Price::new(dec!(1)), 1_000);
        assert_eq!(mgr.compute_inventory_skew(), dec!(-0.5));
    }

    #[test]
    fn test_skew_zero_without_price_or_portfolio() {
        let mut mgr = manager(RiskConfig::default());
        assert_eq!(mgr.compute_inventory_skew(), Decimal::ZERO);
        mgr.update_balances_at(dec!(0), dec!(0), dec!(0), dec!(0), Price::new(dec!(1)), 1_000);
        assert_eq!(mgr.compute_inventory_skew(), Decimal::ZERO);
    }

    #[test]
    fn test_exposure_rejects_over_limit_buy() {
        let mut mgr = manager(RiskConfig {
            max_quote_exposure: dec!(500),
            ..RiskConfig::default()
        });
        mgr.update_balances_at(dec!(0), dec!(0), dec!(100), dec!(480), Price::new(dec!(1)), 1_000);

        // 480 held + 30 notional = 510 > 500.
        assert!(!mgr.check_exposure(OrderSide::Buy, Size::new(dec!(30)), Price::new(dec!(1))));
        // Exactly at the limit passes.
        assert!(mgr.check_exposure(OrderSide::Buy, Size::new(dec!(20)), Price::new(dec!(1))));
    }

    #[test]
    fn test_exposure_rejects_over_limit_sell() {
        let mut mgr = manager(RiskConfig {
            max_base_exposure: dec!(1000),
            ..RiskConfig::default()
        });
        mgr.update_balances_at(dec!(500), dec!(900), dec!(0), dec!(0), Price::new(dec!(1)), 1_000);

        assert!(!mgr.check_exposure(OrderSide::Sell, Size::new(dec!(200)), Price::new(dec!(1))));
        assert!(mgr.check_exposure(OrderSide::Sell, Size::new(dec!(100)), Price::new(dec!(1))));
    }

    #[test]
    fn test_order_count_limit() {
        let mgr = manager(RiskConfig {
            max_open_orders: 20,
            ..RiskConfig::default()
        });
        assert!(mgr.check_can_place_orders(5, 15));
        assert!(!mgr.check_can_place_orders(6, 15));
    }

    #[test]
    fn test_daily_loss_halt_is_sticky() {
        let mut mgr = manager(RiskConfig {
            daily_loss_limit: dec!(-100),
            ..RiskConfig::default()
        });

        // A buy with no offsetting sell takes realized pnl to -150.
        mgr.record_fill(&fill(OrderSide::Buy, dec!(150), dec!(1), dec!(0.3)));
        assert!(mgr.is_halted());
        assert!(mgr.halt_reason().unwrap().contains("daily loss"));

        // Profitable fills do not clear the halt.
        mgr.record_fill(&fill(OrderSide::Sell, dec!(500), dec!(1), dec!(0)));
        assert!(mgr.is_halted());
        assert!(!mgr.check_can_place_orders(1, 0));
        assert!(!mgr.check_exposure(OrderSide::Buy, Size::new(dec!(1)), Price::new(dec!(1))));

        mgr.resume();
        assert!(!mgr.is_halted());
        assert!(mgr.check_can_place_orders(1, 0));
    }

    #[test]
    fn test_stop_loss_on_periodic_check() {
        let mut mgr = manager(RiskConfig {
            stop_loss: dec!(-50),
            ..RiskConfig::default()
        });
        // Baseline: 1000 base at 0.1 plus 100 quote.
        mgr.update_balances_at(dec!(1000), dec!(0), dec!(100), dec!(0), Price::new(dec!(0.1)), 1_000);
        mgr.periodic_check();
        assert!(!mgr.is_halted());

        // Quote drains to 40: unrealized = (1000-1000)*0.1 + (40-100) = -60.
        mgr.update_balances_at(dec!(1000), dec!(0), dec!(40), dec!(0), Price::new(dec!(0.1)), 2_000);
        mgr.periodic_check();
        assert!(mgr.is_halted());
        assert!(mgr.halt_reason().unwrap().contains("stop-loss"));
    }

    #[test]
    fn test_rolling_window_resets_pnl_and_baseline() {
        let mut mgr = manager(RiskConfig::default());
        mgr.update_balances_at(dec!(1000), dec!(0), dec!(100), dec!(0), Price::new(dec!(0.1)), 0);
        mgr.record_fill(&fill(OrderSide::Buy, dec!(10), dec!(1), dec!(0)));
        assert_eq!(mgr.position().daily_pnl, dec!(-10));

        // Within the window nothing resets.
        mgr.update_balances_at(dec!(900), dec!(0), dec!(110), dec!(0), Price::new(dec!(0.1)), DAY_MS);
        assert_eq!(mgr.position().daily_pnl, dec!(-10));
        assert_eq!(mgr.position().initial_base, dec!(1000));

        // Past 24h the window rolls and re-baselines.
        mgr.update_balances_at(dec!(900), dec!(0), dec!(110), dec!(0), Price::new(dec!(0.1)), DAY_MS + 1);
        assert_eq!(mgr.position().daily_pnl, Decimal::ZERO);
        assert_eq!(mgr.position().initial_base, dec!(900));
        assert_eq!(mgr.position().initial_quote, dec!(110));
    }

    #[test]
    fn test_buy_budget_and_sell_inventory() {
        let mut mgr = manager(RiskConfig {
            max_balance_usage_pct: dec!(0.8),
            ..RiskConfig::default()
        });
        mgr.update_balances_at(dec!(1000), dec!(50), dec!(200), dec!(20), Price::new(dec!(0.1)), 1_000);
        assert_eq!(mgr.available_buy_budget(), dec!(160.0));
        assert_eq!(mgr.available_sell_inventory(), dec!(800.0));
    }
}
