//! Cycle orchestration and the main loop.

use crate::api::ExchangeApi;
use crate::config::StrategyConfig;
use crate::error::{EngineError, Result};
use crate::fills::{fill_from_order, missing_order_ids};
use crate::quotes::build_quotes;
use crate::reconcile;
use crate::spread::MidHistory;
use mm_core::{OrderSide, Price, QuoteLevel};
use mm_risk::RiskManager;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Book depth fetched each cycle; feeds mid-price, maker safety, and
/// the imbalance signal.
const BOOK_DEPTH: u32 = 10;

/// Read-only snapshot for hosts polling engine state. Copied out, not
/// shared; readers never observe a cycle mid-flight.
#[derive(Debug, Clone)]
pub struct EngineStatus {
    pub cycle_count: u64,
    pub last_mid_price: Option<Decimal>,
    pub tracked_orders: usize,
    pub halted: bool,
    pub halt_reason: Option<String>,
    pub daily_pnl: Decimal,
}

/// Single-task market-making loop.
///
/// One cycle runs to completion before the next starts; the tracked
/// order map and risk state are owned exclusively by this task.
pub struct MarketMakingEngine<A: ExchangeApi> {
    api: Arc<A>,
    cfg: StrategyConfig,
    risk: RiskManager,
    tracked: HashMap<String, QuoteLevel>,
    mid_history: MidHistory,
    cycle_count: u64,
    last_mid: Option<Price>,
}

impl<A: ExchangeApi> MarketMakingEngine<A> {
    pub fn new(api: Arc<A>, cfg: StrategyConfig, risk: RiskManager) -> Self {
        Self {
            api,
            cfg,
            risk,
            tracked: HashMap::new(),
            mid_history: MidHistory::new(),
            cycle_count: 0,
            last_mid: None,
        }
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            cycle_count: self.cycle_count,
            last_mid_price: self.last_mid.map(|p| p.inner()),
            tracked_orders: self.tracked.len(),
            halted: self.risk.is_halted(),
            halt_reason: self.risk.halt_reason().map(str::to_string),
            daily_pnl: self.risk.position().daily_pnl,
        }
    }

    pub fn risk(&self) -> &RiskManager {
        &self.risk
    }

    /// Manual halt clear; see [`RiskManager::resume`].
    pub fn resume(&mut self) {
        self.risk.resume();
    }

    /// Connectivity check and precision metadata load. Fails hard so a
    /// misconfigured bot never reaches the quoting loop.
    pub async fn startup(&self) -> Result<()> {
        let report = self.api.test_connection().await;
        if !report.ok {
            return Err(EngineError::Startup(
                report
                    .error
                    .unwrap_or_else(|| "connection check failed".into()),
            ));
        }
        self.api.load_market_metadata().await?;
        Ok(())
    }

    /// Run until the token is cancelled, then cancel all orders.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<()> {
        self.startup().await?;
        info!(
            interval_secs = self.cfg.refresh_interval_secs,
            "market maker started"
        );

        let interval = Duration::from_secs(self.cfg.refresh_interval_secs);
        loop {
            self.cycle().await;
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// One full cycle: price, balances, fills, quotes, reconciliation.
    /// Failures in price or balance discovery skip the cycle and leave
    /// existing orders untouched.
    pub async fn cycle(&mut self) {
        self.cycle_count += 1;
        debug!(cycle = self.cycle_count, "cycle start");

        // Risk gate comes before any market data: a halted engine must
        // sweep its orders even when price discovery is down.
        self.risk.periodic_check();
        if self.risk.is_halted() {
            warn!(reason = ?self.risk.halt_reason(), "halted, cancelling all orders");
            self.cancel_everything().await;
            return;
        }

        let book = match self.api.orderbook(BOOK_DEPTH).await {
            Ok(book) => Some(book),
            Err(e) => {
                warn!(error = %e, "orderbook fetch failed");
                None
            }
        };

        let Some(mid) = self.discover_mid(book.as_ref()).await else {
            warn!("no price available, skipping cycle");
            return;
        };
        self.last_mid = Some(mid);

        if !self.refresh_balances(mid).await {
            return;
        }

        self.check_fills().await;

        // A fill this cycle can trip the daily-loss halt; quoting on top
        // of that would be exactly the behavior the halt exists to stop.
        if self.risk.is_halted() {
            warn!(reason = ?self.risk.halt_reason(), "halted, cancelling all orders");
            self.cancel_everything().await;
            return;
        }

        self.mid_history.push(mid.inner());
        let spread = self.mid_history.effective_spread(&self.cfg, mid.inner());
        let desired = build_quotes(&self.cfg, &self.risk, mid, spread, book.as_ref());
        self.reconcile(&desired).await;
    }

    /// Book mid, falling back to the last trade when one side is empty.
    async fn discover_mid(&self, book: Option<&mm_core::OrderBook>) -> Option<Price> {
        if let Some(mid) = book.and_then(|b| b.mid_price()) {
            return Some(mid);
        }
        match self.api.last_trade_price().await {
            Ok(Some(last)) => {
                debug!(price = %last, "using last trade price as mid");
                Some(last)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "ticker fetch failed");
                None
            }
        }
    }

    async fn refresh_balances(&mut self, mid: Price) -> bool {
        let base = match self.api.balance(self.api.base_asset()).await {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "base balance fetch failed, skipping cycle");
                return false;
            }
        };
        let quote = match self.api.balance(self.api.quote_asset()).await {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "quote balance fetch failed, skipping cycle");
                return false;
            }
        };
        self.risk.update_balances(base.0, base.1, quote.0, quote.1, mid);
        debug!(
            base_available = %base.0,
            base_held = %base.1,
            quote_available = %quote.0,
            quote_held = %quote.1,
            "balances refreshed"
        );
        true
    }

    /// Detect fills: any tracked id missing from the open set is looked
    /// up; executed quantity is reported to risk and tracking dropped.
    async fn check_fills(&mut self) {
        if self.tracked.is_empty() {
            return;
        }
        let open: HashSet<String> = match self.api.active_order_ids().await {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                warn!(error = %e, "active orders fetch failed, deferring fill check");
                return;
            }
        };

        for id in missing_order_ids(self.tracked.keys(), &open) {
            match self.api.order(&id).await {
                Ok(info) => {
                    if let Some(placed) = self.tracked.remove(&id) {
                        if let Some(fill) = fill_from_order(&info, &placed) {
                            info!(order_id = %id, side = %fill.side, "fill detected");
                            self.risk.record_fill(&fill);
                        }
                    }
                }
                // Lookup failed; keep tracking and retry next cycle.
                Err(e) => warn!(order_id = %id, error = %e, "order lookup failed"),
            }
        }
    }

    async fn reconcile(&mut self, desired: &[QuoteLevel]) {
        let plan = reconcile::plan(&self.tracked, desired, self.cfg.reprice_threshold());

        for id in &plan.cancel {
            match self.api.cancel_order(id).await {
                Ok(()) => {
                    self.tracked.remove(id);
                }
                // Possibly filled in flight; the next fill check settles it.
                Err(e) => debug!(order_id = %id, error = %e, "cancel failed"),
            }
        }

        // A failed cancel leaves its order tracked; placing the replacement
        // anyway would double the posted size at that slot.
        let live_slots: HashSet<(OrderSide, u32)> = self
            .tracked
            .values()
            .map(|q| (q.side, q.level))
            .collect();
        let place: Vec<&QuoteLevel> = plan
            .place
            .iter()
            .filter(|q| !live_slots.contains(&(q.side, q.level)))
            .collect();

        if place.is_empty() {
            return;
        }
        if !self
            .risk
            .check_can_place_orders(place.len(), self.tracked.len())
        {
            warn!("risk check blocked order placement");
            return;
        }

        let mut placed = 0usize;
        for quote in &place {
            match self.place_one(quote).await {
                Ok(true) => placed += 1,
                Ok(false) => {}
                Err(e) => {
                    error!(side = %quote.side, price = %quote.price, error = %e, "order placement failed")
                }
            }
        }
        info!(placed, desired = place.len(), "orders placed");
    }

    async fn place_one(&mut self, quote: &QuoteLevel) -> Result<bool> {
        let price_str = self.api.format_price(quote.price)?;
        let qty_str = self.api.format_quantity(quote.quantity)?;

        // Truncation can collapse a dust quote to zero.
        let valid = |s: &str| s.parse::<Decimal>().map(|d| d > Decimal::ZERO).unwrap_or(false);
        if !valid(&price_str) || !valid(&qty_str) {
            return Ok(false);
        }

        let info = self
            .api
            .create_order(quote.side, &qty_str, &price_str)
            .await?;
        info!(
            side = %quote.side,
            level = quote.level,
            price = %price_str,
            quantity = %qty_str,
            order_id = %info.id,
            "order placed"
        );
        self.tracked.insert(info.id, quote.clone());
        Ok(true)
    }

    async fn cancel_everything(&mut self) {
        for id in self.tracked.keys().cloned().collect::<Vec<_>>() {
            if let Err(e) = self.api.cancel_order(&id).await {
                debug!(order_id = %id, error = %e, "cancel failed, may already be filled");
            }
        }
        self.tracked.clear();
        // Safety net for orders placed but never tracked, e.g. when a
        // placement succeeded but the response was lost in transit.
        if let Err(e) = self.api.cancel_all_orders().await {
            error!(error = %e, "bulk cancel failed");
        }
    }

    /// Cancel every order before stopping.
    pub async fn shutdown(&mut self) {
        info!(cycles = self.cycle_count, "shutting down, cancelling all orders");
        self.cancel_everything().await;
    }
}
