//! Per-cycle quote construction.

use crate::config::StrategyConfig;
use mm_core::{OrderBook, OrderSide, Price, QuoteLevel, Size};
use mm_risk::RiskManager;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

/// Book levels per side feeding the imbalance signal.
const IMBALANCE_DEPTH: usize = 5;
/// Imbalance contribution to skew, clamped to this magnitude.
const IMBALANCE_CAP: Decimal = dec!(0.3);
/// Buffer applied when bumping dust orders up to the minimum notional.
const NOTIONAL_BUFFER: Decimal = dec!(1.05);
const SIZE_MULT_FLOOR: Decimal = dec!(0.5);
const SIZE_MULT_CAP: Decimal = dec!(1.5);
const EPSILON: Decimal = dec!(0.000000001);

fn decimal_pow(base: Decimal, exp: u32) -> Decimal {
    use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
    let b = base.to_f64().unwrap_or(0.0);
    Decimal::from_f64(b.powi(exp as i32)).unwrap_or(Decimal::ZERO)
}

/// Extra skew from top-of-book volume imbalance.
///
/// Positive when bids outweigh asks, nudging quotes upward with the
/// pressure. Contribution is intentionally small next to inventory skew.
pub fn imbalance_skew(book: &OrderBook) -> Decimal {
    match book.imbalance(IMBALANCE_DEPTH) {
        Some(imbalance) => (imbalance * IMBALANCE_CAP).clamp(-IMBALANCE_CAP, IMBALANCE_CAP),
        None => Decimal::ZERO,
    }
}

/// Build the desired quote set for one cycle.
///
/// Every candidate must clear the risk exposure check and fit the
/// remaining per-cycle budget pool for its side; budget is consumed as
/// levels are added so cumulative exposure stays bounded.
pub fn build_quotes(
    cfg: &StrategyConfig,
    risk: &RiskManager,
    mid: Price,
    effective_spread: Decimal,
    book: Option<&OrderBook>,
) -> Vec<QuoteLevel> {
    let mid = mid.inner();
    if mid <= Decimal::ZERO {
        return Vec::new();
    }

    let inventory_skew = risk.compute_inventory_skew();
    let imbalance = match book {
        Some(book) if cfg.imbalance_skew_enabled => imbalance_skew(book),
        _ => Decimal::ZERO,
    };
    let skew = (inventory_skew + imbalance).clamp(dec!(-1), dec!(1));

    // Allocation bands: stop quoting a side entirely at the extremes.
    let ratio = risk.inventory_ratio();
    let target = risk
        .config()
        .inventory_target_ratio
        .clamp(Decimal::ZERO, Decimal::ONE);
    let (band_low, band_high) = {
        let low = risk.config().band_low();
        let high = risk.config().band_high();
        if low > high {
            (high, low)
        } else {
            (low, high)
        }
    };
    let allow_buy = ratio < band_high;
    let allow_sell = ratio > band_low;

    // Shrink size on the over-weighted side, grow it on the other,
    // proportional to distance from target.
    let pressure = (ratio - target).abs() / (Decimal::ONE - target).max(target).max(EPSILON);
    let size_mult_buy = if ratio > target {
        (Decimal::ONE - pressure).max(SIZE_MULT_FLOOR)
    } else {
        (Decimal::ONE + pressure).min(SIZE_MULT_CAP)
    };
    let size_mult_sell = if ratio < target {
        (Decimal::ONE - pressure).max(SIZE_MULT_FLOOR)
    } else {
        (Decimal::ONE + pressure).min(SIZE_MULT_CAP)
    };

    let best_ask = book.and_then(OrderBook::best_ask).map(|p| p.inner());
    let best_bid = book.and_then(OrderBook::best_bid).map(|p| p.inner());

    let mut buy_budget = risk.available_buy_budget();
    let mut sell_inventory = risk.available_sell_inventory();
    let half_skew = skew * effective_spread * dec!(0.5);

    let mut quotes = Vec::with_capacity(cfg.num_levels as usize * 2);

    for level in 0..cfg.num_levels {
        let offset = effective_spread + Decimal::from(level) * cfg.level_step_pct;
        let level_qty = cfg.base_quantity * decimal_pow(cfg.quantity_multiplier, level);

        // Bid: positive skew (long base) widens, discouraging more buys.
        let bid_price = mid * (Decimal::ONE - offset - half_skew);
        let mut bid_qty = level_qty * size_mult_buy;
        if bid_price > Decimal::ZERO && bid_qty * bid_price < cfg.min_order_notional {
            bid_qty = cfg.min_order_notional / bid_price * NOTIONAL_BUFFER;
        }
        let bid_cost = bid_qty * bid_price;

        let mut bid_allowed = allow_buy && bid_price > Decimal::ZERO;
        if cfg.min_bid_price > Decimal::ZERO && bid_price < cfg.min_bid_price {
            debug!(level, %bid_price, floor = %cfg.min_bid_price, "bid below price floor, dropped");
            bid_allowed = false;
        }
        // Maker safety: never cross the opposite best.
        if let Some(best_ask) = best_ask {
            if bid_price >= best_ask {
                bid_allowed = false;
            }
        }
        if bid_allowed
            && bid_cost <= buy_budget
            && risk.check_exposure(OrderSide::Buy, Size::new(bid_qty), Price::new(bid_price))
        {
            quotes.push(QuoteLevel {
                side: OrderSide::Buy,
                price: Price::new(bid_price),
                quantity: Size::new(bid_qty),
                level,
            });
            buy_budget -= bid_cost;
        }

        // Ask: positive skew tightens, encouraging rebalancing sells.
        let ask_offset = (offset - half_skew).max(cfg.min_spread_pct);
        let ask_price = mid * (Decimal::ONE + ask_offset);
        let mut ask_qty = level_qty * size_mult_sell;
        if ask_price > Decimal::ZERO && ask_qty * ask_price < cfg.min_order_notional {
            ask_qty = cfg.min_order_notional / ask_price * NOTIONAL_BUFFER;
        }

        let mut ask_allowed = allow_sell && ask_price > Decimal::ZERO;
        if let Some(best_bid) = best_bid {
            if ask_price <= best_bid {
                ask_allowed = false;
            }
        }
        if ask_allowed
            && ask_qty <= sell_inventory
            && risk.check_exposure(OrderSide::Sell, Size::new(ask_qty), Price::new(ask_price))
        {
            quotes.push(QuoteLevel {
                side: OrderSide::Sell,
                price: Price::new(ask_price),
                quantity: Size::new(ask_qty),
                level,
            });
            sell_inventory -= ask_qty;
        }
    }

    debug!(
        bids = quotes.iter().filter(|q| q.side == OrderSide::Buy).count(),
        asks = quotes.iter().filter(|q| q.side == OrderSide::Sell).count(),
        %skew,
        spread = %effective_spread,
        inventory_ratio = %ratio,
        "quotes computed"
    );
    quotes
}
