//! Fill detection from tracked-order state.
//!
//! The exchange offers no reliable fill stream, so fills are inferred:
//! a tracked id that left the open-order set is looked up individually
//! and its executed quantity, if positive, is reported as a fill.

use mm_core::{Fill, Price, QuoteLevel, Size};
use mm_exchange::OrderInfo;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;

/// Taker-side fee estimate applied when the exchange does not report
/// the actual fee for a detected fill.
const ESTIMATED_FEE_RATE: Decimal = dec!(0.002);

/// Tracked ids that are no longer open on the exchange.
pub fn missing_order_ids<'a>(
    tracked_ids: impl Iterator<Item = &'a String>,
    open_ids: &HashSet<String>,
) -> Vec<String> {
    tracked_ids
        .filter(|id| !open_ids.contains(*id))
        .cloned()
        .collect()
}

/// Interpret a closed order as a fill, if it executed.
///
/// The side comes from the quote the order was placed from, not the
/// exchange's echo, since some endpoint variants omit it. Partial fills
/// are recorded at the executed quantity.
pub fn fill_from_order(info: &OrderInfo, placed: &QuoteLevel) -> Option<Fill> {
    if !info.has_execution() {
        return None;
    }
    let price = if info.price > Decimal::ZERO {
        Price::new(info.price)
    } else {
        placed.price
    };
    let quantity = Size::new(info.executed_quantity);
    let fee = quantity.notional(price) * ESTIMATED_FEE_RATE;
    Some(Fill {
        side: placed.side,
        quantity,
        price,
        fee,
    })
}
