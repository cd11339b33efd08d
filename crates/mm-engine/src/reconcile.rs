//! Queue-aware order reconciliation.
//!
//! Resting orders keep their queue position unless the desired price
//! for their `(side, level)` slot has moved past the reprice threshold,
//! or the slot vanished from the new quote set. Everything else is
//! cancel/replace churn for no benefit.

use mm_core::{OrderSide, QuoteLevel};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

/// Cancel/place actions for one cycle.
#[derive(Debug, Default)]
pub struct ReconcilePlan {
    /// Order ids to cancel before placing.
    pub cancel: Vec<String>,
    /// Quotes with no live order after the cancels.
    pub place: Vec<QuoteLevel>,
}

/// Diff desired quotes against currently tracked orders.
///
/// `threshold` is the fractional price move that justifies a replace.
pub fn plan(
    tracked: &HashMap<String, QuoteLevel>,
    desired: &[QuoteLevel],
    threshold: Decimal,
) -> ReconcilePlan {
    let desired_by_slot: HashMap<(OrderSide, u32), &QuoteLevel> =
        desired.iter().map(|q| ((q.side, q.level), q)).collect();

    let mut cancel = Vec::new();
    let mut kept_slots: HashSet<(OrderSide, u32)> = HashSet::new();

    for (id, resting) in tracked {
        let slot = (resting.side, resting.level);
        match desired_by_slot.get(&slot) {
            None => cancel.push(id.clone()),
            Some(new) => {
                let old_price = resting.price.inner();
                let moved = if old_price > Decimal::ZERO {
                    ((new.price.inner() - old_price) / old_price).abs()
                } else {
                    Decimal::ONE
                };
                if moved > threshold {
                    cancel.push(id.clone());
                } else {
                    kept_slots.insert(slot);
                }
            }
        }
    }

    let place = desired
        .iter()
        .filter(|q| !kept_slots.contains(&(q.side, q.level)))
        .cloned()
        .collect();

    ReconcilePlan { cancel, place }
}
