//! Order book snapshot.
//!
//! A shallow book fetched once per cycle drives mid-price discovery,
//! the imbalance skew, and the maker-safety price checks.

use crate::{Price, Size};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One aggregated price level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Price,
    pub quantity: Size,
}

/// Shallow order book snapshot.
///
/// Bids sorted by price descending, asks ascending (exchange order).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderBook {
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

impl OrderBook {
    /// Best bid price, if the bid side is non-empty.
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|l| l.price)
    }

    /// Best ask price, if the ask side is non-empty.
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|l| l.price)
    }

    /// Mid price: (best bid + best ask) / 2.
    ///
    /// Returns None when either side is empty or the book is crossed;
    /// callers fall back to the last trade price or skip the cycle.
    pub fn mid_price(&self) -> Option<Price> {
        let bid = self.best_bid().filter(|p| p.is_positive())?;
        let ask = self.best_ask().filter(|p| p.is_positive())?;
        if bid >= ask {
            return None;
        }
        Some((bid + ask) / Decimal::TWO)
    }

    /// Volume imbalance over the top `depth` levels of each side:
    /// `(bid_vol - ask_vol) / (bid_vol + ask_vol)`, in [-1, 1].
    ///
    /// Returns None when both sides are empty within the window.
    pub fn imbalance(&self, depth: usize) -> Option<Decimal> {
        let bid_vol: Decimal = self
            .bids
            .iter()
            .take(depth)
            .map(|l| l.quantity.inner())
            .sum();
        let ask_vol: Decimal = self
            .asks
            .iter()
            .take(depth)
            .map(|l| l.quantity.inner())
            .sum();
        let total = bid_vol + ask_vol;
        if total <= Decimal::ZERO {
            return None;
        }
        Some((bid_vol - ask_vol) / total)
    }
}
