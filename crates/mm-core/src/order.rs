//! Order-side primitives shared by the risk manager and the quoting engine.

use crate::{Price, Size};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Wire representation used by the exchange.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single price/quantity level to be placed on the book.
///
/// Produced fresh each cycle and never mutated afterwards; superseded
/// quotes are discarded, not edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteLevel {
    /// Buy for bid, sell for ask.
    pub side: OrderSide,
    /// Quote price.
    pub price: Price,
    /// Quote quantity in base units.
    pub quantity: Size,
    /// Level index (0 = closest to mid).
    pub level: u32,
}

/// An executed trade reported to the risk manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fill {
    pub side: OrderSide,
    pub quantity: Size,
    pub price: Price,
    /// Fee in quote-asset units.
    pub fee: rust_decimal::Decimal,
}
