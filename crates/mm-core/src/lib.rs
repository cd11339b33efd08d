//! Core domain types for the spot market-maker.
//!
//! Shared by the exchange client, the risk manager, and the quoting engine.

pub mod book;
pub mod decimal;
pub mod error;
pub mod order;

pub use book::{BookLevel, OrderBook};
pub use decimal::{Price, Size};
pub use error::{CoreError, Result};
pub use order::{Fill, OrderSide, QuoteLevel};
