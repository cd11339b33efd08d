//! Market-making engine.
//!
//! Owns the cycle state machine: fetch price, refresh balances, detect
//! fills, compute quotes, reconcile resting orders. Single-task by
//! construction; one cycle runs to completion before the next starts.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod fills;
pub mod quotes;
pub mod reconcile;
pub mod spread;

pub use api::{BoxFuture, ExchangeApi};
pub use config::StrategyConfig;
pub use engine::{EngineStatus, MarketMakingEngine};
pub use error::{EngineError, Result};
