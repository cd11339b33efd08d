//! Risk management.
//!
//! Gatekeeper for every order the engine wants to place and the sole
//! authority on halting the system. Tracks inventory, realized daily
//! P&L, and unrealized P&L against a day-start baseline.

pub mod config;
pub mod manager;
pub mod position;

pub use config::RiskConfig;
pub use manager::{HaltState, RiskManager};
pub use position::PositionState;
