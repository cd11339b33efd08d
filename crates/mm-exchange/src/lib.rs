//! Signed REST protocol client.
//!
//! Translates intent (place order, cancel, fetch book) into authenticated
//! HTTP calls and normalized responses. Handles credential sanitization,
//! HMAC-SHA256 request signing, endpoint-variant probing, and decimal
//! precision formatting.

pub mod client;
pub mod credentials;
pub mod error;
pub mod responses;
pub mod signing;
pub mod variants;

pub use client::{ConnectionReport, ExchangeClient, ExchangeConfig, MarketPrecision};
pub use credentials::ApiCredentials;
pub use error::{ExchangeError, Result};
pub use responses::{AssetBalance, OrderInfo, TradeRecord};
pub use signing::{Clock, SystemClock};
