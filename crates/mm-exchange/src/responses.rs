//! Wire-format response types.
//!
//! The exchange reports all decimal quantities as strings; everything is
//! deserialized straight into `Decimal` and normalized into core types
//! where one exists.

use mm_core::{BookLevel, OrderBook, Price, Size};
use rust_decimal::Decimal;
use serde::Deserialize;

/// One asset's balance line from the balances endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetBalance {
    #[serde(default)]
    pub asset: String,
    #[serde(default)]
    pub available: Decimal,
    #[serde(default)]
    pub held: Decimal,
}

impl AssetBalance {
    /// Exchange-reported total for this asset.
    pub fn total(&self) -> Decimal {
        self.available + self.held
    }

    /// Zero balance for an asset missing from the response.
    pub fn empty(asset: &str) -> Self {
        Self {
            asset: asset.to_string(),
            available: Decimal::ZERO,
            held: Decimal::ZERO,
        }
    }
}

/// Order object as returned by order lookup and creation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderInfo {
    pub id: String,
    #[serde(default)]
    pub side: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default)]
    pub executed_quantity: Decimal,
    #[serde(default)]
    pub status: String,
}

impl OrderInfo {
    /// Whether the order executed at least partially.
    ///
    /// Status strings vary across endpoint variants, so positive executed
    /// quantity is required in addition to the status marker.
    pub fn has_execution(&self) -> bool {
        let status = self.status.to_ascii_lowercase();
        (status.contains("fill") || status.contains("part"))
            && self.executed_quantity > Decimal::ZERO
    }
}

/// One private trade from the trade-history endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub side: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default)]
    pub fee: Decimal,
    #[serde(default)]
    pub timestamp: i64,
}

/// Server time payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTime {
    pub server_time: i64,
}

/// Market metadata payload; only the decimal precisions are consumed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketInfo {
    #[serde(default = "default_price_decimals")]
    pub price_decimals: u32,
    #[serde(default = "default_quantity_decimals")]
    pub quantity_decimals: u32,
}

fn default_price_decimals() -> u32 {
    8
}

fn default_quantity_decimals() -> u32 {
    2
}

/// 24h ticker payload; only the last trade price is consumed.
#[derive(Debug, Clone, Deserialize)]
pub struct Ticker {
    #[serde(default, alias = "lastPrice")]
    pub last_price: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawBookLevel {
    price: Decimal,
    quantity: Decimal,
}

/// Order book payload, normalized into [`OrderBook`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawOrderBook {
    #[serde(default)]
    bids: Vec<RawBookLevel>,
    #[serde(default)]
    asks: Vec<RawBookLevel>,
}

impl From<RawOrderBook> for OrderBook {
    fn from(raw: RawOrderBook) -> Self {
        let convert = |levels: Vec<RawBookLevel>| {
            levels
                .into_iter()
                .map(|l| BookLevel {
                    price: Price::new(l.price),
                    quantity: Size::new(l.quantity),
                })
                .collect()
        };
        OrderBook {
            bids: convert(raw.bids),
            asks: convert(raw.asks),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_balance_parses_string_decimals() {
        let bal: AssetBalance =
            serde_json::from_str(r#"{"asset":"MEWC","available":"1000.5","held":"25"}"#).unwrap();
        assert_eq!(bal.asset, "MEWC");
        assert_eq!(bal.available, dec!(1000.5));
        assert_eq!(bal.held, dec!(25));
        assert_eq!(bal.total(), dec!(1025.5));
    }

    #[test]
    fn test_order_info_execution_detection() {
        let filled: OrderInfo = serde_json::from_str(
            r#"{"id":"o1","side":"buy","price":"0.001","quantity":"100","executedQuantity":"100","status":"Filled"}"#,
        )
        .unwrap();
        assert!(filled.has_execution());

        let partial: OrderInfo = serde_json::from_str(
            r#"{"id":"o2","side":"sell","price":"0.002","quantity":"100","executedQuantity":"40","status":"partially_filled"}"#,
        )
        .unwrap();
        assert!(partial.has_execution());
        assert_eq!(partial.executed_quantity, dec!(40));

        let cancelled: OrderInfo = serde_json::from_str(
            r#"{"id":"o3","side":"buy","price":"0.001","quantity":"100","executedQuantity":"0","status":"Cancelled"}"#,
        )
        .unwrap();
        assert!(!cancelled.has_execution());

        // "filled" status with zero executed quantity is not a fill.
        let zero: OrderInfo = serde_json::from_str(
            r#"{"id":"o4","side":"buy","price":"0.001","quantity":"100","executedQuantity":"0","status":"Filled"}"#,
        )
        .unwrap();
        assert!(!zero.has_execution());
    }

    #[test]
    fn test_orderbook_normalizes_into_core_type() {
        let raw: RawOrderBook = serde_json::from_str(
            r#"{"bids":[{"price":"0.0010","quantity":"5000"}],"asks":[{"price":"0.0012","quantity":"3000"}]}"#,
        )
        .unwrap();
        let book: OrderBook = raw.into();
        assert_eq!(book.best_bid().unwrap().inner(), dec!(0.0010));
        assert_eq!(book.best_ask().unwrap().inner(), dec!(0.0012));
        assert_eq!(book.mid_price().unwrap().inner(), dec!(0.0011));
    }

    #[test]
    fn test_empty_book_sides_default() {
        let raw: RawOrderBook = serde_json::from_str(r#"{"bids":[]}"#).unwrap();
        let book: OrderBook = raw.into();
        assert!(book.best_bid().is_none());
        assert!(book.mid_price().is_none());
    }

    #[test]
    fn test_market_info_defaults() {
        let info: MarketInfo = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(info.price_decimals, 8);
        assert_eq!(info.quantity_decimals, 2);

        let info: MarketInfo =
            serde_json::from_str(r#"{"priceDecimals":6,"quantityDecimals":0}"#).unwrap();
        assert_eq!(info.price_decimals, 6);
        assert_eq!(info.quantity_decimals, 0);
    }

    #[test]
    fn test_ticker_last_price_aliases() {
        let t: Ticker = serde_json::from_str(r#"{"last_price":"0.0015"}"#).unwrap();
        assert_eq!(t.last_price, Some(dec!(0.0015)));
        let t: Ticker = serde_json::from_str(r#"{"lastPrice":"0.0016"}"#).unwrap();
        assert_eq!(t.last_price, Some(dec!(0.0016)));
        let t: Ticker = serde_json::from_str(r#"{}"#).unwrap();
        assert!(t.last_price.is_none());
    }
}
