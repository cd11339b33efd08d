//! Exchange access seam.
//!
//! The engine talks to the exchange through a dyn-compatible trait so
//! tests can drive full cycles against an in-memory double.

use mm_core::{OrderBook, OrderSide, Price, Size};
use mm_exchange::{ConnectionReport, ExchangeClient, MarketPrecision, OrderInfo};
use rust_decimal::Decimal;
use std::pin::Pin;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

type ExResult<T> = mm_exchange::Result<T>;

/// Everything the engine needs from the exchange.
pub trait ExchangeApi: Send + Sync {
    fn base_asset(&self) -> &str;
    fn quote_asset(&self) -> &str;

    fn test_connection(&self) -> BoxFuture<'_, ConnectionReport>;
    fn load_market_metadata(&self) -> BoxFuture<'_, ExResult<MarketPrecision>>;

    fn orderbook(&self, limit: u32) -> BoxFuture<'_, ExResult<OrderBook>>;
    /// Last trade price from the ticker, if the market has traded.
    fn last_trade_price(&self) -> BoxFuture<'_, ExResult<Option<Price>>>;

    /// Available and held amounts for one asset.
    fn balance<'a>(&'a self, asset: &'a str) -> BoxFuture<'a, ExResult<(Decimal, Decimal)>>;

    fn active_order_ids(&self) -> BoxFuture<'_, ExResult<Vec<String>>>;
    fn order<'a>(&'a self, order_id: &'a str) -> BoxFuture<'a, ExResult<OrderInfo>>;

    fn create_order<'a>(
        &'a self,
        side: OrderSide,
        quantity: &'a str,
        price: &'a str,
    ) -> BoxFuture<'a, ExResult<OrderInfo>>;
    fn cancel_order<'a>(&'a self, order_id: &'a str) -> BoxFuture<'a, ExResult<()>>;
    fn cancel_all_orders(&self) -> BoxFuture<'_, ExResult<()>>;

    fn format_price(&self, price: Price) -> ExResult<String>;
    fn format_quantity(&self, quantity: Size) -> ExResult<String>;
}

impl ExchangeApi for ExchangeClient {
    fn base_asset(&self) -> &str {
        ExchangeClient::base_asset(self)
    }

    fn quote_asset(&self) -> &str {
        ExchangeClient::quote_asset(self)
    }

    fn test_connection(&self) -> BoxFuture<'_, ConnectionReport> {
        Box::pin(ExchangeClient::test_connection(self))
    }

    fn load_market_metadata(&self) -> BoxFuture<'_, ExResult<MarketPrecision>> {
        Box::pin(ExchangeClient::load_market_metadata(self))
    }

    fn orderbook(&self, limit: u32) -> BoxFuture<'_, ExResult<OrderBook>> {
        Box::pin(ExchangeClient::orderbook(self, limit))
    }

    fn last_trade_price(&self) -> BoxFuture<'_, ExResult<Option<Price>>> {
        Box::pin(async move {
            let ticker = self.ticker().await?;
            Ok(ticker
                .last_price
                .filter(|p| *p > Decimal::ZERO)
                .map(Price::new))
        })
    }

    fn balance<'a>(&'a self, asset: &'a str) -> BoxFuture<'a, ExResult<(Decimal, Decimal)>> {
        Box::pin(async move {
            let balance = ExchangeClient::balance(self, asset).await?;
            Ok((balance.available, balance.held))
        })
    }

    fn active_order_ids(&self) -> BoxFuture<'_, ExResult<Vec<String>>> {
        Box::pin(async move {
            let orders = self.active_orders().await?;
            Ok(orders.into_iter().map(|o| o.id).collect())
        })
    }

    fn order<'a>(&'a self, order_id: &'a str) -> BoxFuture<'a, ExResult<OrderInfo>> {
        Box::pin(ExchangeClient::order(self, order_id))
    }

    fn create_order<'a>(
        &'a self,
        side: OrderSide,
        quantity: &'a str,
        price: &'a str,
    ) -> BoxFuture<'a, ExResult<OrderInfo>> {
        Box::pin(ExchangeClient::create_order(self, side, quantity, price))
    }

    fn cancel_order<'a>(&'a self, order_id: &'a str) -> BoxFuture<'a, ExResult<()>> {
        Box::pin(ExchangeClient::cancel_order(self, order_id))
    }

    fn cancel_all_orders(&self) -> BoxFuture<'_, ExResult<()>> {
        Box::pin(ExchangeClient::cancel_all_orders(self))
    }

    fn format_price(&self, price: Price) -> ExResult<String> {
        ExchangeClient::format_price(self, price)
    }

    fn format_quantity(&self, quantity: Size) -> ExResult<String> {
        ExchangeClient::format_quantity(self, quantity)
    }
}
