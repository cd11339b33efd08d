//! Authenticated REST client.

use crate::credentials::ApiCredentials;
use crate::error::{ExchangeError, Result};
use crate::responses::{AssetBalance, MarketInfo, OrderInfo, RawOrderBook, Ticker, TradeRecord};
use crate::signing::{sign_request, Clock, SystemClock};
use crate::variants::VariantProber;
use mm_core::{OrderBook, OrderSide, Price, Size};
use once_cell::sync::OnceCell;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Clock skew beyond this produces a warning in [`ConnectionReport`].
/// The exchange silently rejects stale nonces, which otherwise shows up
/// as a confusing auth failure.
const MAX_CLOCK_SKEW_MS: i64 = 30_000;

/// Candidate endpoint paths for operations where the documented path is
/// unreliable across exchange deployments.
const BALANCE_PATHS: &[&str] = &["balances", "account/balances", "wallet"];
const CREATE_ORDER_PATHS: &[&str] = &["createorder", "order/new"];
/// Cancel variants also differ in the id field name.
const CANCEL_ORDER_VARIANTS: &[(&str, &str)] = &[("cancelorder", "id"), ("order/cancel", "orderId")];

/// Connection parameters; credentials are supplied separately so a
/// config file never has to carry the secret.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ExchangeConfig {
    pub base_url: String,
    /// Trading pair in `BASE/QUOTE` form, e.g. `MEWC/USDT`.
    pub symbol: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    15
}

/// Cached decimal precision advertised by the market.
#[derive(Debug, Clone, Copy)]
pub struct MarketPrecision {
    pub price_decimals: u32,
    pub quantity_decimals: u32,
}

/// Result of the startup connectivity check.
#[derive(Debug, Clone, Default)]
pub struct ConnectionReport {
    pub ok: bool,
    pub public_api: bool,
    pub authenticated: bool,
    pub server_time_delta_ms: i64,
    pub skew_warning: bool,
    pub error: Option<String>,
}

impl ConnectionReport {
    /// Set the skew flag from the recorded time delta. Independent of
    /// authentication outcome.
    fn flag_clock_skew(&mut self) {
        if self.server_time_delta_ms.abs() > MAX_CLOCK_SKEW_MS {
            self.skew_warning = true;
            warn!(
                delta_ms = self.server_time_delta_ms,
                "large clock skew detected; stale nonces may cause auth failures"
            );
        }
    }
}

/// Signed REST client for one trading pair.
pub struct ExchangeClient {
    http: reqwest::Client,
    base_url: String,
    symbol: String,
    credentials: ApiCredentials,
    clock: Arc<dyn Clock>,
    prober: VariantProber,
    precision: OnceCell<MarketPrecision>,
}

impl ExchangeClient {
    pub fn new(config: &ExchangeConfig, credentials: ApiCredentials) -> Result<Self> {
        Self::with_clock(config, credentials, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: &ExchangeConfig,
        credentials: ApiCredentials,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(ExchangeError::Config("base_url is empty".into()));
        }
        if !config.symbol.contains('/') {
            return Err(ExchangeError::Config(format!(
                "symbol '{}' must be BASE/QUOTE",
                config.symbol
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;

        if !credentials.is_empty() {
            info!(api_key = %credentials.masked_key(), "API credentials loaded");
        }

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            symbol: config.symbol.clone(),
            credentials,
            clock,
            prober: VariantProber::new(),
            precision: OnceCell::new(),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Base asset of the configured pair.
    pub fn base_asset(&self) -> &str {
        self.symbol.split('/').next().unwrap_or(&self.symbol)
    }

    /// Quote asset of the configured pair.
    pub fn quote_asset(&self) -> &str {
        self.symbol.split('/').nth(1).unwrap_or("")
    }

    fn ticker_symbol(&self) -> String {
        self.symbol.replace('/', "_")
    }

    // ------------------------------------------------------------------
    // HTTP plumbing
    // ------------------------------------------------------------------

    fn url(&self, path: &str, query: &[(&str, String)]) -> String {
        let base = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        if query.is_empty() {
            base
        } else {
            let qs: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
            format!("{base}?{}", qs.join("&"))
        }
    }

    async fn get_value(&self, path: &str, query: &[(&str, String)], signed: bool) -> Result<Value> {
        let url = self.url(path, query);
        let mut req = self.http.get(&url);
        if signed {
            let headers = sign_request(&self.credentials, &url, "", self.clock.now_ms());
            req = req
                .header("X-API-KEY", headers.api_key)
                .header("X-API-NONCE", headers.nonce)
                .header("X-API-SIGN", headers.signature);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;
        classify_response(resp).await
    }

    async fn post_value(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self.url(path, &[]);
        let body_str =
            serde_json::to_string(body).map_err(|e| ExchangeError::Parse(e.to_string()))?;
        let headers = sign_request(&self.credentials, &url, &body_str, self.clock.now_ms());
        let resp = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .header("X-API-KEY", headers.api_key)
            .header("X-API-NONCE", headers.nonce)
            .header("X-API-SIGN", headers.signature)
            .body(body_str)
            .send()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;
        classify_response(resp).await
    }

    // ------------------------------------------------------------------
    // Public endpoints
    // ------------------------------------------------------------------

    /// Exchange server time in Unix milliseconds.
    pub async fn server_time(&self) -> Result<i64> {
        let value = self.get_value("time", &[], false).await?;
        value
            .get("serverTime")
            .and_then(Value::as_i64)
            .ok_or_else(|| ExchangeError::Parse("time response missing serverTime".into()))
    }

    /// Current order book, shallow by default.
    pub async fn orderbook(&self, limit: u32) -> Result<OrderBook> {
        let value = self
            .get_value(
                "market/orderbook",
                &[
                    ("symbol", self.symbol.clone()),
                    ("limit", limit.to_string()),
                ],
                false,
            )
            .await?;
        let raw: RawOrderBook = from_value(value)?;
        Ok(raw.into())
    }

    /// 24h ticker for the configured pair.
    pub async fn ticker(&self) -> Result<Ticker> {
        let value = self
            .get_value(&format!("ticker/{}", self.ticker_symbol()), &[], false)
            .await?;
        from_value(value)
    }

    /// Recent public trades for the configured pair.
    pub async fn recent_trades(&self, limit: u32) -> Result<Vec<TradeRecord>> {
        let value = self
            .get_value(
                "market/trades",
                &[
                    ("symbol", self.symbol.clone()),
                    ("limit", limit.to_string()),
                ],
                false,
            )
            .await?;
        let items = unwrap_list(value, &["trades", "data"])?;
        items.into_iter().map(from_value).collect()
    }

    // ------------------------------------------------------------------
    // Private endpoints
    // ------------------------------------------------------------------

    /// All account balances.
    pub async fn balances(&self) -> Result<Vec<AssetBalance>> {
        let value = self
            .prober
            .run("balances", BALANCE_PATHS.len(), |i| {
                self.get_value(BALANCE_PATHS[i], &[], true)
            })
            .await?;
        let items = unwrap_list(value, &["balances", "data"])?;
        items.into_iter().map(from_value).collect()
    }

    /// Balance for one asset, zero if the exchange omits it.
    pub async fn balance(&self, asset: &str) -> Result<AssetBalance> {
        let balances = self.balances().await?;
        Ok(balances
            .into_iter()
            .find(|b| b.asset.eq_ignore_ascii_case(asset))
            .unwrap_or_else(|| AssetBalance::empty(asset)))
    }

    /// Currently open orders for the configured pair.
    pub async fn active_orders(&self) -> Result<Vec<OrderInfo>> {
        let value = self
            .get_value(
                "account/orders",
                &[
                    ("status", "active".to_string()),
                    ("symbol", self.symbol.clone()),
                ],
                true,
            )
            .await?;
        let items = unwrap_list(value, &["orders", "data"])?;
        items.into_iter().map(from_value).collect()
    }

    /// Look up one order by its exchange-assigned id.
    pub async fn order(&self, order_id: &str) -> Result<OrderInfo> {
        let value = self
            .get_value(&format!("getorder/{order_id}"), &[], true)
            .await?;
        from_value(value)
    }

    /// Recent private trades for the configured pair.
    pub async fn trade_history(&self, limit: u32) -> Result<Vec<TradeRecord>> {
        // Symbol spelling differs across variants as well as the path.
        let compact = self.ticker_symbol().replace('_', "");
        let variants: Vec<(&str, String)> = vec![
            ("account/trades", self.ticker_symbol()),
            ("account/trades", compact),
            ("mytrades", self.ticker_symbol()),
            ("user/trades", self.ticker_symbol()),
        ];
        let value = self
            .prober
            .run("trade_history", variants.len(), |i| {
                let (path, symbol) = variants[i].clone();
                async move {
                    self.get_value(
                        path,
                        &[("symbol", symbol), ("limit", limit.to_string())],
                        true,
                    )
                    .await
                }
            })
            .await?;
        let items = unwrap_list(value, &["trades", "data"])?;
        items.into_iter().map(from_value).collect()
    }

    /// Place a limit order. Price and quantity must already be formatted
    /// to the market's precision.
    pub async fn create_order(
        &self,
        side: OrderSide,
        quantity: &str,
        price: &str,
    ) -> Result<OrderInfo> {
        let body = json!({
            "symbol": self.symbol,
            "side": side.as_str(),
            "type": "limit",
            "quantity": quantity,
            "price": price,
            "userProvidedId": uuid::Uuid::new_v4().simple().to_string(),
        });
        info!(side = %side, %price, %quantity, "create order");
        let value = self
            .prober
            .run("create_order", CREATE_ORDER_PATHS.len(), |i| {
                self.post_value(CREATE_ORDER_PATHS[i], &body)
            })
            .await?;
        from_value(value)
    }

    /// Cancel one open order by id.
    pub async fn cancel_order(&self, order_id: &str) -> Result<()> {
        info!(id = order_id, "cancel order");
        self.prober
            .run("cancel_order", CANCEL_ORDER_VARIANTS.len(), |i| {
                let (path, id_field) = CANCEL_ORDER_VARIANTS[i];
                let body = json!({ id_field: order_id });
                async move { self.post_value(path, &body).await }
            })
            .await?;
        Ok(())
    }

    /// Cancel every open order for the configured pair.
    pub async fn cancel_all_orders(&self) -> Result<()> {
        info!(symbol = %self.symbol, "cancel all orders");
        let body = json!({ "symbol": self.symbol, "side": "all" });
        self.post_value("cancelallorders", &body).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Connectivity
    // ------------------------------------------------------------------

    /// Check public reachability, clock skew, and credential validity.
    pub async fn test_connection(&self) -> ConnectionReport {
        let mut report = ConnectionReport::default();

        match self.server_time().await {
            Ok(server_time) => {
                report.public_api = true;
                report.server_time_delta_ms = self.clock.now_ms() - server_time;
                info!(
                    delta_ms = report.server_time_delta_ms,
                    "public API reachable"
                );
            }
            Err(e) => {
                report.error = Some(format!("cannot reach public API: {e}"));
                return report;
            }
        }

        report.flag_clock_skew();

        if self.credentials.is_empty() {
            report.error = Some("API key or secret is empty".into());
            return report;
        }

        match self.balances().await {
            Ok(_) => {
                report.authenticated = true;
                report.ok = true;
                info!("authentication OK");
            }
            Err(e) => {
                report.error = Some(e.to_string());
                warn!(error = %e, "authentication failed");
            }
        }

        report
    }

    // ------------------------------------------------------------------
    // Precision
    // ------------------------------------------------------------------

    /// Fetch and cache decimal precision for the configured market.
    /// Must be called once before any order formatting.
    pub async fn load_market_metadata(&self) -> Result<MarketPrecision> {
        if let Some(p) = self.precision.get() {
            return Ok(*p);
        }
        let value = self
            .get_value("market/info", &[("symbol", self.symbol.clone())], false)
            .await?;
        let info: MarketInfo = from_value(value)?;
        let precision = MarketPrecision {
            price_decimals: info.price_decimals,
            quantity_decimals: info.quantity_decimals,
        };
        info!(
            price_decimals = precision.price_decimals,
            quantity_decimals = precision.quantity_decimals,
            "market metadata loaded"
        );
        Ok(*self.precision.get_or_init(|| precision))
    }

    fn precision(&self) -> Result<MarketPrecision> {
        self.precision.get().copied().ok_or_else(|| {
            ExchangeError::Config("market metadata not loaded; call load_market_metadata".into())
        })
    }

    /// Format a price to the market's precision, truncating toward zero.
    /// Truncation keeps the submitted value inside the intended quote.
    pub fn format_price(&self, price: Price) -> Result<String> {
        let p = self.precision()?;
        Ok(trunc_to_string(price.inner(), p.price_decimals))
    }

    /// Format a quantity to the market's precision, truncating toward zero.
    pub fn format_quantity(&self, quantity: Size) -> Result<String> {
        let p = self.precision()?;
        Ok(trunc_to_string(quantity.inner(), p.quantity_decimals))
    }

    #[cfg(test)]
    pub(crate) fn prime_precision(&self, price_decimals: u32, quantity_decimals: u32) {
        let _ = self.precision.set(MarketPrecision {
            price_decimals,
            quantity_decimals,
        });
    }
}

fn trunc_to_string(value: Decimal, decimals: u32) -> String {
    value.trunc_with_scale(decimals).normalize().to_string()
}

fn from_value<T: serde::de::DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| ExchangeError::Parse(e.to_string()))
}

/// Accept a bare JSON array or an object wrapping one under a known key.
/// Endpoint variants disagree on the envelope.
fn unwrap_list(value: Value, keys: &[&str]) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => {
            for key in keys {
                if let Some(Value::Array(items)) = map.remove(*key) {
                    return Ok(items);
                }
            }
            Err(ExchangeError::Parse(format!(
                "expected a list or an object with one of {keys:?}"
            )))
        }
        other => Err(ExchangeError::Parse(format!(
            "expected a list, got {other}"
        ))),
    }
}

/// Map an HTTP response to a JSON value or a classified error.
///
/// A 2xx body carrying an `error` key is a logical failure and must be
/// rejected regardless of the status code.
async fn classify_response(resp: reqwest::Response) -> Result<Value> {
    let status = resp.status().as_u16();
    let text = resp
        .text()
        .await
        .map_err(|e| ExchangeError::Transport(e.to_string()))?;

    if status == 401 || status == 403 {
        return Err(ExchangeError::auth(status, truncate(&text, 200)));
    }

    if !(200..300).contains(&status) {
        let message = extract_error_message(&text).unwrap_or_else(|| truncate(&text, 200));
        return Err(ExchangeError::Http { status, message });
    }

    let value: Value =
        serde_json::from_str(&text).map_err(|e| ExchangeError::Parse(e.to_string()))?;
    if let Some(message) = body_error_message(&value) {
        return Err(ExchangeError::Api { message });
    }
    Ok(value)
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn extract_error_message(text: &str) -> Option<String> {
    let value: Value = serde_json::from_str(text).ok()?;
    body_error_message(&value)
}

fn body_error_message(value: &Value) -> Option<String> {
    let err = value.as_object()?.get("error")?;
    match err {
        Value::Object(obj) => {
            let msg = obj
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            match obj.get("description").and_then(Value::as_str) {
                Some(desc) if !desc.is_empty() => Some(format!("{msg} ({desc})")),
                _ => Some(msg.to_string()),
            }
        }
        other => Some(other.to_string()),
    }
}
