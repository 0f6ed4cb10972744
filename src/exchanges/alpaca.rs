use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::core::{
    broker::BrokerClient,
    config::{ApiKeys, BrokerSettings},
    error::BrokerError,
    types::{
        Account, Bar, MarketClock, OrderRequest, OrderSide, OrderType, Position, PositionSide,
        Result,
    },
};

/// 市场时钟
#[derive(Debug, Clone, Deserialize)]
struct ClockResponse {
    timestamp: DateTime<Utc>,
    is_open: bool,
    next_open: DateTime<Utc>,
    next_close: DateTime<Utc>,
}

impl ClockResponse {
    fn until_open(&self) -> Duration {
        if self.is_open {
            Duration::zero()
        } else {
            self.next_open - self.timestamp
        }
    }

    fn until_close(&self) -> Option<Duration> {
        if self.is_open {
            Some(self.next_close - self.timestamp)
        } else {
            None
        }
    }

    fn snapshot(&self) -> MarketClock {
        MarketClock {
            until_open: self.until_open(),
            until_close: self.until_close(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BarsResponse {
    // 没有数据时返回 null
    #[serde(default)]
    bars: Option<Vec<AlpacaBar>>,
}

#[derive(Debug, Deserialize)]
struct AlpacaBar {
    t: DateTime<Utc>,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: u64,
}

impl From<AlpacaBar> for Bar {
    fn from(bar: AlpacaBar) -> Self {
        Bar {
            time: bar.t,
            open: bar.o,
            high: bar.h,
            low: bar.l,
            close: bar.c,
            volume: bar.v,
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct AlpacaPosition {
    symbol: String,
    #[serde_as(as = "DisplayFromStr")]
    qty: f64,
    #[serde_as(as = "DisplayFromStr")]
    market_value: f64,
    #[serde_as(as = "DisplayFromStr")]
    current_price: f64,
    side: PositionSide,
}

impl From<AlpacaPosition> for Position {
    fn from(position: AlpacaPosition) -> Self {
        Position {
            symbol: position.symbol,
            // 只按整股交易
            quantity: position.qty.trunc() as i64,
            market_value: position.market_value,
            current_price: position.current_price,
            side: position.side,
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct AlpacaAccount {
    id: String,
    #[serde_as(as = "DisplayFromStr")]
    cash: f64,
    #[serde_as(as = "DisplayFromStr")]
    buying_power: f64,
    #[serde_as(as = "DisplayFromStr")]
    portfolio_value: f64,
}

impl From<AlpacaAccount> for Account {
    fn from(account: AlpacaAccount) -> Self {
        Account {
            id: account.id,
            cash: account.cash,
            buying_power: account.buying_power,
            portfolio_value: account.portfolio_value,
        }
    }
}

#[derive(Debug, Serialize)]
struct PlaceOrderBody<'a> {
    symbol: &'a str,
    qty: String,
    side: &'static str,
    #[serde(rename = "type")]
    order_type: &'static str,
    time_in_force: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit_price: Option<String>,
}

impl<'a> PlaceOrderBody<'a> {
    fn from_request(order: &'a OrderRequest) -> Result<Self> {
        let limit_price = match (order.order_type, order.limit_price) {
            (OrderType::Limit, Some(price)) => Some(format_limit_price(price, order.side)),
            (OrderType::Limit, None) => {
                return Err(BrokerError::OrderError("限价单缺少价格".to_string()))
            }
            (OrderType::Market, _) => None,
        };
        Ok(Self {
            symbol: &order.symbol,
            qty: order.quantity.to_string(),
            side: order.side.as_str(),
            order_type: order.order_type.as_str(),
            time_in_force: "day",
            limit_price,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
}

/// 1美元以上的价格只接受两位小数，以下接受四位
///
/// 买单向下取整、卖单向上取整，买入金额不会超过下单时的购买力。
fn format_limit_price(price: f64, side: OrderSide) -> String {
    let decimals = if price >= 1.0 { 2 } else { 4 };
    let scale = 10f64.powi(decimals);
    // 抵消浮点误差，避免 8.0 这类整价被挪动一档
    let scaled = match side {
        OrderSide::Buy => (price * scale + 1e-6).floor(),
        OrderSide::Sell => (price * scale - 1e-6).ceil(),
    };
    format!("{:.*}", decimals as usize, scaled / scale)
}

/// 批量撤单/平仓的单条结果（HTTP 207）
#[derive(Debug, Deserialize)]
struct MultiStatusEntry {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
    status: u16,
    #[serde(default)]
    body: Option<serde_json::Value>,
}

impl MultiStatusEntry {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn target(&self) -> &str {
        self.id
            .as_deref()
            .or(self.symbol.as_deref())
            .unwrap_or("unknown")
    }

    fn reason(&self) -> String {
        match &self.body {
            Some(body) => body
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| body.to_string()),
            None => "no body".to_string(),
        }
    }
}

/// 任一条目失败即返回错误，错误信息列出全部失败条目
fn ensure_all_succeeded(action: &str, entries: &[MultiStatusEntry]) -> Result<()> {
    let failed: Vec<&MultiStatusEntry> = entries.iter().filter(|e| !e.is_success()).collect();
    let Some(first) = failed.first() else {
        return Ok(());
    };
    let details: Vec<String> = failed
        .iter()
        .map(|e| format!("{}({}: {})", e.target(), e.status, e.reason()))
        .collect();
    Err(BrokerError::ApiError {
        code: first.status as i32,
        message: format!(
            "{}: {}/{} 条失败 {}",
            action,
            failed.len(),
            entries.len(),
            details.join(", ")
        ),
    })
}

fn classify_error(code: u16, message: String) -> BrokerError {
    match code {
        401 => BrokerError::AuthError(message),
        _ => BrokerError::ApiError {
            code: code as i32,
            message,
        },
    }
}

/// Alpaca 券商实现（v2 REST）
pub struct AlpacaBroker {
    client: Client,
    base_url: String,
    data_url: String,
    api_keys: ApiKeys,
}

impl AlpacaBroker {
    /// 创建Alpaca券商实例
    pub fn new(settings: &BrokerSettings, api_keys: ApiKeys) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(
                settings.request_timeout_secs,
            ))
            .build()?;

        log::info!("创建 AlpacaBroker 实例: {}", settings.base_url);
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            data_url: settings.data_url.trim_end_matches('/').to_string(),
            api_keys,
        })
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("APCA-API-KEY-ID", &self.api_keys.api_key)
            .header("APCA-API-SECRET-KEY", &self.api_keys.api_secret)
    }

    async fn check_status(response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status_code = response.status().as_u16();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(classify_error(status_code, error_text))
    }

    async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let response = Self::check_status(response).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.authed(self.client.get(url)).send().await?;
        Self::parse_json(response).await
    }

    /// 批量删除接口，逐条检查 207 返回体中的结果
    async fn delete_all(&self, url: &str, action: &str) -> Result<usize> {
        let response = self.authed(self.client.delete(url)).send().await?;
        let response = Self::check_status(response).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(0);
        }
        let entries: Vec<MultiStatusEntry> = serde_json::from_str(&text)?;
        ensure_all_succeeded(action, &entries)?;
        Ok(entries.len())
    }

    async fn clock(&self) -> Result<ClockResponse> {
        self.get_json(&format!("{}/v2/clock", self.base_url)).await
    }
}

#[async_trait]
impl BrokerClient for AlpacaBroker {
    fn name(&self) -> &str {
        "alpaca"
    }

    async fn time_until_market_open(&self) -> Result<Duration> {
        Ok(self.clock().await?.until_open())
    }

    async fn time_until_market_close(&self) -> Result<Option<Duration>> {
        Ok(self.clock().await?.until_close())
    }

    async fn market_clock(&self) -> Result<MarketClock> {
        Ok(self.clock().await?.snapshot())
    }

    async fn get_symbol_bars(&self, symbol: &str, count: usize) -> Result<Vec<Bar>> {
        // 倒序取最近的 count 根，再翻转成从旧到新
        let url = format!(
            "{}/v2/stocks/{}/bars?timeframe=1Min&limit={}&sort=desc",
            self.data_url,
            urlencoding::encode(symbol),
            count
        );
        let response: BarsResponse = self.get_json(&url).await?;
        let mut bars: Vec<Bar> = response
            .bars
            .unwrap_or_default()
            .into_iter()
            .map(Bar::from)
            .collect();
        bars.reverse();
        Ok(bars)
    }

    async fn get_position(&self, symbol: &str) -> Result<Position> {
        let url = format!(
            "{}/v2/positions/{}",
            self.base_url,
            urlencoding::encode(symbol)
        );
        match self.get_json::<AlpacaPosition>(&url).await {
            Ok(position) => Ok(position.into()),
            Err(BrokerError::ApiError { code: 404, .. }) => Err(BrokerError::PositionNotFound {
                symbol: symbol.to_string(),
            }),
            Err(err) => Err(err),
        }
    }

    async fn get_account(&self) -> Result<Account> {
        let account: AlpacaAccount = self
            .get_json(&format!("{}/v2/account", self.base_url))
            .await?;
        Ok(account.into())
    }

    async fn submit_order(&self, order: &OrderRequest) -> Result<String> {
        let body = PlaceOrderBody::from_request(order)?;
        let response = self
            .authed(self.client.post(format!("{}/v2/orders", self.base_url)))
            .json(&body)
            .send()
            .await?;
        let placed: OrderResponse = Self::parse_json(response).await?;
        Ok(placed.id)
    }

    async fn exit_all_positions(&self) -> Result<()> {
        let cancelled = self
            .delete_all(&format!("{}/v2/orders", self.base_url), "撤单")
            .await?;
        let closed = self
            .delete_all(
                &format!("{}/v2/positions?cancel_orders=true", self.base_url),
                "平仓",
            )
            .await?;
        log::info!(
            "Alpaca: 已撤销 {} 个挂单并平掉 {} 个持仓",
            cancelled,
            closed
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_when_closed() {
        let clock: ClockResponse = serde_json::from_str(
            r#"{
                "timestamp": "2024-03-04T08:00:00.123-05:00",
                "is_open": false,
                "next_open": "2024-03-04T09:30:00-05:00",
                "next_close": "2024-03-04T16:00:00-05:00"
            }"#,
        )
        .unwrap();

        assert_eq!(clock.until_open().num_minutes(), 89);
        assert_eq!(clock.until_close(), None);
    }

    #[test]
    fn test_clock_when_open() {
        let clock: ClockResponse = serde_json::from_str(
            r#"{
                "timestamp": "2024-03-04T15:50:00-05:00",
                "is_open": true,
                "next_open": "2024-03-05T09:30:00-05:00",
                "next_close": "2024-03-04T16:00:00-05:00"
            }"#,
        )
        .unwrap();

        assert_eq!(clock.until_open(), Duration::zero());
        assert_eq!(clock.until_close(), Some(Duration::minutes(10)));
        assert!(clock.snapshot().is_open());
    }

    #[test]
    fn test_bars_payload() {
        let response: BarsResponse = serde_json::from_str(
            r#"{
                "bars": [
                    {"t": "2024-03-04T15:02:00Z", "o": 10.5, "h": 10.6, "l": 10.4, "c": 10.55, "v": 1200, "n": 12, "vw": 10.5},
                    {"t": "2024-03-04T15:01:00Z", "o": 10.0, "h": 10.5, "l": 9.9, "c": 10.5, "v": 800, "n": 9, "vw": 10.2}
                ],
                "symbol": "AAPL",
                "next_page_token": null
            }"#,
        )
        .unwrap();
        let bars: Vec<Bar> = response.bars.unwrap().into_iter().map(Bar::from).collect();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 10.55);
        assert_eq!(bars[1].volume, 800);

        let empty: BarsResponse =
            serde_json::from_str(r#"{"bars": null, "symbol": "AAPL"}"#).unwrap();
        assert!(empty.bars.is_none());
    }

    #[test]
    fn test_position_payload() {
        let position: AlpacaPosition = serde_json::from_str(
            r#"{
                "asset_id": "b0b6dd9d-8b9b-48a9-ba46-b9d54906e415",
                "symbol": "AAPL",
                "exchange": "NASDAQ",
                "qty": "20",
                "side": "long",
                "market_value": "200.00",
                "current_price": "10.00"
            }"#,
        )
        .unwrap();
        let position = Position::from(position);
        assert_eq!(position.quantity, 20);
        assert_eq!(position.market_value, 200.0);
        assert_eq!(position.side, PositionSide::Long);
    }

    #[test]
    fn test_account_payload() {
        let account: AlpacaAccount = serde_json::from_str(
            r#"{
                "id": "904837e3-3b76-47ec-b432-046db621571b",
                "status": "ACTIVE",
                "cash": "1000.50",
                "buying_power": "500",
                "portfolio_value": "1000.50"
            }"#,
        )
        .unwrap();
        let account = Account::from(account);
        assert_eq!(account.buying_power, 500.0);
        assert_eq!(account.portfolio_value, 1000.5);
    }

    #[test]
    fn test_limit_order_body() {
        let order = OrderRequest::limit("AAPL", 62, 8.0, OrderSide::Buy).unwrap();
        let body = serde_json::to_value(PlaceOrderBody::from_request(&order).unwrap()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "symbol": "AAPL",
                "qty": "62",
                "side": "buy",
                "type": "limit",
                "time_in_force": "day",
                "limit_price": "8.00"
            })
        );
    }

    #[test]
    fn test_market_order_body_has_no_price() {
        let order = OrderRequest::market("AAPL", 3, OrderSide::Sell).unwrap();
        let body = serde_json::to_value(PlaceOrderBody::from_request(&order).unwrap()).unwrap();
        assert_eq!(body["type"], "market");
        assert!(body.get("limit_price").is_none());
    }

    #[test]
    fn test_sub_dollar_price_precision() {
        assert_eq!(format_limit_price(15.123, OrderSide::Buy), "15.12");
        assert_eq!(format_limit_price(0.51234, OrderSide::Buy), "0.5123");
        assert_eq!(format_limit_price(8.0, OrderSide::Buy), "8.00");
        assert_eq!(format_limit_price(8.0, OrderSide::Sell), "8.00");
    }

    #[test]
    fn test_buy_rounds_down_sell_rounds_up() {
        // 15.127 四舍五入会变成 15.13，买单金额超过按现价计算的购买力
        assert_eq!(format_limit_price(15.127, OrderSide::Buy), "15.12");
        assert_eq!(format_limit_price(15.121, OrderSide::Sell), "15.13");
        assert_eq!(format_limit_price(0.12345, OrderSide::Buy), "0.1234");
        assert_eq!(format_limit_price(0.12341, OrderSide::Sell), "0.1235");

        let order = OrderRequest::limit("AAPL", 62, 8.069, OrderSide::Buy).unwrap();
        let body = PlaceOrderBody::from_request(&order).unwrap();
        assert_eq!(body.limit_price.as_deref(), Some("8.06"));
    }

    #[test]
    fn test_multi_status_with_failed_entry() {
        let entries: Vec<MultiStatusEntry> = serde_json::from_str(
            r#"[
                {"id": "o1", "status": 500, "body": {"code": 40010001, "message": "cancel failed"}},
                {"id": "o2", "status": 200}
            ]"#,
        )
        .unwrap();

        let err = ensure_all_succeeded("撤单", &entries).unwrap_err();
        match err {
            BrokerError::ApiError { code, message } => {
                assert_eq!(code, 500);
                assert!(message.contains("o1"));
                assert!(message.contains("cancel failed"));
                assert!(!message.contains("o2"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_multi_status_all_succeeded() {
        let entries: Vec<MultiStatusEntry> = serde_json::from_str(
            r#"[
                {"symbol": "AAPL", "status": 200, "body": {"id": "close-1", "qty": "20"}},
                {"symbol": "MSFT", "status": 200}
            ]"#,
        )
        .unwrap();
        assert!(ensure_all_succeeded("平仓", &entries).is_ok());
        assert!(ensure_all_succeeded("平仓", &[]).is_ok());
    }

    #[test]
    fn test_multi_status_names_position_symbol() {
        let entries: Vec<MultiStatusEntry> = serde_json::from_str(
            r#"[{"symbol": "AAPL", "status": 403, "body": {"message": "insufficient qty"}}]"#,
        )
        .unwrap();
        let err = ensure_all_succeeded("平仓", &entries).unwrap_err();
        assert!(err.to_string().contains("AAPL(403: insufficient qty)"));
    }

    /// 本地起一个只会返回固定响应的 HTTP 服务
    async fn serve_fixed(status_line: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                loop {
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                    if request.windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{}", addr)
    }

    fn broker_at(url: &str) -> AlpacaBroker {
        let settings = BrokerSettings {
            base_url: url.to_string(),
            data_url: url.to_string(),
            ..BrokerSettings::default()
        };
        let keys = ApiKeys {
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
        };
        AlpacaBroker::new(&settings, keys).unwrap()
    }

    #[tokio::test]
    async fn test_exit_all_positions_reports_item_failures() {
        let url = serve_fixed(
            "207 Multi-Status",
            r#"[{"id":"o1","status":500,"body":{"code":40010001,"message":"cancel failed"}}]"#,
        )
        .await;

        let err = broker_at(&url).exit_all_positions().await.unwrap_err();

        assert!(matches!(err, BrokerError::ApiError { code: 500, .. }));
        assert!(err.to_string().contains("o1"));
    }

    #[tokio::test]
    async fn test_exit_all_positions_ok_when_nothing_open() {
        let url = serve_fixed("207 Multi-Status", "[]").await;

        broker_at(&url).exit_all_positions().await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_body_is_serde_error() {
        let url = serve_fixed("200 OK", "{\"timestamp\": 42").await;

        let err = broker_at(&url).market_clock().await.unwrap_err();

        assert!(matches!(err, BrokerError::SerdeError(_)));
    }

    #[test]
    fn test_error_classification() {
        assert!(matches!(
            classify_error(401, "unauthorized".to_string()),
            BrokerError::AuthError(_)
        ));
        assert!(matches!(
            classify_error(404, "position does not exist".to_string()),
            BrokerError::ApiError { code: 404, .. }
        ));
    }
}
