use crate::core::types::{Account, Bar, MarketClock, OrderRequest, OrderSide, Position, Result};
use async_trait::async_trait;
use chrono::Duration;

/// 券商通用接口trait
///
/// 每个调用都等待券商返回结果或类型化的错误，超时由具体实现负责。
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// 获取券商名称
    fn name(&self) -> &str;

    /// 距离下次开盘的时间，小于等于0表示当前已开盘
    async fn time_until_market_open(&self) -> Result<Duration>;

    /// 距离收盘的时间，券商无法提供时返回 None
    async fn time_until_market_close(&self) -> Result<Option<Duration>> {
        Ok(None)
    }

    /// 开盘与收盘时间的快照，默认由上面两个查询组合而成
    ///
    /// 已开盘时才查询收盘时间。能一次拿到两者的券商应覆盖此方法。
    async fn market_clock(&self) -> Result<MarketClock> {
        let until_open = self.time_until_market_open().await?;
        let until_close = if until_open <= Duration::zero() {
            self.time_until_market_close().await?
        } else {
            None
        };
        Ok(MarketClock {
            until_open,
            until_close,
        })
    }

    /// 获取最近 count 根一分钟K线，按时间从旧到新排列，可能少于 count
    async fn get_symbol_bars(&self, symbol: &str, count: usize) -> Result<Vec<Bar>>;

    /// 获取持仓，未持仓时返回 `BrokerError::PositionNotFound`
    async fn get_position(&self, symbol: &str) -> Result<Position>;

    /// 获取账户资金
    async fn get_account(&self) -> Result<Account>;

    /// 提交订单，返回订单ID
    async fn submit_order(&self, order: &OrderRequest) -> Result<String>;

    /// 提交限价单
    async fn submit_limit_order(
        &self,
        symbol: &str,
        quantity: u64,
        price: f64,
        side: OrderSide,
    ) -> Result<String> {
        let order = OrderRequest::limit(symbol, quantity as i64, price, side).ok_or_else(|| {
            crate::core::error::BrokerError::OrderError(format!("无效的下单数量: {}", quantity))
        })?;
        self.submit_order(&order).await
    }

    /// 提交市价单
    async fn submit_market_order(
        &self,
        symbol: &str,
        quantity: u64,
        side: OrderSide,
    ) -> Result<String> {
        let order = OrderRequest::market(symbol, quantity as i64, side).ok_or_else(|| {
            crate::core::error::BrokerError::OrderError(format!("无效的下单数量: {}", quantity))
        })?;
        self.submit_order(&order).await
    }

    /// 撤销所有挂单并平掉所有持仓
    async fn exit_all_positions(&self) -> Result<()>;
}
