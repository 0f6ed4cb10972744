use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use super::status::StrategyStatus;
use crate::core::broker::BrokerClient;
use crate::core::error::StrategyError;

#[async_trait]
pub trait StrategyInstance: Send {
    /// 注入预算与券商客户端
    fn start(&mut self, budget: f64, client: Arc<dyn BrokerClient>);

    /// 阻塞运行直到 shutdown 被置为 true（或发送端被丢弃）或出现致命错误
    async fn run(&mut self, shutdown: watch::Receiver<bool>) -> Result<(), StrategyError>;

    fn status(&self) -> StrategyStatus;
}

pub trait Strategy: StrategyInstance + Sized {
    type Config: Send + Sync + 'static;

    fn create(config: Self::Config) -> anyhow::Result<Self>
    where
        Self: Sized;
}
