use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::core::broker::BrokerClient;
use crate::core::error::StrategyError;
use crate::strategies::common::{Strategy, StrategyInstance, StrategyState, StrategyStatus};

use super::config::MeanReversionConfig;
use super::history::PriceLog;
use super::logging;

pub struct MeanReversionStrategy {
    pub(super) config: MeanReversionConfig,
    pub(super) client: Option<Arc<dyn BrokerClient>>,
    pub(super) budget: f64,
    pub(super) price_log: PriceLog,
    pub(super) last_order_id: Option<String>,
    pub(super) last_price: Option<f64>,
    pub(super) last_error: Option<String>,
    pub(super) state: StrategyState,
    pub(super) updated_at: DateTime<Utc>,
    /// 本交易日是否已执行收盘前清仓
    pub(super) liquidated_for_close: bool,
}

impl MeanReversionStrategy {
    fn new(config: MeanReversionConfig) -> Result<Self> {
        config.validate()?;
        let price_log = PriceLog::new(&config.history_dir)
            .with_context(|| format!("创建价格日志目录失败: {}", config.history_dir))?;

        Ok(Self {
            budget: config.budget,
            config,
            client: None,
            price_log,
            last_order_id: None,
            last_price: None,
            last_error: None,
            state: StrategyState::Idle,
            updated_at: Utc::now(),
            liquidated_for_close: false,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.config.symbol
    }

    pub fn last_order_id(&self) -> Option<&str> {
        self.last_order_id.as_deref()
    }

    pub(super) fn set_state(&mut self, state: StrategyState) {
        self.state = state;
        self.updated_at = Utc::now();
    }
}

impl Strategy for MeanReversionStrategy {
    type Config = MeanReversionConfig;

    fn create(config: Self::Config) -> Result<Self>
    where
        Self: Sized,
    {
        Self::new(config)
    }
}

#[async_trait]
impl StrategyInstance for MeanReversionStrategy {
    fn start(&mut self, budget: f64, client: Arc<dyn BrokerClient>) {
        self.budget = budget;
        logging::info(
            Some(&self.config.symbol),
            format!(
                "均值回归策略准备就绪: 券商={} 预算={:.2} 窗口={}根",
                client.name(),
                budget,
                self.config.lookback_bars
            ),
        );
        self.client = Some(client);
        self.set_state(StrategyState::Preparing);
    }

    async fn run(&mut self, shutdown: watch::Receiver<bool>) -> Result<(), StrategyError> {
        if self.state == StrategyState::Stopped {
            return Ok(());
        }
        self.set_state(StrategyState::Running);
        let result = self.run_loop(shutdown).await;
        if let Err(err) = &result {
            self.last_error = Some(err.to_string());
        }
        self.set_state(StrategyState::Stopped);
        logging::info(Some(&self.config.symbol), "均值回归策略已停止");
        result
    }

    fn status(&self) -> StrategyStatus {
        let mut status = StrategyStatus::new(&self.config.strategy.name, &self.config.symbol)
            .with_state(self.state);
        if let Some(err) = &self.last_error {
            status = status.with_last_error(err.clone());
        }
        status.budget = self.budget;
        status.last_order_id = self.last_order_id.clone();
        status.last_price = self.last_price;
        status.updated_at = self.updated_at;
        status
    }
}
