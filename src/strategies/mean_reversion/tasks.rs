use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use tokio::sync::watch;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

use crate::core::broker::BrokerClient;
use crate::core::error::StrategyError;

use super::logging;
use super::planner::{self, Holding, PriceSignal, PriceZone};
use super::MeanReversionStrategy;

impl MeanReversionStrategy {
    pub(super) fn client(&self) -> Result<Arc<dyn BrokerClient>, StrategyError> {
        self.client.clone().ok_or(StrategyError::NotPrepared)
    }

    /// 清仓后立即执行一轮，然后按固定间隔执行，直到收到停止信号
    ///
    /// 停止信号只在两轮之间检查，已经开始的一轮总会执行完。
    pub(super) async fn run_loop(
        &mut self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), StrategyError> {
        let client = self.client()?;
        client
            .exit_all_positions()
            .await
            .map_err(StrategyError::Liquidation)?;
        logging::info(Some(&self.config.symbol), "已撤销全部挂单并清空持仓");

        let period = Duration::from_secs(self.config.tick_interval_secs);
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.tick().await?;
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        // 发送端已丢弃，视为停止
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.tick().await?;
                }
            }
        }
        Ok(())
    }

    /// 执行一轮更新，下单失败只记录日志，其余错误向上返回
    async fn tick(&mut self) -> Result<(), StrategyError> {
        match self.update().await {
            Ok(()) => Ok(()),
            Err(err) if !err.is_fatal() => {
                self.last_error = Some(err.to_string());
                Ok(())
            }
            Err(err) => {
                logging::error(Some(&self.config.symbol), format!("致命错误: {}", err));
                Err(err)
            }
        }
    }

    pub(super) async fn update(&mut self) -> Result<(), StrategyError> {
        let client = self.client()?;
        let symbol = self.config.symbol.clone();
        let lookback = self.config.lookback_bars;
        self.updated_at = chrono::Utc::now();

        let clock = client
            .market_clock()
            .await
            .map_err(|e| StrategyError::broker("查询市场时钟", e))?;
        if !clock.is_open() {
            self.liquidated_for_close = false;
            logging::info(
                Some(&symbol),
                format!("距离下次开盘还有 {} 分钟", clock.until_open.num_minutes()),
            );
            return Ok(());
        }

        if self.liquidate_before_close(&client, clock.until_close).await? {
            return Ok(());
        }

        let bars = client
            .get_symbol_bars(&symbol, lookback)
            .await
            .map_err(|e| StrategyError::broker("获取K线", e))?;
        let Some(signal) = PriceSignal::from_bars(&bars, lookback) else {
            logging::info(
                Some(&symbol),
                format!(
                    "K线不足，还需等待 {} 分钟积累数据",
                    lookback.saturating_sub(bars.len())
                ),
            );
            return Ok(());
        };

        let holding = match client.get_position(&symbol).await {
            Ok(position) => Holding::from(&position),
            Err(err) if err.is_position_not_found() => Holding::default(),
            Err(err) => return Err(StrategyError::broker("查询持仓", err)),
        };

        if signal.current_price <= self.config.min_valid_price {
            logging::warn(
                Some(&symbol),
                format!("当前价格异常: {}，跳过本轮", signal.current_price),
            );
            return Ok(());
        }

        self.last_price = Some(signal.current_price);
        if let Err(err) = self.price_log.record(signal.current_price) {
            logging::warn(Some(&symbol), format!("写入价格日志失败: {}", err));
        }
        logging::info(
            Some(&symbol),
            format!(
                "均价: {:.4}, 当前价: {:.4}, 持仓: {}",
                signal.mean_price, signal.current_price, holding.quantity
            ),
        );

        match signal.zone() {
            PriceZone::AboveMean => {
                if let Some(plan) = planner::plan_exit(&signal, &holding) {
                    logging::info(
                        Some(&symbol),
                        format!(
                            "高于均值，卖出全部 {} 股，价格 {:.4}",
                            plan.quantity, plan.price
                        ),
                    );
                    self.submit_limit_order(&client, plan).await?;
                }
            }
            PriceZone::BelowMean => {
                let account = client
                    .get_account()
                    .await
                    .map_err(|e| StrategyError::broker("查询账户", e))?;
                let gain = self.config.portfolio_gain;
                let amount = planner::amount_to_add(&signal, &holding, &account, gain);
                logging::info(
                    Some(&symbol),
                    format!(
                        "目标仓位占比 {:.4}，需调整金额 {:.2}（购买力 {:.2}）",
                        signal.portfolio_share(gain),
                        amount,
                        account.buying_power
                    ),
                );
                if let Some(plan) = planner::plan_rebalance(&signal, &holding, &account, gain) {
                    self.submit_limit_order(&client, plan).await?;
                }
            }
            PriceZone::AtMean => {
                logging::debug(Some(&symbol), "当前价等于均值，不操作");
            }
        }

        Ok(())
    }

    /// 收盘前清仓窗口内返回 true，本轮不再交易
    async fn liquidate_before_close(
        &mut self,
        client: &Arc<dyn BrokerClient>,
        until_close: Option<ChronoDuration>,
    ) -> Result<bool, StrategyError> {
        let Some(window) = self.config.close_liquidation_minutes else {
            return Ok(false);
        };
        let Some(until_close) = until_close else {
            return Ok(false);
        };
        if until_close >= ChronoDuration::minutes(window) {
            return Ok(false);
        }

        if !self.liquidated_for_close {
            logging::info(
                Some(&self.config.symbol),
                format!("距离收盘不足 {} 分钟，撤单并清空持仓", window),
            );
            client
                .exit_all_positions()
                .await
                .map_err(StrategyError::Liquidation)?;
            self.liquidated_for_close = true;
        }
        Ok(true)
    }
}
