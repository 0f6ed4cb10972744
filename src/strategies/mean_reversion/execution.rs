use std::sync::Arc;

use crate::core::broker::BrokerClient;
use crate::core::error::{ErrorSeverity, StrategyError};

use super::logging;
use super::planner::OrderPlan;
use super::MeanReversionStrategy;

impl MeanReversionStrategy {
    /// 数量为正时提交限价单，否则记录日志后直接返回
    pub(super) async fn submit_limit_order(
        &mut self,
        client: &Arc<dyn BrokerClient>,
        plan: OrderPlan,
    ) -> Result<Option<String>, StrategyError> {
        let symbol = self.config.symbol.clone();
        if plan.quantity <= 0 {
            logging::info(
                Some(&symbol),
                format!(
                    "订单 | {} {} {} | 数量不为正，未发送",
                    plan.quantity, symbol, plan.side
                ),
            );
            return Ok(None);
        }
        let quantity = plan.quantity as u64;

        match client
            .submit_limit_order(&symbol, quantity, plan.price, plan.side)
            .await
        {
            Ok(order_id) => {
                logging::info(
                    Some(&symbol),
                    format!(
                        "限价单 | {} {} {} @ {:.4} | 已发送 id={}",
                        quantity, symbol, plan.side, plan.price, order_id
                    ),
                );
                self.last_order_id = Some(order_id.clone());
                Ok(Some(order_id))
            }
            Err(err) => {
                let message = format!(
                    "订单 | {} {} {} @ {:.4} | 未成功提交: {}",
                    quantity, symbol, plan.side, plan.price, err
                );
                match err.severity() {
                    ErrorSeverity::Info | ErrorSeverity::Warning => {
                        logging::warn(Some(&symbol), message)
                    }
                    ErrorSeverity::Error | ErrorSeverity::Critical => {
                        logging::error(Some(&symbol), message)
                    }
                }
                Err(StrategyError::OrderSubmission {
                    symbol,
                    quantity,
                    side: plan.side,
                    source: err,
                })
            }
        }
    }
}
