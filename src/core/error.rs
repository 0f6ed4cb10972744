use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("网络请求错误: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON序列化错误: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("API错误: {code} - {message}")]
    ApiError { code: i32, message: String },

    #[error("认证错误: {0}")]
    AuthError(String),

    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("订单错误: {0}")]
    OrderError(String),

    #[error("持仓不存在: {symbol}")]
    PositionNotFound { symbol: String },

}

impl BrokerError {
    /// 持仓不存在属于正常状态，不是故障
    pub fn is_position_not_found(&self) -> bool {
        matches!(self, BrokerError::PositionNotFound { .. })
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BrokerError::PositionNotFound { .. } => ErrorSeverity::Info,
            BrokerError::NetworkError(_) => ErrorSeverity::Warning,
            BrokerError::ApiError { code, .. } if *code == 429 => ErrorSeverity::Warning,
            BrokerError::AuthError(_) => ErrorSeverity::Critical,
            BrokerError::ConfigError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }
}

/// 错误严重程度
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorSeverity {
    Info,     // 信息性错误，通常不影响操作
    Warning,  // 警告性错误，可能影响性能但可以重试
    Error,    // 一般错误，需要用户处理
    Critical, // 严重错误，需要立即处理
}

/// 策略运行期错误
///
/// 行情/账户/时钟查询失败属于致命错误，会终止运行循环；
/// 下单失败只影响当前这一轮，循环继续。
#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("{operation} 失败: {source}")]
    Broker {
        operation: &'static str,
        #[source]
        source: BrokerError,
    },

    #[error("清仓失败: {0}")]
    Liquidation(#[source] BrokerError),

    #[error("订单 | {quantity} {symbol} {side} | 提交失败: {source}")]
    OrderSubmission {
        symbol: String,
        quantity: u64,
        side: crate::core::types::OrderSide,
        #[source]
        source: BrokerError,
    },

    #[error("策略尚未调用 start 注入券商客户端")]
    NotPrepared,
}

impl StrategyError {
    pub(crate) fn broker(operation: &'static str, source: BrokerError) -> Self {
        StrategyError::Broker { operation, source }
    }

    /// 致命错误会结束 run 循环并返回给调用方
    pub fn is_fatal(&self) -> bool {
        !matches!(self, StrategyError::OrderSubmission { .. })
    }
}
