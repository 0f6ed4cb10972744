use chrono::{DateTime, Utc};

/// 策略运行状态
///
/// Idle -> Preparing -> Running -> Stopped，停止后不可恢复。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyState {
    Idle,
    Preparing,
    Running,
    Stopped,
}

/// 统一的策略状态结构
#[derive(Debug, Clone)]
pub struct StrategyStatus {
    pub name: String,
    pub state: StrategyState,
    pub symbol: String,
    pub budget: f64,
    pub last_order_id: Option<String>,
    pub last_price: Option<f64>,
    pub updated_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

impl StrategyStatus {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: StrategyState::Idle,
            symbol: symbol.into(),
            budget: 0.0,
            last_order_id: None,
            last_price: None,
            updated_at: Utc::now(),
            last_error: None,
        }
    }

    pub fn with_state(mut self, state: StrategyState) -> Self {
        self.state = state;
        self
    }

    pub fn with_last_error(mut self, last_error: impl Into<String>) -> Self {
        self.last_error = Some(last_error.into());
        self
    }
}
