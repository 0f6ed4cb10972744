use chrono::{DateTime, Utc};
/// 统一的类型定义模块
/// 策略与券商适配层之间传递的数据结构
use serde::{Deserialize, Serialize};

// ============= 基础类型定义 =============

/// 结果类型别名
pub type Result<T> = std::result::Result<T, crate::core::error::BrokerError>;

// ============= 行情数据 =============

/// K线数据（一分钟一根）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

// ============= 市场时钟 =============

/// 一次查询得到的市场时钟快照
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketClock {
    /// 距离下次开盘，小于等于0表示已开盘
    pub until_open: chrono::Duration,
    /// 距离收盘，未知或已收盘时为 None
    pub until_close: Option<chrono::Duration>,
}

impl MarketClock {
    pub fn is_open(&self) -> bool {
        self.until_open <= chrono::Duration::zero()
    }
}

// ============= 账户与持仓 =============

/// 持仓方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

/// 持仓信息，只有持有非零数量时才存在
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    /// 正数为多头
    pub quantity: i64,
    pub market_value: f64,
    pub current_price: f64,
    pub side: PositionSide,
}

/// 账户资金
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub cash: f64,
    pub buying_power: f64,
    pub portfolio_value: f64,
}

// ============= 订单相关 =============

/// 订单方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// 订单类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "market",
            OrderType::Limit => "limit",
        }
    }
}

/// 订单请求，提交后不再修改
///
/// 只能通过 `limit` / `market` 构造，数量必须为正。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: u64,
    pub limit_price: Option<f64>,
}

impl OrderRequest {
    /// 创建限价单，数量不为正时返回 None
    pub fn limit(symbol: &str, quantity: i64, price: f64, side: OrderSide) -> Option<Self> {
        let quantity = positive_quantity(quantity)?;
        Some(Self {
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Limit,
            quantity,
            limit_price: Some(price),
        })
    }

    /// 创建市价单，数量不为正时返回 None
    pub fn market(symbol: &str, quantity: i64, side: OrderSide) -> Option<Self> {
        let quantity = positive_quantity(quantity)?;
        Some(Self {
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Market,
            quantity,
            limit_price: None,
        })
    }
}

fn positive_quantity(quantity: i64) -> Option<u64> {
    if quantity > 0 {
        Some(quantity as u64)
    } else {
        None
    }
}
