// 核心模块 - 券商接口、公共类型与错误定义
pub mod broker;
pub mod config;
pub mod error;
pub mod types;

pub use broker::BrokerClient;
pub use config::{ApiKeys, BrokerSettings};
pub use error::{BrokerError, ErrorSeverity, StrategyError};
pub use types::{
    Account, Bar, MarketClock, OrderRequest, OrderSide, OrderType, Position, PositionSide,
};
