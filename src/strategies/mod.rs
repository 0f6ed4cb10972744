// 核心策略模块
pub mod common;
pub mod mean_reversion;

// 导出策略类型
pub use common::{Strategy, StrategyInstance, StrategyState, StrategyStatus};
pub use mean_reversion::{MeanReversionConfig, MeanReversionStrategy};
