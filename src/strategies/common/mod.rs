pub mod application;

pub use application::{Strategy, StrategyInstance, StrategyState, StrategyStatus};
