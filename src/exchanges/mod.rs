// 券商实现
pub mod alpaca;

pub use alpaca::AlpacaBroker;
