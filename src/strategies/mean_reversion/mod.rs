pub mod config;
mod execution;
pub mod history;
mod logging;
mod planner;
mod strategy;
mod tasks;


pub use config::MeanReversionConfig;
pub use history::PriceLog;
pub use strategy::MeanReversionStrategy;
