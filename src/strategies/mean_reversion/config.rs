use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::config::BrokerSettings;

fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_lookback_bars() -> usize {
    20
}

fn default_tick_interval_secs() -> u64 {
    60
}

fn default_portfolio_gain() -> f64 {
    200.0
}

fn default_min_valid_price() -> f64 {
    0.001
}

fn default_history_dir() -> String {
    "history".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeanReversionConfig {
    pub strategy: StrategyInfo,
    /// 交易标的
    pub symbol: String,
    /// 均值窗口长度（一分钟K线根数）
    #[serde(default = "default_lookback_bars")]
    pub lookback_bars: usize,
    /// 预算，目前仅用于展示
    #[serde(default)]
    pub budget: f64,
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    /// 偏离均值1%时目标仓位约占组合的 gain/100 %
    #[serde(default = "default_portfolio_gain")]
    pub portfolio_gain: f64,
    /// 收盘价不高于该值时视为异常报价
    #[serde(default = "default_min_valid_price")]
    pub min_valid_price: f64,
    /// 收盘前多少分钟清仓，不配置则不启用
    #[serde(default)]
    pub close_liquidation_minutes: Option<i64>,
    #[serde(default = "default_history_dir")]
    pub history_dir: String,
    #[serde(default)]
    pub broker: BrokerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyInfo {
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl MeanReversionConfig {
    /// 从YAML文件加载并校验配置
    pub fn from_file(path: &str) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("读取配置文件失败: {}", path))?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: MeanReversionConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(anyhow!("symbol 不能为空"));
        }
        if self.lookback_bars == 0 {
            return Err(anyhow!("lookback_bars 必须大于0"));
        }
        if self.tick_interval_secs == 0 {
            return Err(anyhow!("tick_interval_secs 必须大于0"));
        }
        if !(self.portfolio_gain > 0.0) {
            return Err(anyhow!("portfolio_gain 必须大于0"));
        }
        if !(self.min_valid_price > 0.0) {
            return Err(anyhow!("min_valid_price 必须大于0"));
        }
        if let Some(minutes) = self.close_liquidation_minutes {
            if minutes <= 0 {
                return Err(anyhow!("close_liquidation_minutes 必须大于0"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let config = MeanReversionConfig::from_yaml(
            r#"
strategy:
  name: mr_aapl
symbol: AAPL
"#,
        )
        .unwrap();

        assert_eq!(config.strategy.log_level, "INFO");
        assert_eq!(config.lookback_bars, 20);
        assert_eq!(config.tick_interval_secs, 60);
        assert_eq!(config.portfolio_gain, 200.0);
        assert_eq!(config.min_valid_price, 0.001);
        assert_eq!(config.close_liquidation_minutes, None);
        assert_eq!(config.history_dir, "history");
        assert_eq!(config.broker.env_prefix, "ALPACA");
        assert_eq!(config.broker.base_url, "https://paper-api.alpaca.markets");
    }

    #[test]
    fn test_full_config() {
        let config = MeanReversionConfig::from_yaml(
            r#"
strategy:
  name: mr_cern
  log_level: DEBUG
symbol: CERN
lookback_bars: 30
budget: 5000
tick_interval_secs: 30
portfolio_gain: 150
close_liquidation_minutes: 15
history_dir: /tmp/prices
broker:
  base_url: https://api.alpaca.markets
  env_prefix: APCA
"#,
        )
        .unwrap();

        assert_eq!(config.lookback_bars, 30);
        assert_eq!(config.budget, 5000.0);
        assert_eq!(config.close_liquidation_minutes, Some(15));
        assert_eq!(config.broker.env_prefix, "APCA");
        assert_eq!(config.broker.data_url, "https://data.alpaca.markets");
    }

    #[test]
    fn test_zero_lookback_rejected() {
        let err = MeanReversionConfig::from_yaml(
            r#"
strategy:
  name: bad
symbol: AAPL
lookback_bars: 0
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("lookback_bars"));
    }

    #[test]
    fn test_non_positive_gain_rejected() {
        let result = MeanReversionConfig::from_yaml(
            r#"
strategy:
  name: bad
symbol: AAPL
portfolio_gain: 0
"#,
        );
        assert!(result.is_err());
    }
}
