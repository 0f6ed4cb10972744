use crate::core::error::BrokerError;
use serde::{Deserialize, Serialize};

fn default_base_url() -> String {
    "https://paper-api.alpaca.markets".to_string()
}

fn default_data_url() -> String {
    "https://data.alpaca.markets".to_string()
}

fn default_env_prefix() -> String {
    "ALPACA".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// 券商连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_data_url")]
    pub data_url: String,
    /// API密钥环境变量前缀，例如 ALPACA -> ALPACA_API_KEY
    #[serde(default = "default_env_prefix")]
    pub env_prefix: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            data_url: default_data_url(),
            env_prefix: default_env_prefix(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// API密钥配置
#[derive(Debug, Clone)]
pub struct ApiKeys {
    pub api_key: String,
    pub api_secret: String,
}

impl ApiKeys {
    /// 从环境变量加载API密钥
    pub fn from_env(prefix: &str) -> Result<Self, BrokerError> {
        dotenv::dotenv().ok(); // 加载.env文件，忽略错误

        let prefix_upper = prefix.to_uppercase();

        let api_key = std::env::var(format!("{}_API_KEY", prefix_upper))
            .or_else(|_| std::env::var(format!("{}_KEY_ID", prefix_upper)))
            .map_err(|_| {
                BrokerError::ConfigError(format!("未找到{}的API_KEY环境变量", prefix))
            })?;

        // 尝试两种格式的密钥名称
        let api_secret = std::env::var(format!("{}_API_SECRET", prefix_upper))
            .or_else(|_| std::env::var(format!("{}_SECRET_KEY", prefix_upper)))
            .map_err(|_| {
                BrokerError::ConfigError(format!(
                    "未找到{}的API_SECRET或SECRET_KEY环境变量",
                    prefix
                ))
            })?;

        Ok(ApiKeys {
            api_key,
            api_secret,
        })
    }
}
