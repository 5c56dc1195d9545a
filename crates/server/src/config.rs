/// 配置管理

use anyhow::Context;
use common::models::constants::DEFAULT_SERVER_PORT;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub log_level: String,
    /// 监控相关配置
    pub monitor: monitor::Config,
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> anyhow::Result<Self> {
        let server_port = std::env::var("SERVER_PORT")
            .unwrap_or_else(|_| DEFAULT_SERVER_PORT.to_string())
            .parse()
            .context("SERVER_PORT 不是有效的端口")?;

        let log_level = std::env::var("LOG_LEVEL")
            .unwrap_or_else(|_| "debug".to_string());

        let monitor = monitor::Config::from_env()?;

        Ok(Self {
            server_port,
            log_level,
            monitor,
        })
    }
}
