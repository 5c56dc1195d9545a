/// 配置管理

use std::time::Duration;

use anyhow::{bail, Context};
use common::models::constants::{
    DEFAULT_CPU_CORES, DEFAULT_POLL_INTERVAL_MS, DEFAULT_PUSH_TIMEOUT_MS,
};

use crate::controller::ControllerConfig;
use crate::display::IndicatorKind;
use crate::environment::EnvironmentProbe;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub poll_interval_ms: u64,
    pub push_timeout_ms: u64,
    /// 显式的宿主标记
    pub push_host: Option<bool>,
    pub page_url: Option<String>,
    /// 关闭后轮询使用纯随机模拟
    pub heuristic_enabled: bool,
    pub default_cpu_cores: u32,
    /// 页面上不显示的指示器
    pub hidden_indicators: Vec<IndicatorKind>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            push_timeout_ms: DEFAULT_PUSH_TIMEOUT_MS,
            push_host: None,
            page_url: None,
            heuristic_enabled: true,
            default_cpu_cores: DEFAULT_CPU_CORES,
            hidden_indicators: Vec::new(),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源加载配置
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let poll_interval_ms = parse_millis(&lookup, "POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?;
        let push_timeout_ms = parse_millis(&lookup, "PUSH_TIMEOUT_MS", DEFAULT_PUSH_TIMEOUT_MS)?;

        let push_host = match lookup("PUSH_HOST") {
            Some(value) => Some(parse_bool("PUSH_HOST", &value)?),
            None => None,
        };

        let page_url = lookup("PAGE_URL").filter(|url| !url.trim().is_empty());

        let heuristic_enabled = match lookup("HEURISTIC_ENABLED") {
            Some(value) => parse_bool("HEURISTIC_ENABLED", &value)?,
            None => true,
        };

        let default_cpu_cores: u32 = lookup("DEFAULT_CPU_CORES")
            .unwrap_or_else(|| DEFAULT_CPU_CORES.to_string())
            .trim()
            .parse()
            .context("DEFAULT_CPU_CORES 不是有效的整数")?;
        if default_cpu_cores == 0 {
            bail!("DEFAULT_CPU_CORES 必须大于 0");
        }

        let hidden_indicators = match lookup("HIDDEN_INDICATORS") {
            Some(value) => parse_indicators(&value)?,
            None => Vec::new(),
        };

        Ok(Self {
            poll_interval_ms,
            push_timeout_ms,
            push_host,
            page_url,
            heuristic_enabled,
            default_cpu_cores,
            hidden_indicators,
        })
    }

    pub fn probe(&self) -> EnvironmentProbe {
        EnvironmentProbe::new(self.push_host, self.page_url.clone())
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            push_timeout: Duration::from_millis(self.push_timeout_ms),
        }
    }

    /// 指示器是否需要显示
    pub fn is_visible(&self, kind: IndicatorKind) -> bool {
        !self.hidden_indicators.contains(&kind)
    }
}

fn parse_millis<F>(lookup: &F, key: &str, default: u64) -> anyhow::Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let value: u64 = lookup(key)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse()
        .with_context(|| format!("{} 不是有效的毫秒数", key))?;
    if value == 0 {
        bail!("{} 必须大于 0", key);
    }
    Ok(value)
}

fn parse_bool(key: &str, value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => bail!("{} 不是有效的布尔值: {}", key, other),
    }
}

fn parse_indicators(value: &str) -> anyhow::Result<Vec<IndicatorKind>> {
    let mut kinds = Vec::new();
    for item in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match IndicatorKind::parse(item) {
            Some(kind) if !kinds.contains(&kind) => kinds.push(kind),
            Some(_) => {}
            None => bail!("未知的指示器: {}", item),
        }
    }
    Ok(kinds)
}
