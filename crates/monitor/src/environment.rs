/// 运行环境探测
///
/// 判断是否存在可推送遥测数据的宿主，并提供估算算法使用的时钟

use chrono::Timelike;
use tracing::debug;

/// 时钟：估算算法只依赖当前毫秒时间戳和本地小时
pub trait Clock: Send + Sync {
    /// 当前毫秒时间戳
    fn now_ms(&self) -> f64;

    /// 本地时间的小时 (0-23)
    fn local_hour(&self) -> u32;
}

/// 系统时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        chrono::Utc::now().timestamp_millis() as f64
    }

    fn local_hour(&self) -> u32 {
        chrono::Local::now().hour()
    }
}

/// 固定时钟
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    pub now_ms: f64,
    pub hour: u32,
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now_ms(&self) -> f64 {
        self.now_ms
    }

    fn local_hour(&self) -> u32 {
        self.hour
    }
}

/// 宿主能力探测
#[derive(Debug, Clone, Default)]
pub struct EnvironmentProbe {
    /// 显式的宿主标记，优先级最高
    pub push_host: Option<bool>,
    /// 页面地址，未设置标记时按协议推断
    pub page_url: Option<String>,
}

impl EnvironmentProbe {
    pub fn new(push_host: Option<bool>, page_url: Option<String>) -> Self {
        Self {
            push_host,
            page_url,
        }
    }

    /// 是否存在可推送数据的宿主
    pub fn push_capable(&self) -> bool {
        if let Some(flag) = self.push_host {
            debug!("宿主标记: {}", flag);
            return flag;
        }

        // 桌面壁纸宿主以本地文件方式加载页面
        let capable = self
            .page_url
            .as_deref()
            .map(|url| url.trim().to_ascii_lowercase().starts_with("file://"))
            .unwrap_or(false);
        debug!("按页面地址推断宿主: {:?} -> {}", self.page_url, capable);
        capable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_flag_wins() {
        let probe = EnvironmentProbe::new(Some(false), Some("file:///wallpaper/index.html".into()));
        assert!(!probe.push_capable());

        let probe = EnvironmentProbe::new(Some(true), None);
        assert!(probe.push_capable());
    }

    #[test]
    fn test_url_heuristic() {
        let probe = EnvironmentProbe::new(None, Some("FILE:///C:/wallpapers/index.html".into()));
        assert!(probe.push_capable());

        let probe = EnvironmentProbe::new(None, Some("https://example.github.io/wallpaper/".into()));
        assert!(!probe.push_capable());

        assert!(!EnvironmentProbe::default().push_capable());
    }

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock { now_ms: 42.0, hour: 21 };
        assert_eq!(clock.now_ms(), 42.0);
        assert_eq!(clock.local_hour(), 21);
    }
}
