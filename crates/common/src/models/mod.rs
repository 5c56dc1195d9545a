/// 共享数据模型
///
/// 定义 monitor 与 server 共享的指标快照、数据源模式以及浏览器上报的能力信号

use serde::{Deserialize, Serialize};

use crate::utils::{clamp_percent, non_negative};

/// 数据源模式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    /// 宿主程序推送的真实数据
    NativePush,
    /// 基于浏览器性能信号的启发式估算
    HeuristicEstimator,
    /// 纯随机模拟
    StaticFallback,
}

impl SourceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NativePush => "native_push",
            Self::HeuristicEstimator => "heuristic_estimator",
            Self::StaticFallback => "static_fallback",
        }
    }
}

impl std::fmt::Display for SourceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU 指标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuMetrics {
    pub name: String,
    /// 使用率 (0-100)
    pub usage_percent: f64,
    pub core_count: u32,
}

impl CpuMetrics {
    pub fn new(name: impl Into<String>, usage_percent: f64, core_count: u32) -> Self {
        Self {
            name: name.into(),
            usage_percent: clamp_percent(usage_percent),
            core_count: core_count.max(1),
        }
    }
}

/// GPU 指标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuMetrics {
    pub name: String,
    /// 使用率 (0-100)
    pub usage_percent: f64,
}

impl GpuMetrics {
    pub fn new(name: impl Into<String>, usage_percent: f64) -> Self {
        Self {
            name: name.into(),
            usage_percent: clamp_percent(usage_percent),
        }
    }
}

/// 内存指标（单位 MB）
///
/// 始终满足 `total_mb == used_mb + available_mb`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RamMetrics {
    pub total_mb: f64,
    pub used_mb: f64,
    pub available_mb: f64,
    pub usage_percent: f64,
}

impl RamMetrics {
    /// 由总量和已用百分比构造
    pub fn from_percent(total_mb: f64, usage_percent: f64) -> Self {
        let total_mb = non_negative(total_mb);
        let usage_percent = clamp_percent(usage_percent);
        let used_mb = total_mb * usage_percent / 100.0;
        Self {
            total_mb,
            used_mb,
            available_mb: total_mb - used_mb,
            usage_percent,
        }
    }

    /// 由总量和可用量构造，已用 = 总量 - 可用
    pub fn from_available(total_mb: f64, available_mb: f64) -> Self {
        let total_mb = non_negative(total_mb);
        let available_mb = non_negative(available_mb).min(total_mb);
        let used_mb = total_mb - available_mb;
        let usage_percent = if total_mb > 0.0 {
            clamp_percent(used_mb / total_mb * 100.0)
        } else {
            0.0
        };
        Self {
            total_mb,
            used_mb,
            available_mb,
            usage_percent,
        }
    }
}

/// 网络指标（单位 Mbps）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetrics {
    pub name: String,
    pub down_speed_mbps: f64,
    pub up_speed_mbps: f64,
}

impl NetworkMetrics {
    pub fn new(name: impl Into<String>, down_speed_mbps: f64, up_speed_mbps: f64) -> Self {
        Self {
            name: name.into(),
            down_speed_mbps: non_negative(down_speed_mbps),
            up_speed_mbps: non_negative(up_speed_mbps),
        }
    }
}

/// 指标快照
///
/// 每次轮询或每次推送生成一份，交给显示端后即丢弃
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub cpu: CpuMetrics,
    pub gpu: GpuMetrics,
    pub ram: RamMetrics,
    pub network: NetworkMetrics,
    /// 产生该快照的数据源
    pub source: SourceMode,
    /// 采集时间（毫秒时间戳）
    pub captured_at: i64,
}

impl MetricSnapshot {
    pub fn new(
        cpu: CpuMetrics,
        gpu: GpuMetrics,
        ram: RamMetrics,
        network: NetworkMetrics,
        source: SourceMode,
    ) -> Self {
        Self {
            cpu,
            gpu,
            ram,
            network,
            source,
            captured_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// 检查百分比与绝对值约束
    pub fn is_consistent(&self) -> bool {
        let percent_ok = |v: f64| (0.0..=100.0).contains(&v);
        let ram_sum = self.ram.used_mb + self.ram.available_mb;

        percent_ok(self.cpu.usage_percent)
            && percent_ok(self.gpu.usage_percent)
            && percent_ok(self.ram.usage_percent)
            && self.cpu.core_count > 0
            && self.ram.total_mb >= 0.0
            && self.ram.used_mb >= 0.0
            && self.ram.available_mb >= 0.0
            && (ram_sum - self.ram.total_mb).abs() < 1e-6
            && self.network.down_speed_mbps >= 0.0
            && self.network.up_speed_mbps >= 0.0
    }
}

// ============================================================================
// 浏览器上报的能力信号
// ============================================================================

/// 网络连接信息（对应 navigator.connection）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// slow-2g / 2g / 3g / 4g
    #[serde(default)]
    pub effective_type: Option<String>,
    /// 估计下行带宽 (Mbps)
    #[serde(default)]
    pub downlink: Option<f64>,
    /// wifi / ethernet / cellular ...
    #[serde(default)]
    pub connection_type: Option<String>,
}

/// GPU 探测结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpuProbeReport {
    /// 未屏蔽的渲染器名称
    #[serde(default)]
    pub renderer: Option<String>,
    /// 纹理创建/绑定/上传微基准耗时 (ms)
    #[serde(default)]
    pub benchmark_ms: Option<f64>,
}

/// 页面上报的浏览器能力信号，缺失字段表示对应能力不可用
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrowserSignals {
    #[serde(default)]
    pub hardware_concurrency: Option<u32>,
    #[serde(default)]
    pub device_memory_gb: Option<f64>,
    #[serde(default)]
    pub connection: Option<ConnectionInfo>,
    #[serde(default)]
    pub gpu: Option<GpuProbeReport>,
}

/// 常量定义
pub mod constants {
    /// 默认 Server 端口
    pub const DEFAULT_SERVER_PORT: u16 = 8787;

    /// 默认轮询间隔（毫秒）
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

    /// 等待宿主推送的超时（毫秒）
    pub const DEFAULT_PUSH_TIMEOUT_MS: u64 = 3000;

    /// 帧耗时历史容量
    pub const FRAME_HISTORY_CAPACITY: usize = 60;

    /// 堆内存快照历史容量
    pub const HEAP_HISTORY_CAPACITY: usize = 30;

    /// 60fps 对应的目标帧耗时（毫秒）
    pub const TARGET_FRAME_TIME_MS: f64 = 16.67;

    /// 未上报设备内存时假定的内存大小（GB）
    pub const DEFAULT_DEVICE_MEMORY_GB: f64 = 16.0;

    /// 未上报核心数时假定的 CPU 核心数
    pub const DEFAULT_CPU_CORES: u32 = 4;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ram_from_percent_keeps_sum() {
        let ram = RamMetrics::from_percent(16384.0, 37.5);
        assert!((ram.used_mb + ram.available_mb - ram.total_mb).abs() < 1e-9);
        assert_eq!(ram.used_mb, 6144.0);
    }

    #[test]
    fn test_ram_from_available_clamps() {
        let ram = RamMetrics::from_available(1024.0, 4096.0);
        assert_eq!(ram.available_mb, 1024.0);
        assert_eq!(ram.used_mb, 0.0);
        assert_eq!(ram.usage_percent, 0.0);

        let empty = RamMetrics::from_available(0.0, 0.0);
        assert_eq!(empty.usage_percent, 0.0);
    }

    #[test]
    fn test_constructors_clamp() {
        let cpu = CpuMetrics::new("X", 140.0, 0);
        assert_eq!(cpu.usage_percent, 100.0);
        assert_eq!(cpu.core_count, 1);

        let net = NetworkMetrics::new("eth0", -3.0, f64::NAN);
        assert_eq!(net.down_speed_mbps, 0.0);
        assert_eq!(net.up_speed_mbps, 0.0);
    }

    #[test]
    fn test_source_mode_serialization() {
        let json = serde_json::to_string(&SourceMode::HeuristicEstimator).unwrap();
        assert_eq!(json, "\"heuristic_estimator\"");
    }

    #[test]
    fn test_signals_accept_partial_json() {
        let signals: BrowserSignals =
            serde_json::from_str(r#"{"device_memory_gb": 8, "connection": {"effective_type": "4g"}}"#).unwrap();
        assert_eq!(signals.device_memory_gb, Some(8.0));
        assert!(signals.hardware_concurrency.is_none());
        assert_eq!(signals.connection.unwrap().effective_type.as_deref(), Some("4g"));
    }
}
