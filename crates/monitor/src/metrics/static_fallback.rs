/// 静态模拟数据源
///
/// 每项指标按固定随机分布取值，没有更好的数据源时使用；
/// 启发式估算在单项计算出错时也委托到这里

use async_trait::async_trait;
use common::models::constants::DEFAULT_DEVICE_MEMORY_GB;
use common::models::{BrowserSignals, CpuMetrics, GpuMetrics, NetworkMetrics, RamMetrics};
use common::{Error, MetricSnapshot, Result, SourceMode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::collector::SignalCollector;
use super::source::MetricSource;

pub struct StaticFallback {
    collector: SignalCollector,
    default_cores: u32,
    rng: StdRng,
}

impl StaticFallback {
    pub fn new(collector: SignalCollector, default_cores: u32) -> Self {
        Self::with_rng(collector, default_cores, StdRng::from_entropy())
    }

    pub fn with_rng(collector: SignalCollector, default_cores: u32, rng: StdRng) -> Self {
        Self {
            collector,
            default_cores: default_cores.max(1),
            rng,
        }
    }

    /// CPU：5-25% 基础负载，10% 概率叠加最多 40% 的尖峰
    pub fn cpu(&mut self, signals: &BrowserSignals) -> CpuMetrics {
        let cores = core_count(signals, self.default_cores);
        let base: f64 = self.rng.gen_range(5.0..25.0);
        let spike = if self.rng.gen_bool(0.1) {
            self.rng.gen_range(0.0..40.0)
        } else {
            0.0
        };
        CpuMetrics::new(format!("CPU {} cores", cores), (base + spike).min(100.0), cores)
    }

    /// GPU：有渲染上下文时 10-60%，否则 5-45%
    pub fn gpu(&mut self, signals: &BrowserSignals) -> GpuMetrics {
        match &signals.gpu {
            Some(report) => {
                let name = report
                    .renderer
                    .clone()
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| "Unknown GPU".to_string());
                GpuMetrics::new(name, self.rng.gen_range(10.0..60.0))
            }
            None => GpuMetrics::new("Unknown GPU", self.rng.gen_range(5.0..45.0)),
        }
    }

    /// 内存：设备内存（默认 16GB）的 20-80%
    pub fn ram(&mut self, signals: &BrowserSignals) -> RamMetrics {
        let total_mb = device_memory_gb(signals) * 1024.0;
        RamMetrics::from_percent(total_mb, self.rng.gen_range(20.0..80.0))
    }

    /// 网络：有连接信息时使用其下行带宽，上行按下行的 10% 计
    pub fn network(&mut self, signals: &BrowserSignals) -> NetworkMetrics {
        match &signals.connection {
            Some(conn) => {
                let name = conn
                    .effective_type
                    .clone()
                    .unwrap_or_else(|| "Unknown".to_string());
                let down = conn
                    .downlink
                    .filter(|d| *d > 0.0)
                    .unwrap_or_else(|| self.rng.gen_range(0.0..100.0));
                NetworkMetrics::new(name, down, down * 0.1)
            }
            None => {
                debug!("{}", Error::CapabilityUnavailable("网络连接信息".to_string()));
                NetworkMetrics::new(
                    "WiFi Network",
                    self.rng.gen_range(10.0..110.0),
                    self.rng.gen_range(5.0..25.0),
                )
            }
        }
    }
}

#[async_trait]
impl MetricSource for StaticFallback {
    fn mode(&self) -> SourceMode {
        SourceMode::StaticFallback
    }

    async fn sample(&mut self) -> Result<MetricSnapshot> {
        let signals = self.collector.signals().await;
        Ok(MetricSnapshot::new(
            self.cpu(&signals),
            self.gpu(&signals),
            self.ram(&signals),
            self.network(&signals),
            SourceMode::StaticFallback,
        ))
    }
}

/// 上报的核心数，缺失或为 0 时使用默认值
pub(crate) fn core_count(signals: &BrowserSignals, default_cores: u32) -> u32 {
    match signals.hardware_concurrency.filter(|c| *c > 0) {
        Some(cores) => cores,
        None => {
            debug!("{}，按 {} 核计", Error::CapabilityUnavailable("CPU 核心数".to_string()), default_cores);
            default_cores
        }
    }
}

/// 上报的设备内存 (GB)，缺失时按 16GB 计
pub(crate) fn device_memory_gb(signals: &BrowserSignals) -> f64 {
    match signals.device_memory_gb.filter(|gb| gb.is_finite() && *gb > 0.0) {
        Some(gb) => gb,
        None => {
            debug!(
                "{}，按 {}GB 计",
                Error::CapabilityUnavailable("设备内存".to_string()),
                DEFAULT_DEVICE_MEMORY_GB
            );
            DEFAULT_DEVICE_MEMORY_GB
        }
    }
}
