/// 启发式估算
///
/// 根据帧耗时、堆内存变化和时段规律估算 CPU/GPU/内存/网络的使用情况。
/// 结果只是看起来合理的近似值，并非真实硬件读数。
///
/// 单项计算出错（结果非有限值）或所需能力缺失时，该项以兜底值替代，其余项不受影响。

use std::sync::Arc;

use async_trait::async_trait;
use common::models::constants::TARGET_FRAME_TIME_MS;
use common::models::{BrowserSignals, ConnectionInfo, CpuMetrics, GpuMetrics, NetworkMetrics, RamMetrics};
use common::utils::clamp_range;
use common::{Error, MetricSnapshot, Result, SourceMode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::collector::SignalCollector;
use super::history::PerformanceHistory;
use super::source::MetricSource;
use super::static_fallback::{core_count, device_memory_gb, StaticFallback};
use crate::environment::{Clock, SystemClock};

/// ANGLE 渲染器字符串中真实显卡名称之前的驱动前缀
const ANGLE_D3D11_PREFIX: &str = "Direct3D11 vs_5_0 ps_5_0, ";

pub struct HeuristicEstimator {
    collector: SignalCollector,
    fallback: StaticFallback,
    clock: Arc<dyn Clock>,
    default_cores: u32,
    rng: StdRng,
}

impl HeuristicEstimator {
    pub fn new(collector: SignalCollector, default_cores: u32) -> Self {
        Self::with_parts(
            collector.clone(),
            StaticFallback::new(collector, default_cores),
            Arc::new(SystemClock),
            default_cores,
            StdRng::from_entropy(),
        )
    }

    pub fn with_parts(
        collector: SignalCollector,
        fallback: StaticFallback,
        clock: Arc<dyn Clock>,
        default_cores: u32,
        rng: StdRng,
    ) -> Self {
        Self {
            collector,
            fallback,
            clock,
            default_cores: default_cores.max(1),
            rng,
        }
    }

    fn cpu(&mut self, history: &PerformanceHistory, signals: &BrowserSignals, hour: u32, now_ms: f64) -> CpuMetrics {
        let cores = core_count(signals, self.default_cores);
        match estimate_cpu_usage(history, hour, now_ms, &mut self.rng) {
            Ok(usage) => CpuMetrics::new(format!("{}-Core CPU", cores), usage, cores),
            Err(e) => {
                debug!("CPU 估算失败，使用兜底值: {}", e);
                self.fallback.cpu(signals)
            }
        }
    }

    fn gpu(&mut self, signals: &BrowserSignals, hour: u32, now_ms: f64) -> GpuMetrics {
        let report = match &signals.gpu {
            Some(report) => report,
            None => {
                debug!("{}", Error::CapabilityUnavailable("GPU 渲染上下文".to_string()));
                return GpuMetrics::new("Integrated Graphics", self.rng.gen_range(10.0..35.0));
            }
        };

        let name = clean_gpu_name(report.renderer.as_deref());
        let benchmark_ms = report.benchmark_ms.unwrap_or(0.0);
        match estimate_gpu_usage(benchmark_ms, hour, now_ms, &mut self.rng) {
            Ok(usage) => GpuMetrics::new(name, usage),
            Err(e) => {
                debug!("GPU 估算失败，使用兜底值: {}", e);
                self.fallback.gpu(signals)
            }
        }
    }

    fn ram(&mut self, history: &PerformanceHistory, signals: &BrowserSignals, hour: u32, now_ms: f64) -> RamMetrics {
        let total_mb = device_memory_gb(signals) * 1024.0;
        match estimate_ram_percent(history, hour, now_ms, &mut self.rng) {
            Ok(percent) => RamMetrics::from_percent(total_mb, percent),
            Err(e) => {
                debug!("内存估算失败，使用兜底值: {}", e);
                self.fallback.ram(signals)
            }
        }
    }

    fn network(&mut self, signals: &BrowserSignals, hour: u32, now_ms: f64) -> NetworkMetrics {
        let (name, max_speed) = nominal_network(signals.connection.as_ref());
        let multiplier = network_usage_multiplier(hour, now_ms, &mut self.rng);

        let down = max_speed * multiplier;
        let up = down * self.rng.gen_range(0.1..0.25);
        if !down.is_finite() || !up.is_finite() {
            debug!("网络估算失败，使用兜底值");
            return self.fallback.network(signals);
        }
        NetworkMetrics::new(name, down.max(0.1), up.max(0.05))
    }
}

#[async_trait]
impl MetricSource for HeuristicEstimator {
    fn mode(&self) -> SourceMode {
        SourceMode::HeuristicEstimator
    }

    async fn sample(&mut self) -> Result<MetricSnapshot> {
        let history = self.collector.history().await;
        let signals = self.collector.signals().await;
        let hour = self.clock.local_hour();
        let now_ms = self.clock.now_ms();

        let cpu = self.cpu(&history, &signals, hour, now_ms);
        let gpu = self.gpu(&signals, hour, now_ms);
        let ram = self.ram(&history, &signals, hour, now_ms);
        let network = self.network(&signals, hour, now_ms);

        Ok(MetricSnapshot::new(cpu, gpu, ram, network, SourceMode::HeuristicEstimator))
    }
}

fn finite(value: f64, metric: &str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::Internal(format!("{} 估算结果无效: {}", metric, value)))
    }
}

/// CPU 使用率，结果限制在 [5, 95]
pub fn estimate_cpu_usage<R: Rng>(history: &PerformanceHistory, hour: u32, now_ms: f64, rng: &mut R) -> Result<f64> {
    let mut usage = 15.0;

    // 帧耗时超出 60fps 目标的部分，最多 +40
    if let Some(avg) = history.mean_frame_time() {
        if avg > TARGET_FRAME_TIME_MS {
            let delay = (avg - TARGET_FRAME_TIME_MS) / TARGET_FRAME_TIME_MS;
            usage += (delay * 30.0).min(40.0);
        }
    }

    // 堆内存压力，至少两次采样后才计入，最多 +20
    if history.heap_count() > 1 {
        if let Some(ratio) = history.latest_heap().and_then(|h| h.used_ratio()) {
            usage += ratio.clamp(0.0, 1.0) * 20.0;
        }
    }

    usage *= if (9..=17).contains(&hour) { 1.3 } else { 0.8 };

    usage += (now_ms / 10000.0).sin() * 10.0;
    usage += rng.gen_range(-7.5..=7.5);

    Ok(clamp_range(finite(usage, "CPU")?, 5.0, 95.0))
}

/// GPU 使用率，结果限制在 [3, 85]
pub fn estimate_gpu_usage<R: Rng>(benchmark_ms: f64, hour: u32, now_ms: f64, rng: &mut R) -> Result<f64> {
    let mut usage = 10.0;
    usage += (benchmark_ms.max(0.0) * 0.5).min(20.0);

    if (19..=23).contains(&hour) {
        usage += 15.0;
    }

    usage += (now_ms / 15000.0).sin() * 12.0;
    usage += rng.gen_range(-10.0..=10.0);

    Ok(clamp_range(finite(usage, "GPU")?, 3.0, 85.0))
}

/// 内存使用百分比，结果限制在 [25, 85]
pub fn estimate_ram_percent<R: Rng>(history: &PerformanceHistory, hour: u32, now_ms: f64, rng: &mut R) -> Result<f64> {
    let percent = match history.latest_heap().and_then(|h| h.used_ratio()) {
        Some(ratio) => {
            let mut percent = 30.0 + ratio * 40.0;
            if let Some((previous, latest)) = history.last_two_heaps() {
                if previous.used_bytes > 0.0 {
                    let growth = (latest.used_bytes - previous.used_bytes) / previous.used_bytes;
                    percent += growth * 100.0;
                }
            }
            percent
        }
        None => {
            let base = if (9..=18).contains(&hour) { 55.0 } else { 35.0 };
            base + (now_ms / 30000.0).sin() * 15.0 + rng.gen_range(-5.0..=5.0)
        }
    };

    Ok(clamp_range(finite(percent, "RAM")?, 25.0, 85.0))
}

/// 根据连接类型给出网络名称和名义最大速度 (Mbps)
pub fn nominal_network(connection: Option<&ConnectionInfo>) -> (String, f64) {
    let conn = match connection {
        Some(conn) => conn,
        None => {
            debug!("{}", Error::CapabilityUnavailable("网络连接信息".to_string()));
            return ("WiFi".to_string(), 100.0);
        }
    };

    let (name, mut max_speed) = match conn.effective_type.as_deref() {
        Some("slow-2g") => ("2G (Slow)", 0.5),
        Some("2g") => ("2G", 2.0),
        Some("3g") => ("3G", 10.0),
        Some("4g") => ("4G LTE", 50.0),
        _ => {
            let name = if conn.connection_type.as_deref() == Some("wifi") {
                "WiFi"
            } else {
                "Ethernet"
            };
            (name, 100.0)
        }
    };

    // 实际上报的下行带宽优先
    if let Some(downlink) = conn.downlink {
        if downlink.is_finite() && downlink > 0.0 {
            max_speed = downlink;
        }
    }

    (name.to_string(), max_speed)
}

/// 网络占用系数，结果限制在 [0.05, 0.6]
pub fn network_usage_multiplier<R: Rng>(hour: u32, now_ms: f64, rng: &mut R) -> f64 {
    let mut multiplier = if (19..=23).contains(&hour) {
        0.4
    } else if (9..=17).contains(&hour) {
        0.25
    } else {
        0.1
    };

    multiplier += (now_ms / 20000.0).sin() * 0.2;
    multiplier += rng.gen_range(0.0..0.15);

    clamp_range(multiplier, 0.05, 0.6)
}

/// 清理渲染器名称，去掉 ANGLE 的 D3D11 驱动前缀
pub fn clean_gpu_name(renderer: Option<&str>) -> String {
    let renderer = match renderer.map(str::trim).filter(|r| !r.is_empty()) {
        Some(renderer) => renderer,
        None => return "Unknown GPU".to_string(),
    };

    if renderer.contains("ANGLE") {
        if let Some(pos) = renderer.find(ANGLE_D3D11_PREFIX) {
            let rest = &renderer[pos + ANGLE_D3D11_PREFIX.len()..];
            if !rest.is_empty() {
                return rest.to_string();
            }
        }
    }

    renderer.to_string()
}
