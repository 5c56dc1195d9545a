/// Prometheus 指标

use common::{MetricSnapshot, SourceMode};
use prometheus::{Encoder, Gauge, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

const PUSH_ACCEPTED: &str = "accepted";
const PUSH_REJECTED: &str = "rejected";

/// 最近一次渲染的快照、当前数据源和推送计数
#[derive(Clone)]
pub struct Telemetry {
    registry: Registry,
    cpu_usage: Gauge,
    gpu_usage: Gauge,
    ram_usage: Gauge,
    net_down: Gauge,
    net_up: Gauge,
    source_mode: IntGaugeVec,
    push_payloads: IntCounterVec,
}

impl Telemetry {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("wallpaper".to_string()), None)?;

        let cpu_usage = Gauge::new("cpu_usage_percent", "最近一次显示的 CPU 使用率")?;
        let gpu_usage = Gauge::new("gpu_usage_percent", "最近一次显示的 GPU 使用率")?;
        let ram_usage = Gauge::new("ram_usage_percent", "最近一次显示的内存使用率")?;
        let net_down = Gauge::new("network_down_mbps", "最近一次显示的下行速度")?;
        let net_up = Gauge::new("network_up_mbps", "最近一次显示的上行速度")?;
        let source_mode = IntGaugeVec::new(
            Opts::new("source_mode", "当前数据源，取值为 1 的标签有效"),
            &["mode"],
        )?;
        let push_payloads = IntCounterVec::new(
            Opts::new("push_payloads_total", "宿主推送数据计数"),
            &["result"],
        )?;

        registry.register(Box::new(cpu_usage.clone()))?;
        registry.register(Box::new(gpu_usage.clone()))?;
        registry.register(Box::new(ram_usage.clone()))?;
        registry.register(Box::new(net_down.clone()))?;
        registry.register(Box::new(net_up.clone()))?;
        registry.register(Box::new(source_mode.clone()))?;
        registry.register(Box::new(push_payloads.clone()))?;

        Ok(Self {
            registry,
            cpu_usage,
            gpu_usage,
            ram_usage,
            net_down,
            net_up,
            source_mode,
            push_payloads,
        })
    }

    pub fn observe_snapshot(&self, snapshot: &MetricSnapshot) {
        self.cpu_usage.set(snapshot.cpu.usage_percent);
        self.gpu_usage.set(snapshot.gpu.usage_percent);
        self.ram_usage.set(snapshot.ram.usage_percent);
        self.net_down.set(snapshot.network.down_speed_mbps);
        self.net_up.set(snapshot.network.up_speed_mbps);

        for mode in [
            SourceMode::NativePush,
            SourceMode::HeuristicEstimator,
            SourceMode::StaticFallback,
        ] {
            let active = i64::from(mode == snapshot.source);
            self.source_mode.with_label_values(&[mode.as_str()]).set(active);
        }
    }

    pub fn record_push(&self, accepted: bool) {
        let result = if accepted { PUSH_ACCEPTED } else { PUSH_REJECTED };
        self.push_payloads.with_label_values(&[result]).inc();
    }

    pub fn push_count(&self, accepted: bool) -> u64 {
        let result = if accepted { PUSH_ACCEPTED } else { PUSH_REJECTED };
        self.push_payloads.with_label_values(&[result]).get()
    }

    /// 文本格式导出
    pub fn encode(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
