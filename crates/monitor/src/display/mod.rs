/// 显示端
///
/// 把快照渲染为 CPU / GPU / 网络 / 内存四个指示器（文字标签 + 进度条宽度）。
/// 每个指示器独立更新，某个显示元素缺失时只跳过该项。

use std::collections::HashMap;

use async_trait::async_trait;
use common::utils::{clamp_percent, format_gb};
use common::{Error, MetricSnapshot, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// 指示器种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    Cpu,
    Gpu,
    Net,
    Ram,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 4] = [Self::Cpu, Self::Gpu, Self::Net, Self::Ram];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Gpu => "gpu",
            Self::Net => "net",
            Self::Ram => "ram",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cpu" => Some(Self::Cpu),
            "gpu" => Some(Self::Gpu),
            "net" | "network" => Some(Self::Net),
            "ram" | "memory" => Some(Self::Ram),
            _ => None,
        }
    }
}

impl std::fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单个指示器的显示内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecIndicator {
    pub kind: IndicatorKind,
    pub label: String,
    /// 进度条宽度 (0-100)
    pub bar_percent: f64,
}

/// 四个指示器的显示内容
#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub indicators: Vec<SpecIndicator>,
}

impl PanelView {
    pub fn from_snapshot(snapshot: &MetricSnapshot) -> Self {
        let cpu = &snapshot.cpu;
        let gpu = &snapshot.gpu;
        let net = &snapshot.network;
        let ram = &snapshot.ram;

        let indicators = vec![
            SpecIndicator {
                kind: IndicatorKind::Cpu,
                label: format!("{}: {:.1}%", cpu.name, cpu.usage_percent),
                bar_percent: clamp_percent(cpu.usage_percent),
            },
            SpecIndicator {
                kind: IndicatorKind::Gpu,
                label: format!("{}: {:.1}%", gpu.name, gpu.usage_percent),
                bar_percent: clamp_percent(gpu.usage_percent),
            },
            SpecIndicator {
                kind: IndicatorKind::Net,
                label: format!(
                    "{}: ↓{:.1} ↑{:.1} Mb/s",
                    net.name, net.down_speed_mbps, net.up_speed_mbps
                ),
                bar_percent: clamp_percent((net.down_speed_mbps + net.up_speed_mbps) / 2.0),
            },
            SpecIndicator {
                kind: IndicatorKind::Ram,
                label: format!(
                    "{}/{} ({:.1}%)",
                    format_gb(ram.used_mb),
                    format_gb(ram.total_mb),
                    ram.usage_percent
                ),
                bar_percent: clamp_percent(ram.usage_percent),
            },
        ];

        Self { indicators }
    }
}

/// 显示端：接收快照并更新界面，不向调用方报错
#[async_trait]
pub trait DisplaySink: Send {
    async fn render(&mut self, snapshot: &MetricSnapshot);
}

/// 单个显示元素
#[async_trait]
pub trait Indicator: Send + Sync {
    async fn update(&self, indicator: &SpecIndicator) -> Result<()>;
}

/// 按指示器种类挂载显示元素的面板
#[derive(Default)]
pub struct PanelSink {
    targets: HashMap<IndicatorKind, Box<dyn Indicator>>,
}

impl PanelSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 挂载显示元素
    pub fn attach(&mut self, kind: IndicatorKind, target: Box<dyn Indicator>) {
        self.targets.insert(kind, target);
    }

    pub fn with_target(mut self, kind: IndicatorKind, target: Box<dyn Indicator>) -> Self {
        self.attach(kind, target);
        self
    }

    /// 更新各指示器，返回成功更新的数量
    pub async fn apply(&self, view: &PanelView) -> usize {
        let mut updated = 0;
        for indicator in &view.indicators {
            let result = match self.targets.get(&indicator.kind) {
                Some(target) => target.update(indicator).await,
                None => Err(Error::Render(format!("缺少显示元素: {}", indicator.kind))),
            };

            match result {
                Ok(()) => updated += 1,
                Err(e) => warn!("跳过指示器 {}: {}", indicator.kind, e),
            }
        }
        updated
    }
}

#[async_trait]
impl DisplaySink for PanelSink {
    async fn render(&mut self, snapshot: &MetricSnapshot) {
        let view = PanelView::from_snapshot(snapshot);
        let updated = self.apply(&view).await;
        debug!("✅ 指标已更新 {}/{} ({})", updated, view.indicators.len(), snapshot.source);
    }
}
