/// 页面显示端
///
/// 指示器更新通过 WebSocket 广播给所有页面连接，同时记录最近一次快照和监控指标

use std::sync::Arc;

use async_trait::async_trait;
use common::{MetricSnapshot, Result};
use monitor::{DisplaySink, Indicator, IndicatorKind, PanelSink, SpecIndicator};
use tokio::sync::RwLock;
use tracing::debug;

use crate::telemetry::Telemetry;
use crate::ws::{FrontendConnectionManager, FrontendMessage};

/// 页面上的单个指示器，更新即广播
pub struct ChannelIndicator {
    manager: FrontendConnectionManager,
}

impl ChannelIndicator {
    pub fn new(manager: FrontendConnectionManager) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Indicator for ChannelIndicator {
    async fn update(&self, indicator: &SpecIndicator) -> Result<()> {
        let sent = self.manager.broadcast(FrontendMessage::from(indicator)).await;
        debug!("指示器 {} 已发送到 {} 个页面", indicator.kind, sent);
        Ok(())
    }
}

/// 为可见的指示器挂载显示元素，隐藏的指示器不挂载
pub fn build_panel(manager: &FrontendConnectionManager, hidden: &[IndicatorKind]) -> PanelSink {
    let mut panel = PanelSink::new();
    for kind in IndicatorKind::ALL {
        if !hidden.contains(&kind) {
            panel.attach(kind, Box::new(ChannelIndicator::new(manager.clone())));
        }
    }
    panel
}

/// 壁纸页面显示端
pub struct WallpaperSink {
    panel: PanelSink,
    latest: Arc<RwLock<Option<MetricSnapshot>>>,
    telemetry: Telemetry,
}

impl WallpaperSink {
    pub fn new(
        panel: PanelSink,
        latest: Arc<RwLock<Option<MetricSnapshot>>>,
        telemetry: Telemetry,
    ) -> Self {
        Self {
            panel,
            latest,
            telemetry,
        }
    }
}

#[async_trait]
impl DisplaySink for WallpaperSink {
    async fn render(&mut self, snapshot: &MetricSnapshot) {
        *self.latest.write().await = Some(snapshot.clone());
        self.telemetry.observe_snapshot(snapshot);
        self.panel.render(snapshot).await;
    }
}
