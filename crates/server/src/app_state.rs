/// 应用全局状态

use std::sync::Arc;

use common::MetricSnapshot;
use monitor::controller::ControllerEvent;
use monitor::metrics::{select_polling_source, NativePush, SignalCollector};
use monitor::wallpaper::WallpaperSchedule;
use monitor::{
    Clock, ControllerHandle, IndicatorKind, MonitorController, PanelView, SpecIndicator, SystemClock,
};
use tokio::sync::{mpsc, RwLock};

use crate::display::{build_panel, WallpaperSink};
use crate::telemetry::Telemetry;
use crate::ws::FrontendConnectionManager;

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    /// 监控控制器句柄
    pub controller: ControllerHandle,
    /// 页面 WebSocket 连接管理器
    pub frontend_manager: FrontendConnectionManager,
    /// 页面上报的性能信号
    pub collector: SignalCollector,
    /// 最近一次渲染的快照
    pub latest: Arc<RwLock<Option<MetricSnapshot>>>,
    pub telemetry: Telemetry,
    pub schedule: Arc<RwLock<WallpaperSchedule>>,
    pub clock: Arc<dyn Clock>,
    hidden: Arc<Vec<IndicatorKind>>,
}

impl AppState {
    /// 组装控制器及其显示端，返回的控制器需要交给 `run` 运行
    pub fn build(
        cfg: &monitor::Config,
    ) -> anyhow::Result<(Self, MonitorController, mpsc::UnboundedReceiver<ControllerEvent>)> {
        let frontend_manager = FrontendConnectionManager::new();
        let collector = SignalCollector::new();
        let latest = Arc::new(RwLock::new(None));
        let telemetry = Telemetry::new()?;

        let sink = WallpaperSink::new(
            build_panel(&frontend_manager, &cfg.hidden_indicators),
            latest.clone(),
            telemetry.clone(),
        );

        let (controller, rx) = MonitorController::new(
            cfg.controller_config(),
            cfg.probe(),
            NativePush::new(cfg.default_cpu_cores),
            select_polling_source(cfg.heuristic_enabled, collector.clone(), cfg.default_cpu_cores),
            Box::new(sink),
        );

        let state = Self {
            controller: controller.handle(),
            frontend_manager,
            collector,
            latest,
            telemetry,
            schedule: Arc::new(RwLock::new(WallpaperSchedule::new())),
            clock: Arc::new(SystemClock),
            hidden: Arc::new(cfg.hidden_indicators.clone()),
        };

        Ok((state, controller, rx))
    }

    pub fn controller(&self) -> ControllerHandle {
        self.controller.clone()
    }

    pub fn frontend_manager(&self) -> FrontendConnectionManager {
        self.frontend_manager.clone()
    }

    pub fn collector(&self) -> SignalCollector {
        self.collector.clone()
    }

    pub async fn latest_snapshot(&self) -> Option<MetricSnapshot> {
        self.latest.read().await.clone()
    }

    /// 快照对应的可见指示器
    pub fn visible_indicators(&self, snapshot: &MetricSnapshot) -> Vec<SpecIndicator> {
        PanelView::from_snapshot(snapshot)
            .indicators
            .into_iter()
            .filter(|indicator| !self.hidden.contains(&indicator.kind))
            .collect()
    }
}
