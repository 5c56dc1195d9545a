/// 系统指标监控
///
/// 在宿主推送、浏览器估算和随机模拟之间选择数据源，按固定节奏把快照交给显示端

pub mod config;
pub mod controller;
pub mod display;
pub mod environment;
pub mod metrics;
pub mod wallpaper;

pub use config::Config;
pub use controller::{ControllerConfig, ControllerHandle, ControllerState, MonitorController};
pub use display::{DisplaySink, Indicator, IndicatorKind, PanelSink, PanelView, SpecIndicator};
pub use environment::{Clock, EnvironmentProbe, SystemClock};
