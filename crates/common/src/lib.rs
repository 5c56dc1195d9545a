/// Daily Wallpaper - 公共库
/// 
/// 提供 monitor 与 server 共享的指标模型、推送数据格式、错误处理、工具函数等

pub mod errors;
pub mod models;
pub mod push;
pub mod utils;

// 重新导出常用类型
pub use errors::{Error, Result};
pub use models::{
    BrowserSignals, ConnectionInfo, CpuMetrics, GpuMetrics, GpuProbeReport, MetricSnapshot,
    NetworkMetrics, RamMetrics, SourceMode,
};
pub use push::PushPayload;
