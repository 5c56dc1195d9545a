/// 信号收集器
///
/// 被动接收页面上报的帧耗时、堆内存快照和能力信号，供启发式估算读取

use std::sync::Arc;

use common::models::BrowserSignals;
use tokio::sync::RwLock;
use tracing::debug;

use super::history::{HeapSample, PerformanceHistory};

#[derive(Clone, Default)]
pub struct SignalCollector {
    history: Arc<RwLock<PerformanceHistory>>,
    signals: Arc<RwLock<BrowserSignals>>,
    /// 上一帧回调的时间戳（毫秒）
    last_frame_at: Arc<RwLock<Option<f64>>>,
}

impl SignalCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一帧耗时
    pub async fn record_frame(&self, duration_ms: f64) {
        self.history.write().await.record_frame(duration_ms);
    }

    /// 批量记录帧耗时
    pub async fn record_frames(&self, durations_ms: &[f64]) {
        let mut history = self.history.write().await;
        for duration in durations_ms {
            history.record_frame(*duration);
        }
        debug!("记录 {} 个帧耗时样本", durations_ms.len());
    }

    /// 帧回调：根据与上一帧的时间差记录帧耗时
    pub async fn on_frame(&self, now_ms: f64) {
        let mut last = self.last_frame_at.write().await;
        if let Some(previous) = *last {
            self.history.write().await.record_frame(now_ms - previous);
        }
        *last = Some(now_ms);
    }

    /// 记录堆内存快照
    pub async fn record_heap(&self, sample: HeapSample) {
        self.history.write().await.record_heap(sample);
    }

    /// 合并能力信号，只覆盖本次上报中存在的字段
    pub async fn update_signals(&self, update: BrowserSignals) {
        let mut signals = self.signals.write().await;
        if update.hardware_concurrency.is_some() {
            signals.hardware_concurrency = update.hardware_concurrency;
        }
        if update.device_memory_gb.is_some() {
            signals.device_memory_gb = update.device_memory_gb;
        }
        if update.connection.is_some() {
            signals.connection = update.connection;
        }
        if update.gpu.is_some() {
            signals.gpu = update.gpu;
        }
    }

    /// 当前能力信号（克隆）
    pub async fn signals(&self) -> BrowserSignals {
        self.signals.read().await.clone()
    }

    /// 当前性能历史（克隆）
    pub async fn history(&self) -> PerformanceHistory {
        self.history.read().await.clone()
    }
}
