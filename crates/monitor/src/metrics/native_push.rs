/// 宿主推送数据源
///
/// 不做计算，只解析宿主推送的负载并保存最近一次结果

use async_trait::async_trait;
use common::{Error, MetricSnapshot, PushPayload, Result, SourceMode};
use tracing::{debug, warn};

use super::source::MetricSource;

pub struct NativePush {
    latest: Option<MetricSnapshot>,
    /// 推送数据不含核心数，使用该值填充
    core_count: u32,
}

impl NativePush {
    pub fn new(core_count: u32) -> Self {
        Self {
            latest: None,
            core_count,
        }
    }

    /// 接收一次推送，解析失败时保留之前的快照
    pub fn receive(&mut self, raw: &str) -> Result<MetricSnapshot> {
        let payload = PushPayload::from_json(raw).map_err(|e| {
            warn!("❌ 推送数据解析失败: {}", e);
            e
        })?;

        let snapshot = payload.into_snapshot(self.core_count);
        debug!(
            "收到宿主推送: cpu={:.1}% gpu={:.1}% ram={:.1}%",
            snapshot.cpu.usage_percent, snapshot.gpu.usage_percent, snapshot.ram.usage_percent
        );
        self.latest = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// 最近一次成功解析的快照
    pub fn latest(&self) -> Option<&MetricSnapshot> {
        self.latest.as_ref()
    }

    /// 是否曾成功接收过推送
    pub fn has_received(&self) -> bool {
        self.latest.is_some()
    }
}

#[async_trait]
impl MetricSource for NativePush {
    fn mode(&self) -> SourceMode {
        SourceMode::NativePush
    }

    async fn sample(&mut self) -> Result<MetricSnapshot> {
        self.latest
            .clone()
            .ok_or_else(|| Error::Parse("尚未收到宿主推送数据".to_string()))
    }
}
