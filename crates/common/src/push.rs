/// 宿主推送数据格式
///
/// 桌面壁纸宿主以扁平 JSON 对象推送真实遥测数据，字段名沿用宿主的命名

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::models::{CpuMetrics, GpuMetrics, MetricSnapshot, NetworkMetrics, RamMetrics, SourceMode};
use crate::utils::bytes_per_sec_to_mbps;

/// 推送负载
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushPayload {
    #[serde(rename = "NameCpu")]
    pub name_cpu: String,

    /// CPU 使用率 (0-100)
    #[serde(rename = "CurrentCpu")]
    pub current_cpu: f64,

    #[serde(rename = "NameGpu")]
    pub name_gpu: String,

    /// GPU 3D 使用率 (0-100)，可缺省
    #[serde(rename = "CurrentGpu3D", default)]
    pub current_gpu_3d: f64,

    #[serde(rename = "NameNetCard")]
    pub name_net_card: String,

    /// 下行速度（字节/秒）
    #[serde(rename = "CurrentNetDown")]
    pub current_net_down: f64,

    /// 上行速度（字节/秒）
    #[serde(rename = "CurrentNetUp")]
    pub current_net_up: f64,

    /// 内存总量 (MB)
    #[serde(rename = "TotalRam")]
    pub total_ram: f64,

    /// 可用内存 (MB)
    #[serde(rename = "CurrentRamAvail")]
    pub current_ram_avail: f64,
}

impl PushPayload {
    /// 从 JSON 字符串解析，任何格式问题都归为解析错误
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::Parse(format!("推送数据格式错误: {}", e)))
    }

    /// 转换为指标快照
    ///
    /// 推送数据不带核心数，由调用方给出
    pub fn into_snapshot(self, core_count: u32) -> MetricSnapshot {
        let cpu = CpuMetrics::new(self.name_cpu, self.current_cpu, core_count);
        let gpu = GpuMetrics::new(self.name_gpu, self.current_gpu_3d);
        let ram = RamMetrics::from_available(self.total_ram, self.current_ram_avail);
        let network = NetworkMetrics::new(
            self.name_net_card,
            bytes_per_sec_to_mbps(self.current_net_down),
            bytes_per_sec_to_mbps(self.current_net_up),
        );

        MetricSnapshot::new(cpu, gpu, ram, network, SourceMode::NativePush)
    }
}
