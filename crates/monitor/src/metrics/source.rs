/// 指标数据源
///
/// 三种实现：宿主推送、启发式估算、静态随机模拟，构造时选定

use async_trait::async_trait;
use common::{MetricSnapshot, Result, SourceMode};
use tracing::info;

use super::collector::SignalCollector;
use super::heuristic::HeuristicEstimator;
use super::static_fallback::StaticFallback;

/// 指标数据源能力
#[async_trait]
pub trait MetricSource: Send {
    /// 数据源模式
    fn mode(&self) -> SourceMode;

    /// 生成一份快照
    ///
    /// 估算类数据源内部出错时以兜底值替代，不向外返回错误
    async fn sample(&mut self) -> Result<MetricSnapshot>;
}

/// 选择轮询使用的数据源：启发式估算被禁用时退回静态模拟
pub fn select_polling_source(
    heuristic_enabled: bool,
    collector: SignalCollector,
    default_cores: u32,
) -> Box<dyn MetricSource> {
    if heuristic_enabled {
        info!("🌐 轮询数据源: 启发式估算");
        Box::new(HeuristicEstimator::new(collector, default_cores))
    } else {
        info!("🎲 轮询数据源: 静态模拟");
        Box::new(StaticFallback::new(collector, default_cores))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_select_polling_source() {
        let collector = SignalCollector::new();

        let mut source = select_polling_source(true, collector.clone(), 4);
        assert_eq!(source.mode(), SourceMode::HeuristicEstimator);
        assert_eq!(source.sample().await.unwrap().source, SourceMode::HeuristicEstimator);

        let mut source = select_polling_source(false, collector, 4);
        assert_eq!(source.mode(), SourceMode::StaticFallback);
        assert_eq!(source.sample().await.unwrap().source, SourceMode::StaticFallback);
    }
}
