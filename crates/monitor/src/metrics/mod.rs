/// 指标模块
///
/// 数据源能力抽象及其三种实现，以及估算所依赖的性能历史与信号收集

pub mod collector;
pub mod heuristic;
pub mod history;
pub mod native_push;
pub mod source;
pub mod static_fallback;

pub use collector::SignalCollector;
pub use heuristic::HeuristicEstimator;
pub use history::{HeapSample, PerformanceHistory};
pub use native_push::NativePush;
pub use source::{select_polling_source, MetricSource};
pub use static_fallback::StaticFallback;
