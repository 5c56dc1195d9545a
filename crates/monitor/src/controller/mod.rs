/// 监控控制器
///
/// 持有当前数据源，决定使用宿主推送还是浏览器估算，并把快照转发给显示端。
///
/// 状态流转：
/// - Uninitialized -> AwaitingPush：检测到宿主，启动推送等待超时
/// - AwaitingPush -> PushActive：超时前收到有效推送
/// - AwaitingPush -> PollingHeuristic：超时，或首个推送解析失败
/// - Uninitialized -> PollingHeuristic：未检测到宿主
/// - PollingHeuristic -> PushActive：轮询期间收到有效推送
/// - 任意状态 -> Uninitialized：stop
///
/// 所有事件在同一个队列中串行处理，定时器只负责投递事件。

pub mod timer;

use std::time::Duration;

use common::{Error, MetricSnapshot, Result};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::display::DisplaySink;
use crate::environment::EnvironmentProbe;
use crate::metrics::{MetricSource, NativePush};
use timer::{spawn_interval, spawn_timeout, TimerHandle};

/// 控制器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    Uninitialized,
    AwaitingPush,
    PollingHeuristic,
    PushActive,
}

/// 控制器事件
pub enum ControllerEvent {
    Start,
    /// 宿主推送，ack 用于回报解析结果
    Push {
        raw: String,
        ack: Option<oneshot::Sender<Result<()>>>,
    },
    PushTimeout {
        epoch: u64,
    },
    PollTick {
        epoch: u64,
    },
    Stop,
    Shutdown,
}

/// 控制器定时参数
#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    pub poll_interval: Duration,
    pub push_timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use common::models::constants::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_PUSH_TIMEOUT_MS};
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            push_timeout: Duration::from_millis(DEFAULT_PUSH_TIMEOUT_MS),
        }
    }
}

/// 控制器句柄，可在其他任务中投递推送或停止控制器
#[derive(Clone)]
pub struct ControllerHandle {
    tx: mpsc::UnboundedSender<ControllerEvent>,
    state: watch::Receiver<ControllerState>,
}

impl ControllerHandle {
    fn send(&self, event: ControllerEvent) -> Result<()> {
        self.tx
            .send(event)
            .map_err(|_| Error::Internal("控制器已退出".to_string()))
    }

    /// 投递推送数据并等待解析结果
    pub async fn push(&self, raw: impl Into<String>) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(ControllerEvent::Push {
            raw: raw.into(),
            ack: Some(tx),
        })?;
        rx.await
            .map_err(|_| Error::Internal("控制器未回报推送结果".to_string()))?
    }

    pub fn start(&self) -> Result<()> {
        self.send(ControllerEvent::Start)
    }

    pub fn stop(&self) -> Result<()> {
        self.send(ControllerEvent::Stop)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(ControllerEvent::Shutdown)
    }

    /// 当前状态
    pub fn state(&self) -> ControllerState {
        *self.state.borrow()
    }
}

pub struct MonitorController {
    config: ControllerConfig,
    probe: EnvironmentProbe,
    native: NativePush,
    polling: Box<dyn MetricSource>,
    sink: Box<dyn DisplaySink>,
    state: ControllerState,
    state_tx: watch::Sender<ControllerState>,
    events: mpsc::UnboundedSender<ControllerEvent>,
    push_timer: Option<TimerHandle>,
    poll_timer: Option<TimerHandle>,
    /// 每次 start/stop 递增，旧定时器投递的事件据此丢弃
    epoch: u64,
}

impl MonitorController {
    /// 创建控制器，返回事件接收端，交给 [`MonitorController::run`]
    pub fn new(
        config: ControllerConfig,
        probe: EnvironmentProbe,
        native: NativePush,
        polling: Box<dyn MetricSource>,
        sink: Box<dyn DisplaySink>,
    ) -> (Self, mpsc::UnboundedReceiver<ControllerEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(ControllerState::Uninitialized);

        let controller = Self {
            config,
            probe,
            native,
            polling,
            sink,
            state: ControllerState::Uninitialized,
            state_tx,
            events,
            push_timer: None,
            poll_timer: None,
            epoch: 0,
        };

        (controller, rx)
    }

    pub fn handle(&self) -> ControllerHandle {
        ControllerHandle {
            tx: self.events.clone(),
            state: self.state_tx.subscribe(),
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// 最近一次宿主推送的快照
    pub fn latest_push(&self) -> Option<&MetricSnapshot> {
        self.native.latest()
    }

    /// 启动并串行处理事件，直到收到 Shutdown
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<ControllerEvent>) {
        self.start().await;

        while let Some(event) = rx.recv().await {
            if !self.handle_event(event).await {
                break;
            }
        }

        self.stop();
        info!("监控控制器已退出");
    }

    /// 处理一个事件，返回 false 表示应当退出
    pub async fn handle_event(&mut self, event: ControllerEvent) -> bool {
        match event {
            ControllerEvent::Start => self.start().await,
            ControllerEvent::Push { raw, ack } => {
                let result = self.on_push(&raw).await;
                if let Some(ack) = ack {
                    let _ = ack.send(result);
                }
            }
            ControllerEvent::PushTimeout { epoch } => self.on_push_timeout(epoch).await,
            ControllerEvent::PollTick { epoch } => self.on_poll_tick(epoch).await,
            ControllerEvent::Stop => self.stop(),
            ControllerEvent::Shutdown => return false,
        }
        true
    }

    /// 探测环境并进入等待推送或轮询状态
    pub async fn start(&mut self) {
        if self.state != ControllerState::Uninitialized {
            debug!("控制器已在运行: {:?}", self.state);
            return;
        }
        self.epoch += 1;

        if self.probe.push_capable() {
            info!(
                "✅ 检测到宿主，等待推送数据 ({}ms)",
                self.config.push_timeout.as_millis()
            );
            self.set_state(ControllerState::AwaitingPush);
            self.push_timer = Some(spawn_timeout(
                self.config.push_timeout,
                self.events.clone(),
                ControllerEvent::PushTimeout { epoch: self.epoch },
            ));
        } else {
            info!("🌐 未检测到宿主，使用浏览器估算");
            self.enter_polling().await;
        }
    }

    /// 取消全部定时器并回到初始状态
    pub fn stop(&mut self) {
        self.cancel_push_timer();
        self.cancel_poll_timer();
        self.epoch += 1;
        if self.state != ControllerState::Uninitialized {
            info!("🛑 监控已停止");
        }
        self.set_state(ControllerState::Uninitialized);
    }

    /// 处理宿主推送
    pub async fn on_push(&mut self, raw: &str) -> Result<()> {
        if self.state == ControllerState::Uninitialized {
            debug!("控制器未启动，忽略推送");
            return Err(Error::Internal("控制器未启动".to_string()));
        }

        match self.native.receive(raw) {
            Ok(snapshot) => {
                if self.state != ControllerState::PushActive {
                    info!("✅ 收到宿主推送，切换到推送模式");
                    self.cancel_push_timer();
                    self.cancel_poll_timer();
                    self.set_state(ControllerState::PushActive);
                }
                self.sink.render(&snapshot).await;
                Ok(())
            }
            Err(e) => {
                if self.state == ControllerState::AwaitingPush && !self.native.has_received() {
                    warn!("⚠️ 首个推送无法解析，回退到浏览器估算");
                    self.enter_polling().await;
                }
                Err(e)
            }
        }
    }

    /// 推送等待超时；重复或过期的超时事件直接忽略
    pub async fn on_push_timeout(&mut self, epoch: u64) {
        if epoch != self.epoch || self.state != ControllerState::AwaitingPush {
            debug!("忽略过期的推送超时事件");
            return;
        }
        warn!(
            "⚠️ {}ms 内未收到宿主推送，回退到浏览器估算",
            self.config.push_timeout.as_millis()
        );
        self.enter_polling().await;
    }

    /// 轮询周期到达
    pub async fn on_poll_tick(&mut self, epoch: u64) {
        if epoch != self.epoch || self.state != ControllerState::PollingHeuristic {
            debug!("忽略过期的轮询事件");
            return;
        }
        self.poll_once().await;
    }

    /// 进入轮询状态：立即采样一次，再按固定间隔采样
    async fn enter_polling(&mut self) {
        self.cancel_push_timer();
        self.set_state(ControllerState::PollingHeuristic);

        self.poll_once().await;

        let epoch = self.epoch;
        self.poll_timer = Some(spawn_interval(
            self.config.poll_interval,
            self.events.clone(),
            move || ControllerEvent::PollTick { epoch },
        ));
    }

    async fn poll_once(&mut self) {
        match self.polling.sample().await {
            Ok(snapshot) => self.sink.render(&snapshot).await,
            Err(e) => warn!("采样失败 ({}): {}", self.polling.mode(), e),
        }
    }

    fn cancel_push_timer(&mut self) {
        if let Some(timer) = self.push_timer.take() {
            timer.cancel();
        }
    }

    fn cancel_poll_timer(&mut self) {
        if let Some(timer) = self.poll_timer.take() {
            timer.cancel();
        }
    }

    fn set_state(&mut self, state: ControllerState) {
        if self.state != state {
            debug!("控制器状态: {:?} -> {:?}", self.state, state);
        }
        self.state = state;
        self.state_tx.send_replace(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{select_polling_source, SignalCollector};
    use async_trait::async_trait;
    use common::SourceMode;
    use std::sync::{Arc, Mutex};

    const SAMPLE: &str = r#"{"NameCpu":"X","CurrentCpu":42.3,"NameGpu":"Y","CurrentGpu3D":10,
        "NameNetCard":"Z","CurrentNetDown":1048576,"CurrentNetUp":131072,
        "TotalRam":16384,"CurrentRamAvail":8192}"#;

    #[derive(Clone, Default)]
    struct RecordingSink(Arc<Mutex<Vec<MetricSnapshot>>>);

    impl RecordingSink {
        fn sources(&self) -> Vec<SourceMode> {
            self.0.lock().unwrap().iter().map(|s| s.source).collect()
        }

        fn len(&self) -> usize {
            self.0.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl DisplaySink for RecordingSink {
        async fn render(&mut self, snapshot: &MetricSnapshot) {
            self.0.lock().unwrap().push(snapshot.clone());
        }
    }

    fn controller(
        push_host: bool,
    ) -> (MonitorController, mpsc::UnboundedReceiver<ControllerEvent>, RecordingSink) {
        let sink = RecordingSink::default();
        let (controller, rx) = MonitorController::new(
            ControllerConfig::default(),
            EnvironmentProbe::new(Some(push_host), None),
            NativePush::new(4),
            select_polling_source(true, SignalCollector::new(), 4),
            Box::new(sink.clone()),
        );
        (controller, rx, sink)
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_host_polls_immediately() {
        let (mut controller, _rx, sink) = controller(false);
        controller.start().await;

        assert_eq!(controller.state(), ControllerState::PollingHeuristic);
        assert_eq!(sink.sources(), vec![SourceMode::HeuristicEstimator]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_interval_through_run_loop() {
        let (controller, rx, sink) = controller(false);
        let handle = controller.handle();
        let task = tokio::spawn(controller.run(rx));

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(handle.state(), ControllerState::PollingHeuristic);
        // 立即采样一次 + 1s/2s/3s 各一次
        assert_eq!(sink.len(), 4);

        handle.shutdown().unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_before_timeout_cancels_fallback() {
        let (mut controller, _rx, sink) = controller(true);
        controller.start().await;
        assert_eq!(controller.state(), ControllerState::AwaitingPush);
        assert_eq!(sink.len(), 0);

        controller.on_push(SAMPLE).await.unwrap();
        assert_eq!(controller.state(), ControllerState::PushActive);
        assert!(controller.push_timer.is_none());

        // 冗余的超时和轮询事件都不产生影响
        let epoch = controller.epoch;
        controller.on_push_timeout(epoch).await;
        controller.on_push_timeout(epoch).await;
        controller.on_poll_tick(epoch).await;

        assert_eq!(controller.state(), ControllerState::PushActive);
        assert_eq!(sink.sources(), vec![SourceMode::NativePush]);
        assert_eq!(controller.latest_push().unwrap().network.down_speed_mbps, 8.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_through_run_loop_never_emits_heuristic() {
        let (controller, rx, sink) = controller(true);
        let handle = controller.handle();
        let task = tokio::spawn(controller.run(rx));

        tokio::time::sleep(Duration::from_millis(1000)).await;
        handle.push(SAMPLE).await.unwrap();
        assert_eq!(handle.state(), ControllerState::PushActive);

        tokio::time::sleep(Duration::from_millis(10_000)).await;
        handle.push(SAMPLE).await.unwrap();

        assert_eq!(sink.sources(), vec![SourceMode::NativePush, SourceMode::NativePush]);

        handle.shutdown().unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back_once() {
        let (mut controller, _rx, sink) = controller(true);
        controller.start().await;
        let epoch = controller.epoch;

        controller.on_push_timeout(epoch).await;
        assert_eq!(controller.state(), ControllerState::PollingHeuristic);
        assert_eq!(sink.len(), 1);

        controller.on_push_timeout(epoch).await;
        assert_eq!(controller.state(), ControllerState::PollingHeuristic);
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_through_run_loop() {
        let (controller, rx, sink) = controller(true);
        let handle = controller.handle();
        let task = tokio::spawn(controller.run(rx));

        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert_eq!(handle.state(), ControllerState::AwaitingPush);
        assert_eq!(sink.len(), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(handle.state(), ControllerState::PollingHeuristic);
        assert_eq!(sink.sources(), vec![SourceMode::HeuristicEstimator]);

        handle.shutdown().unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_first_push_falls_back() {
        let (mut controller, _rx, sink) = controller(true);
        controller.start().await;

        let err = controller.on_push("{\"NameCpu\":\"X\"}").await.unwrap_err();
        assert!(err.is_parse());
        assert_eq!(controller.state(), ControllerState::PollingHeuristic);
        assert_eq!(sink.sources(), vec![SourceMode::HeuristicEstimator]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_push_after_success_is_ignored() {
        let (mut controller, _rx, sink) = controller(true);
        controller.start().await;
        controller.on_push(SAMPLE).await.unwrap();

        assert!(controller.on_push("garbage").await.is_err());
        assert_eq!(controller.state(), ControllerState::PushActive);
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_reactivates_from_polling() {
        let (mut controller, _rx, sink) = controller(false);
        controller.start().await;
        let epoch = controller.epoch;

        controller.on_push(SAMPLE).await.unwrap();
        assert_eq!(controller.state(), ControllerState::PushActive);
        assert!(controller.poll_timer.is_none());

        controller.on_poll_tick(epoch).await;
        assert_eq!(
            sink.sources(),
            vec![SourceMode::HeuristicEstimator, SourceMode::NativePush]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_polling() {
        let (controller, rx, sink) = controller(false);
        let handle = controller.handle();
        let task = tokio::spawn(controller.run(rx));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(sink.len(), 2);

        handle.stop().unwrap();
        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert_eq!(handle.state(), ControllerState::Uninitialized);
        assert_eq!(sink.len(), 2);

        // 停止后推送被拒绝
        assert!(handle.push(SAMPLE).await.is_err());

        // 可以重新启动
        handle.start().unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.state(), ControllerState::PollingHeuristic);
        assert_eq!(sink.len(), 3);

        handle.shutdown().unwrap();
        task.await.unwrap();
        assert!(handle.push(SAMPLE).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_tick_after_stop_is_ignored() {
        let (mut controller, _rx, sink) = controller(false);
        controller.start().await;
        let epoch = controller.epoch;

        controller.stop();
        controller.on_poll_tick(epoch).await;
        assert_eq!(sink.len(), 1);

        controller.start().await;
        controller.on_poll_tick(epoch).await;
        assert_eq!(sink.len(), 2);
    }
}
