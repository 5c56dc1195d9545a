/// 可取消的定时器
///
/// 定时器以独立任务运行，到期后向控制器事件队列投递事件。
/// 句柄被取消或被丢弃时定时器立即失效。

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug)]
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    fn new() -> (Self, CancellationToken) {
        let token = CancellationToken::new();
        let child = token.child_token();
        (Self { token }, child)
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// 延迟 `delay` 后投递一次事件
pub fn spawn_timeout<E>(delay: Duration, tx: mpsc::UnboundedSender<E>, event: E) -> TimerHandle
where
    E: Send + 'static,
{
    let (handle, token) = TimerHandle::new();
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {
                debug!("超时定时器已取消");
            }
            _ = tokio::time::sleep(delay) => {
                let _ = tx.send(event);
            }
        }
    });
    handle
}

/// 每隔 `period` 投递一次事件，第一次在一个周期之后
pub fn spawn_interval<E, F>(period: Duration, tx: mpsc::UnboundedSender<E>, make_event: F) -> TimerHandle
where
    E: Send + 'static,
    F: Fn() -> E + Send + 'static,
{
    let (handle, token) = TimerHandle::new();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("轮询定时器已取消");
                    break;
                }
                _ = interval.tick() => {
                    if tx.send(make_event()).is_err() {
                        break;
                    }
                }
            }
        }
    });
    handle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fires_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = spawn_timeout(Duration::from_millis(3000), tx, 7u32);

        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(rx.try_recv().unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timeout_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = spawn_timeout(Duration::from_millis(100), tx, ());
        handle.cancel();
        assert!(handle.is_cancelled());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_stops_on_drop() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = spawn_interval(Duration::from_millis(1000), tx, || ());

        tokio::time::sleep(Duration::from_millis(3500)).await;
        let mut ticks = 0;
        while rx.try_recv().is_ok() {
            ticks += 1;
        }
        assert_eq!(ticks, 3);

        drop(handle);
        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert!(rx.try_recv().is_err());
    }
}
