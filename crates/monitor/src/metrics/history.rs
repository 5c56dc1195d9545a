/// 性能历史
///
/// 有界环形缓冲，按时间顺序保存最近的帧耗时和堆内存快照，超出容量时淘汰最旧的记录

use std::collections::VecDeque;

use common::models::constants::{FRAME_HISTORY_CAPACITY, HEAP_HISTORY_CAPACITY};
use serde::{Deserialize, Serialize};

/// 堆内存快照
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeapSample {
    pub used_bytes: f64,
    pub total_bytes: f64,
    /// 毫秒时间戳
    pub timestamp: i64,
}

impl HeapSample {
    /// 已用/总量比例，总量无效时返回 None
    pub fn used_ratio(&self) -> Option<f64> {
        if self.total_bytes > 0.0 && self.used_bytes.is_finite() {
            Some(self.used_bytes / self.total_bytes)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct PerformanceHistory {
    frame_times: VecDeque<f64>,
    heap_samples: VecDeque<HeapSample>,
    frame_capacity: usize,
    heap_capacity: usize,
}

impl PerformanceHistory {
    pub fn new() -> Self {
        Self::with_capacity(FRAME_HISTORY_CAPACITY, HEAP_HISTORY_CAPACITY)
    }

    pub fn with_capacity(frame_capacity: usize, heap_capacity: usize) -> Self {
        Self {
            frame_times: VecDeque::with_capacity(frame_capacity),
            heap_samples: VecDeque::with_capacity(heap_capacity),
            frame_capacity,
            heap_capacity,
        }
    }

    /// 记录一帧耗时（毫秒），负数和非有限值直接丢弃
    pub fn record_frame(&mut self, duration_ms: f64) {
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            return;
        }
        self.frame_times.push_back(duration_ms);
        while self.frame_times.len() > self.frame_capacity {
            self.frame_times.pop_front();
        }
    }

    /// 记录一次堆内存快照
    pub fn record_heap(&mut self, sample: HeapSample) {
        if !sample.used_bytes.is_finite() || !sample.total_bytes.is_finite() {
            return;
        }
        self.heap_samples.push_back(sample);
        while self.heap_samples.len() > self.heap_capacity {
            self.heap_samples.pop_front();
        }
    }

    /// 平均帧耗时，无记录时返回 None
    pub fn mean_frame_time(&self) -> Option<f64> {
        if self.frame_times.is_empty() {
            return None;
        }
        let sum: f64 = self.frame_times.iter().sum();
        Some(sum / self.frame_times.len() as f64)
    }

    pub fn frame_count(&self) -> usize {
        self.frame_times.len()
    }

    pub fn heap_count(&self) -> usize {
        self.heap_samples.len()
    }

    /// 最近一次堆快照
    pub fn latest_heap(&self) -> Option<&HeapSample> {
        self.heap_samples.back()
    }

    /// 最近两次堆快照 (previous, latest)
    pub fn last_two_heaps(&self) -> Option<(&HeapSample, &HeapSample)> {
        let len = self.heap_samples.len();
        if len < 2 {
            return None;
        }
        Some((&self.heap_samples[len - 2], &self.heap_samples[len - 1]))
    }

    #[cfg(test)]
    pub fn frame_times(&self) -> impl Iterator<Item = &f64> {
        self.frame_times.iter()
    }
}

impl Default for PerformanceHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heap(used: f64, total: f64, timestamp: i64) -> HeapSample {
        HeapSample {
            used_bytes: used,
            total_bytes: total,
            timestamp,
        }
    }

    #[test]
    fn test_frame_buffer_never_exceeds_capacity() {
        let mut history = PerformanceHistory::new();
        for i in 0..1000 {
            history.record_frame(i as f64);
            assert!(history.frame_count() <= FRAME_HISTORY_CAPACITY);
        }
        assert_eq!(history.frame_count(), 60);
        // 最旧的记录先被淘汰
        assert_eq!(history.frame_times().next(), Some(&940.0));
    }

    #[test]
    fn test_heap_buffer_never_exceeds_capacity() {
        let mut history = PerformanceHistory::new();
        for i in 0..500 {
            history.record_heap(heap(i as f64, 1000.0, i));
            assert!(history.heap_count() <= HEAP_HISTORY_CAPACITY);
        }
        assert_eq!(history.heap_count(), 30);
        assert_eq!(history.latest_heap().unwrap().timestamp, 499);
        let (prev, latest) = history.last_two_heaps().unwrap();
        assert_eq!(prev.timestamp, 498);
        assert_eq!(latest.timestamp, 499);
    }

    #[test]
    fn test_invalid_samples_are_dropped() {
        let mut history = PerformanceHistory::new();
        history.record_frame(-1.0);
        history.record_frame(f64::NAN);
        history.record_heap(heap(f64::INFINITY, 10.0, 0));
        assert_eq!(history.frame_count(), 0);
        assert_eq!(history.heap_count(), 0);
        assert!(history.mean_frame_time().is_none());
    }

    #[test]
    fn test_mean_frame_time() {
        let mut history = PerformanceHistory::new();
        history.record_frame(10.0);
        history.record_frame(20.0);
        assert_eq!(history.mean_frame_time(), Some(15.0));
    }

    #[test]
    fn test_used_ratio() {
        assert_eq!(heap(50.0, 100.0, 0).used_ratio(), Some(0.5));
        assert_eq!(heap(50.0, 0.0, 0).used_ratio(), None);
    }
}
