/// 每日壁纸刷新计划

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize)]
pub struct WallpaperSchedule {
    /// 最近一次获取壁纸的日期
    last_fetched: Option<NaiveDate>,
}

impl WallpaperSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_fetched(&self) -> Option<NaiveDate> {
        self.last_fetched
    }

    /// 从未获取过或日期已变化时需要刷新
    pub fn needs_refresh(&self, today: NaiveDate) -> bool {
        self.last_fetched != Some(today)
    }

    pub fn mark_fetched(&mut self, date: NaiveDate) {
        debug!("壁纸已更新: {}", date);
        self.last_fetched = Some(date);
    }
}
