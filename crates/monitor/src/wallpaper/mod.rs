/// 壁纸辅助功能
///
/// 文字区域亮度分析、壁纸不可用时的渐变背景，以及每日刷新计划

pub mod brightness;
pub mod schedule;

use serde::Serialize;

pub use brightness::{analyze_zones, average_brightness, TextTheme, TextZone, ZoneAnalysis};
pub use schedule::WallpaperSchedule;

/// 一天中的时段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPeriod {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl DayPeriod {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => Self::Morning,
            12..=17 => Self::Afternoon,
            18..=21 => Self::Evening,
            _ => Self::Night,
        }
    }

    /// 渐变色标
    fn stops(&self) -> [&'static str; 3] {
        match self {
            Self::Morning => ["#74b9ff", "#0984e3", "#fdcb6e"],
            Self::Afternoon => ["#fd79a8", "#fdcb6e", "#e17055"],
            Self::Evening => ["#a29bfe", "#6c5ce7", "#fd79a8"],
            Self::Night => ["#2d3436", "#636e72", "#74b9ff"],
        }
    }
}

/// 备用渐变背景
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackWallpaper {
    pub period: DayPeriod,
    /// CSS background 取值
    pub gradient: String,
    pub theme: TextTheme,
}

/// 按本地小时生成备用渐变背景，文字统一使用白色
pub fn fallback_gradient(hour: u32) -> FallbackWallpaper {
    let period = DayPeriod::from_hour(hour);
    let [a, b, c] = period.stops();
    FallbackWallpaper {
        period,
        gradient: format!("linear-gradient(135deg, {} 0%, {} 50%, {} 100%)", a, b, c),
        theme: TextTheme::light_text(),
    }
}
