/// 壁纸亮度分析

use common::{Error, Result};
use serde::{Deserialize, Serialize};

/// 亮度阈值，高于该值使用深色文字
pub const BRIGHTNESS_THRESHOLD: f64 = 128.0;

/// 文字区域占画面宽高的比例
const ZONE_RATIO: f64 = 0.4;

/// 页面上的文字区域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextZone {
    /// 左上角，系统指标
    Specs,
    /// 右下角，时间
    Time,
    /// 左下角，壁纸信息
    Info,
}

impl TextZone {
    pub const ALL: [TextZone; 3] = [Self::Specs, Self::Time, Self::Info];

    /// 区域在画面中的像素矩形 (x, y, w, h)
    pub fn rect(&self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        let w = (width as f64 * ZONE_RATIO) as u32;
        let h = (height as f64 * ZONE_RATIO) as u32;
        let right = width - w;
        let bottom = height - h;

        match self {
            Self::Specs => (0, 0, w, h),
            Self::Time => (right, bottom, w, h),
            Self::Info => (0, bottom, w, h),
        }
    }
}

/// 文字配色
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextTheme {
    pub color: String,
    pub shadow: String,
}

impl TextTheme {
    /// 背景较亮时用黑字白影，否则白字黑影
    pub fn for_brightness(brightness: f64) -> Self {
        if brightness > BRIGHTNESS_THRESHOLD {
            Self {
                color: "#000000".to_string(),
                shadow: "rgba(255,255,255,0.8)".to_string(),
            }
        } else {
            Self::light_text()
        }
    }

    /// 白字黑影
    pub fn light_text() -> Self {
        Self {
            color: "#ffffff".to_string(),
            shadow: "rgba(0,0,0,0.8)".to_string(),
        }
    }

    /// CSS text-shadow 取值
    pub fn text_shadow(&self) -> String {
        format!("0 2px 4px {}", self.shadow)
    }
}

/// 单个区域的分析结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneAnalysis {
    pub zone: TextZone,
    pub brightness: f64,
    pub theme: TextTheme,
}

/// RGBA 像素的平均感知亮度，没有完整像素时返回 None
pub fn average_brightness(rgba: &[u8]) -> Option<f64> {
    let pixels = rgba.chunks_exact(4);
    let count = pixels.len();
    if count == 0 {
        return None;
    }

    let total: f64 = pixels
        .map(|p| 0.299 * p[0] as f64 + 0.587 * p[1] as f64 + 0.114 * p[2] as f64)
        .sum();
    Some(total / count as f64)
}

/// 逐区域分析整幅 RGBA 图像
pub fn analyze_zones(rgba: &[u8], width: u32, height: u32) -> Result<Vec<ZoneAnalysis>> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidArgument("图像尺寸不能为 0".to_string()));
    }
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| Error::InvalidArgument(format!("图像尺寸过大: {}x{}", width, height)))?;
    if rgba.len() != expected {
        return Err(Error::InvalidArgument(format!(
            "像素数据长度 {} 与尺寸 {}x{} 不符",
            rgba.len(),
            width,
            height
        )));
    }

    let mut result = Vec::with_capacity(TextZone::ALL.len());
    for zone in TextZone::ALL {
        let (x, y, w, h) = zone.rect(width, height);
        let mut region = Vec::with_capacity(w as usize * h as usize * 4);
        for row in y..y + h {
            let start = (row as usize * width as usize + x as usize) * 4;
            region.extend_from_slice(&rgba[start..start + w as usize * 4]);
        }

        // 区域过小时整体视为暗背景
        let brightness = average_brightness(&region).unwrap_or(0.0);
        result.push(ZoneAnalysis {
            zone,
            brightness,
            theme: TextTheme::for_brightness(brightness),
        });
    }

    Ok(result)
}
