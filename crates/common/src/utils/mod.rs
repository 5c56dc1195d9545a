/// 工具函数集合

/// 将百分比限制在 [0, 100]，非有限值视为 0
pub fn clamp_percent(value: f64) -> f64 {
    clamp_range(value, 0.0, 100.0)
}

/// 将数值限制在 [min, max]，非有限值取下限
pub fn clamp_range(value: f64, min: f64, max: f64) -> f64 {
    if value.is_finite() {
        value.max(min).min(max)
    } else {
        min
    }
}

/// 负数与非有限值归零
pub fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

/// 字节/秒 转换为 Mbps：bytes * 8 / (1024 * 1024)
pub fn bytes_per_sec_to_mbps(bytes_per_sec: f64) -> f64 {
    bytes_per_sec * 8.0 / (1024.0 * 1024.0)
}

/// 格式化 MB 为 GB 文本（保留一位小数）
pub fn format_gb(megabytes: f64) -> String {
    format!("{:.1}GB", megabytes / 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_percent() {
        assert_eq!(clamp_percent(-5.0), 0.0);
        assert_eq!(clamp_percent(55.5), 55.5);
        assert_eq!(clamp_percent(101.0), 100.0);
        assert_eq!(clamp_percent(f64::NAN), 0.0);
        assert_eq!(clamp_percent(f64::INFINITY), 0.0);
    }

    #[test]
    fn test_clamp_range() {
        assert_eq!(clamp_range(1.0, 5.0, 95.0), 5.0);
        assert_eq!(clamp_range(500.0, 5.0, 95.0), 95.0);
    }

    #[test]
    fn test_bytes_per_sec_to_mbps() {
        assert_eq!(bytes_per_sec_to_mbps(1048576.0), 8.0);
        assert_eq!(bytes_per_sec_to_mbps(131072.0), 1.0);
        assert_eq!(bytes_per_sec_to_mbps(0.0), 0.0);
    }

    #[test]
    fn test_format_gb() {
        assert_eq!(format_gb(16384.0), "16.0GB");
        assert_eq!(format_gb(1536.0), "1.5GB");
    }
}
