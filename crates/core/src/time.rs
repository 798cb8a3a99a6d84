use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

// =========================================================================
// 全局时钟控制 (用于历史回放)
// =========================================================================

/// 全局模拟时间 (0 表示使用系统真实时间)
/// 使用 AtomicI64 保证线程安全
static MOCK_TIME: AtomicI64 = AtomicI64::new(0);

pub struct Clock;

impl Clock {
    /// 获取当前时间戳 (毫秒)
    ///
    /// 逻辑：如果设置了模拟时间(回放模式)，返回模拟时间；否则返回系统真实时间。
    #[inline]
    pub fn now_ms() -> i64 {
        let mock = MOCK_TIME.load(Ordering::Relaxed);
        if mock > 0 {
            mock
        } else {
            Utc::now().timestamp_millis()
        }
    }

    /// 获取当前 UTC 时间对象
    pub fn now() -> DateTime<Utc> {
        Self::from_timestamp_ms(Self::now_ms())
    }

    /// 回看窗口的起点: now - lookback
    pub fn cutoff(lookback: Duration) -> DateTime<Utc> {
        Self::now() - lookback
    }

    // -----------------------------------------------------------------
    // 回放专用方法
    // -----------------------------------------------------------------

    /// 设置模拟时间 (回放历史签到时，按消息原始时间推进)
    pub fn set_mock_time(timestamp_ms: i64) {
        MOCK_TIME.store(timestamp_ms, Ordering::Relaxed);
    }

    /// 重置为系统真实时间 (回放结束时调用)
    pub fn reset() {
        MOCK_TIME.store(0, Ordering::Relaxed);
    }
}

// =========================================================================
// 格式化与转换工具
// =========================================================================

impl Clock {
    /// 时间戳 (ms) -> DateTime<Utc>
    pub fn from_timestamp_ms(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap_or_default()
    }

    /// 时间戳 (ms) -> 字符串 "2025-01-01 12:00:00"
    pub fn format_ms(ms: i64) -> String {
        Self::from_timestamp_ms(ms)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }

    /// 字符串 -> 时间戳 (ms)
    /// 支持 "2025-01-01 12:00:00" / "2025-01-01T12:00:00" / "2025-01-01"
    pub fn parse_str(s: &str) -> Option<i64> {
        let formats = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%SZ"];

        for fmt in formats {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(dt.and_utc().timestamp_millis());
            }
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp_millis())
    }

    /// 周报所属的周: 当周周一的日期 "YYYY-MM-DD"
    pub fn week_of(at: DateTime<Utc>) -> String {
        let date = at.date_naive();
        let offset = date.weekday().num_days_from_monday() as i64;
        (date - Duration::days(offset)).format("%Y-%m-%d").to_string()
    }
}

// =========================================================================
// 单元测试
// =========================================================================
