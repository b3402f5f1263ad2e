//! 时间工具函数 (业务时区转换)
//!
//! 存储层只使用 `i64` Unix millis；本地日期 / HH:MM 与时间戳之间的换算
//! 统一在这里完成。

use chrono::{NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;

/// 当前业务时区的本地时间
pub fn local_now(tz: Tz) -> NaiveDateTime {
    Utc::now().with_timezone(&tz).naive_local()
}

/// 当前业务时区的日期
pub fn today(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// Unix millis → 业务时区日期
pub fn millis_to_local_date(millis: i64, tz: Tz) -> NaiveDate {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.with_timezone(&tz).date_naive())
        .unwrap_or_else(|| today(tz))
}

/// 本地时间 → Unix millis (业务时区)
///
/// DST gap fallback: 如果本地时间不存在 (夏令时跳跃)，fallback 到 UTC。
pub fn local_to_millis(naive: NaiveDateTime, tz: Tz) -> i64 {
    naive
        .and_local_timezone(tz)
        .latest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| naive.and_utc().timestamp_millis())
}

/// 日期开始 (00:00:00) → Unix millis (业务时区)
pub fn day_start_millis(date: NaiveDate, tz: Tz) -> i64 {
    local_to_millis(date.and_time(chrono::NaiveTime::MIN), tz)
}

/// 日期结束 → 次日 00:00:00 的 Unix millis (业务时区)
///
/// 调用方使用 `< end` (不含) 语义。
pub fn day_end_millis(date: NaiveDate, tz: Tz) -> i64 {
    let next_day = date.succ_opt().unwrap_or(date);
    day_start_millis(next_day, tz)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_range_in_kolkata() {
        let tz = chrono_tz::Asia::Kolkata;
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let start = day_start_millis(date, tz);
        let end = day_end_millis(date, tz);
        assert_eq!(end - start, 24 * 3_600_000);
        // IST = UTC+5:30
        assert_eq!(
            start,
            date.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp_millis() - 19_800_000
        );
        assert_eq!(millis_to_local_date(start, tz), date);
        assert_eq!(millis_to_local_date(end - 1, tz), date);
    }
}
