use chrono::{DateTime, Duration, Utc};

use crate::error::{AppError, AppResult};

/// 根据开始时间与时长计算结束时间：end = start + days + hours
pub fn compute_end_date(
    start: DateTime<Utc>,
    duration_days: i32,
    duration_hours: i32,
) -> AppResult<DateTime<Utc>> {
    if duration_days < 0 || duration_hours < 0 {
        return Err(AppError::ValidationError(
            "Duration must not be negative".into(),
        ));
    }
    let span = Duration::days(i64::from(duration_days)) + Duration::hours(i64::from(duration_hours));
    start
        .checked_add_signed(span)
        .ok_or_else(|| AppError::ValidationError("Duration is out of range".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_days_and_hours_are_added() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let end = compute_end_date(start, 2, 5).unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 1, 3, 17, 0, 0).unwrap());
    }

    #[test]
    fn test_zero_duration_ends_immediately() {
        let start = Utc::now();
        assert_eq!(compute_end_date(start, 0, 0).unwrap(), start);
    }

    #[test]
    fn test_negative_duration_rejected() {
        assert!(compute_end_date(Utc::now(), -1, 0).is_err());
        assert!(compute_end_date(Utc::now(), 0, -3).is_err());
    }
}
