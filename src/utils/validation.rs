//! 请求字段校验

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use regex::Regex;

use crate::errors::{MediRemindError, Result};

fn time_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([01]?[0-9]|2[0-3]):([0-5][0-9])$").unwrap_or_else(|e| {
            unreachable!("static time regex is valid: {}", e)
        })
    })
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
            .unwrap_or_else(|e| unreachable!("static email regex is valid: {}", e))
    })
}

/// 解析 24 小时制 `HH:MM`（小时允许一位数）
pub fn parse_reminder_time(value: &str) -> Result<NaiveTime> {
    let caps = time_regex().captures(value.trim()).ok_or_else(|| {
        MediRemindError::validation(format!(
            "Invalid time format '{}'. Use HH:MM (24-hour format)",
            value
        ))
    })?;

    let hour: u32 = caps[1].parse().unwrap_or(0);
    let minute: u32 = caps[2].parse().unwrap_or(0);
    NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| MediRemindError::validation(format!("Invalid time '{}'", value)))
}

/// 规范化并校验邮箱（去空白、转小写）
pub fn normalize_email(value: &str) -> Result<String> {
    let email = value.trim().to_lowercase();
    if email.len() > 255 || !email_regex().is_match(&email) {
        return Err(MediRemindError::validation("Invalid email address"));
    }
    Ok(email)
}

/// 字符数校验（按 Unicode 字符计）
pub fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(MediRemindError::validation(if min == 0 {
            format!("{} must be at most {} characters", field, max)
        } else {
            format!("{} must be between {} and {} characters", field, min, max)
        }));
    }
    Ok(())
}

/// 数值范围校验（闭区间）
pub fn check_range<T>(field: &str, value: T, min: T, max: T) -> Result<()>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if value < min || value > max {
        return Err(MediRemindError::validation(format!(
            "{} must be between {} and {}",
            field, min, max
        )));
    }
    Ok(())
}

/// 解析日期：`YYYY-MM-DD`（当天 00:00 UTC）或 RFC 3339
pub fn parse_date(field: &str, value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            MediRemindError::validation(format!(
                "{} must be YYYY-MM-DD or an RFC 3339 timestamp",
                field
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reminder_time_accepts_24h() {
        assert_eq!(
            parse_reminder_time("08:30").unwrap(),
            NaiveTime::from_hms_opt(8, 30, 0).unwrap()
        );
        assert_eq!(
            parse_reminder_time("8:05").unwrap(),
            NaiveTime::from_hms_opt(8, 5, 0).unwrap()
        );
        assert_eq!(
            parse_reminder_time("23:59").unwrap(),
            NaiveTime::from_hms_opt(23, 59, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_reminder_time_rejects_invalid() {
        for bad in ["24:00", "12:60", "7", "07:5", "noon", "", "12:00:00"] {
            assert!(parse_reminder_time(bad).is_err(), "{} should fail", bad);
        }
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(
            normalize_email("  Alice@Example.COM ").unwrap(),
            "alice@example.com"
        );
        assert!(normalize_email("not-an-email").is_err());
        assert!(normalize_email("a@b").is_err());
    }

    #[test]
    fn test_check_length_counts_chars() {
        assert!(check_length("name", "Ибупрофен", 1, 9).is_ok());
        assert!(check_length("name", "", 1, 200).is_err());
        assert!(check_length("notes", &"x".repeat(501), 0, 500).is_err());
    }

    #[test]
    fn test_check_range_inclusive() {
        assert!(check_range("age", 1, 1, 120).is_ok());
        assert!(check_range("age", 120, 1, 120).is_ok());
        assert!(check_range("age", 0, 1, 120).is_err());
        assert!(check_range("weight", 9.9, 10.0, 500.0).is_err());
    }

    #[test]
    fn test_parse_date_formats() {
        let d = parse_date("start_date", "2025-03-01").unwrap();
        assert_eq!(d.to_rfc3339(), "2025-03-01T00:00:00+00:00");
        let t = parse_date("start_date", "2025-03-01T10:15:00+05:30").unwrap();
        assert_eq!(t.to_rfc3339(), "2025-03-01T04:45:00+00:00");
        assert!(parse_date("start_date", "03/01/2025").is_err());
    }
}
