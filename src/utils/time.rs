use crate::utils::error::{Result, ScenarioError};
use chrono::{NaiveTime, Timelike};

/// 解析 `HH:MM:SS` (或 `HH:MM`) 格式的時間
pub fn parse_clock(field: &str, value: &str) -> Result<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|e| {
            ScenarioError::validation(format!(
                "{} must be a HH:MM:SS time, got '{}': {}",
                field, value, e
            ))
        })
}

/// Minutes elapsed from `origin` to `time`, negative when `time` is earlier.
pub fn minutes_between(origin: NaiveTime, time: NaiveTime) -> i64 {
    (time - origin).num_seconds().div_euclid(60)
}

/// `HH:MM:SS` interpreted as a length of time, in whole minutes.
pub fn parse_duration_minutes(field: &str, value: &str) -> Result<i64> {
    let time = parse_clock(field, value)?;
    Ok(i64::from(time.num_seconds_from_midnight()) / 60)
}

/// Clock time `minutes` after `origin`, formatted `HH:MM:SS`.
pub fn format_offset(origin: NaiveTime, minutes: i64) -> String {
    let (time, _) = origin.overflowing_add_signed(chrono::Duration::minutes(minutes));
    time.format("%H:%M:%S").to_string()
}

pub fn round_up(value: i64, granularity: i64) -> i64 {
    if granularity <= 1 {
        return value;
    }
    (value + granularity - 1).div_euclid(granularity) * granularity
}
