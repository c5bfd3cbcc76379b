use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};

/// explodes if the variable is missing
pub fn env_var(k: &str) -> String {
    match std::env::var(k) {
        Ok(v) => v,
        Err(_e) => {
            panic!("Missing environment variable {k}")
        }
    }
}

pub fn env_default<T: FromStr>(k: &str, default: T) -> T {
    std::env::var(k)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// None if unset or empty
pub fn env_optional(k: &str) -> Option<String> {
    std::env::var(k).ok().filter(|v| !v.trim().is_empty())
}

/// out of range timestamps clamp to the epoch rather than blowing up
pub fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0)
        .single()
        .unwrap_or_default()
}

pub fn format_kickoff(ts: i64) -> String {
    timestamp_to_datetime(ts)
        .format("%Y-%m-%d %H:%M UTC")
        .to_string()
}
