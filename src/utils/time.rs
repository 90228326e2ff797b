use crate::utils::timezone::localize;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;

/// Parse time string in HH:MM format
pub fn parse_time(time_str: &str) -> Option<(u32, u32)> {
    let parts: Vec<&str> = time_str.trim().split(':').collect();
    if parts.len() != 2 {
        return None;
    }
    let hour = parts[0].parse::<u32>().ok()?;
    let minute = parts[1].parse::<u32>().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some((hour, minute))
}

/// Calculate the next instant the wall clock in `zone` shows `time_str`
pub fn next_daily_time(now: DateTime<Utc>, time_str: &str, zone: Tz) -> Option<DateTime<Utc>> {
    let (hour, minute) = parse_time(time_str)?;
    let today = now.with_timezone(&zone).date_naive();

    let next = at_wall_clock(today, hour, minute, zone)?;
    if next > now {
        return Some(next);
    }

    // Already passed today, schedule for tomorrow
    at_wall_clock(today.succ_opt()?, hour, minute, zone)
}

fn at_wall_clock(date: NaiveDate, hour: u32, minute: u32, zone: Tz) -> Option<DateTime<Utc>> {
    Some(localize(date.and_hms_opt(hour, minute, 0)?, zone))
}

/// Calculate the wait duration until the next notification
pub fn calculate_wait_duration(now: DateTime<Utc>, next_time: DateTime<Utc>) -> std::time::Duration {
    const MINIMUM_WAIT: std::time::Duration = std::time::Duration::from_secs(60);

    if next_time <= now {
        // Past the target, wait a minute instead of spinning
        return MINIMUM_WAIT;
    }

    // Full precision so the wake-up never lands just before the target
    (next_time - now).to_std().unwrap_or(MINIMUM_WAIT)
}

/// Convert configuration minutes into a signed duration
pub fn minutes(value: u32) -> Duration {
    Duration::minutes(i64::from(value))
}
