//! Date arithmetic: local-midnight "today" and the weekly plan window.

use anyhow::Result;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;

/// The calendar date at the user's local midnight, resolving an IANA tz
/// name like "America/Chicago". No timezone means UTC.
pub fn local_today(timezone: Option<&str>, now: DateTime<Utc>) -> Result<NaiveDate> {
    let Some(tz) = timezone else {
        return Ok(now.date_naive());
    };
    let tz: Tz = tz
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid timezone: {tz}"))?;
    Ok(now.with_timezone(&tz).date_naive())
}

/// Sunday-indexed weekday of a date (Sunday = 0, Saturday = 6).
pub fn weekday_index(date: NaiveDate) -> usize {
    date.weekday().num_days_from_sunday() as usize
}

/// The 7-day window `[start, end)` containing `today`, anchored on the
/// user's configured week-start day. `end` is the exclusive day after the
/// last day of the week.
pub fn week_window(today: NaiveDate, week_start: u32) -> (NaiveDate, NaiveDate) {
    let week_end = (week_start + 6) % 7;
    let today_idx = weekday_index(today) as u32;
    let diff = if week_end >= today_idx {
        week_end - today_idx
    } else {
        7 - today_idx + week_end
    };
    let end = today + Duration::days(diff as i64 + 1);
    (end - Duration::days(7), end)
}
