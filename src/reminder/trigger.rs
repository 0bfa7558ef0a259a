use chrono::{DateTime, Days, Duration, LocalResult, NaiveDateTime, NaiveTime, TimeZone, Timelike};

use crate::plan::line::TimeOfDay;

/// How far ahead a past-due day-0 reminder is pushed.
pub const PAST_DUE_DELAY_MINUTES: i64 = 5;

fn resolve_local_datetime<Tz>(timezone: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>>
where
    Tz: TimeZone,
    Tz::Offset: Copy,
{
    match timezone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(first, _second) => Some(first),
        // Spring-forward gap: the same wall time an hour later exists.
        LocalResult::None => timezone
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest(),
    }
}

/// Local midnight of today plus `day_offset` days, at `time`.
pub fn date_for_offset<Tz>(
    now: &DateTime<Tz>,
    day_offset: u64,
    time: TimeOfDay,
    timezone: &Tz,
) -> Option<DateTime<Tz>>
where
    Tz: TimeZone,
    Tz::Offset: Copy,
{
    let date = now.date_naive().checked_add_days(Days::new(day_offset))?;
    resolve_local_datetime(timezone, date.and_time(time.to_naive_time()))
}

/// A few minutes from now, seconds zeroed, never past the end of today.
pub fn past_due_correction<Tz>(now: &DateTime<Tz>, timezone: &Tz) -> DateTime<Tz>
where
    Tz: TimeZone,
    Tz::Offset: Copy,
{
    let soon = *now + Duration::minutes(PAST_DUE_DELAY_MINUTES);
    let soon = soon
        .with_second(0)
        .and_then(|dt| dt.with_nanosecond(0))
        .unwrap_or(soon);

    let end_of_today = NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999)
        .and_then(|time| resolve_local_datetime(timezone, now.date_naive().and_time(time)));
    match end_of_today {
        Some(end) if soon.date_naive() != now.date_naive() => end.max(*now + Duration::nanoseconds(1)),
        _ => soon,
    }
}

/// Trigger instant for a reminder `day_offset` days from today.
///
/// Day 0 times that have already passed are pushed to just after `now`
/// instead of firing immediately or moving to tomorrow.
pub fn trigger_for_day<Tz>(
    now: &DateTime<Tz>,
    day_offset: u64,
    time: TimeOfDay,
    timezone: &Tz,
) -> Option<DateTime<Tz>>
where
    Tz: TimeZone,
    Tz::Offset: Copy,
{
    let trigger = date_for_offset(now, day_offset, time, timezone)?;
    if day_offset == 0 && trigger <= *now {
        return Some(past_due_correction(now, timezone));
    }
    Some(trigger)
}
