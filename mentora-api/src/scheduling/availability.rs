use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use serde::Serialize;
use uuid::Uuid;

use mentora_shared::errors::{AppError, AppResult, ErrorCode};

use super::{mentor_not_found, ScheduleStore, TimeWindow, AVAILABILITY_BLOCKERS};

pub const SLOT_MINUTES: i64 = 30;
pub const OPENING_HOUR: i64 = 10;
pub const CLOSING_HOUR: i64 = 16;
pub const MAX_PROJECTION_DAYS: i64 = 62;

/// A bookable half hour. Projected slots are never persisted, so `slotId` is null.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualSlot {
    pub slot_id: Option<Uuid>,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
    pub is_booked: bool,
}

/// Business hours in a fixed offset from UTC.
#[derive(Debug, Clone, Copy)]
pub struct BusinessCalendar {
    offset: FixedOffset,
}

impl Default for BusinessCalendar {
    fn default() -> Self {
        Self { offset: Utc.fix() }
    }
}

impl BusinessCalendar {
    pub fn from_offset_minutes(minutes: i32) -> AppResult<Self> {
        let offset = minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                AppError::Validation(format!("invalid business utc offset: {minutes} minutes"))
            })?;
        Ok(Self { offset })
    }

    /// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp, read in business time.
    pub fn parse_date(&self, raw: &str) -> AppResult<NaiveDate> {
        let raw = raw.trim();
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .or_else(|_| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|dt| dt.with_timezone(&self.offset).date_naive())
            })
            .map_err(|_| AppError::new(ErrorCode::ValidationError, format!("invalid date: {raw}")))
    }

    /// The half-hour grid for one business day, in UTC.
    pub fn day_grid(&self, day: NaiveDate) -> Vec<TimeWindow> {
        let midnight_local = day.and_time(NaiveTime::default());
        let midnight = Utc.from_utc_datetime(
            &(midnight_local - Duration::seconds(i64::from(self.offset.local_minus_utc()))),
        );
        let opening = midnight + Duration::hours(OPENING_HOUR);
        let slots = (CLOSING_HOUR - OPENING_HOUR) * 60 / SLOT_MINUTES;

        (0..slots)
            .map(|i| {
                let start = opening + Duration::minutes(i * SLOT_MINUTES);
                TimeWindow { start, end: start + Duration::minutes(SLOT_MINUTES) }
            })
            .collect()
    }
}

/// Projects the mentor's business-hour grid for every day in
/// `[start_date, end_date]`, marking slots that overlap a live session.
pub fn project(
    store: &mut dyn ScheduleStore,
    calendar: &BusinessCalendar,
    mentor_id: Uuid,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> AppResult<Vec<VirtualSlot>> {
    let (Some(start_raw), Some(end_raw)) = (start_date, end_date) else {
        return Ok(Vec::new());
    };
    let start = calendar.parse_date(start_raw)?;
    let end = calendar.parse_date(end_raw)?;
    if end < start {
        return Ok(Vec::new());
    }

    let days = (end - start).num_days() + 1;
    if days > MAX_PROJECTION_DAYS {
        return Err(AppError::with_details(
            ErrorCode::ValidationError,
            format!("date range may span at most {MAX_PROJECTION_DAYS} days"),
            serde_json::json!({ "maxDays": MAX_PROJECTION_DAYS, "requestedDays": days }),
        ));
    }

    store.mentor_price(mentor_id)?.ok_or_else(mentor_not_found)?;

    let grid: Vec<TimeWindow> = start
        .iter_days()
        .take(days as usize)
        .flat_map(|day| calendar.day_grid(day))
        .collect();
    let (Some(first), Some(last)) = (grid.first(), grid.last()) else {
        return Ok(Vec::new());
    };
    let range = TimeWindow { start: first.start, end: last.end };

    let sessions = store.overlapping_sessions(mentor_id, &range, AVAILABILITY_BLOCKERS, None)?;

    Ok(grid
        .into_iter()
        .map(|w| VirtualSlot {
            slot_id: None,
            start_ts: w.start,
            end_ts: w.end,
            is_booked: sessions.iter().any(|s| w.overlaps(s.scheduled_start, s.scheduled_end)),
        })
        .collect())
}
