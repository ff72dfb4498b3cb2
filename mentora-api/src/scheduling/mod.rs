//! Session booking, rescheduling, status transitions and availability
//! projection. Engines run against the [`ScheduleStore`] seam so the same
//! rules apply to Postgres and to the in-memory store used in tests.

pub mod availability;
pub mod booking;
pub mod expiry;
pub mod meeting;
pub mod pg_store;
pub mod reschedule;
pub mod slots;
pub mod status;

#[cfg(test)]
pub mod memory_store;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use mentora_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{
    AvailabilitySlot, NewPayment, NewSession, Payment, Session, SessionStatus,
};

pub use availability::{BusinessCalendar, VirtualSlot};
pub use booking::{book, Booking, BookingRequest};
pub use expiry::{mark_expired, spawn_expiry_sweep};
pub use meeting::MeetingLinks;
pub use pg_store::PgScheduleStore;
pub use reschedule::reschedule;
pub use status::{parse_status, set_status};

/// Counters emitted by the scheduling engines, as `(name, help)`.
pub const SCHEDULING_COUNTERS: &[(&str, &str)] = &[
    ("sessions_booked_total", "Sessions booked successfully"),
    ("booking_conflicts_total", "Bookings rejected because the window was taken"),
    ("sessions_expired_total", "Upcoming sessions moved to past by the expiry sweep"),
];

/// Sessions in these states block a new booking of an overlapping window.
pub const BOOKING_BLOCKERS: &[SessionStatus] = &[SessionStatus::Upcoming, SessionStatus::Past];

/// Sessions in these states block moving another session onto their window.
pub const RESCHEDULE_BLOCKERS: &[SessionStatus] =
    &[SessionStatus::Upcoming, SessionStatus::Rescheduled];

/// Sessions in these states mark an availability slot as booked.
pub const AVAILABILITY_BLOCKERS: &[SessionStatus] =
    &[SessionStatus::Upcoming, SessionStatus::Rescheduled];

/// A half-open interval `[start, end)` with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<Self> {
        if start >= end {
            return Err(AppError::new(
                ErrorCode::InvalidTimeWindow,
                "scheduledStart must be before scheduledEnd",
            ));
        }
        Ok(Self { start, end })
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end && end > self.start
    }

    pub fn matches(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start == start && self.end == end
    }
}

/// Row-level operations the scheduling engines need. Every method runs
/// inside whatever transaction the caller opened.
pub trait ScheduleStore {
    /// Session price of a live mentor account, `None` if there is no such mentor.
    fn mentor_price(&mut self, mentor_id: Uuid) -> AppResult<Option<i32>>;

    /// Sessions of `mentor_id` in one of `statuses` overlapping `window`.
    fn overlapping_sessions(
        &mut self,
        mentor_id: Uuid,
        window: &TimeWindow,
        statuses: &[SessionStatus],
        exclude: Option<Uuid>,
    ) -> AppResult<Vec<Session>>;

    fn slot(&mut self, slot_id: Uuid) -> AppResult<Option<AvailabilitySlot>>;

    /// The slot row for exactly `window`, created unbooked if absent.
    fn upsert_slot(
        &mut self,
        mentor_id: Uuid,
        window: &TimeWindow,
    ) -> AppResult<AvailabilitySlot>;

    fn set_slot_booked(&mut self, slot_id: Uuid, booked: bool) -> AppResult<()>;

    /// Clears the slot reference of every session pointing at `slot_id`.
    fn detach_slot(&mut self, slot_id: Uuid) -> AppResult<()>;

    fn insert_session(&mut self, session: &NewSession) -> AppResult<Session>;

    fn insert_payment(&mut self, payment: &NewPayment) -> AppResult<Payment>;

    /// Loads a session and locks it for the rest of the transaction.
    fn session(&mut self, session_id: Uuid) -> AppResult<Option<Session>>;

    /// Points the session at a new slot and window and resets it to `upcoming`.
    fn move_session(
        &mut self,
        session_id: Uuid,
        slot_id: Uuid,
        window: &TimeWindow,
    ) -> AppResult<Session>;

    fn set_session_status(
        &mut self,
        session_id: Uuid,
        status: SessionStatus,
        detach_slot: bool,
    ) -> AppResult<Session>;

    /// Moves `upcoming` sessions that ended before `now` to `past`.
    fn expire_sessions(&mut self, now: DateTime<Utc>) -> AppResult<Vec<Session>>;
}

/// A store that can run a unit of work all-or-nothing.
pub trait TransactionalStore {
    /// Runs `op` in one transaction. `op` may be invoked more than once when
    /// the backend retries a transaction that lost a race.
    fn atomically<T, F>(&mut self, op: F) -> AppResult<T>
    where
        F: FnMut(&mut dyn ScheduleStore) -> AppResult<T>;
}

fn session_not_found() -> AppError {
    AppError::new(ErrorCode::SessionNotFound, "session not found")
}

fn mentor_not_found() -> AppError {
    AppError::new(ErrorCode::MentorNotFound, "mentor not found")
}

fn slot_conflict() -> AppError {
    AppError::new(ErrorCode::SlotConflict, "time slot is already booked")
}
