//! In-memory [`ScheduleStore`] for engine tests. Transactions snapshot the
//! whole state and restore it when the unit of work fails.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use mentora_shared::errors::{AppError, AppResult};

use super::{ScheduleStore, TimeWindow, TransactionalStore};
use crate::models::{
    AvailabilitySlot, NewPayment, NewSession, Payment, Session, SessionStatus,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    mentors: HashMap<Uuid, i32>,
    slots: Vec<AvailabilitySlot>,
    sessions: Vec<Session>,
    payments: Vec<Payment>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: MemoryState,
    /// Makes every payment insert fail, to exercise rollback.
    pub fail_payments: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mentor(&mut self, price_minor: i32) -> Uuid {
        let id = Uuid::now_v7();
        self.state.mentors.insert(id, price_minor);
        id
    }

    /// Seeds a session row directly, bypassing the engines.
    pub fn add_session(
        &mut self,
        mentor_id: Uuid,
        window: &TimeWindow,
        status: SessionStatus,
        slot_id: Option<Uuid>,
    ) -> Uuid {
        let id = Uuid::now_v7();
        let now = Utc::now();
        self.state.sessions.push(Session {
            id,
            mentor_id,
            mentee_id: Uuid::now_v7(),
            slot_id,
            status,
            price_minor: 5000,
            meeting_url: format!("https://zoom.us/j/{id}"),
            scheduled_start: window.start,
            scheduled_end: window.end,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn add_slot(&mut self, mentor_id: Uuid, window: &TimeWindow, booked: bool) -> Uuid {
        let id = Uuid::now_v7();
        self.state.slots.push(AvailabilitySlot {
            id,
            mentor_id,
            start_ts: window.start,
            end_ts: window.end,
            is_booked: booked,
            created_at: Utc::now(),
        });
        id
    }

    pub fn slots(&self) -> &[AvailabilitySlot] {
        &self.state.slots
    }

    pub fn sessions(&self) -> &[Session] {
        &self.state.sessions
    }

    pub fn payments(&self) -> &[Payment] {
        &self.state.payments
    }

    pub fn slot_by_id(&self, slot_id: Uuid) -> Option<&AvailabilitySlot> {
        self.state.slots.iter().find(|s| s.id == slot_id)
    }

    fn session_mut(&mut self, session_id: Uuid) -> AppResult<&mut Session> {
        self.state
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or(AppError::Database(diesel::result::Error::NotFound))
    }
}

impl ScheduleStore for MemoryStore {
    fn mentor_price(&mut self, mentor_id: Uuid) -> AppResult<Option<i32>> {
        Ok(self.state.mentors.get(&mentor_id).copied())
    }

    fn overlapping_sessions(
        &mut self,
        mentor_id: Uuid,
        window: &TimeWindow,
        statuses: &[SessionStatus],
        exclude: Option<Uuid>,
    ) -> AppResult<Vec<Session>> {
        Ok(self
            .state
            .sessions
            .iter()
            .filter(|s| s.mentor_id == mentor_id)
            .filter(|s| statuses.contains(&s.status))
            .filter(|s| Some(s.id) != exclude)
            .filter(|s| window.overlaps(s.scheduled_start, s.scheduled_end))
            .cloned()
            .collect())
    }

    fn slot(&mut self, slot_id: Uuid) -> AppResult<Option<AvailabilitySlot>> {
        Ok(self.slot_by_id(slot_id).cloned())
    }

    fn upsert_slot(
        &mut self,
        mentor_id: Uuid,
        window: &TimeWindow,
    ) -> AppResult<AvailabilitySlot> {
        let existing = self
            .state
            .slots
            .iter()
            .find(|s| s.mentor_id == mentor_id && window.matches(s.start_ts, s.end_ts))
            .cloned();
        match existing {
            Some(slot) => Ok(slot),
            None => {
                let id = self.add_slot(mentor_id, window, false);
                self.slot(id)?
                    .ok_or(AppError::Database(diesel::result::Error::NotFound))
            }
        }
    }

    fn set_slot_booked(&mut self, slot_id: Uuid, booked: bool) -> AppResult<()> {
        if let Some(slot) = self.state.slots.iter_mut().find(|s| s.id == slot_id) {
            slot.is_booked = booked;
        }
        Ok(())
    }

    fn detach_slot(&mut self, slot_id: Uuid) -> AppResult<()> {
        for session in self.state.sessions.iter_mut() {
            if session.slot_id == Some(slot_id) {
                session.slot_id = None;
                session.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    fn insert_session(&mut self, new: &NewSession) -> AppResult<Session> {
        let now = Utc::now();
        let session = Session {
            id: new.id,
            mentor_id: new.mentor_id,
            mentee_id: new.mentee_id,
            slot_id: new.slot_id,
            status: new.status,
            price_minor: new.price_minor,
            meeting_url: new.meeting_url.clone(),
            scheduled_start: new.scheduled_start,
            scheduled_end: new.scheduled_end,
            created_at: now,
            updated_at: now,
        };
        self.state.sessions.push(session.clone());
        Ok(session)
    }

    fn insert_payment(&mut self, new: &NewPayment) -> AppResult<Payment> {
        if self.fail_payments {
            return Err(AppError::Internal(anyhow::anyhow!("payment insert failed")));
        }
        let payment = Payment {
            id: new.id,
            session_id: new.session_id,
            mentee_id: new.mentee_id,
            amount_minor: new.amount_minor,
            currency: new.currency.clone(),
            status: new.status.clone(),
            created_at: Utc::now(),
        };
        self.state.payments.push(payment.clone());
        Ok(payment)
    }

    fn session(&mut self, session_id: Uuid) -> AppResult<Option<Session>> {
        Ok(self.state.sessions.iter().find(|s| s.id == session_id).cloned())
    }

    fn move_session(
        &mut self,
        session_id: Uuid,
        slot_id: Uuid,
        window: &TimeWindow,
    ) -> AppResult<Session> {
        let session = self.session_mut(session_id)?;
        session.slot_id = Some(slot_id);
        session.scheduled_start = window.start;
        session.scheduled_end = window.end;
        session.status = SessionStatus::Upcoming;
        session.updated_at = Utc::now();
        Ok(session.clone())
    }

    fn set_session_status(
        &mut self,
        session_id: Uuid,
        status: SessionStatus,
        detach_slot: bool,
    ) -> AppResult<Session> {
        let session = self.session_mut(session_id)?;
        session.status = status;
        if detach_slot {
            session.slot_id = None;
        }
        session.updated_at = Utc::now();
        Ok(session.clone())
    }

    fn expire_sessions(&mut self, now: DateTime<Utc>) -> AppResult<Vec<Session>> {
        let mut expired = Vec::new();
        for session in self.state.sessions.iter_mut() {
            if session.status == SessionStatus::Upcoming && session.scheduled_end < now {
                session.status = SessionStatus::Past;
                session.updated_at = now;
                expired.push(session.clone());
            }
        }
        Ok(expired)
    }
}

impl TransactionalStore for MemoryStore {
    fn atomically<T, F>(&mut self, mut op: F) -> AppResult<T>
    where
        F: FnMut(&mut dyn ScheduleStore) -> AppResult<T>,
    {
        let snapshot = self.state.clone();
        let result = op(self);
        if result.is_err() {
            self.state = snapshot;
        }
        result
    }
}
