use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use mentora_shared::errors::{AppError, AppResult};
use mentora_shared::types::auth::AccountRole;

use super::{ScheduleStore, TimeWindow, TransactionalStore};
use crate::models::{
    AvailabilitySlot, NewAvailabilitySlot, NewPayment, NewSession, Payment, Session, SessionStatus,
};
use crate::schema::{accounts, availability_slots, payments, sessions};

const MAX_ATTEMPTS: u32 = 3;

/// Postgres-backed [`ScheduleStore`]. Transactions run at SERIALIZABLE and
/// are retried when they lose a race with a concurrent writer.
pub struct PgScheduleStore<'a> {
    conn: &'a mut PgConnection,
}

impl<'a> PgScheduleStore<'a> {
    pub fn new(conn: &'a mut PgConnection) -> Self {
        Self { conn }
    }
}

impl TransactionalStore for PgScheduleStore<'_> {
    fn atomically<T, F>(&mut self, mut op: F) -> AppResult<T>
    where
        F: FnMut(&mut dyn ScheduleStore) -> AppResult<T>,
    {
        let mut attempt = 1;
        loop {
            let result = self
                .conn
                .build_transaction()
                .serializable()
                .run::<T, AppError, _>(|conn| op(&mut PgScheduleStore { conn }));

            match result {
                Err(e) if e.is_serialization_failure() => {
                    retry_or_give_up(e, attempt)?;
                    tracing::warn!(attempt, "serialization failure, retrying transaction");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

/// `Ok` to run the transaction again; once the attempts are used up the
/// caller sees a conflict.
fn retry_or_give_up(err: AppError, attempt: u32) -> AppResult<()> {
    if attempt < MAX_ATTEMPTS {
        return Ok(());
    }
    tracing::warn!(attempts = attempt, error = %err, "giving up on contended transaction");
    Err(AppError::conflict("the schedule changed concurrently, please retry"))
}

impl ScheduleStore for PgScheduleStore<'_> {
    fn mentor_price(&mut self, mentor_id: Uuid) -> AppResult<Option<i32>> {
        let price = accounts::table
            .filter(accounts::id.eq(mentor_id))
            .filter(accounts::role.eq(AccountRole::Mentor.as_str()))
            .filter(accounts::deleted_at.is_null())
            .select(accounts::session_price_minor)
            .first::<Option<i32>>(self.conn)
            .optional()?;
        Ok(price.flatten())
    }

    fn overlapping_sessions(
        &mut self,
        mentor_id: Uuid,
        window: &TimeWindow,
        statuses: &[SessionStatus],
        exclude: Option<Uuid>,
    ) -> AppResult<Vec<Session>> {
        let mut query = sessions::table
            .filter(sessions::mentor_id.eq(mentor_id))
            .filter(sessions::status.eq_any(statuses.to_vec()))
            .filter(sessions::scheduled_start.lt(window.end))
            .filter(sessions::scheduled_end.gt(window.start))
            .select(Session::as_select())
            .into_boxed();

        if let Some(id) = exclude {
            query = query.filter(sessions::id.ne(id));
        }

        Ok(query
            .order(sessions::scheduled_start.asc())
            .load(self.conn)?)
    }

    fn slot(&mut self, slot_id: Uuid) -> AppResult<Option<AvailabilitySlot>> {
        Ok(availability_slots::table
            .find(slot_id)
            .select(AvailabilitySlot::as_select())
            .for_update()
            .first(self.conn)
            .optional()?)
    }

    fn upsert_slot(
        &mut self,
        mentor_id: Uuid,
        window: &TimeWindow,
    ) -> AppResult<AvailabilitySlot> {
        diesel::insert_into(availability_slots::table)
            .values(&NewAvailabilitySlot {
                id: Uuid::now_v7(),
                mentor_id,
                start_ts: window.start,
                end_ts: window.end,
                is_booked: false,
            })
            .on_conflict((
                availability_slots::mentor_id,
                availability_slots::start_ts,
                availability_slots::end_ts,
            ))
            .do_nothing()
            .execute(self.conn)?;

        Ok(availability_slots::table
            .filter(availability_slots::mentor_id.eq(mentor_id))
            .filter(availability_slots::start_ts.eq(window.start))
            .filter(availability_slots::end_ts.eq(window.end))
            .select(AvailabilitySlot::as_select())
            .for_update()
            .first(self.conn)?)
    }

    fn set_slot_booked(&mut self, slot_id: Uuid, booked: bool) -> AppResult<()> {
        diesel::update(availability_slots::table.find(slot_id))
            .set(availability_slots::is_booked.eq(booked))
            .execute(self.conn)?;
        Ok(())
    }

    fn detach_slot(&mut self, slot_id: Uuid) -> AppResult<()> {
        diesel::update(sessions::table.filter(sessions::slot_id.eq(slot_id)))
            .set((
                sessions::slot_id.eq(None::<Uuid>),
                sessions::updated_at.eq(Utc::now()),
            ))
            .execute(self.conn)?;
        Ok(())
    }

    fn insert_session(&mut self, session: &NewSession) -> AppResult<Session> {
        Ok(diesel::insert_into(sessions::table)
            .values(session)
            .returning(Session::as_returning())
            .get_result(self.conn)?)
    }

    fn insert_payment(&mut self, payment: &NewPayment) -> AppResult<Payment> {
        Ok(diesel::insert_into(payments::table)
            .values(payment)
            .returning(Payment::as_returning())
            .get_result(self.conn)?)
    }

    fn session(&mut self, session_id: Uuid) -> AppResult<Option<Session>> {
        Ok(sessions::table
            .find(session_id)
            .select(Session::as_select())
            .for_update()
            .first(self.conn)
            .optional()?)
    }

    fn move_session(
        &mut self,
        session_id: Uuid,
        slot_id: Uuid,
        window: &TimeWindow,
    ) -> AppResult<Session> {
        Ok(diesel::update(sessions::table.find(session_id))
            .set((
                sessions::slot_id.eq(Some(slot_id)),
                sessions::scheduled_start.eq(window.start),
                sessions::scheduled_end.eq(window.end),
                sessions::status.eq(SessionStatus::Upcoming),
                sessions::updated_at.eq(Utc::now()),
            ))
            .returning(Session::as_returning())
            .get_result(self.conn)?)
    }

    fn set_session_status(
        &mut self,
        session_id: Uuid,
        status: SessionStatus,
        detach_slot: bool,
    ) -> AppResult<Session> {
        let target = sessions::table.find(session_id);
        let now = Utc::now();

        let session = if detach_slot {
            diesel::update(target)
                .set((
                    sessions::status.eq(status),
                    sessions::slot_id.eq(None::<Uuid>),
                    sessions::updated_at.eq(now),
                ))
                .returning(Session::as_returning())
                .get_result(self.conn)?
        } else {
            diesel::update(target)
                .set((sessions::status.eq(status), sessions::updated_at.eq(now)))
                .returning(Session::as_returning())
                .get_result(self.conn)?
        };
        Ok(session)
    }

    fn expire_sessions(&mut self, now: DateTime<Utc>) -> AppResult<Vec<Session>> {
        Ok(diesel::update(
            sessions::table
                .filter(sessions::status.eq(SessionStatus::Upcoming))
                .filter(sessions::scheduled_end.lt(now)),
        )
        .set((
            sessions::status.eq(SessionStatus::Past),
            sessions::updated_at.eq(now),
        ))
        .returning(Session::as_returning())
        .get_results(self.conn)?)
    }
}
