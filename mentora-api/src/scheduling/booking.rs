use serde::Serialize;
use uuid::Uuid;

use mentora_shared::errors::{AppError, AppResult, ErrorCode};

use super::slots::claim_slot;
use super::{
    mentor_not_found, slot_conflict, MeetingLinks, TimeWindow, TransactionalStore,
    BOOKING_BLOCKERS,
};
use crate::models::{NewPayment, NewSession, Payment, Session, SessionStatus};

pub const PAYMENT_CURRENCY: &str = "USD";
pub const PAYMENT_COMPLETED: &str = "completed";

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub mentor_id: Uuid,
    pub mentee_id: Uuid,
    pub window: TimeWindow,
    pub slot_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct Booking {
    pub session: Session,
    pub payment: Payment,
}

/// Books a session for the mentee. The overlap check, slot claim, session
/// row and payment row commit together or not at all.
pub fn book<S: TransactionalStore>(
    store: &mut S,
    request: &BookingRequest,
    links: &MeetingLinks,
) -> AppResult<Booking> {
    let result = store.atomically(|tx| {
        let price = tx.mentor_price(request.mentor_id)?.ok_or_else(mentor_not_found)?;

        let clashes = tx.overlapping_sessions(
            request.mentor_id,
            &request.window,
            BOOKING_BLOCKERS,
            None,
        )?;
        if !clashes.is_empty() {
            return Err(slot_conflict());
        }

        let slot = claim_slot(tx, request.mentor_id, &request.window, request.slot_id)?;

        let session = tx.insert_session(&NewSession {
            id: Uuid::now_v7(),
            mentor_id: request.mentor_id,
            mentee_id: request.mentee_id,
            slot_id: Some(slot.id),
            status: SessionStatus::Upcoming,
            price_minor: price,
            meeting_url: links.generate(),
            scheduled_start: request.window.start,
            scheduled_end: request.window.end,
        })?;

        let payment = tx.insert_payment(&NewPayment {
            id: Uuid::now_v7(),
            session_id: session.id,
            mentee_id: request.mentee_id,
            amount_minor: price,
            currency: PAYMENT_CURRENCY.to_string(),
            status: PAYMENT_COMPLETED.to_string(),
        })?;

        Ok(Booking { session, payment })
    });

    match &result {
        Ok(booking) => {
            metrics::counter!("sessions_booked_total").increment(1);
            tracing::info!(
                session_id = %booking.session.id,
                mentor_id = %request.mentor_id,
                mentee_id = %request.mentee_id,
                "session booked"
            );
        }
        Err(AppError::Known { code: ErrorCode::SlotConflict, .. }) => {
            metrics::counter!("booking_conflicts_total").increment(1);
            tracing::debug!(mentor_id = %request.mentor_id, "booking conflict");
        }
        Err(_) => {}
    }

    result
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::Duration;

    use super::*;
    use crate::scheduling::availability::{project, BusinessCalendar};
    use crate::scheduling::memory_store::MemoryStore;
    use crate::scheduling::reschedule::reschedule;
    use crate::scheduling::status::set_status;
    use crate::scheduling::test_support::{at, caller, links, request, window};
    use mentora_shared::types::auth::AccountRole;

    fn book_window(store: &mut MemoryStore, mentor: Uuid, w: TimeWindow) -> AppResult<Booking> {
        book(store, &request(mentor, Uuid::now_v7(), w), &links())
    }

    #[test]
    fn booking_creates_session_slot_and_payment() {
        let mut store = MemoryStore::new();
        let mentor = store.add_mentor(5000);
        let mentee = Uuid::now_v7();

        let w = window((10, 0), (10, 30));

        let booking = book(&mut store, &request(mentor, mentee, w), &links()).unwrap();

        assert_eq!(booking.session.status, SessionStatus::Upcoming);
        assert_eq!(booking.session.price_minor, 5000);
        assert_eq!(booking.payment.amount_minor, 5000);
        assert_eq!(booking.payment.currency, "USD");
        assert_eq!(booking.payment.status, "completed");
        assert_eq!(booking.payment.session_id, booking.session.id);

        let slot_id = booking.session.slot_id.unwrap();
        let slot = store.slot_by_id(slot_id).unwrap();
        assert!(slot.is_booked);
        assert_eq!(slot.start_ts, booking.session.scheduled_start);
        assert_eq!(slot.end_ts, booking.session.scheduled_end);
    }

    #[test]
    fn unknown_mentor_is_rejected() {
        let mut store = MemoryStore::new();
        let err = book_window(&mut store, Uuid::now_v7(), window((10, 0), (10, 30))).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::MentorNotFound);
        assert!(store.slots().is_empty());
    }

    #[test]
    fn book_conflict_cancel_rebook() {
        let mut store = MemoryStore::new();
        let mentor = store.add_mentor(5000);
        let mentee = Uuid::now_v7();

        let w = window((10, 0), (10, 30));

        let first = book(&mut store, &request(mentor, mentee, w), &links()).unwrap();

        let err = book_window(&mut store, mentor, window((10, 15), (10, 45))).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::SlotConflict);
        assert_eq!(store.sessions().len(), 1);

        let me = caller(mentee, AccountRole::Mentee);
        set_status(&mut store, first.session.id, &me, SessionStatus::Cancelled).unwrap();

        let again = book_window(&mut store, mentor, window((10, 0), (10, 30))).unwrap();
        assert_eq!(again.session.slot_id, first.session.slot_id);
        assert_eq!(store.slots().len(), 1);
    }

    #[test]
    fn adjacent_windows_do_not_conflict() {
        let mut store = MemoryStore::new();
        let mentor = store.add_mentor(5000);

        book_window(&mut store, mentor, window((10, 0), (10, 30))).unwrap();
        book_window(&mut store, mentor, window((10, 30), (11, 0))).unwrap();
        assert_eq!(store.sessions().len(), 2);
    }

    #[test]
    fn past_session_still_blocks_booking() {
        let mut store = MemoryStore::new();
        let mentor = store.add_mentor(5000);
        let first = book_window(&mut store, mentor, window((10, 0), (10, 30))).unwrap();
        let me = caller(first.session.mentee_id, AccountRole::Mentee);
        set_status(&mut store, first.session.id, &me, SessionStatus::Past).unwrap();

        let err = book_window(&mut store, mentor, window((10, 0), (11, 0))).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::SlotConflict);
    }

    #[test]
    fn completed_window_can_be_booked_again() {
        let mut store = MemoryStore::new();
        let mentor = store.add_mentor(5000);
        let w = window((11, 0), (11, 30));
        let first = book_window(&mut store, mentor, w).unwrap();
        let me = caller(mentor, AccountRole::Mentor);
        set_status(&mut store, first.session.id, &me, SessionStatus::Completed).unwrap();

        let day = Some("2030-05-14");
        let projected =
            project(&mut store, &BusinessCalendar::default(), mentor, day, day).unwrap();
        let at_eleven = projected.iter().find(|s| s.start_ts == w.start).unwrap();
        assert!(!at_eleven.is_booked);

        let second = book_window(&mut store, mentor, w).unwrap();
        assert_eq!(second.session.slot_id, first.session.slot_id);
        assert_eq!(store.slots().len(), 1);

        let completed = store.sessions().iter().find(|s| s.id == first.session.id).unwrap();
        assert_eq!(completed.slot_id, None);
    }

    #[test]
    fn reschedule_onto_a_completed_window() {
        let mut store = MemoryStore::new();
        let mentor = store.add_mentor(5000);
        let w = window((11, 0), (11, 30));
        let done = book_window(&mut store, mentor, w).unwrap();
        let mentor_caller = caller(mentor, AccountRole::Mentor);
        set_status(&mut store, done.session.id, &mentor_caller, SessionStatus::Completed).unwrap();

        let other = book_window(&mut store, mentor, window((14, 0), (14, 30))).unwrap();
        let mentee = caller(other.session.mentee_id, AccountRole::Mentee);

        let moved = reschedule(&mut store, other.session.id, &mentee, w).unwrap();
        assert_eq!(moved.slot_id, done.session.slot_id);
        assert_eq!(moved.scheduled_start, w.start);
    }

    #[test]
    fn explicit_slot_is_used() {
        let mut store = MemoryStore::new();
        let mentor = store.add_mentor(5000);
        let w = window((14, 0), (14, 30));
        let slot = store.add_slot(mentor, &w, false);

        let request = BookingRequest {
            mentor_id: mentor,
            mentee_id: Uuid::now_v7(),
            window: w,
            slot_id: Some(slot),
        };
        let booking = book(&mut store, &request, &links()).unwrap();
        assert_eq!(booking.session.slot_id, Some(slot));
        assert_eq!(store.slots().len(), 1);
    }

    #[test]
    fn failed_payment_rolls_back_slot_and_session() {
        let mut store = MemoryStore::new();
        let mentor = store.add_mentor(5000);
        store.fail_payments = true;

        let err = book_window(&mut store, mentor, window((10, 0), (10, 30))).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::InternalError);
        assert!(store.sessions().is_empty());
        assert!(store.payments().is_empty());
        assert!(store.slots().iter().all(|s| !s.is_booked));

        store.fail_payments = false;
        book_window(&mut store, mentor, window((10, 0), (10, 30))).unwrap();
    }

    #[test]
    fn interleaved_overlapping_bookings_admit_one() {
        let mut store = MemoryStore::new();
        let mentor = store.add_mentor(5000);
        let store = Arc::new(Mutex::new(store));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let start = at(10, i * 3);
                    let w = TimeWindow::new(start, start + Duration::minutes(30)).unwrap();
                    let mut guard = store.lock().unwrap();
                    book_window(&mut guard, mentor, w).is_ok()
                })
            })
            .collect();

        let successes = handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count();
        assert_eq!(successes, 1);
        assert_eq!(store.lock().unwrap().sessions().len(), 1);
    }
}
