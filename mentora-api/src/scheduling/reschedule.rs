use uuid::Uuid;

use mentora_shared::errors::{AppError, AppResult, ErrorCode};
use mentora_shared::types::auth::AuthUser;

use super::slots::{claim_slot, release_slot};
use super::{
    session_not_found, slot_conflict, TimeWindow, TransactionalStore, RESCHEDULE_BLOCKERS,
};
use crate::guard;
use crate::models::{Session, SessionStatus};

/// Moves an upcoming session to `window`: the old slot is freed, the new one
/// claimed and the session rewritten, all in one transaction.
pub fn reschedule<S: TransactionalStore>(
    store: &mut S,
    session_id: Uuid,
    caller: &AuthUser,
    window: TimeWindow,
) -> AppResult<Session> {
    let session = store.atomically(|tx| {
        let session = tx.session(session_id)?.ok_or_else(session_not_found)?;
        guard::authorize_session_mentee(caller, &session)?;

        if session.status != SessionStatus::Upcoming {
            return Err(AppError::new(
                ErrorCode::InvalidSessionState,
                format!("cannot reschedule a {} session", session.status),
            ));
        }

        let clashes = tx.overlapping_sessions(
            session.mentor_id,
            &window,
            RESCHEDULE_BLOCKERS,
            Some(session.id),
        )?;
        if !clashes.is_empty() {
            return Err(slot_conflict());
        }

        release_slot(tx, session.slot_id)?;
        let slot = claim_slot(tx, session.mentor_id, &window, None)?;
        tx.move_session(session.id, slot.id, &window)
    })?;

    tracing::info!(
        session_id = %session.id,
        start = %session.scheduled_start,
        end = %session.scheduled_end,
        "session rescheduled"
    );
    Ok(session)
}
