use uuid::Uuid;

use mentora_shared::errors::{AppError, AppResult, ErrorCode};
use mentora_shared::types::auth::AuthUser;

use super::slots::release_slot;
use super::{session_not_found, slot_conflict, TimeWindow, TransactionalStore, BOOKING_BLOCKERS};
use crate::guard;
use crate::models::{Session, SessionStatus};

pub fn parse_status(raw: &str) -> AppResult<SessionStatus> {
    raw.parse()
        .map_err(|e: String| AppError::new(ErrorCode::UnknownSessionStatus, e))
}

/// Writes a new status on behalf of one of the session's participants.
/// Cancelling frees and detaches the slot. Repeating a status is a no-op
/// apart from `updatedAt`; a cancelled session cannot be revived. Moving a
/// session back into a blocking status passes the same overlap check as a
/// new booking.
pub fn set_status<S: TransactionalStore>(
    store: &mut S,
    session_id: Uuid,
    caller: &AuthUser,
    status: SessionStatus,
) -> AppResult<Session> {
    let session = store.atomically(|tx| {
        let session = tx.session(session_id)?.ok_or_else(session_not_found)?;
        guard::authorize_ownership(caller, &session)?;

        if session.status == SessionStatus::Cancelled && status != SessionStatus::Cancelled {
            return Err(AppError::new(
                ErrorCode::InvalidSessionState,
                "a cancelled session cannot change status",
            ));
        }

        let revives = BOOKING_BLOCKERS.contains(&status)
            && !BOOKING_BLOCKERS.contains(&session.status);
        if revives {
            let clashes = tx.overlapping_sessions(
                session.mentor_id,
                &TimeWindow {
                    start: session.scheduled_start,
                    end: session.scheduled_end,
                },
                BOOKING_BLOCKERS,
                Some(session.id),
            )?;
            if !clashes.is_empty() {
                return Err(slot_conflict());
            }
        }

        if status == SessionStatus::Cancelled {
            release_slot(tx, session.slot_id)?;
            tx.set_session_status(session.id, status, true)
        } else {
            tx.set_session_status(session.id, status, false)
        }
    })?;

    tracing::info!(
        session_id = %session.id,
        status = %session.status,
        caller = %caller.id,
        "session status updated"
    );
    Ok(session)
}
