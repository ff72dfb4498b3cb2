use mentora_shared::errors::{AppError, AppResult};
use mentora_shared::types::auth::AuthUser;

use crate::models::Session;

/// The caller must be the session's mentor or mentee.
pub fn authorize_ownership(caller: &AuthUser, session: &Session) -> AppResult<()> {
    if caller.id == session.mentor_id || caller.id == session.mentee_id {
        return Ok(());
    }
    Err(AppError::forbidden("not authorized to access this session"))
}

pub fn authorize_session_mentee(caller: &AuthUser, session: &Session) -> AppResult<()> {
    if caller.id == session.mentee_id {
        return Ok(());
    }
    Err(AppError::forbidden("only the mentee who booked this session can reschedule it"))
}
