use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mentora_shared::clients::db::interact;
use mentora_shared::errors::{AppError, AppResult, ErrorCode};
use mentora_shared::middleware::MenteeUser;
use mentora_shared::types::auth::AuthUser;
use mentora_shared::types::{ApiResponse, Paginated, PaginationParams};

use super::json_body;
use crate::guard;
use crate::models::Session;
use crate::scheduling::{self, Booking, BookingRequest, PgScheduleStore, TimeWindow};
use crate::schema::sessions;
use crate::AppState;

// --- POST /sessions ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSessionRequest {
    pub mentor_id: Option<Uuid>,
    pub slot_id: Option<Uuid>,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
}

pub async fn book_session(
    MenteeUser(user): MenteeUser,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BookSessionRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<Booking>>)> {
    let req = json_body(payload)?;
    let (Some(mentor_id), Some(start), Some(end)) =
        (req.mentor_id, req.scheduled_start, req.scheduled_end)
    else {
        return Err(AppError::Validation(
            "mentorId, scheduledStart and scheduledEnd are required".into(),
        ));
    };

    let request = BookingRequest {
        mentor_id,
        mentee_id: user.id,
        window: TimeWindow::new(start, end)?,
        slot_id: req.slot_id,
    };
    let links = state.meeting_links.clone();

    let booking = interact(&state.db, move |conn| {
        scheduling::book(&mut PgScheduleStore::new(conn), &request, &links)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message(booking, "session booked successfully")),
    ))
}

// --- PUT /sessions/:id/reschedule ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleRequest {
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
}

pub async fn reschedule_session(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    payload: Result<Json<RescheduleRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<Session>>> {
    let req = json_body(payload)?;
    let (Some(start), Some(end)) = (req.scheduled_start, req.scheduled_end) else {
        return Err(AppError::Validation("scheduledStart and scheduledEnd are required".into()));
    };
    let window = TimeWindow::new(start, end)?;

    let session = interact(&state.db, move |conn| {
        scheduling::reschedule(&mut PgScheduleStore::new(conn), session_id, &user, window)
    })
    .await?;

    Ok(Json(ApiResponse::ok_with_message(session, "session rescheduled successfully")))
}

// --- PUT /sessions/:id/status ---

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

pub async fn update_status(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<Session>>> {
    let req = json_body(payload)?;
    let raw = req
        .status
        .ok_or_else(|| AppError::Validation("status is required".into()))?;
    let status = scheduling::parse_status(&raw)?;

    let session = interact(&state.db, move |conn| {
        scheduling::set_status(&mut PgScheduleStore::new(conn), session_id, &user, status)
    })
    .await?;

    Ok(Json(ApiResponse::ok_with_message(session, "session status updated")))
}

// --- PUT /sessions/update-expired ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpirySweep {
    pub updated_count: usize,
}

pub async fn update_expired(
    _user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<ExpirySweep>>> {
    let updated_count = interact(&state.db, |conn| {
        scheduling::mark_expired(&mut PgScheduleStore::new(conn), Utc::now())
    })
    .await?;

    Ok(Json(ApiResponse::ok(ExpirySweep { updated_count })))
}

// --- GET /sessions ---

#[derive(Debug, Deserialize)]
pub struct SessionFilter {
    pub status: Option<String>,
}

pub async fn list_sessions(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(filter): Query<SessionFilter>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Session>>>> {
    let status = filter
        .status
        .as_deref()
        .map(scheduling::parse_status)
        .transpose()?;

    let page = interact(&state.db, move |conn| {
        let owned = || {
            let mut query = sessions::table.into_boxed();
            query = if user.is_mentor() {
                query.filter(sessions::mentor_id.eq(user.id))
            } else {
                query.filter(sessions::mentee_id.eq(user.id))
            };
            if let Some(status) = status {
                query = query.filter(sessions::status.eq(status));
            }
            query
        };

        let total: i64 = owned().count().get_result(conn)?;
        let items = owned()
            .select(Session::as_select())
            .order(sessions::scheduled_start.desc())
            .limit(params.limit() as i64)
            .offset(params.offset() as i64)
            .load(conn)?;

        Ok(Paginated::new(items, total as u64, &params))
    })
    .await?;

    Ok(Json(ApiResponse::ok(page)))
}

// --- GET /sessions/:id ---

pub async fn get_session(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Session>>> {
    let session = interact(&state.db, move |conn| {
        Ok(sessions::table
            .find(session_id)
            .select(Session::as_select())
            .first(conn)
            .optional()?)
    })
    .await?
    .ok_or_else(|| AppError::new(ErrorCode::SessionNotFound, "session not found"))?;

    guard::authorize_ownership(&user, &session)?;
    Ok(Json(ApiResponse::ok(session)))
}
