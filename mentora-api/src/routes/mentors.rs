use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use mentora_shared::clients::db::interact;
use mentora_shared::errors::AppResult;
use mentora_shared::types::ApiResponse;

use crate::models::MentorProfile;
use crate::scheduling::availability::{self, VirtualSlot};
use crate::scheduling::PgScheduleStore;
use crate::services::account_service;
use crate::AppState;

// --- GET /mentors/:id ---

pub async fn get_mentor(
    State(state): State<Arc<AppState>>,
    Path(mentor_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MentorProfile>>> {
    let mentor =
        interact(&state.db, move |conn| account_service::find_mentor(conn, mentor_id)).await?;
    Ok(Json(ApiResponse::ok(MentorProfile::from(mentor))))
}

// --- GET /mentors/:id/availability ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

pub async fn availability(
    State(state): State<Arc<AppState>>,
    Path(mentor_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<ApiResponse<Vec<VirtualSlot>>>> {
    let calendar = state.calendar;
    let slots = interact(&state.db, move |conn| {
        availability::project(
            &mut PgScheduleStore::new(conn),
            &calendar,
            mentor_id,
            query.start_date.as_deref(),
            query.end_date.as_deref(),
        )
    })
    .await?;

    Ok(Json(ApiResponse::ok(slots)))
}
