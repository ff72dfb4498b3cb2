use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use diesel::prelude::*;

use mentora_shared::clients::db::interact;
use mentora_shared::errors::AppResult;
use mentora_shared::types::auth::AccountRole;
use mentora_shared::types::ApiResponse;

use crate::models::Major;
use crate::schema::majors;
use crate::AppState;

pub async fn list_majors(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<Major>>>> {
    let items = interact(&state.db, |conn| {
        Ok(majors::table
            .select(Major::as_select())
            .order(majors::name.asc())
            .load(conn)?)
    })
    .await?;
    Ok(Json(ApiResponse::ok(items)))
}

pub async fn list_roles() -> Json<ApiResponse<[AccountRole; 2]>> {
    Json(ApiResponse::ok(AccountRole::ALL))
}
