use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use mentora_shared::clients::db::interact;
use mentora_shared::errors::{AppError, AppResult, ErrorCode};
use mentora_shared::types::auth::{AccessToken, AccountRole, AuthUser};
use mentora_shared::types::ApiResponse;

use super::json_body;
use crate::models::{money, Account, NewAccount};
use crate::services::account_service::{self, DeletionSummary};
use crate::services::{auth_service, token_service};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AuthPayload {
    #[serde(flatten)]
    pub token: AccessToken,
    pub user: Account,
}

// --- POST /auth/register ---

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "first name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "last name is required"))]
    pub last_name: String,
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    pub password: String,
    #[validate(length(max = 30))]
    pub phone_number: Option<String>,
    pub role: AccountRole,
    pub major_id: Option<Uuid>,
    #[validate(url(message = "invalid linkedin url"))]
    pub linkedin_url: Option<String>,
    /// In major currency units, e.g. `49.99`.
    #[validate(range(min = 0.0, max = 10000.0, message = "session price out of range"))]
    pub session_price: Option<f64>,
    #[validate(length(max = 2000))]
    pub bio: Option<String>,
}

impl RegisterRequest {
    /// Mentors must price their sessions; mentees never carry a price.
    fn price_minor(&self) -> AppResult<Option<i32>> {
        match (self.role, self.session_price) {
            (AccountRole::Mentor, None) => Err(AppError::new(
                ErrorCode::SessionPriceRequired,
                "mentors must set a session price",
            )),
            (AccountRole::Mentor, Some(price)) => Ok(Some(money::to_minor(price))),
            (AccountRole::Mentee, _) => Ok(None),
        }
    }
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<AuthPayload>>)> {
    let req = json_body(payload)?;
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;
    auth_service::validate_password(&req.password)?;
    let session_price_minor = req.price_minor()?;

    let account = interact(&state.db, move |conn| {
        let password_hash = auth_service::hash_password(&req.password)?;
        account_service::register(
            conn,
            NewAccount {
                id: Uuid::now_v7(),
                role: req.role.as_str().to_string(),
                major_id: req.major_id,
                first_name: req.first_name.trim().to_string(),
                last_name: req.last_name.trim().to_string(),
                email: req.email.to_lowercase(),
                phone_number: req.phone_number,
                password_hash,
                linkedin_url: req.linkedin_url,
                session_price_minor,
                bio: req.bio,
            },
        )
    })
    .await?;

    let token = token_service::create_access_token(
        account.id,
        account.role(),
        &account.email,
        &state.jwt,
        state.config.jwt_access_ttl,
    )?;

    tracing::info!(account_id = %account.id, role = %account.role, "account registered");

    let payload = AuthPayload { token, user: account };
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message(payload, "registration successful")),
    ))
}

// --- POST /auth/login ---

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<AuthPayload>>> {
    let req = json_body(payload)?;

    let account = interact(&state.db, move |conn| {
        let invalid = || AppError::new(ErrorCode::InvalidCredentials, "invalid email or password");
        let account = account_service::find_by_email(conn, &req.email)?.ok_or_else(invalid)?;
        if !auth_service::verify_password(&req.password, &account.password_hash)? {
            return Err(invalid());
        }
        Ok(account)
    })
    .await?;

    let token = token_service::create_access_token(
        account.id,
        account.role(),
        &account.email,
        &state.jwt,
        state.config.jwt_access_ttl,
    )?;

    tracing::info!(account_id = %account.id, "account logged in");

    Ok(Json(ApiResponse::ok(AuthPayload { token, user: account })))
}

// --- GET /auth/profile ---

pub async fn profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Account>>> {
    let account = interact(&state.db, move |conn| account_service::find_account(conn, user.id))
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::AccountNotFound, "account not found"))?;
    Ok(Json(ApiResponse::ok(account)))
}

// --- POST /auth/logout ---

/// Tokens are stateless; the client discards its copy.
pub async fn logout(user: AuthUser) -> Json<ApiResponse<()>> {
    tracing::info!(account_id = %user.id, token_id = %user.token_id, "account logged out");
    Json(ApiResponse::ok_with_message((), "logged out"))
}

// --- DELETE /auth/delete-account ---

pub async fn delete_account(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<DeletionSummary>>> {
    let summary = interact(&state.db, move |conn| {
        let account = account_service::find_account(conn, user.id)?
            .ok_or_else(|| AppError::new(ErrorCode::AccountNotFound, "account not found"))?;
        account_service::delete_account(conn, &account)
    })
    .await?;

    tracing::info!(
        account_id = %user.id,
        sessions_deleted = summary.sessions_deleted,
        "account deleted"
    );
    Ok(Json(ApiResponse::ok_with_message(summary, "account deleted")))
}
