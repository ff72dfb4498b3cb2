use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::errors::{AppError, ErrorCode};
use crate::types::auth::{AccountRole, AuthUser, Claims};

/// HS256 signing secret, pulled out of the router state by the auth extractors.
#[derive(Clone)]
pub struct JwtSecret(pub Arc<str>);

/// Router state that can hand the auth extractors a signing secret.
pub trait HasJwtSecret {
    fn jwt_secret(&self) -> &JwtSecret;
}

impl<T: HasJwtSecret> HasJwtSecret for Arc<T> {
    fn jwt_secret(&self) -> &JwtSecret {
        (**self).jwt_secret()
    }
}

impl JwtSecret {
    pub fn new(secret: impl AsRef<str>) -> Self {
        Self(Arc::from(secret.as_ref()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: HasJwtSecret + Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)?;
        let claims = validate_jwt(token, state.jwt_secret())?;

        if claims.is_expired() {
            return Err(AppError::new(ErrorCode::TokenExpired, "token has expired"));
        }

        Ok(AuthUser::from(claims))
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::new(ErrorCode::Unauthorized, "access token required"))?
        .to_str()
        .map_err(|_| AppError::new(ErrorCode::Unauthorized, "invalid authorization header"))?;

    auth_header
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            AppError::new(ErrorCode::Unauthorized, "authorization header must use Bearer scheme")
        })
}

pub fn validate_jwt(token: &str, secret: &JwtSecret) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::new(ErrorCode::TokenExpired, "token has expired")
        }
        _ => AppError::new(ErrorCode::TokenInvalid, format!("invalid token: {e}")),
    })?;

    Ok(token_data.claims)
}

/// Require the mentee role.
pub struct MenteeUser(pub AuthUser);

#[axum::async_trait]
impl<S> FromRequestParts<S> for MenteeUser
where
    S: HasJwtSecret + Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        require_role(&user, AccountRole::Mentee)?;
        Ok(Self(user))
    }
}

/// Require the mentor role.
pub struct MentorUser(pub AuthUser);

#[axum::async_trait]
impl<S> FromRequestParts<S> for MentorUser
where
    S: HasJwtSecret + Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        require_role(&user, AccountRole::Mentor)?;
        Ok(Self(user))
    }
}

pub fn require_role(user: &AuthUser, role: AccountRole) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::new(
            ErrorCode::Forbidden,
            format!("access denied, {role} role required"),
        ));
    }
    Ok(())
}
