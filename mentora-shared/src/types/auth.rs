use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The two kinds of marketplace account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    Mentor,
    Mentee,
}

impl AccountRole {
    pub const ALL: [AccountRole; 2] = [AccountRole::Mentor, AccountRole::Mentee];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::Mentor => "mentor",
            AccountRole::Mentee => "mentee",
        }
    }
}

impl std::fmt::Display for AccountRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mentor" => Ok(AccountRole::Mentor),
            "mentee" => Ok(AccountRole::Mentee),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: AccountRole,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

impl Claims {
    pub fn new(
        account_id: Uuid,
        role: AccountRole,
        email: impl Into<String>,
        duration_secs: i64,
    ) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: account_id,
            role,
            email: email.into(),
            iat: now,
            exp: now + duration_secs,
            jti: Uuid::now_v7(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: AccountRole,
    pub email: String,
    pub token_id: Uuid,
}

impl AuthUser {
    pub fn is_mentor(&self) -> bool {
        self.role == AccountRole::Mentor
    }

    pub fn is_mentee(&self) -> bool {
        self.role == AccountRole::Mentee
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
            email: claims.email,
            token_id: claims.jti,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl AccessToken {
    pub fn bearer(access_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}
