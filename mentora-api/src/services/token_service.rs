use jsonwebtoken::{encode, EncodingKey, Header};
use uuid::Uuid;

use mentora_shared::errors::AppError;
use mentora_shared::middleware::JwtSecret;
use mentora_shared::types::auth::{AccessToken, AccountRole, Claims};

pub fn create_access_token(
    account_id: Uuid,
    role: AccountRole,
    email: &str,
    secret: &JwtSecret,
    ttl_secs: i64,
) -> Result<AccessToken, AppError> {
    let claims = Claims::new(account_id, role, email, ttl_secs);
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(format!("JWT encoding failed: {e}")))?;
    Ok(AccessToken::bearer(token, ttl_secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentora_shared::middleware::validate_jwt;

    #[test]
    fn issued_token_validates() {
        let secret = JwtSecret::new("unit-test-secret");
        let id = Uuid::now_v7();

        let token =
            create_access_token(id, AccountRole::Mentee, "sam@example.com", &secret, 3600).unwrap();
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, 3600);

        let claims = validate_jwt(&token.access_token, &secret).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, AccountRole::Mentee);
        assert_eq!(claims.email, "sam@example.com");
    }
}
