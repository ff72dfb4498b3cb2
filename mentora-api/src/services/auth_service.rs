use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use mentora_shared::errors::{AppError, ErrorCode};

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::internal(format!("could not hash password: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::internal(format!("stored password hash is malformed: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

type PasswordRule = (fn(&str) -> bool, &'static str);

const PASSWORD_RULES: [PasswordRule; 3] = [
    (|p| p.chars().count() >= 8, "password must be at least 8 characters"),
    (|p| p.chars().any(|c| c.is_ascii_digit()), "password must contain at least one number"),
    (|p| p.chars().any(|c| c.is_ascii_alphabetic()), "password must contain at least one letter"),
];

pub fn validate_password(password: &str) -> Result<(), AppError> {
    match PASSWORD_RULES.iter().find(|(ok, _)| !ok(password)) {
        Some((_, message)) => Err(AppError::new(ErrorCode::PasswordTooWeak, *message)),
        None => Ok(()),
    }
}
