//! Password validation and argon2 hashing.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};

use crate::error::AppError;

pub const MIN_PASSWORD_LENGTH: usize = 8;

const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "password123",
    "12345678",
    "123456789",
    "1234567890",
    "qwerty123",
    "qwertyuiop",
    "iloveyou",
    "sunshine",
    "princess",
    "football",
    "baseball",
    "welcome1",
    "letmein1",
    "trustno1",
    "abc12345",
    "passw0rd",
    "superman",
    "11111111",
];

/// Check a candidate password against the registration rules.
///
/// Returns every violated rule, not just the first one.
pub fn validate_password(
    password: &str,
    email: &str,
    first_name: &str,
    last_name: &str,
) -> Result<(), Vec<String>> {
    let mut problems = Vec::new();
    let lowered = password.to_lowercase();

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        problems.push(format!(
            "This password is too short. It must contain at least {MIN_PASSWORD_LENGTH} characters."
        ));
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }
    if COMMON_PASSWORDS.contains(&lowered.trim()) {
        problems.push("This password is too common.".to_string());
    }

    let local_part = email.split('@').next().unwrap_or_default().to_lowercase();
    let attributes = [local_part, first_name.to_lowercase(), last_name.to_lowercase()];
    if attributes
        .iter()
        .filter(|a| a.chars().count() >= 3)
        .any(|a| lowered.contains(a.as_str()) || a.contains(lowered.as_str()))
    {
        problems.push("The password is too similar to your personal information.".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems)
    }
}

/// Hash a password into an argon2 PHC string.
///
/// Argon2 is CPU-bound, so the work runs on the blocking thread pool.
pub async fn hash_password(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_with_argon2(&password))
        .await
        .map_err(|_| AppError::PasswordHash)?
}

/// Verify a password against a stored PHC string on the blocking pool.
///
/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(password: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || verify_with_argon2(&password, &hash))
        .await
        .unwrap_or(false)
}

fn hash_with_argon2(password: &str) -> Result<String, AppError> {
    let salt_bytes: [u8; 16] = rand::random();
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|_| AppError::PasswordHash)?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| AppError::PasswordHash)?
        .to_string();
    Ok(hash)
}

fn verify_with_argon2(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
