//! Session service - cookie-based login sessions.
//!
//! A session is a random 32-byte token. The browser holds
//! `<token>.<signature>` where the signature is HMAC-SHA256 over the token
//! keyed with the application secret; the database holds the SHA-256 hash of
//! the token. Tampered cookies are rejected before any query runs.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    config::SessionSettings,
    db::DbPool,
    error::AppError,
    models::{session::Session, user::User},
};

type HmacSha256 = Hmac<Sha256>;

/// Create a session for `user_id` and return the cookie value.
pub async fn create_session(
    pool: &DbPool,
    secret_key: &str,
    settings: &SessionSettings,
    user_id: Uuid,
) -> Result<String, AppError> {
    let token = generate_token();
    let expires_at = Utc::now() + settings.cookie_age;

    sqlx::query("INSERT INTO sessions (token_hash, user_id, expires_at) VALUES ($1, $2, $3)")
        .bind(hash_token(&token))
        .bind(user_id)
        .bind(expires_at)
        .execute(pool)
        .await?;

    tracing::debug!(%user_id, "session created");

    Ok(sign_token(secret_key, &token))
}

/// Resolve a cookie value to the logged-in user.
///
/// Expired sessions are deleted on sight. When `refresh` is set the expiry
/// is pushed forward by the configured cookie age.
pub async fn load_user(
    pool: &DbPool,
    secret_key: &str,
    settings: &SessionSettings,
    cookie_value: &str,
    refresh: bool,
) -> Result<User, AppError> {
    let token = verify_token(secret_key, cookie_value).ok_or(AppError::NotAuthenticated)?;
    let token_hash = hash_token(token);

    let session = sqlx::query_as::<_, Session>(
        "SELECT user_id, expires_at FROM sessions WHERE token_hash = $1",
    )
    .bind(&token_hash)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotAuthenticated)?;

    let now = Utc::now();
    if session.is_expired(now) {
        sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(&token_hash)
            .execute(pool)
            .await?;
        return Err(AppError::NotAuthenticated);
    }

    if refresh {
        sqlx::query("UPDATE sessions SET expires_at = $1 WHERE token_hash = $2")
            .bind(now + settings.cookie_age)
            .bind(&token_hash)
            .execute(pool)
            .await?;
    }

    let user = sqlx::query_as::<_, User>(
        "SELECT id, email, first_name, last_name, password_hash, created_at FROM users WHERE id = $1",
    )
    .bind(session.user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotAuthenticated)?;

    Ok(user)
}

/// Delete the session behind a cookie value. Unknown cookies are ignored.
pub async fn destroy_session(
    pool: &DbPool,
    secret_key: &str,
    cookie_value: &str,
) -> Result<(), AppError> {
    if let Some(token) = verify_token(secret_key, cookie_value) {
        sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(hash_token(token))
            .execute(pool)
            .await?;
    }
    Ok(())
}

/// Remove every expired session. Returns the number of rows deleted.
pub async fn purge_expired(pool: &DbPool) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Build the `Set-Cookie` value for a session.
pub fn session_cookie(settings: &SessionSettings, value: &str) -> String {
    build_cookie(settings, value, settings.cookie_age.num_seconds())
}

/// Build a `Set-Cookie` value that removes the session cookie.
pub fn clear_session_cookie(settings: &SessionSettings) -> String {
    build_cookie(settings, "", 0)
}

fn build_cookie(settings: &SessionSettings, value: &str, max_age_secs: i64) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; SameSite={}",
        settings.cookie_name,
        value,
        max_age_secs.max(0),
        settings.cookie_same_site
    );
    if settings.cookie_http_only {
        cookie.push_str("; HttpOnly");
    }
    if settings.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Extract a cookie by name from a `Cookie` request header.
pub fn get_cookie<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header.split(';').find_map(|part| {
        let (k, v) = part.trim().split_once('=')?;
        (k.trim() == name).then(|| v.trim())
    })
}

/// Generate a session token (32 random bytes, hex encoded).
fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn mac_for(secret_key: &str) -> HmacSha256 {
    // HMAC accepts keys of any length.
    HmacSha256::new_from_slice(secret_key.as_bytes()).expect("HMAC key length is valid")
}

fn sign_token(secret_key: &str, token: &str) -> String {
    let mut mac = mac_for(secret_key);
    mac.update(token.as_bytes());
    format!("{}.{}", token, hex::encode(mac.finalize().into_bytes()))
}

/// Return the token part of a signed cookie value if the signature matches.
fn verify_token<'a>(secret_key: &str, cookie_value: &'a str) -> Option<&'a str> {
    let (token, signature) = cookie_value.rsplit_once('.')?;
    let signature = hex::decode(signature).ok()?;
    let mut mac = mac_for(secret_key);
    mac.update(token.as_bytes());
    mac.verify_slice(&signature).ok()?;
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EnvVars, Settings};

    fn session_settings(production: bool) -> SessionSettings {
        let vars = EnvVars {
            app_env: production.then(|| "production".to_string()),
            secret_key: Some("test-secret-key-long-enough".into()),
            database_url: Some("postgres://localhost/test".into()),
            server_port: 3000,
            ..Default::default()
        };
        Settings::resolve(vars).unwrap().session
    }

    #[test]
    fn signed_token_verifies_with_same_key() {
        let signed = sign_token("k1", "abc123");
        assert_eq!(verify_token("k1", &signed), Some("abc123"));
    }

    #[test]
    fn tampered_or_foreign_cookies_are_rejected() {
        let signed = sign_token("k1", "abc123");
        assert_eq!(verify_token("k2", &signed), None);
        assert_eq!(verify_token("k1", &signed.replace("abc", "abd")), None);
        assert_eq!(verify_token("k1", "abc123"), None);
        assert_eq!(verify_token("k1", "abc123.zz"), None);
    }

    #[test]
    fn tokens_are_unique_and_hashes_are_hex() {
        let (a, b) = (generate_token(), generate_token());
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
        let hash = hash_token(&a);
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn production_cookie_is_hardened() {
        let cookie = session_cookie(&session_settings(true), "v");
        assert_eq!(
            cookie,
            "sessionid=v; Path=/; Max-Age=86400; SameSite=Strict; HttpOnly; Secure"
        );
    }

    #[test]
    fn local_cookie_is_not_secure() {
        let cookie = session_cookie(&session_settings(false), "v");
        assert!(!cookie.contains("Secure"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
    }

    #[test]
    fn clearing_cookie_expires_it() {
        let cookie = clear_session_cookie(&session_settings(false));
        assert!(cookie.starts_with("sessionid=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn cookie_header_lookup() {
        let header = "theme=dark; sessionid=abc.def ; other=1";
        assert_eq!(get_cookie(header, "sessionid"), Some("abc.def"));
        assert_eq!(get_cookie(header, "missing"), None);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn session_lives_until_logout(pool: DbPool) {
        let (user, _) =
            crate::services::account_service::tests::open_account(&pool, "jane@example.com").await;
        let settings = session_settings(false);

        let cookie = create_session(&pool, "key", &settings, user.id).await.unwrap();
        let loaded = load_user(&pool, "key", &settings, &cookie, true).await.unwrap();
        assert_eq!(loaded.id, user.id);

        assert!(matches!(
            load_user(&pool, "another-key", &settings, &cookie, false).await,
            Err(AppError::NotAuthenticated)
        ));

        destroy_session(&pool, "key", &cookie).await.unwrap();
        assert!(matches!(
            load_user(&pool, "key", &settings, &cookie, false).await,
            Err(AppError::NotAuthenticated)
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn expired_session_is_deleted_on_sight(pool: DbPool) {
        let (user, _) =
            crate::services::account_service::tests::open_account(&pool, "jane@example.com").await;
        let settings = session_settings(false);
        let cookie = create_session(&pool, "key", &settings, user.id).await.unwrap();
        sqlx::query("UPDATE sessions SET expires_at = NOW() - INTERVAL '1 minute'")
            .execute(&pool)
            .await
            .unwrap();

        assert!(matches!(
            load_user(&pool, "key", &settings, &cookie, true).await,
            Err(AppError::NotAuthenticated)
        ));
        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
