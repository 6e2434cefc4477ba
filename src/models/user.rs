//! User data models and API request/response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::account::AccountResponse;

/// Represents a user record from the `users` table.
///
/// Users log in with their email address. The password is stored as an
/// argon2 PHC string and never leaves the server.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Request body for `POST /accounts/register`.
///
/// # JSON Example
///
/// ```json
/// {
///   "email": "jane@example.com",
///   "first_name": "Jane",
///   "last_name": "Doe",
///   "password": "correct horse battery",
///   "account_type": "Savings"
/// }
/// ```
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 150, message = "First name is too long."))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150, message = "Last name is too long."))]
    pub last_name: String,
    pub password: String,
    /// Name of a row in `bank_account_types` (defaults to "Savings")
    #[serde(default = "default_account_type")]
    pub account_type: String,
}

fn default_account_type() -> String {
    "Savings".to_string()
}

/// Request body for `POST /accounts/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            created_at: user.created_at,
        }
    }
}

/// Response body for register, login and `GET /accounts/me`.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserResponse,
    pub account: AccountResponse,
}
