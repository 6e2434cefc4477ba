//! Login session model.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Represents a row in the `sessions` table.
///
/// Only the SHA-256 hash of the session token is stored; lookups go by that
/// hash, so it is not loaded back.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
