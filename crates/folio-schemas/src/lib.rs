use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub user_id: Uuid,
    pub email: String,
    /// PHC-format argon2 hash, never the raw password.
    pub password_hash: String,
    /// Base32 TOTP secret; present once MFA setup has been initiated.
    pub mfa_secret: Option<String>,
    /// MFA is enforced at login only after the user confirmed a valid code.
    pub mfa_enabled: bool,
    pub created_at_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub entry_id: Uuid,
    pub user_id: Uuid,
    pub symbol: String,
    pub added_at_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub note_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

/// Latest close for one symbol as returned by the quote provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub symbol: String,
    pub close: f64,
    pub as_of_utc: DateTime<Utc>,
}
