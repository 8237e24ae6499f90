//! Store seams the service depends on.
//!
//! The replay engine and this orchestration layer never see a concrete
//! database connection — only these traits. Production wiring injects the
//! Postgres implementations from `folio-db`; tests inject the in-memory
//! implementations from `folio-testkit`.

use std::sync::Arc;

use async_trait::async_trait;
use folio_ledger::LedgerEvent;
use folio_schemas::{Note, UserAccount, WatchlistEntry};
use uuid::Uuid;

use crate::service::Snapshot;

/// Errors surfaced by store implementations.
#[derive(Debug)]
pub enum StoreError {
    /// The addressed row does not exist.
    NotFound,
    /// Backend failure (connection, serialization, constraint).
    Backend(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Backend(msg) => write!(f, "store backend error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Append-only per-portfolio event log, keyed by `(user_id, portfolio_no)`.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// All events for one portfolio in ascending `(date, insertion_order)`.
    async fn list_events(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
    ) -> Result<Vec<LedgerEvent>, StoreError>;

    /// Persist a new event. The caller has already assigned `insertion_order`
    /// under the portfolio lock; the store writes it verbatim.
    async fn append_event(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
        event: &LedgerEvent,
    ) -> Result<(), StoreError>;

    /// Remove one event from the log.
    async fn remove_event(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
        event_id: Uuid,
    ) -> Result<(), StoreError>;

    /// Replace one event in place (same id, same insertion_order).
    async fn replace_event(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
        event: &LedgerEvent,
    ) -> Result<(), StoreError>;
}

/// Derived-state store: the materialized `(cash, positions)` snapshot.
#[async_trait]
pub trait PortfolioStore: Send + Sync {
    async fn write_snapshot(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
        snapshot: &Snapshot,
    ) -> Result<(), StoreError>;

    async fn read_snapshot(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
    ) -> Result<Option<Snapshot>, StoreError>;
}

/// Account records and MFA state.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: &UserAccount) -> Result<(), StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError>;
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserAccount>, StoreError>;
    /// Store a freshly generated TOTP secret with MFA still disabled.
    async fn set_mfa_secret(&self, user_id: Uuid, secret: &str) -> Result<(), StoreError>;
    async fn enable_mfa(&self, user_id: Uuid) -> Result<(), StoreError>;
}

/// Per-user watchlist.
#[async_trait]
pub trait WatchlistStore: Send + Sync {
    async fn insert_entry(&self, entry: &WatchlistEntry) -> Result<(), StoreError>;
    async fn list_entries(&self, user_id: Uuid) -> Result<Vec<WatchlistEntry>, StoreError>;
    /// Returns false when the entry did not exist.
    async fn remove_entry(&self, user_id: Uuid, entry_id: Uuid) -> Result<bool, StoreError>;
    async fn count_entries(&self, user_id: Uuid) -> Result<usize, StoreError>;
}

/// Per-user notes.
#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn insert_note(&self, note: &Note) -> Result<(), StoreError>;
    async fn list_notes(&self, user_id: Uuid) -> Result<Vec<Note>, StoreError>;
    /// Returns false when the note did not exist.
    async fn update_note(
        &self,
        user_id: Uuid,
        note_id: Uuid,
        title: &str,
        body: &str,
    ) -> Result<bool, StoreError>;
    /// Returns false when the note did not exist.
    async fn delete_note(&self, user_id: Uuid, note_id: Uuid) -> Result<bool, StoreError>;
    async fn count_notes(&self, user_id: Uuid) -> Result<usize, StoreError>;
}

// ---------------------------------------------------------------------------
// Arc delegation
// ---------------------------------------------------------------------------
// The daemon holds stores as `Arc<dyn …>`; delegate so `PortfolioService`
// can be instantiated over trait objects as well as concrete types.

#[async_trait]
impl<T: EventStore + ?Sized> EventStore for Arc<T> {
    async fn list_events(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
    ) -> Result<Vec<LedgerEvent>, StoreError> {
        (**self).list_events(user_id, portfolio_no).await
    }

    async fn append_event(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
        event: &LedgerEvent,
    ) -> Result<(), StoreError> {
        (**self).append_event(user_id, portfolio_no, event).await
    }

    async fn remove_event(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
        event_id: Uuid,
    ) -> Result<(), StoreError> {
        (**self).remove_event(user_id, portfolio_no, event_id).await
    }

    async fn replace_event(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
        event: &LedgerEvent,
    ) -> Result<(), StoreError> {
        (**self).replace_event(user_id, portfolio_no, event).await
    }
}

#[async_trait]
impl<T: PortfolioStore + ?Sized> PortfolioStore for Arc<T> {
    async fn write_snapshot(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
        snapshot: &Snapshot,
    ) -> Result<(), StoreError> {
        (**self).write_snapshot(user_id, portfolio_no, snapshot).await
    }

    async fn read_snapshot(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
    ) -> Result<Option<Snapshot>, StoreError> {
        (**self).read_snapshot(user_id, portfolio_no).await
    }
}
