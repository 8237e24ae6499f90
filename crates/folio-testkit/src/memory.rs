use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use folio_ledger::{sort_events_canonical, LedgerEvent};
use folio_schemas::{Note, UserAccount, WatchlistEntry};
use folio_service::{
    EventStore, NoteStore, PortfolioStore, Snapshot, StoreError, UserStore, WatchlistStore,
};
use tokio::sync::RwLock;
use uuid::Uuid;

type Key = (Uuid, i32);

/// In-memory append-only event log, one vec per `(user, portfolio)`.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    inner: Arc<RwLock<HashMap<Key, Vec<LedgerEvent>>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw event count across all portfolios (test assertions).
    pub async fn total_events(&self) -> usize {
        self.inner.read().await.values().map(|v| v.len()).sum()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn list_events(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
    ) -> Result<Vec<LedgerEvent>, StoreError> {
        let mut events = self
            .inner
            .read()
            .await
            .get(&(user_id, portfolio_no))
            .cloned()
            .unwrap_or_default();
        sort_events_canonical(&mut events);
        Ok(events)
    }

    async fn append_event(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
        event: &LedgerEvent,
    ) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .entry((user_id, portfolio_no))
            .or_default()
            .push(event.clone());
        Ok(())
    }

    async fn remove_event(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
        event_id: Uuid,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let log = inner
            .get_mut(&(user_id, portfolio_no))
            .ok_or(StoreError::NotFound)?;
        let before = log.len();
        log.retain(|e| e.id != event_id);
        if log.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn replace_event(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
        event: &LedgerEvent,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let log = inner
            .get_mut(&(user_id, portfolio_no))
            .ok_or(StoreError::NotFound)?;
        match log.iter_mut().find(|e| e.id == event.id) {
            Some(slot) => {
                *slot = event.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }
}

/// In-memory snapshot store.
#[derive(Clone, Default)]
pub struct InMemoryPortfolioStore {
    inner: Arc<RwLock<HashMap<Key, Snapshot>>>,
}

impl InMemoryPortfolioStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PortfolioStore for InMemoryPortfolioStore {
    async fn write_snapshot(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
        snapshot: &Snapshot,
    ) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .insert((user_id, portfolio_no), snapshot.clone());
        Ok(())
    }

    async fn read_snapshot(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
    ) -> Result<Option<Snapshot>, StoreError> {
        Ok(self.inner.read().await.get(&(user_id, portfolio_no)).cloned())
    }
}

// ---------------------------------------------------------------------------
// InMemoryUserStore / InMemoryWatchlistStore / InMemoryNoteStore
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    inner: Arc<RwLock<HashMap<Uuid, UserAccount>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert_user(&self, user: &UserAccount) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.values().any(|u| u.email == user.email) {
            return Err(StoreError::Backend("email already registered".to_string()));
        }
        inner.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserAccount>, StoreError> {
        Ok(self.inner.read().await.get(&user_id).cloned())
    }

    async fn set_mfa_secret(&self, user_id: Uuid, secret: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let user = inner.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.mfa_secret = Some(secret.to_string());
        user.mfa_enabled = false;
        Ok(())
    }

    async fn enable_mfa(&self, user_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let user = inner.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.mfa_enabled = true;
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryWatchlistStore {
    inner: Arc<RwLock<HashMap<Uuid, Vec<WatchlistEntry>>>>,
}

impl InMemoryWatchlistStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WatchlistStore for InMemoryWatchlistStore {
    async fn insert_entry(&self, entry: &WatchlistEntry) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let list = inner.entry(entry.user_id).or_default();
        if !list.iter().any(|e| e.symbol == entry.symbol) {
            list.push(entry.clone());
        }
        Ok(())
    }

    async fn list_entries(&self, user_id: Uuid) -> Result<Vec<WatchlistEntry>, StoreError> {
        Ok(self.inner.read().await.get(&user_id).cloned().unwrap_or_default())
    }

    async fn remove_entry(&self, user_id: Uuid, entry_id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(list) = inner.get_mut(&user_id) else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|e| e.entry_id != entry_id);
        Ok(list.len() != before)
    }

    async fn count_entries(&self, user_id: Uuid) -> Result<usize, StoreError> {
        Ok(self.inner.read().await.get(&user_id).map(|l| l.len()).unwrap_or(0))
    }
}

#[derive(Clone, Default)]
pub struct InMemoryNoteStore {
    inner: Arc<RwLock<HashMap<Uuid, Vec<Note>>>>,
}

impl InMemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NoteStore for InMemoryNoteStore {
    async fn insert_note(&self, note: &Note) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .entry(note.user_id)
            .or_default()
            .push(note.clone());
        Ok(())
    }

    async fn list_notes(&self, user_id: Uuid) -> Result<Vec<Note>, StoreError> {
        Ok(self.inner.read().await.get(&user_id).cloned().unwrap_or_default())
    }

    async fn update_note(
        &self,
        user_id: Uuid,
        note_id: Uuid,
        title: &str,
        body: &str,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(list) = inner.get_mut(&user_id) else {
            return Ok(false);
        };
        match list.iter_mut().find(|n| n.note_id == note_id) {
            Some(note) => {
                note.title = title.to_string();
                note.body = body.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_note(&self, user_id: Uuid, note_id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(list) = inner.get_mut(&user_id) else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|n| n.note_id != note_id);
        Ok(list.len() != before)
    }

    async fn count_notes(&self, user_id: Uuid) -> Result<usize, StoreError> {
        Ok(self.inner.read().await.get(&user_id).map(|l| l.len()).unwrap_or(0))
    }
}
