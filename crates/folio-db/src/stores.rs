//! Postgres implementations of the service store seams.
//!
//! Every query is scoped by `(user_id, portfolio_no)`; the service layer
//! holds the per-portfolio lock across list → replay → write, so these
//! implementations never see interleaved writers for one portfolio.

use async_trait::async_trait;
use folio_ledger::{LedgerEvent, Position};
use folio_schemas::{Note, UserAccount, WatchlistEntry};
use folio_service::{
    EventStore, NoteStore, PortfolioStore, Snapshot, StoreError, UserStore, WatchlistStore,
};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{kind_as_str, parse_kind};

fn backend(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

// ---------------------------------------------------------------------------
// PgEventStore
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn event_from_row(row: sqlx::postgres::PgRow) -> Result<LedgerEvent, StoreError> {
    let kind: String = row.try_get("kind").map_err(backend)?;
    Ok(LedgerEvent {
        id: row.try_get("event_id").map_err(backend)?,
        kind: parse_kind(&kind).map_err(backend)?,
        symbol: row.try_get("symbol").map_err(backend)?,
        shares: row.try_get("shares").map_err(backend)?,
        price: row.try_get("price").map_err(backend)?,
        total: row.try_get("total").map_err(backend)?,
        leverage: row.try_get("leverage").map_err(backend)?,
        date: row.try_get("trade_date").map_err(backend)?,
        insertion_order: row.try_get("insertion_order").map_err(backend)?,
    })
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn list_events(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
    ) -> Result<Vec<LedgerEvent>, StoreError> {
        let rows = sqlx::query(
            r#"
            select event_id, kind, symbol, shares, price, total, leverage,
                   trade_date, insertion_order
            from events
            where user_id = $1 and portfolio_no = $2
            order by trade_date, insertion_order
            "#,
        )
        .bind(user_id)
        .bind(portfolio_no)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(event_from_row).collect()
    }

    async fn append_event(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
        event: &LedgerEvent,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            insert into events (
              event_id, user_id, portfolio_no, kind, symbol, shares, price,
              total, leverage, trade_date, insertion_order
            ) values (
              $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11
            )
            "#,
        )
        .bind(event.id)
        .bind(user_id)
        .bind(portfolio_no)
        .bind(kind_as_str(event.kind))
        .bind(&event.symbol)
        .bind(event.shares)
        .bind(event.price)
        .bind(event.total)
        .bind(event.leverage)
        .bind(event.date)
        .bind(event.insertion_order)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn remove_event(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
        event_id: Uuid,
    ) -> Result<(), StoreError> {
        let res = sqlx::query(
            "delete from events where user_id = $1 and portfolio_no = $2 and event_id = $3",
        )
        .bind(user_id)
        .bind(portfolio_no)
        .bind(event_id)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if res.rows_affected() == 0 {
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
        let res = sqlx::query(
            r#"
            update events set
              kind = $4, symbol = $5, shares = $6, price = $7, total = $8,
              leverage = $9, trade_date = $10
            where user_id = $1 and portfolio_no = $2 and event_id = $3
            "#,
        )
        .bind(user_id)
        .bind(portfolio_no)
        .bind(event.id)
        .bind(kind_as_str(event.kind))
        .bind(&event.symbol)
        .bind(event.shares)
        .bind(event.price)
        .bind(event.total)
        .bind(event.leverage)
        .bind(event.date)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PgPortfolioStore
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgPortfolioStore {
    pool: PgPool,
}

impl PgPortfolioStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PortfolioStore for PgPortfolioStore {
    async fn write_snapshot(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
        snapshot: &Snapshot,
    ) -> Result<(), StoreError> {
        let positions = serde_json::to_value(&snapshot.positions).map_err(backend)?;
        sqlx::query(
            r#"
            insert into snapshots (user_id, portfolio_no, cash, base_value, positions, updated_at_utc)
            values ($1, $2, $3, $4, $5, now())
            on conflict (user_id, portfolio_no) do update set
              cash = excluded.cash,
              base_value = excluded.base_value,
              positions = excluded.positions,
              updated_at_utc = now()
            "#,
        )
        .bind(user_id)
        .bind(portfolio_no)
        .bind(snapshot.cash)
        .bind(snapshot.base_value)
        .bind(positions)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn read_snapshot(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
    ) -> Result<Option<Snapshot>, StoreError> {
        let row = sqlx::query(
            r#"
            select cash, base_value, positions
            from snapshots
            where user_id = $1 and portfolio_no = $2
            "#,
        )
        .bind(user_id)
        .bind(portfolio_no)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let positions: Vec<Position> =
            serde_json::from_value(row.try_get("positions").map_err(backend)?)
                .map_err(backend)?;
        Ok(Some(Snapshot {
            cash: row.try_get("cash").map_err(backend)?,
            base_value: row.try_get("base_value").map_err(backend)?,
            positions,
        }))
    }
}

// ---------------------------------------------------------------------------
// PgUserStore / PgWatchlistStore / PgNoteStore
// ---------------------------------------------------------------------------
// Thin trait adapters over the CRUD functions in `lib.rs`.

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert_user(&self, user: &UserAccount) -> Result<(), StoreError> {
        crate::insert_user(&self.pool, user).await.map_err(backend)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        crate::find_user_by_email(&self.pool, email)
            .await
            .map_err(backend)
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserAccount>, StoreError> {
        crate::find_user_by_id(&self.pool, user_id)
            .await
            .map_err(backend)
    }

    async fn set_mfa_secret(&self, user_id: Uuid, secret: &str) -> Result<(), StoreError> {
        crate::set_mfa_secret(&self.pool, user_id, secret)
            .await
            .map_err(backend)
    }

    async fn enable_mfa(&self, user_id: Uuid) -> Result<(), StoreError> {
        crate::enable_mfa(&self.pool, user_id).await.map_err(backend)
    }
}

#[derive(Clone)]
pub struct PgWatchlistStore {
    pool: PgPool,
}

impl PgWatchlistStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WatchlistStore for PgWatchlistStore {
    async fn insert_entry(&self, entry: &WatchlistEntry) -> Result<(), StoreError> {
        crate::insert_watchlist_entry(&self.pool, entry)
            .await
            .map_err(backend)
    }

    async fn list_entries(&self, user_id: Uuid) -> Result<Vec<WatchlistEntry>, StoreError> {
        crate::list_watchlist(&self.pool, user_id)
            .await
            .map_err(backend)
    }

    async fn remove_entry(&self, user_id: Uuid, entry_id: Uuid) -> Result<bool, StoreError> {
        crate::remove_watchlist_entry(&self.pool, user_id, entry_id)
            .await
            .map_err(backend)
    }

    async fn count_entries(&self, user_id: Uuid) -> Result<usize, StoreError> {
        crate::count_watchlist(&self.pool, user_id)
            .await
            .map(|n| n as usize)
            .map_err(backend)
    }
}

#[derive(Clone)]
pub struct PgNoteStore {
    pool: PgPool,
}

impl PgNoteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteStore for PgNoteStore {
    async fn insert_note(&self, note: &Note) -> Result<(), StoreError> {
        crate::insert_note(&self.pool, note).await.map_err(backend)
    }

    async fn list_notes(&self, user_id: Uuid) -> Result<Vec<Note>, StoreError> {
        crate::list_notes(&self.pool, user_id).await.map_err(backend)
    }

    async fn update_note(
        &self,
        user_id: Uuid,
        note_id: Uuid,
        title: &str,
        body: &str,
    ) -> Result<bool, StoreError> {
        crate::update_note(&self.pool, user_id, note_id, title, body)
            .await
            .map_err(backend)
    }

    async fn delete_note(&self, user_id: Uuid, note_id: Uuid) -> Result<bool, StoreError> {
        crate::delete_note(&self.pool, user_id, note_id)
            .await
            .map_err(backend)
    }

    async fn count_notes(&self, user_id: Uuid) -> Result<usize, StoreError> {
        crate::count_notes(&self.pool, user_id)
            .await
            .map(|n| n as usize)
            .map_err(backend)
    }
}
