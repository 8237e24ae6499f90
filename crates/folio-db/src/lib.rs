//! folio-db
//!
//! Postgres persistence: connection bootstrap, embedded migrations, user /
//! portfolio / watchlist / note CRUD, and the Postgres implementations of
//! the service store seams ([`PgEventStore`], [`PgPortfolioStore`]).

mod stores;

pub use stores::{PgEventStore, PgNoteStore, PgPortfolioStore, PgUserStore, PgWatchlistStore};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use folio_ledger::EventKind;
use folio_schemas::{Note, UserAccount, WatchlistEntry};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use uuid::Uuid;

/// Connect to Postgres. The URL comes from resolved secrets
/// (`folio_config::resolve_secrets`), never from a config literal.
pub async fn connect(url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='events'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_events_table: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_events_table: bool,
}

// ---------------------------------------------------------------------------
// Event kind <-> column text
// ---------------------------------------------------------------------------

pub(crate) fn kind_as_str(kind: EventKind) -> &'static str {
    match kind {
        EventKind::CashDeposit => "CASH_DEPOSIT",
        EventKind::CashWithdrawal => "CASH_WITHDRAWAL",
        EventKind::OpenLong => "OPEN_LONG",
        EventKind::CloseLong => "CLOSE_LONG",
        EventKind::OpenShort => "OPEN_SHORT",
        EventKind::CloseShort => "CLOSE_SHORT",
    }
}

pub(crate) fn parse_kind(s: &str) -> Result<EventKind> {
    match s {
        "CASH_DEPOSIT" => Ok(EventKind::CashDeposit),
        "CASH_WITHDRAWAL" => Ok(EventKind::CashWithdrawal),
        "OPEN_LONG" => Ok(EventKind::OpenLong),
        "CLOSE_LONG" => Ok(EventKind::CloseLong),
        "OPEN_SHORT" => Ok(EventKind::OpenShort),
        "CLOSE_SHORT" => Ok(EventKind::CloseShort),
        other => Err(anyhow!("invalid event kind: {}", other)),
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub async fn insert_user(pool: &PgPool, user: &UserAccount) -> Result<()> {
    sqlx::query(
        r#"
        insert into users (user_id, email, password_hash, mfa_secret, mfa_enabled, created_at_utc)
        values ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(user.user_id)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.mfa_secret)
    .bind(user.mfa_enabled)
    .bind(user.created_at_utc)
    .execute(pool)
    .await
    .context("insert_user failed")?;
    Ok(())
}

pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserAccount>> {
    let row = sqlx::query(
        r#"
        select user_id, email, password_hash, mfa_secret, mfa_enabled, created_at_utc
        from users where email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .context("find_user_by_email failed")?;

    row.map(user_from_row).transpose()
}

pub async fn find_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<UserAccount>> {
    let row = sqlx::query(
        r#"
        select user_id, email, password_hash, mfa_secret, mfa_enabled, created_at_utc
        from users where user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("find_user_by_id failed")?;

    row.map(user_from_row).transpose()
}

fn user_from_row(row: sqlx::postgres::PgRow) -> Result<UserAccount> {
    Ok(UserAccount {
        user_id: row.try_get("user_id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        mfa_secret: row.try_get("mfa_secret")?,
        mfa_enabled: row.try_get("mfa_enabled")?,
        created_at_utc: row.try_get::<DateTime<Utc>, _>("created_at_utc")?,
    })
}

/// Store a freshly generated TOTP secret; enabling happens separately once
/// the user has confirmed a valid code.
pub async fn set_mfa_secret(pool: &PgPool, user_id: Uuid, secret: &str) -> Result<()> {
    sqlx::query("update users set mfa_secret = $2, mfa_enabled = false where user_id = $1")
        .bind(user_id)
        .bind(secret)
        .execute(pool)
        .await
        .context("set_mfa_secret failed")?;
    Ok(())
}

pub async fn enable_mfa(pool: &PgPool, user_id: Uuid) -> Result<()> {
    sqlx::query("update users set mfa_enabled = true where user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .context("enable_mfa failed")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Watchlist
// ---------------------------------------------------------------------------

pub async fn insert_watchlist_entry(pool: &PgPool, entry: &WatchlistEntry) -> Result<()> {
    sqlx::query(
        r#"
        insert into watchlist_items (entry_id, user_id, symbol, added_at_utc)
        values ($1, $2, $3, $4)
        on conflict (user_id, symbol) do nothing
        "#,
    )
    .bind(entry.entry_id)
    .bind(entry.user_id)
    .bind(&entry.symbol)
    .bind(entry.added_at_utc)
    .execute(pool)
    .await
    .context("insert_watchlist_entry failed")?;
    Ok(())
}

pub async fn list_watchlist(pool: &PgPool, user_id: Uuid) -> Result<Vec<WatchlistEntry>> {
    let rows = sqlx::query(
        r#"
        select entry_id, user_id, symbol, added_at_utc
        from watchlist_items where user_id = $1 order by added_at_utc
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("list_watchlist failed")?;

    rows.into_iter()
        .map(|row| {
            Ok(WatchlistEntry {
                entry_id: row.try_get("entry_id")?,
                user_id: row.try_get("user_id")?,
                symbol: row.try_get("symbol")?,
                added_at_utc: row.try_get("added_at_utc")?,
            })
        })
        .collect()
}

pub async fn count_watchlist(pool: &PgPool, user_id: Uuid) -> Result<i64> {
    let (n,): (i64,) = sqlx::query_as::<_, (i64,)>(
        "select count(*)::bigint from watchlist_items where user_id = $1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .context("count_watchlist failed")?;
    Ok(n)
}

/// Returns true when a row was actually removed.
pub async fn remove_watchlist_entry(pool: &PgPool, user_id: Uuid, entry_id: Uuid) -> Result<bool> {
    let res = sqlx::query("delete from watchlist_items where user_id = $1 and entry_id = $2")
        .bind(user_id)
        .bind(entry_id)
        .execute(pool)
        .await
        .context("remove_watchlist_entry failed")?;
    Ok(res.rows_affected() > 0)
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

pub async fn insert_note(pool: &PgPool, note: &Note) -> Result<()> {
    sqlx::query(
        r#"
        insert into notes (note_id, user_id, title, body, created_at_utc, updated_at_utc)
        values ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(note.note_id)
    .bind(note.user_id)
    .bind(&note.title)
    .bind(&note.body)
    .bind(note.created_at_utc)
    .bind(note.updated_at_utc)
    .execute(pool)
    .await
    .context("insert_note failed")?;
    Ok(())
}

pub async fn list_notes(pool: &PgPool, user_id: Uuid) -> Result<Vec<Note>> {
    let rows = sqlx::query(
        r#"
        select note_id, user_id, title, body, created_at_utc, updated_at_utc
        from notes where user_id = $1 order by updated_at_utc desc
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("list_notes failed")?;

    rows.into_iter()
        .map(|row| {
            Ok(Note {
                note_id: row.try_get("note_id")?,
                user_id: row.try_get("user_id")?,
                title: row.try_get("title")?,
                body: row.try_get("body")?,
                created_at_utc: row.try_get("created_at_utc")?,
                updated_at_utc: row.try_get("updated_at_utc")?,
            })
        })
        .collect()
}

pub async fn count_notes(pool: &PgPool, user_id: Uuid) -> Result<i64> {
    let (n,): (i64,) =
        sqlx::query_as::<_, (i64,)>("select count(*)::bigint from notes where user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .context("count_notes failed")?;
    Ok(n)
}

/// Returns true when the note existed and was updated.
pub async fn update_note(
    pool: &PgPool,
    user_id: Uuid,
    note_id: Uuid,
    title: &str,
    body: &str,
) -> Result<bool> {
    let res = sqlx::query(
        r#"
        update notes set title = $3, body = $4, updated_at_utc = now()
        where user_id = $1 and note_id = $2
        "#,
    )
    .bind(user_id)
    .bind(note_id)
    .bind(title)
    .bind(body)
    .execute(pool)
    .await
    .context("update_note failed")?;
    Ok(res.rows_affected() > 0)
}

/// Returns true when a row was actually removed.
pub async fn delete_note(pool: &PgPool, user_id: Uuid, note_id: Uuid) -> Result<bool> {
    let res = sqlx::query("delete from notes where user_id = $1 and note_id = $2")
        .bind(user_id)
        .bind(note_id)
        .execute(pool)
        .await
        .context("delete_note failed")?;
    Ok(res.rows_affected() > 0)
}
