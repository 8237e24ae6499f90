use chrono::NaiveDate;
use folio_ledger::{
    classify, correct_action, replay, validate_event, AccountState, Book, LedgerEvent, Position,
    TradeAction,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ServiceError;
use crate::locks::PortfolioLocks;
use crate::store::{EventStore, PortfolioStore};

// ---------------------------------------------------------------------------
// Wire-friendly derived state
// ---------------------------------------------------------------------------

/// The materialized `(cash, positions)` view written to the portfolio store
/// and returned to the HTTP layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub cash: f64,
    pub base_value: f64,
    pub positions: Vec<Position>,
}

impl Snapshot {
    pub fn from_state(state: &AccountState) -> Self {
        Self {
            cash: state.cash,
            base_value: state.base_value,
            positions: state.open_positions().cloned().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// An incoming trade as submitted by the user, before classification and
/// action auto-correction.
#[derive(Clone, Debug, Deserialize)]
pub struct TradeRequest {
    pub symbol: String,
    pub action: TradeAction,
    #[serde(default)]
    pub is_short: bool,
    pub shares: f64,
    pub price: f64,
    /// Defaults to 1 (unleveraged).
    pub leverage: Option<f64>,
    pub date: NaiveDate,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CashDirection {
    Deposit,
    Withdraw,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CashRequest {
    pub direction: CashDirection,
    pub amount: f64,
    pub date: NaiveDate,
}

/// Result of a mutating call: the event as recorded plus the fresh snapshot.
#[derive(Clone, Debug, Serialize)]
pub struct TradeOutcome {
    pub event: LedgerEvent,
    pub snapshot: Snapshot,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Orchestrates every portfolio mutation as "mutate the event log, then
/// derive state with one replay".
///
/// Generic over the store seams so tests run against in-memory stores and
/// production runs against Postgres, with identical logic in between.
pub struct PortfolioService<E, P> {
    events: E,
    portfolios: P,
    locks: PortfolioLocks,
    max_trades: usize,
}

impl<E: EventStore, P: PortfolioStore> PortfolioService<E, P> {
    pub fn new(events: E, portfolios: P, max_trades: usize) -> Self {
        Self {
            events,
            portfolios,
            locks: PortfolioLocks::new(),
            max_trades,
        }
    }

    /// Record a new trade: auto-correct the action against the open books,
    /// classify, validate at the entry boundary, append, persist the updated
    /// snapshot.
    pub async fn record_trade(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
        req: TradeRequest,
    ) -> Result<TradeOutcome, ServiceError> {
        let symbol = trade_symbol(&req)?;

        let _guard = self.locks.acquire(user_id, portfolio_no).await;

        let log = self.events.list_events(user_id, portfolio_no).await?;
        let trade_count = log.iter().filter(|e| !e.kind.is_cash()).count();
        if trade_count >= self.max_trades {
            return Err(ServiceError::TradeCapExceeded {
                cap: self.max_trades,
            });
        }

        let next_order = next_insertion_order(&log);
        let mut book = Book::from_events(log);

        let (action, is_short) = correct_action(book.state(), &symbol, req.action, req.is_short);
        let kind = classify(action, is_short, &symbol);
        let event = LedgerEvent::trade(
            kind,
            symbol,
            req.shares,
            req.price,
            req.leverage.unwrap_or(1.0),
            req.date,
        )
        .with_order(next_order);

        book.append(event.clone())?;
        self.events
            .append_event(user_id, portfolio_no, &event)
            .await?;

        let snapshot = Snapshot::from_state(book.state());
        self.portfolios
            .write_snapshot(user_id, portfolio_no, &snapshot)
            .await?;

        Ok(TradeOutcome { event, snapshot })
    }

    /// Record a cash deposit or withdrawal.
    pub async fn record_cash(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
        req: CashRequest,
    ) -> Result<TradeOutcome, ServiceError> {
        let _guard = self.locks.acquire(user_id, portfolio_no).await;

        let log = self.events.list_events(user_id, portfolio_no).await?;
        let next_order = next_insertion_order(&log);
        let mut book = Book::from_events(log);

        let event = match req.direction {
            CashDirection::Deposit => LedgerEvent::deposit(req.amount, req.date),
            CashDirection::Withdraw => LedgerEvent::withdrawal(req.amount, req.date),
        }
        .with_order(next_order);

        book.append(event.clone())?;
        self.events
            .append_event(user_id, portfolio_no, &event)
            .await?;

        let snapshot = Snapshot::from_state(book.state());
        self.portfolios
            .write_snapshot(user_id, portfolio_no, &snapshot)
            .await?;

        Ok(TradeOutcome { event, snapshot })
    }

    /// Delete one event, then rebuild derived state from the remaining log.
    pub async fn delete_trade(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
        event_id: Uuid,
    ) -> Result<Snapshot, ServiceError> {
        let _guard = self.locks.acquire(user_id, portfolio_no).await;

        let log = self.events.list_events(user_id, portfolio_no).await?;
        if !log.iter().any(|e| e.id == event_id) {
            return Err(ServiceError::EventNotFound);
        }

        self.events
            .remove_event(user_id, portfolio_no, event_id)
            .await?;

        let remaining: Vec<LedgerEvent> =
            log.into_iter().filter(|e| e.id != event_id).collect();
        let snapshot = Snapshot::from_state(&replay(&remaining));
        self.portfolios
            .write_snapshot(user_id, portfolio_no, &snapshot)
            .await?;

        Ok(snapshot)
    }

    /// Replace one trade event, then rebuild derived state from the full log.
    ///
    /// The replacement keeps the original id and insertion_order so same-day
    /// ordering is stable across edits. Historical events re-enter through
    /// structural validation only; business checks (oversell, cash) applied
    /// at original entry time are not re-litigated here — the replay fold
    /// handles whatever the edited history implies.
    pub async fn update_trade(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
        event_id: Uuid,
        req: TradeRequest,
    ) -> Result<TradeOutcome, ServiceError> {
        let _guard = self.locks.acquire(user_id, portfolio_no).await;

        let log = self.events.list_events(user_id, portfolio_no).await?;
        let symbol = trade_symbol(&req)?;

        let existing = log
            .iter()
            .find(|e| e.id == event_id)
            .ok_or(ServiceError::EventNotFound)?;
        // cash events are not addressable through the trade-edit path
        if existing.kind.is_cash() {
            return Err(ServiceError::EventNotFound);
        }

        let kind = classify(req.action, req.is_short, &symbol);
        let mut replacement = LedgerEvent::trade(
            kind,
            symbol,
            req.shares,
            req.price,
            req.leverage.unwrap_or(1.0),
            req.date,
        )
        .with_order(existing.insertion_order);
        replacement.id = existing.id;

        validate_event(&replacement)?;
        self.events
            .replace_event(user_id, portfolio_no, &replacement)
            .await?;

        let updated: Vec<LedgerEvent> = log
            .into_iter()
            .map(|e| {
                if e.id == event_id {
                    replacement.clone()
                } else {
                    e
                }
            })
            .collect();
        let snapshot = Snapshot::from_state(&replay(&updated));
        self.portfolios
            .write_snapshot(user_id, portfolio_no, &snapshot)
            .await?;

        Ok(TradeOutcome {
            event: replacement,
            snapshot,
        })
    }

    /// Current derived snapshot. Reads the materialized view when present;
    /// otherwise derives it from the log and persists it.
    pub async fn portfolio_snapshot(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
    ) -> Result<Snapshot, ServiceError> {
        if let Some(snapshot) = self
            .portfolios
            .read_snapshot(user_id, portfolio_no)
            .await?
        {
            return Ok(snapshot);
        }

        let _guard = self.locks.acquire(user_id, portfolio_no).await;
        let log = self.events.list_events(user_id, portfolio_no).await?;
        let snapshot = Snapshot::from_state(&replay(&log));
        self.portfolios
            .write_snapshot(user_id, portfolio_no, &snapshot)
            .await?;
        Ok(snapshot)
    }

    /// Full event history in replay order.
    pub async fn list_trades(
        &self,
        user_id: Uuid,
        portfolio_no: i32,
    ) -> Result<Vec<LedgerEvent>, ServiceError> {
        let mut log = self.events.list_events(user_id, portfolio_no).await?;
        folio_ledger::sort_events_canonical(&mut log);
        Ok(log)
    }
}

/// Next per-portfolio insertion order: one past the highest recorded.
/// Assigned under the portfolio lock, so it is gap-free per writer.
fn next_insertion_order(log: &[LedgerEvent]) -> i64 {
    log.iter().map(|e| e.insertion_order).max().unwrap_or(0) + 1
}

/// Normalized ticker for an incoming trade; the cash sentinel and empty
/// symbols never classify as trades.
fn trade_symbol(req: &TradeRequest) -> Result<String, ServiceError> {
    let symbol = req.symbol.trim().to_ascii_uppercase();
    if symbol.is_empty() || symbol == folio_ledger::CASH_SYMBOL {
        return Err(folio_ledger::LedgerError::BadSymbol { symbol }.into());
    }
    Ok(symbol)
}
