use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CASH_SYMBOL;

/// BUY or SELL as submitted by the caller.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    Buy,
    Sell,
}

/// The six event kinds the replay engine understands.
///
/// Every `match` over this enum is exhaustive with no default arm so a new
/// kind cannot be silently ignored.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    CashDeposit,
    CashWithdrawal,
    OpenLong,
    CloseLong,
    OpenShort,
    CloseShort,
}

impl EventKind {
    /// `true` for the two pure cash kinds.
    pub fn is_cash(&self) -> bool {
        matches!(self, EventKind::CashDeposit | EventKind::CashWithdrawal)
    }

    /// `true` for kinds that reduce an existing position.
    pub fn is_close(&self) -> bool {
        matches!(self, EventKind::CloseLong | EventKind::CloseShort)
    }

    /// `true` for kinds acting on the short book.
    pub fn is_short_book(&self) -> bool {
        matches!(self, EventKind::OpenShort | EventKind::CloseShort)
    }
}

/// Derive the event kind from a raw `(action, is_short)` pair plus the cash
/// sentinel symbol.
///
/// Cash movements arrive tagged with the sentinel symbol `"-"`: a Buy is a
/// deposit, a Sell a withdrawal.
pub fn classify(action: TradeAction, is_short: bool, symbol: &str) -> EventKind {
    if symbol == CASH_SYMBOL {
        return match action {
            TradeAction::Buy => EventKind::CashDeposit,
            TradeAction::Sell => EventKind::CashWithdrawal,
        };
    }
    match (action, is_short) {
        (TradeAction::Buy, false) => EventKind::OpenLong,
        (TradeAction::Sell, false) => EventKind::CloseLong,
        (TradeAction::Sell, true) => EventKind::OpenShort,
        (TradeAction::Buy, true) => EventKind::CloseShort,
    }
}

/// A single recorded ledger event (the accounting atom).
///
/// Immutable once recorded: an "edit" or "delete" replaces/removes the event
/// in the log and rebuilds derived state by full replay. Replay order is
/// ascending `(date, insertion_order)`.
///
/// `total` is the gross notional (`shares * price`) for trade kinds, or the
/// literal cash amount for deposits/withdrawals. Withdrawals store a negative
/// `total` so every cash kind is a plain `cash += total`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub id: Uuid,
    pub kind: EventKind,
    pub symbol: String,
    pub shares: f64,
    pub price: f64,
    pub total: f64,
    /// >= 1; only meaningful when opening long positions. Defaults to 1.
    pub leverage: f64,
    /// Logical trade date — primary replay sort key.
    pub date: NaiveDate,
    /// Same-date tie-break: later-inserted events apply after earlier ones.
    pub insertion_order: i64,
}

impl LedgerEvent {
    /// A trade event. `total` is derived as `shares * price`.
    pub fn trade(
        kind: EventKind,
        symbol: impl Into<String>,
        shares: f64,
        price: f64,
        leverage: f64,
        date: NaiveDate,
    ) -> Self {
        debug_assert!(!kind.is_cash(), "trade() requires a trade kind");
        Self {
            id: Uuid::new_v4(),
            kind,
            symbol: symbol.into(),
            shares,
            price,
            total: shares * price,
            leverage,
            date,
            insertion_order: 0,
        }
    }

    /// A cash deposit of `amount` (> 0).
    pub fn deposit(amount: f64, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: EventKind::CashDeposit,
            symbol: CASH_SYMBOL.to_string(),
            shares: 0.0,
            price: 0.0,
            total: amount,
            leverage: 1.0,
            date,
            insertion_order: 0,
        }
    }

    /// A cash withdrawal of `amount` (> 0), stored as a negative total.
    pub fn withdrawal(amount: f64, date: NaiveDate) -> Self {
        Self {
            total: -amount,
            kind: EventKind::CashWithdrawal,
            ..Self::deposit(amount, date)
        }
    }

    /// Set the per-portfolio insertion order (assigned by the event store).
    pub fn with_order(mut self, insertion_order: i64) -> Self {
        self.insertion_order = insertion_order;
        self
    }
}

/// Key distinguishing the long and short book for the same symbol.
///
/// A user may hold a long and a short position in one symbol simultaneously;
/// they are two separate records.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionKey {
    pub symbol: String,
    pub is_short: bool,
}

impl PositionKey {
    pub fn new(symbol: impl Into<String>, is_short: bool) -> Self {
        Self {
            symbol: symbol.into(),
            is_short,
        }
    }
}

/// Derived open position (from the event log).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    /// Always > CLOSE_EPSILON while the position exists.
    pub shares: f64,
    /// Volume-weighted average entry price.
    pub avg_price: f64,
    /// Carried from the most recent increasing trade.
    pub leverage: f64,
    pub is_short: bool,
}

impl Position {
    pub fn key(&self) -> PositionKey {
        PositionKey::new(self.symbol.clone(), self.is_short)
    }
}

/// The account state derived from a portfolio's event log.
///
/// Created empty and mutated only by [`apply_event`](crate::apply_event);
/// wholly rebuilt by [`replay`](crate::replay) whenever the log is edited.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AccountState {
    pub cash: f64,
    /// First nonzero cash deposit, fixed thereafter. Denominator for
    /// return-percentage calculations.
    pub base_value: f64,
    pub positions: BTreeMap<PositionKey, Position>,
}

impl AccountState {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up one book for a symbol (long or short).
    pub fn position(&self, symbol: &str, is_short: bool) -> Option<&Position> {
        self.positions
            .get(&PositionKey::new(symbol, is_short))
    }

    /// Shares currently held in one book (0 if not held).
    pub fn held_shares(&self, symbol: &str, is_short: bool) -> f64 {
        self.position(symbol, is_short).map(|p| p.shares).unwrap_or(0.0)
    }

    /// Whether the account holds no open positions.
    pub fn is_flat(&self) -> bool {
        self.positions.is_empty()
    }

    /// Deterministic iteration over open positions.
    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }
}
