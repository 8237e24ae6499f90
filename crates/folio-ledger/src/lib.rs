//! folio-ledger
//!
//! Portfolio ledger replay engine:
//! - Append-only event log is the source of truth
//! - Six event kinds (cash deposit/withdrawal, open/close long, open/close short)
//! - Derived cash + positions are a pure function of the ordered log
//! - Incremental apply and full replay are the same fold over the same events
//! - Pure deterministic logic (no IO, no time, no database wiring)

mod metrics;
mod ordering;
mod replay;
mod stats;
mod types;

pub mod book;

pub use book::{correct_action, validate_event, Book, BookSnapshot, LedgerError};
pub use metrics::{
    compute_equity, compute_market_value, compute_return_pct, compute_unrealized_pnl, valuation,
    Valuation,
};
pub use ordering::{replay_order, sort_events_canonical};
pub use replay::{apply_event, replay};
pub use stats::{value_curve, win_loss_summary, ValuePoint, WinLossSummary};
pub use types::{
    classify, AccountState, EventKind, LedgerEvent, Position, PositionKey, TradeAction,
};

use std::collections::BTreeMap;

/// Positions at or below this share count are considered closed and removed.
/// The tolerance absorbs floating-point residue from repeated volume-weighted
/// average-price arithmetic.
pub const CLOSE_EPSILON: f64 = 0.001;

/// Sentinel symbol carried by pure cash events.
pub const CASH_SYMBOL: &str = "-";

/// Canonical mark map type (symbol -> latest close price).
pub type MarkMap = BTreeMap<String, f64>;

/// Helper to build a MarkMap with minimal boilerplate.
pub fn marks<I, S>(items: I) -> MarkMap
where
    I: IntoIterator<Item = (S, f64)>,
    S: Into<String>,
{
    let mut m = MarkMap::new();
    for (sym, px) in items {
        m.insert(sym.into(), px);
    }
    m
}
