//! Book abstraction — owns the invariant-checking boundary.
//!
//! # Purpose
//! [`replay`](crate::replay) contains the raw per-kind transition mechanics.
//! This module wraps them behind a typed, append-only [`Book`] façade that:
//!
//! - Enforces entry invariants on every append (malformed numerics, oversell,
//!   insufficient cash). Historical events are assumed already validated at
//!   entry time, so the fold itself never re-checks them.
//! - Exposes only the minimal write surface (`append`).
//! - Provides read-only snapshot views of cash and positions.
//! - Keeps the transition rules in `replay.rs` while this module owns the
//!   validation boundary.
//!
//! # Determinism
//! `Book` is deterministic and pure — no IO, no time, no randomness. Two
//! `Book` instances fed the same sequence of events always produce identical
//! state, and the incrementally maintained state always matches a full
//! replay of the recorded log ([`Book::verify_integrity`]).

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::ordering::replay_order;
use crate::replay::{apply_event, replay};
use crate::types::{AccountState, EventKind, LedgerEvent, Position, PositionKey, TradeAction};
use crate::{CASH_SYMBOL, CLOSE_EPSILON};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// All entry-time invariant violations `Book` can surface.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// Trade shares must be strictly positive.
    NonPositiveShares { shares: f64 },
    /// Trade price must be strictly positive.
    NonPositivePrice { price: f64 },
    /// Leverage below 1 would corrupt the cash fold (division guard).
    SubUnitLeverage { leverage: f64 },
    /// Trade symbol must be non-empty and must not be the cash sentinel.
    BadSymbol { symbol: String },
    /// Cash movement amount must be strictly positive.
    NonPositiveAmount { amount: f64 },
    /// Closing quantity exceeds currently held shares for that book.
    Oversell {
        symbol: String,
        requested: f64,
        held: f64,
    },
    /// An open-long (or withdrawal) requires more cash than available.
    InsufficientCash { required: f64, available: f64 },
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveShares { shares } => {
                write!(f, "ledger invariant: shares must be > 0, got {shares}")
            }
            Self::NonPositivePrice { price } => {
                write!(f, "ledger invariant: price must be > 0, got {price}")
            }
            Self::SubUnitLeverage { leverage } => {
                write!(f, "ledger invariant: leverage must be >= 1, got {leverage}")
            }
            Self::BadSymbol { symbol } => {
                write!(f, "ledger invariant: invalid trade symbol {symbol:?}")
            }
            Self::NonPositiveAmount { amount } => {
                write!(f, "ledger invariant: cash amount must be > 0, got {amount}")
            }
            Self::Oversell {
                symbol,
                requested,
                held,
            } => write!(
                f,
                "cannot close {requested} shares of {symbol}: only {held} held"
            ),
            Self::InsufficientCash {
                required,
                available,
            } => write!(
                f,
                "insufficient cash: required {required}, available {available}"
            ),
        }
    }
}

impl std::error::Error for LedgerError {}

// ---------------------------------------------------------------------------
// Action auto-correction
// ---------------------------------------------------------------------------

/// Auto-correct a submitted `(action, is_short)` pair against the books
/// actually open for `symbol`.
///
/// Deliberate UX leniency, not a validation failure: a close aimed at a book
/// that does not exist is redirected to the opposite book when that one is
/// open (e.g. the only open position is short and the caller submits `Sell` —
/// treated as buy-to-cover). Open kinds are never corrected; long and short
/// books may legitimately coexist.
///
/// Applied to incoming new trades only, never during replay — historical
/// events already carry their resolved kind.
pub fn correct_action(
    state: &AccountState,
    symbol: &str,
    action: TradeAction,
    is_short: bool,
) -> (TradeAction, bool) {
    let kind = crate::types::classify(action, is_short, symbol);
    if !kind.is_close() || symbol == CASH_SYMBOL {
        return (action, is_short);
    }

    let aimed = state.position(symbol, is_short).is_some();
    let opposite = state.position(symbol, !is_short).is_some();
    if aimed || !opposite {
        return (action, is_short);
    }

    // Redirect the close to the book that is actually open.
    if is_short {
        (TradeAction::Sell, false) // close-short aimed, only long open
    } else {
        (TradeAction::Buy, true) // close-long aimed, only short open
    }
}

// ---------------------------------------------------------------------------
// Snapshot (read-only view)
// ---------------------------------------------------------------------------

/// A point-in-time read-only view of the book's derived state.
#[derive(Clone, Debug, PartialEq)]
pub struct BookSnapshot {
    pub cash: f64,
    pub base_value: f64,
    /// Open positions keyed by `(symbol, is_short)`.
    pub positions: BTreeMap<PositionKey, Position>,
    /// Number of events recorded (trades + cash).
    pub event_count: usize,
}

impl BookSnapshot {
    pub fn held_shares(&self, symbol: &str, is_short: bool) -> f64 {
        self.positions
            .get(&PositionKey::new(symbol, is_short))
            .map(|p| p.shares)
            .unwrap_or(0.0)
    }

    pub fn is_flat(&self) -> bool {
        self.positions.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Book
// ---------------------------------------------------------------------------

/// Append-only event book with entry-time invariant enforcement.
///
/// Internally delegates all transition arithmetic to
/// [`replay`](crate::replay). The `Book` struct only owns the append
/// boundary and the derived account state.
#[derive(Clone, Debug, Default)]
pub struct Book {
    state: AccountState,
    events: Vec<LedgerEvent>,
}

impl Book {
    /// An empty book: zero cash, no positions, no events.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a book from a stored event log (full replay).
    pub fn from_events(events: Vec<LedgerEvent>) -> Self {
        let state = replay(&events);
        Self { state, events }
    }

    // -----------------------------------------------------------------------
    // Write surface
    // -----------------------------------------------------------------------

    /// Append an event, enforcing all entry invariants.
    ///
    /// In-order events (sorting at or after the current tail) are applied
    /// incrementally; a backdated event triggers a full replay so derived
    /// state stays a pure function of the log either way.
    ///
    /// # Errors
    /// Returns [`LedgerError`] if any invariant is violated. The book is
    /// **not** mutated on error.
    pub fn append(&mut self, event: LedgerEvent) -> Result<(), LedgerError> {
        validate_event(&event)?;
        self.check_entry(&event)?;

        let in_order = self
            .events
            .last()
            .map(|last| replay_order(last, &event) != Ordering::Greater)
            .unwrap_or(true);

        if in_order {
            apply_event(&mut self.state, &event);
            self.events.push(event);
        } else {
            self.events.push(event);
            self.state = replay(&self.events);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Read surface
    // -----------------------------------------------------------------------

    pub fn state(&self) -> &AccountState {
        &self.state
    }

    pub fn cash(&self) -> f64 {
        self.state.cash
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Return a cloned snapshot of the current derived state.
    pub fn snapshot(&self) -> BookSnapshot {
        BookSnapshot {
            cash: self.state.cash,
            base_value: self.state.base_value,
            positions: self.state.positions.clone(),
            event_count: self.events.len(),
        }
    }

    /// Recompute state from the recorded events and verify it matches the
    /// running incremental state.
    ///
    /// This is an **integrity check** — O(n) replay — for tests, startup
    /// verification, or audit flows only.
    pub fn verify_integrity(&self) -> bool {
        replay(&self.events) == self.state
    }

    // -----------------------------------------------------------------------
    // Entry checks (business rules, enforced once per new event)
    // -----------------------------------------------------------------------

    fn check_entry(&self, event: &LedgerEvent) -> Result<(), LedgerError> {
        match event.kind {
            EventKind::CashDeposit | EventKind::OpenShort => Ok(()),
            EventKind::CashWithdrawal => {
                let amount = -event.total;
                if amount > self.state.cash {
                    return Err(LedgerError::InsufficientCash {
                        required: amount,
                        available: self.state.cash,
                    });
                }
                Ok(())
            }
            EventKind::OpenLong => {
                let required = event.total / event.leverage;
                if required > self.state.cash {
                    return Err(LedgerError::InsufficientCash {
                        required,
                        available: self.state.cash,
                    });
                }
                Ok(())
            }
            EventKind::CloseLong | EventKind::CloseShort => {
                let held = self
                    .state
                    .held_shares(&event.symbol, event.kind.is_short_book());
                if event.shares > held + CLOSE_EPSILON {
                    return Err(LedgerError::Oversell {
                        symbol: event.symbol.clone(),
                        requested: event.shares,
                        held,
                    });
                }
                Ok(())
            }
        }
    }
}

/// Structural validation: rejects malformed events before they can enter a
/// log. Zero-share and sub-unit-leverage trades are the division-by-zero
/// guards the fold relies on.
pub fn validate_event(event: &LedgerEvent) -> Result<(), LedgerError> {
    match event.kind {
        EventKind::CashDeposit => {
            if event.total <= 0.0 {
                return Err(LedgerError::NonPositiveAmount {
                    amount: event.total,
                });
            }
            Ok(())
        }
        EventKind::CashWithdrawal => {
            if -event.total <= 0.0 {
                return Err(LedgerError::NonPositiveAmount {
                    amount: -event.total,
                });
            }
            Ok(())
        }
        EventKind::OpenLong | EventKind::CloseLong | EventKind::OpenShort
        | EventKind::CloseShort => {
            if event.symbol.trim().is_empty() || event.symbol == CASH_SYMBOL {
                return Err(LedgerError::BadSymbol {
                    symbol: event.symbol.clone(),
                });
            }
            if event.shares <= 0.0 {
                return Err(LedgerError::NonPositiveShares {
                    shares: event.shares,
                });
            }
            if event.price <= 0.0 {
                return Err(LedgerError::NonPositivePrice { price: event.price });
            }
            if event.leverage < 1.0 {
                return Err(LedgerError::SubUnitLeverage {
                    leverage: event.leverage,
                });
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventKind::*;
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn trade(kind: EventKind, sym: &str, shares: f64, price: f64, day: &str) -> LedgerEvent {
        LedgerEvent::trade(kind, sym, shares, price, 1.0, d(day))
    }

    fn funded(amount: f64) -> Book {
        let mut b = Book::new();
        b.append(LedgerEvent::deposit(amount, d("2024-01-02")))
            .unwrap();
        b
    }

    // --- Structural validation ---

    #[test]
    fn rejects_zero_shares() {
        let mut b = funded(10_000.0);
        let err = b.append(trade(OpenLong, "AAA", 0.0, 100.0, "2024-01-03"));
        assert_eq!(err, Err(LedgerError::NonPositiveShares { shares: 0.0 }));
        assert_eq!(b.event_count(), 1); // book not mutated
    }

    #[test]
    fn rejects_negative_price() {
        let mut b = funded(10_000.0);
        let err = b.append(trade(OpenLong, "AAA", 10.0, -1.0, "2024-01-03"));
        assert_eq!(err, Err(LedgerError::NonPositivePrice { price: -1.0 }));
    }

    #[test]
    fn rejects_sub_unit_leverage() {
        let mut b = funded(10_000.0);
        let err = b.append(LedgerEvent::trade(
            OpenLong,
            "AAA",
            10.0,
            100.0,
            0.0,
            d("2024-01-03"),
        ));
        assert_eq!(err, Err(LedgerError::SubUnitLeverage { leverage: 0.0 }));
    }

    #[test]
    fn rejects_cash_sentinel_as_trade_symbol() {
        let mut b = funded(10_000.0);
        let err = b.append(trade(OpenLong, "-", 10.0, 100.0, "2024-01-03"));
        assert!(matches!(err, Err(LedgerError::BadSymbol { .. })));
    }

    #[test]
    fn rejects_non_positive_deposit() {
        let mut b = Book::new();
        let mut ev = LedgerEvent::deposit(100.0, d("2024-01-02"));
        ev.total = 0.0;
        assert_eq!(
            b.append(ev),
            Err(LedgerError::NonPositiveAmount { amount: 0.0 })
        );
    }

    // --- Entry business rules ---

    #[test]
    fn rejects_open_long_beyond_cash() {
        let mut b = funded(500.0);
        let err = b.append(trade(OpenLong, "AAA", 10.0, 100.0, "2024-01-03"));
        assert_eq!(
            err,
            Err(LedgerError::InsufficientCash {
                required: 1_000.0,
                available: 500.0
            })
        );
    }

    #[test]
    fn leverage_shrinks_the_cash_requirement() {
        let mut b = funded(500.0);
        // total 1000 at leverage 4 requires only 250
        b.append(LedgerEvent::trade(OpenLong, "AAA", 10.0, 100.0, 4.0, d("2024-01-03")))
            .unwrap();
        assert_eq!(b.cash(), 250.0);
    }

    #[test]
    fn open_short_needs_no_upfront_cash_check() {
        let mut b = Book::new();
        b.append(trade(OpenShort, "BBB", 5.0, 50.0, "2024-01-02"))
            .unwrap();
        // margin posted straight into negative cash — allowed
        assert_eq!(b.cash(), -250.0);
    }

    #[test]
    fn rejects_withdrawal_beyond_cash() {
        let mut b = funded(100.0);
        let err = b.append(LedgerEvent::withdrawal(150.0, d("2024-01-03")));
        assert_eq!(
            err,
            Err(LedgerError::InsufficientCash {
                required: 150.0,
                available: 100.0
            })
        );
    }

    #[test]
    fn rejects_oversell() {
        let mut b = funded(10_000.0);
        b.append(trade(OpenLong, "AAA", 10.0, 100.0, "2024-01-03"))
            .unwrap();
        let err = b.append(trade(CloseLong, "AAA", 11.0, 100.0, "2024-01-04"));
        assert!(matches!(
            err,
            Err(LedgerError::Oversell { requested, held, .. }) if requested == 11.0 && held == 10.0
        ));
    }

    #[test]
    fn full_close_at_exact_held_quantity_is_allowed() {
        let mut b = funded(10_000.0);
        b.append(trade(OpenLong, "AAA", 10.0, 100.0, "2024-01-03"))
            .unwrap();
        b.append(trade(CloseLong, "AAA", 10.0, 110.0, "2024-01-04"))
            .unwrap();
        assert!(b.snapshot().is_flat());
    }

    #[test]
    fn close_against_the_wrong_book_is_an_oversell() {
        let mut b = funded(10_000.0);
        b.append(trade(OpenShort, "XYZ", 5.0, 50.0, "2024-01-03"))
            .unwrap();
        // no long book exists
        let err = b.append(trade(CloseLong, "XYZ", 5.0, 50.0, "2024-01-04"));
        assert!(matches!(err, Err(LedgerError::Oversell { held, .. }) if held == 0.0));
    }

    // --- Backdated appends ---

    #[test]
    fn backdated_append_triggers_full_replay() {
        let mut b = funded(10_000.0);
        b.append(trade(OpenLong, "AAA", 10.0, 110.0, "2024-01-05").with_order(2))
            .unwrap();
        // backdated second lot at a lower price
        b.append(trade(OpenLong, "AAA", 10.0, 90.0, "2024-01-03").with_order(3))
            .unwrap();

        let pos = b.state().position("AAA", false).unwrap();
        assert_eq!(pos.shares, 20.0);
        assert_eq!(pos.avg_price, 100.0);
        assert!(b.verify_integrity());
    }

    // --- Integrity ---

    #[test]
    fn verify_integrity_passes_after_normal_operations() {
        let mut b = funded(10_000.0);
        b.append(trade(OpenLong, "AAA", 10.0, 100.0, "2024-01-03").with_order(2))
            .unwrap();
        b.append(trade(CloseLong, "AAA", 5.0, 110.0, "2024-01-04").with_order(3))
            .unwrap();
        b.append(trade(OpenShort, "BBB", 5.0, 50.0, "2024-01-04").with_order(4))
            .unwrap();
        assert!(b.verify_integrity());
    }

    #[test]
    fn fresh_book_is_flat_and_consistent() {
        let b = Book::new();
        assert!(b.snapshot().is_flat());
        assert_eq!(b.event_count(), 0);
        assert_eq!(b.cash(), 0.0);
        assert!(b.verify_integrity());
    }

    // --- Action auto-correction ---

    #[test]
    fn sell_against_only_short_book_becomes_buy_to_cover() {
        let mut b = Book::new();
        b.append(trade(OpenShort, "XYZ", 5.0, 50.0, "2024-01-02"))
            .unwrap();

        let (action, is_short) = correct_action(b.state(), "XYZ", TradeAction::Sell, false);
        assert_eq!(action, TradeAction::Buy);
        assert!(is_short);
        assert_eq!(
            crate::types::classify(action, is_short, "XYZ"),
            CloseShort
        );
    }

    #[test]
    fn buy_to_cover_against_only_long_book_becomes_sell() {
        let mut b = funded(10_000.0);
        b.append(trade(OpenLong, "XYZ", 5.0, 50.0, "2024-01-03"))
            .unwrap();

        let (action, is_short) = correct_action(b.state(), "XYZ", TradeAction::Buy, true);
        assert_eq!(action, TradeAction::Sell);
        assert!(!is_short);
    }

    #[test]
    fn correction_leaves_opens_alone() {
        let mut b = Book::new();
        b.append(trade(OpenShort, "XYZ", 5.0, 50.0, "2024-01-02"))
            .unwrap();

        // an explicit long open coexists with the short book
        let (action, is_short) = correct_action(b.state(), "XYZ", TradeAction::Buy, false);
        assert_eq!(action, TradeAction::Buy);
        assert!(!is_short);
    }

    #[test]
    fn correction_leaves_matching_close_alone() {
        let mut b = Book::new();
        b.append(trade(OpenShort, "XYZ", 5.0, 50.0, "2024-01-02"))
            .unwrap();

        let (action, is_short) = correct_action(b.state(), "XYZ", TradeAction::Buy, true);
        assert_eq!(action, TradeAction::Buy);
        assert!(is_short);
    }
}
