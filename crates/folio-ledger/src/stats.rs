//! Derived portfolio statistics.
//!
//! Downstream aggregations over a portfolio's event log: win/loss counts
//! across closing trades and a daily account-value curve. Both are pure
//! functions of the log, computed by the same fold the replay engine uses,
//! so they can never disagree with the derived snapshot.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ordering::replay_order;
use crate::replay::apply_event;
use crate::types::{AccountState, EventKind, LedgerEvent};

/// Win/loss tally over closing trades.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WinLossSummary {
    pub wins: u64,
    pub losses: u64,
    /// Sum of realized P&L across all closing trades.
    pub realized_pnl: f64,
}

/// One point of the account-value curve: state after the last event of `date`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValuePoint {
    pub date: NaiveDate,
    pub cash: f64,
    /// cash + cost basis of every open book (no marks involved).
    pub account_value: f64,
}

/// Tally wins and losses across the log's closing trades.
///
/// Realized P&L per close is measured against the volume-weighted average
/// entry price at the time of the close:
/// long:  `(price - avg) * shares`
/// short: `(avg - price) * shares`
/// A break-even close counts as neither win nor loss.
pub fn win_loss_summary(events: &[LedgerEvent]) -> WinLossSummary {
    let mut ordered: Vec<&LedgerEvent> = events.iter().collect();
    ordered.sort_by(|a, b| replay_order(a, b));

    let mut state = AccountState::empty();
    let mut summary = WinLossSummary::default();

    for event in ordered {
        let realized = match event.kind {
            EventKind::CloseLong => state
                .position(&event.symbol, false)
                .map(|p| (event.price - p.avg_price) * event.shares),
            EventKind::CloseShort => state
                .position(&event.symbol, true)
                .map(|p| (p.avg_price - event.price) * event.shares),
            EventKind::CashDeposit
            | EventKind::CashWithdrawal
            | EventKind::OpenLong
            | EventKind::OpenShort => None,
        };
        if let Some(pnl) = realized {
            summary.realized_pnl += pnl;
            if pnl > 0.0 {
                summary.wins += 1;
            } else if pnl < 0.0 {
                summary.losses += 1;
            }
        }
        apply_event(&mut state, event);
    }
    summary
}

/// Daily account-value curve: one point per distinct event date, taken after
/// the last event of that date has applied.
pub fn value_curve(events: &[LedgerEvent]) -> Vec<ValuePoint> {
    let mut ordered: Vec<&LedgerEvent> = events.iter().collect();
    ordered.sort_by(|a, b| replay_order(a, b));

    let mut state = AccountState::empty();
    let mut curve: Vec<ValuePoint> = Vec::new();

    for event in ordered {
        apply_event(&mut state, event);
        let basis: f64 = state
            .open_positions()
            .map(|p| p.shares * p.avg_price)
            .sum();
        let point = ValuePoint {
            date: event.date,
            cash: state.cash,
            account_value: state.cash + basis,
        };
        match curve.last_mut() {
            Some(last) if last.date == point.date => *last = point,
            _ => curve.push(point),
        }
    }
    curve
}
