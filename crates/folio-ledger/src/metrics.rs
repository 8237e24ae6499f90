use std::collections::BTreeMap;

use crate::types::{Position, PositionKey};
use crate::MarkMap;

/// Valuation of an account against a set of marks.
#[derive(Clone, Debug, PartialEq)]
pub struct Valuation {
    /// Σ position market values (longs at mark; shorts at margin + spread).
    pub market_value: f64,
    pub unrealized_pnl: f64,
    /// cash + market_value.
    pub equity: f64,
    /// (equity - base_value) / base_value * 100; 0 when no base value yet.
    pub return_pct: f64,
}

/// Compute total market value from positions and marks.
///
/// A symbol missing from the mark map values at its average entry price
/// (unrealized P&L contribution of zero) rather than at zero, so a stale
/// quote feed never makes a portfolio look wiped out.
///
/// long:  shares * mark
/// short: shares * (2*avg - mark)  — posted margin plus the favorable spread
pub fn compute_market_value(positions: &BTreeMap<PositionKey, Position>, marks: &MarkMap) -> f64 {
    let mut mv = 0.0;
    for pos in positions.values() {
        let mark = *marks.get(&pos.symbol).unwrap_or(&pos.avg_price);
        if pos.is_short {
            mv += pos.shares * (2.0 * pos.avg_price - mark);
        } else {
            mv += pos.shares * mark;
        }
    }
    mv
}

/// Compute unrealized P&L from positions and marks.
///
/// long:  (mark - avg) * shares
/// short: (avg - mark) * shares
pub fn compute_unrealized_pnl(
    positions: &BTreeMap<PositionKey, Position>,
    marks: &MarkMap,
) -> f64 {
    let mut pnl = 0.0;
    for pos in positions.values() {
        let mark = *marks.get(&pos.symbol).unwrap_or(&pos.avg_price);
        if pos.is_short {
            pnl += (pos.avg_price - mark) * pos.shares;
        } else {
            pnl += (mark - pos.avg_price) * pos.shares;
        }
    }
    pnl
}

/// Compute equity = cash + market value.
pub fn compute_equity(
    cash: f64,
    positions: &BTreeMap<PositionKey, Position>,
    marks: &MarkMap,
) -> f64 {
    cash + compute_market_value(positions, marks)
}

/// Return percentage against the first external cash injection.
pub fn compute_return_pct(equity: f64, base_value: f64) -> f64 {
    if base_value > 0.0 {
        (equity - base_value) / base_value * 100.0
    } else {
        0.0
    }
}

/// Bundle all valuation figures for one account.
pub fn valuation(
    cash: f64,
    base_value: f64,
    positions: &BTreeMap<PositionKey, Position>,
    marks: &MarkMap,
) -> Valuation {
    let market_value = compute_market_value(positions, marks);
    let equity = cash + market_value;
    Valuation {
        market_value,
        unrealized_pnl: compute_unrealized_pnl(positions, marks),
        equity,
        return_pct: compute_return_pct(equity, base_value),
    }
}
