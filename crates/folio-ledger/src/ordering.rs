//! Event ordering policy.
//!
//! Defines the canonical replay order for ledger events. Replaying in
//! canonical order is a mandatory invariant: the same set of events must
//! always produce the same account state regardless of the order in which
//! they were read back from the store or edited.
//!
//! # Canonical sort key
//!
//! `(date, insertion_order)` ascending. `insertion_order` is a
//! per-portfolio monotonically increasing integer assigned by the event
//! store at append time; two same-day events must preserve original entry
//! order, otherwise same-day round-trips realize P&L against the wrong
//! average price.

use std::cmp::Ordering;

use crate::types::LedgerEvent;

/// Compare two events in canonical replay order.
pub fn replay_order(a: &LedgerEvent, b: &LedgerEvent) -> Ordering {
    a.date
        .cmp(&b.date)
        .then(a.insertion_order.cmp(&b.insertion_order))
}

/// Sort `events` into canonical replay order **in place**.
///
/// Pure, stateless, deterministic: identical inputs always produce identical
/// outputs.
pub fn sort_events_canonical(events: &mut [LedgerEvent]) {
    events.sort_by(replay_order);
}
