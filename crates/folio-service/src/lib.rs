//! folio-service
//!
//! Orchestration layer between the HTTP surface and the stores. All three
//! history-mutating operations (add, edit, delete) reduce to "mutate the
//! event log, then derive state with the one replay fold" — there is exactly
//! one interpretation of what each event does to cash and positions.
//!
//! The service owns the entry-time business rules (caps, oversell,
//! insufficient cash) and the per-portfolio mutual-exclusion scope around
//! every read-events → replay → write-snapshot window. The replay engine
//! itself assumes it is the sole writer during that window.

mod error;
mod locks;
mod service;
mod store;

pub use error::ServiceError;
pub use locks::PortfolioLocks;
pub use service::{
    CashDirection, CashRequest, PortfolioService, Snapshot, TradeOutcome, TradeRequest,
};
pub use store::{EventStore, NoteStore, PortfolioStore, StoreError, UserStore, WatchlistStore};
