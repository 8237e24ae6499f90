//! folio-testkit
//!
//! In-memory implementations of the service store seams plus small fixture
//! helpers. Service and daemon tests run against these so they exercise the
//! exact orchestration code paths without a database.

mod memory;

pub use memory::{
    InMemoryEventStore, InMemoryNoteStore, InMemoryPortfolioStore, InMemoryUserStore,
    InMemoryWatchlistStore,
};

use chrono::NaiveDate;
use folio_service::{PortfolioService, TradeRequest};
use folio_ledger::TradeAction;

/// A service wired to fresh in-memory stores.
pub fn memory_service() -> PortfolioService<InMemoryEventStore, InMemoryPortfolioStore> {
    memory_service_with_cap(1000)
}

/// Same, with an explicit trade-event cap (for cap tests).
pub fn memory_service_with_cap(
    max_trades: usize,
) -> PortfolioService<InMemoryEventStore, InMemoryPortfolioStore> {
    PortfolioService::new(
        InMemoryEventStore::new(),
        InMemoryPortfolioStore::new(),
        max_trades,
    )
}

/// Shorthand trade request builder for tests.
pub fn trade(
    symbol: &str,
    action: TradeAction,
    is_short: bool,
    shares: f64,
    price: f64,
    date: &str,
) -> TradeRequest {
    TradeRequest {
        symbol: symbol.to_string(),
        action,
        is_short,
        shares,
        price,
        leverage: None,
        date: parse_date(date),
    }
}

pub fn parse_date(s: &str) -> NaiveDate {
    s.parse().expect("test date must be YYYY-MM-DD")
}
