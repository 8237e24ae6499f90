//! Shared runtime state for folio-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum; this module owns
//! nothing async itself. Stores are held as trait objects so scenario tests
//! wire in-memory implementations while production wires Postgres.

use std::sync::Arc;

use folio_auth::TokenService;
use folio_config::Limits;
use folio_quotes::QuoteProvider;
use folio_service::{
    EventStore, NoteStore, PortfolioService, PortfolioStore, UserStore, WatchlistStore,
};
use serde::{Deserialize, Serialize};

/// Static build metadata included in the health response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

/// Cloneable (Arc) handle shared across all Axum handlers.
pub struct AppState {
    pub build: BuildInfo,
    pub service: PortfolioService<Arc<dyn EventStore>, Arc<dyn PortfolioStore>>,
    pub users: Arc<dyn UserStore>,
    pub watchlist: Arc<dyn WatchlistStore>,
    pub notes: Arc<dyn NoteStore>,
    pub quotes: Arc<dyn QuoteProvider>,
    pub tokens: TokenService,
    pub limits: Limits,
    /// Issuer string used for both JWT and otpauth URLs.
    pub issuer: String,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        events: Arc<dyn EventStore>,
        portfolios: Arc<dyn PortfolioStore>,
        users: Arc<dyn UserStore>,
        watchlist: Arc<dyn WatchlistStore>,
        notes: Arc<dyn NoteStore>,
        quotes: Arc<dyn QuoteProvider>,
        tokens: TokenService,
        limits: Limits,
        issuer: impl Into<String>,
    ) -> Self {
        Self {
            build: BuildInfo {
                service: "folio-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            service: PortfolioService::new(events, portfolios, limits.max_trades_per_portfolio),
            users,
            watchlist,
            notes,
            quotes,
            tokens,
            limits,
            issuer: issuer.into(),
        }
    }
}
