//! Request and response types for all folio-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded by
//! Axum and decoded by tests. No business logic lives here.

use folio_ledger::{LedgerEvent, ValuePoint, WinLossSummary};
use folio_schemas::{Note, QuoteSnapshot, WatchlistEntry};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Generic error body for 4xx/5xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Response body when a request is refused because an item cap was reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitRefusedResponse {
    pub error: String,
    /// Which limit was hit: "max_trades_per_portfolio" | "max_watchlist_items" | "max_notes"
    pub limit: String,
}

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
}

// ---------------------------------------------------------------------------
// /v1/auth/*
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Required once the account has MFA enabled.
    pub mfa_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MfaSetupResponse {
    pub secret_base32: String,
    pub otpauth_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MfaEnableRequest {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MfaEnableResponse {
    pub mfa_enabled: bool,
}

// ---------------------------------------------------------------------------
// /v1/portfolio/*
// ---------------------------------------------------------------------------

/// One open position with its quote-derived figures attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionView {
    pub symbol: String,
    pub shares: f64,
    pub avg_price: f64,
    pub leverage: f64,
    pub is_short: bool,
    /// Latest close, when the quote provider knows the symbol.
    pub mark: Option<f64>,
    pub market_value: f64,
    pub unrealized_pnl: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioResponse {
    pub portfolio_no: i32,
    pub cash: f64,
    pub base_value: f64,
    pub market_value: f64,
    pub unrealized_pnl: f64,
    pub equity: f64,
    pub return_pct: f64,
    pub positions: Vec<PositionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradesResponse {
    pub events: Vec<LedgerEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub summary: WinLossSummary,
    pub value_curve: Vec<ValuePoint>,
}

// ---------------------------------------------------------------------------
// /v1/watchlist  /v1/notes  /v1/quotes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistAddRequest {
    pub symbol: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistResponse {
    pub entries: Vec<WatchlistEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRequest {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesResponse {
    pub notes: Vec<Note>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotesResponse {
    pub quotes: Vec<QuoteSnapshot>,
}
