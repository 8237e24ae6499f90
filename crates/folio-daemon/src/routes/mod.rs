//! Axum router and shared handler plumbing for folio-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. All handlers are `pub(crate)` so the scenario tests in
//! `tests/` can compose the router directly.

mod auth;
mod collections;
mod portfolio;
mod quotes;

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use folio_service::{ServiceError, StoreError};
use uuid::Uuid;

use crate::api_types::{ErrorBody, HealthResponse, LimitRefusedResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/auth/register", post(auth::register))
        .route("/v1/auth/login", post(auth::login))
        .route("/v1/auth/mfa/setup", post(auth::mfa_setup))
        .route("/v1/auth/mfa/enable", post(auth::mfa_enable))
        .route("/v1/portfolio/:n", get(portfolio::get_portfolio))
        .route("/v1/portfolio/:n/trades", get(portfolio::list_trades))
        .route("/v1/portfolio/:n/trades", post(portfolio::record_trade))
        .route("/v1/portfolio/:n/trades/:id", put(portfolio::update_trade))
        .route(
            "/v1/portfolio/:n/trades/:id",
            delete(portfolio::delete_trade),
        )
        .route("/v1/portfolio/:n/cash", post(portfolio::record_cash))
        .route("/v1/portfolio/:n/stats", get(portfolio::stats))
        .route("/v1/watchlist", get(collections::list_watchlist))
        .route("/v1/watchlist", post(collections::add_watchlist))
        .route("/v1/watchlist/:id", delete(collections::remove_watchlist))
        .route("/v1/notes", get(collections::list_notes))
        .route("/v1/notes", post(collections::create_note))
        .route("/v1/notes/:id", put(collections::update_note))
        .route("/v1/notes/:id", delete(collections::delete_note))
        .route("/v1/quotes", get(quotes::get_quotes))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Bearer-token extractor
// ---------------------------------------------------------------------------

/// The authenticated caller, extracted from the `Authorization: Bearer`
/// header. Any handler taking this as an argument is auth-gated.
#[derive(Debug, Clone)]
pub(crate) struct AuthedUser {
    pub user_id: Uuid,
    pub email: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthedUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| unauthorized("missing bearer token"))?;

        let claims = state
            .tokens
            .verify(token)
            .map_err(|e| unauthorized(&e.to_string()))?;

        Ok(AuthedUser {
            user_id: claims.sub,
            email: claims.email,
        })
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

pub(crate) fn unauthorized(msg: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody {
            error: msg.to_string(),
        }),
    )
        .into_response()
}

pub(crate) fn bad_request(msg: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: msg.to_string(),
        }),
    )
        .into_response()
}

pub(crate) fn not_found(msg: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: msg.to_string(),
        }),
    )
        .into_response()
}

pub(crate) fn limit_refused(limit: &str, cap: usize) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(LimitRefusedResponse {
            error: format!("LIMIT_REFUSED: {limit} cap of {cap} reached"),
            limit: limit.to_string(),
        }),
    )
        .into_response()
}

/// Map service failures onto HTTP statuses: entry-validation errors are the
/// caller's fault (422), caps are a refusal (403), unknown events 404, and
/// store trouble is ours (500, logged).
pub(crate) fn service_error(err: ServiceError) -> Response {
    match err {
        ServiceError::Ledger(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorBody {
                error: e.to_string(),
            }),
        )
            .into_response(),
        ServiceError::TradeCapExceeded { cap } => {
            limit_refused("max_trades_per_portfolio", cap)
        }
        ServiceError::EventNotFound => not_found("trade event not found"),
        ServiceError::Store(e) => internal(e),
    }
}

pub(crate) fn store_error(err: StoreError) -> Response {
    match err {
        StoreError::NotFound => not_found("not found"),
        other => internal(other),
    }
}

fn internal(err: impl std::fmt::Display) -> Response {
    tracing::error!(error = %err, "store backend failure");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: "internal error".to_string(),
        }),
    )
        .into_response()
}
