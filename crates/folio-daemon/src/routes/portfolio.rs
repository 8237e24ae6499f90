//! Portfolio, trade, and cash endpoints. Every mutation delegates to the
//! service layer; these handlers only shape requests and responses.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::collections::BTreeMap;

use folio_ledger::{
    valuation, value_curve, win_loss_summary, MarkMap, Position, PositionKey,
};
use folio_service::{CashRequest, Snapshot, TradeRequest};
use tracing::info;
use uuid::Uuid;

use crate::api_types::{PortfolioResponse, PositionView, StatsResponse, TradesResponse};
use crate::state::AppState;

use super::{service_error, AuthedUser};

// ---------------------------------------------------------------------------
// GET /v1/portfolio/:n
// ---------------------------------------------------------------------------

/// Derived snapshot plus a quote-marked valuation.
pub(crate) async fn get_portfolio(
    State(st): State<Arc<AppState>>,
    user: AuthedUser,
    Path(portfolio_no): Path<i32>,
) -> Response {
    let snapshot = match st.service.portfolio_snapshot(user.user_id, portfolio_no).await {
        Ok(s) => s,
        Err(e) => return service_error(e),
    };

    let symbols: Vec<String> = {
        let mut syms: Vec<String> = snapshot.positions.iter().map(|p| p.symbol.clone()).collect();
        syms.sort();
        syms.dedup();
        syms
    };

    // A quote outage degrades to entry-price valuation rather than failing
    // the whole portfolio read.
    let marks: MarkMap = match st.quotes.latest_close(&symbols).await {
        Ok(quotes) => quotes.into_iter().map(|q| (q.symbol, q.close)).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "quote provider unavailable; valuing at entry prices");
            MarkMap::new()
        }
    };

    (
        StatusCode::OK,
        Json(portfolio_response(portfolio_no, &snapshot, &marks)),
    )
        .into_response()
}

fn portfolio_response(
    portfolio_no: i32,
    snapshot: &Snapshot,
    marks: &MarkMap,
) -> PortfolioResponse {
    let books: BTreeMap<PositionKey, Position> = snapshot
        .positions
        .iter()
        .map(|p| (p.key(), p.clone()))
        .collect();
    let v = valuation(snapshot.cash, snapshot.base_value, &books, marks);

    PortfolioResponse {
        portfolio_no,
        cash: snapshot.cash,
        base_value: snapshot.base_value,
        market_value: v.market_value,
        unrealized_pnl: v.unrealized_pnl,
        equity: v.equity,
        return_pct: v.return_pct,
        positions: snapshot
            .positions
            .iter()
            .map(|p| position_view(p, marks))
            .collect(),
    }
}

fn position_view(p: &Position, marks: &MarkMap) -> PositionView {
    let mark = marks.get(&p.symbol).copied();
    let effective = mark.unwrap_or(p.avg_price);
    let (market_value, unrealized_pnl) = if p.is_short {
        (
            p.shares * (2.0 * p.avg_price - effective),
            (p.avg_price - effective) * p.shares,
        )
    } else {
        (p.shares * effective, (effective - p.avg_price) * p.shares)
    };

    PositionView {
        symbol: p.symbol.clone(),
        shares: p.shares,
        avg_price: p.avg_price,
        leverage: p.leverage,
        is_short: p.is_short,
        mark,
        market_value,
        unrealized_pnl,
    }
}

// ---------------------------------------------------------------------------
// GET /v1/portfolio/:n/trades
// ---------------------------------------------------------------------------

pub(crate) async fn list_trades(
    State(st): State<Arc<AppState>>,
    user: AuthedUser,
    Path(portfolio_no): Path<i32>,
) -> Response {
    match st.service.list_trades(user.user_id, portfolio_no).await {
        Ok(events) => (StatusCode::OK, Json(TradesResponse { events })).into_response(),
        Err(e) => service_error(e),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/portfolio/:n/trades
// ---------------------------------------------------------------------------

pub(crate) async fn record_trade(
    State(st): State<Arc<AppState>>,
    user: AuthedUser,
    Path(portfolio_no): Path<i32>,
    Json(req): Json<TradeRequest>,
) -> Response {
    match st.service.record_trade(user.user_id, portfolio_no, req).await {
        Ok(outcome) => {
            info!(user_id = %user.user_id, portfolio_no, event_id = %outcome.event.id, "trade recorded");
            (StatusCode::CREATED, Json(outcome)).into_response()
        }
        Err(e) => service_error(e),
    }
}

// ---------------------------------------------------------------------------
// PUT /v1/portfolio/:n/trades/:id
// ---------------------------------------------------------------------------

pub(crate) async fn update_trade(
    State(st): State<Arc<AppState>>,
    user: AuthedUser,
    Path((portfolio_no, event_id)): Path<(i32, Uuid)>,
    Json(req): Json<TradeRequest>,
) -> Response {
    match st
        .service
        .update_trade(user.user_id, portfolio_no, event_id, req)
        .await
    {
        Ok(outcome) => {
            info!(user_id = %user.user_id, portfolio_no, %event_id, "trade updated");
            (StatusCode::OK, Json(outcome)).into_response()
        }
        Err(e) => service_error(e),
    }
}

// ---------------------------------------------------------------------------
// DELETE /v1/portfolio/:n/trades/:id
// ---------------------------------------------------------------------------

pub(crate) async fn delete_trade(
    State(st): State<Arc<AppState>>,
    user: AuthedUser,
    Path((portfolio_no, event_id)): Path<(i32, Uuid)>,
) -> Response {
    match st
        .service
        .delete_trade(user.user_id, portfolio_no, event_id)
        .await
    {
        Ok(snapshot) => {
            info!(user_id = %user.user_id, portfolio_no, %event_id, "trade deleted");
            (StatusCode::OK, Json(snapshot)).into_response()
        }
        Err(e) => service_error(e),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/portfolio/:n/cash
// ---------------------------------------------------------------------------

pub(crate) async fn record_cash(
    State(st): State<Arc<AppState>>,
    user: AuthedUser,
    Path(portfolio_no): Path<i32>,
    Json(req): Json<CashRequest>,
) -> Response {
    match st.service.record_cash(user.user_id, portfolio_no, req).await {
        Ok(outcome) => {
            info!(user_id = %user.user_id, portfolio_no, event_id = %outcome.event.id, "cash recorded");
            (StatusCode::CREATED, Json(outcome)).into_response()
        }
        Err(e) => service_error(e),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/portfolio/:n/stats
// ---------------------------------------------------------------------------

pub(crate) async fn stats(
    State(st): State<Arc<AppState>>,
    user: AuthedUser,
    Path(portfolio_no): Path<i32>,
) -> Response {
    match st.service.list_trades(user.user_id, portfolio_no).await {
        Ok(events) => (
            StatusCode::OK,
            Json(StatsResponse {
                summary: win_loss_summary(&events),
                value_curve: value_curve(&events),
            }),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}
