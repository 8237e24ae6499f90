//! Market-data lookup endpoint.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::api_types::{ErrorBody, QuotesResponse};
use crate::state::AppState;

use super::{bad_request, AuthedUser};

#[derive(Debug, Deserialize)]
pub(crate) struct QuotesQuery {
    /// Comma-separated ticker list, e.g. `?symbols=AAPL,TSLA`.
    pub symbols: String,
}

// ---------------------------------------------------------------------------
// GET /v1/quotes
// ---------------------------------------------------------------------------

pub(crate) async fn get_quotes(
    State(st): State<Arc<AppState>>,
    _user: AuthedUser,
    Query(query): Query<QuotesQuery>,
) -> Response {
    let symbols: Vec<String> = query
        .symbols
        .split(',')
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .collect();
    if symbols.is_empty() {
        return bad_request("symbols query parameter must name at least one ticker");
    }

    match st.quotes.latest_close(&symbols).await {
        Ok(quotes) => (StatusCode::OK, Json(QuotesResponse { quotes })).into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(ErrorBody {
                error: format!("quote provider: {e}"),
            }),
        )
            .into_response(),
    }
}
