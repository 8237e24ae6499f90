//! Scenario: full paper-trading flow over HTTP.
//!
//! Register → deposit → trade → valuation → edit/delete → stats, all through
//! the router with in-memory stores and a fixed quote provider.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use folio_auth::TokenService;
use folio_config::Limits;
use folio_daemon::{routes, state::AppState};
use folio_quotes::FixedQuoteProvider;
use folio_testkit::{
    InMemoryEventStore, InMemoryNoteStore, InMemoryPortfolioStore, InMemoryUserStore,
    InMemoryWatchlistStore,
};
use http_body_util::BodyExt;
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn test_state() -> Arc<AppState> {
    Arc::new(AppState::new(
        Arc::new(InMemoryEventStore::new()),
        Arc::new(InMemoryPortfolioStore::new()),
        Arc::new(InMemoryUserStore::new()),
        Arc::new(InMemoryWatchlistStore::new()),
        Arc::new(InMemoryNoteStore::new()),
        // marks used for valuation checks below
        Arc::new(FixedQuoteProvider::new([("AAPL", 200.0)])),
        TokenService::new("test-signing-key", "folio", 3600),
        Limits::default(),
        "folio",
    ))
}

async fn call(
    st: &Arc<AppState>,
    req: Request<axum::body::Body>,
) -> (StatusCode, serde_json::Value) {
    let resp = routes::build_router(Arc::clone(st))
        .oneshot(req)
        .await
        .expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).expect("body is not valid JSON")
    };
    (status, json)
}

fn authed(method: &str, uri: &str, token: &str, body: Option<serde_json::Value>) -> Request<axum::body::Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"));
    match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(axum::body::Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(axum::body::Body::empty()).unwrap(),
    }
}

async fn register(st: &Arc<AppState>) -> String {
    let (status, json) = call(
        st,
        Request::builder()
            .method("POST")
            .uri("/v1/auth/register")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(
                serde_json::json!({ "email": "trader@folio.test", "password": "long-enough-password" })
                    .to_string(),
            ))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["token"].as_str().unwrap().to_string()
}

async fn deposit(st: &Arc<AppState>, token: &str, amount: f64) {
    let (status, _) = call(
        st,
        authed(
            "POST",
            "/v1/portfolio/1/cash",
            token,
            Some(serde_json::json!({
                "direction": "deposit", "amount": amount, "date": "2024-05-01"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

// ---------------------------------------------------------------------------
// Flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deposit_trade_and_valuation() {
    let st = test_state();
    let token = register(&st).await;
    deposit(&st, &token, 10_000.0).await;

    // buy 10 AAPL @ 180
    let (status, outcome) = call(
        &st,
        authed(
            "POST",
            "/v1/portfolio/1/trades",
            &token,
            Some(serde_json::json!({
                "symbol": "AAPL", "action": "buy", "shares": 10.0,
                "price": 180.0, "date": "2024-05-02"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(outcome["event"]["kind"], "open_long");
    assert_eq!(outcome["snapshot"]["cash"], 8_200.0);

    // portfolio values the position at the fixed 200 mark
    let (status, portfolio) = call(&st, authed("GET", "/v1/portfolio/1", &token, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(portfolio["cash"], 8_200.0);
    assert_eq!(portfolio["market_value"], 2_000.0);
    assert_eq!(portfolio["equity"], 10_200.0);
    assert_eq!(portfolio["unrealized_pnl"], 200.0);
    assert_eq!(portfolio["positions"][0]["mark"], 200.0);
    // (10200 - 10000) / 10000
    assert_eq!(portfolio["return_pct"], 2.0);
}

#[tokio::test]
async fn insufficient_cash_maps_to_422() {
    let st = test_state();
    let token = register(&st).await;
    deposit(&st, &token, 100.0).await;

    let (status, body) = call(
        &st,
        authed(
            "POST",
            "/v1/portfolio/1/trades",
            &token,
            Some(serde_json::json!({
                "symbol": "AAPL", "action": "buy", "shares": 10.0,
                "price": 180.0, "date": "2024-05-02"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("insufficient cash"));
}

#[tokio::test]
async fn edit_and_delete_rebuild_the_snapshot() {
    let st = test_state();
    let token = register(&st).await;
    deposit(&st, &token, 10_000.0).await;

    let (_, first) = call(
        &st,
        authed(
            "POST",
            "/v1/portfolio/1/trades",
            &token,
            Some(serde_json::json!({
                "symbol": "AAPL", "action": "buy", "shares": 10.0,
                "price": 100.0, "date": "2024-05-02"
            })),
        ),
    )
    .await;
    let event_id = first["event"]["id"].as_str().unwrap().to_string();

    // edit the lot price; snapshot reflects the replay
    let (status, edited) = call(
        &st,
        authed(
            "PUT",
            &format!("/v1/portfolio/1/trades/{event_id}"),
            &token,
            Some(serde_json::json!({
                "symbol": "AAPL", "action": "buy", "shares": 10.0,
                "price": 90.0, "date": "2024-05-02"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["snapshot"]["cash"], 9_100.0);

    // delete it; back to cash only
    let (status, snapshot) = call(
        &st,
        authed(
            "DELETE",
            &format!("/v1/portfolio/1/trades/{event_id}"),
            &token,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["cash"], 10_000.0);
    assert!(snapshot["positions"].as_array().unwrap().is_empty());

    // deleting again is a 404
    let (status, _) = call(
        &st,
        authed(
            "DELETE",
            &format!("/v1/portfolio/1/trades/{event_id}"),
            &token,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stats_tally_round_trips() {
    let st = test_state();
    let token = register(&st).await;
    deposit(&st, &token, 10_000.0).await;

    for (action, shares, price, date) in [
        ("buy", 10.0, 100.0, "2024-05-02"),
        ("sell", 10.0, 120.0, "2024-05-03"),
    ] {
        let (status, _) = call(
            &st,
            authed(
                "POST",
                "/v1/portfolio/1/trades",
                &token,
                Some(serde_json::json!({
                    "symbol": "AAPL", "action": action, "shares": shares,
                    "price": price, "date": date
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, stats) = call(&st, authed("GET", "/v1/portfolio/1/stats", &token, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["summary"]["wins"], 1);
    assert_eq!(stats["summary"]["losses"], 0);
    assert_eq!(stats["summary"]["realized_pnl"], 200.0);
    assert_eq!(stats["value_curve"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn quotes_endpoint_returns_known_symbols() {
    let st = test_state();
    let token = register(&st).await;

    let (status, body) = call(
        &st,
        authed("GET", "/v1/quotes?symbols=AAPL,UNKNOWN", &token, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let quotes = body["quotes"].as_array().unwrap();
    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes[0]["symbol"], "AAPL");
    assert_eq!(quotes[0]["close"], 200.0);
}
