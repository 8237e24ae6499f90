//! folio-daemon entry point.
//!
//! This file is intentionally thin: it sets up tracing, loads config and
//! secrets, wires the Postgres stores and quote provider into the shared
//! state, attaches middleware, and starts the HTTP server. All route
//! handlers live in `routes/`; shared state types live in `state.rs`.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use folio_daemon::{routes, state::AppState};
use folio_quotes::{FixedQuoteProvider, HttpQuoteProvider, QuoteProvider};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience). Silent if the file does
    // not exist — production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let loaded = load_config()?;
    info!(config_hash = %loaded.config_hash, "configuration loaded");
    let config = loaded.config;

    let secrets = folio_config::resolve_secrets(&config.secrets)?;

    let pool = folio_db::connect(&secrets.database_url).await?;
    folio_db::migrate(&pool).await?;
    let db = folio_db::status(&pool).await?;
    info!(ok = db.ok, has_events_table = db.has_events_table, "database ready");

    let quotes: Arc<dyn QuoteProvider> = match HttpQuoteProvider::new(
        config.quotes.base_url.clone(),
        secrets.quote_api_key.clone(),
    ) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            warn!(error = %e, "no quote API key; serving entry-price valuations only");
            Arc::new(FixedQuoteProvider::default())
        }
    };

    let tokens = folio_auth::TokenService::new(
        &secrets.jwt_signing_key,
        config.auth.issuer.clone(),
        config.auth.token_ttl_secs,
    );

    let shared = Arc::new(AppState::new(
        Arc::new(folio_db::PgEventStore::new(pool.clone())),
        Arc::new(folio_db::PgPortfolioStore::new(pool.clone())),
        Arc::new(folio_db::PgUserStore::new(pool.clone())),
        Arc::new(folio_db::PgWatchlistStore::new(pool.clone())),
        Arc::new(folio_db::PgNoteStore::new(pool)),
        quotes,
        tokens,
        config.limits,
        config.auth.issuer.clone(),
    ));

    let app = routes::build_router(shared)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr: SocketAddr = config
        .server
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind addr {:?}", config.server.bind_addr))?;
    info!("folio-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// Config file paths come from FOLIO_CONFIG (comma-separated, later files
/// override earlier ones). With no files set, built-in defaults apply.
fn load_config() -> anyhow::Result<folio_config::LoadedConfig> {
    match std::env::var("FOLIO_CONFIG") {
        Ok(paths) => {
            let parts: Vec<&str> = paths.split(',').map(str::trim).collect();
            folio_config::load_layered_yaml(&parts)
        }
        Err(_) => folio_config::load_layered_yaml_from_strings(&["{}"]),
    }
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(tower_http::cors::Any)
}
