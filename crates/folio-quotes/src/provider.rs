//! Provider boundary for latest-close market data.
//!
//! This module defines only the quote type re-export, the provider trait,
//! and the error taxonomy. Concrete providers live alongside; no database
//! logic and no valuation logic belong here.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::Utc;
use folio_schemas::QuoteSnapshot;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors a [`QuoteProvider`] implementation may return.
#[derive(Debug)]
pub enum QuoteError {
    /// Network or transport failure.
    Transport(String),
    /// The upstream API returned an application-level error.
    Api { code: Option<i64>, message: String },
    /// A response payload could not be decoded.
    Decode(String),
    /// A required configuration value (e.g. API key) is missing or invalid.
    Config(String),
}

impl fmt::Display for QuoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteError::Transport(msg) => write!(f, "transport error: {msg}"),
            QuoteError::Api {
                code: Some(c),
                message,
            } => write!(f, "quote api error code={c}: {message}"),
            QuoteError::Api {
                code: None,
                message,
            } => write!(f, "quote api error: {message}"),
            QuoteError::Decode(msg) => write!(f, "decode error: {msg}"),
            QuoteError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for QuoteError {}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Upstream quote provider contract.
///
/// Object-safe so callers can hold a `Arc<dyn QuoteProvider>` without knowing
/// the concrete type; `Send + Sync` so it crosses async task boundaries.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Human-readable name identifying this provider (e.g. `"twelvedata"`).
    fn name(&self) -> &'static str;

    /// Latest close price for each requested symbol.
    ///
    /// Unknown symbols are omitted from the result rather than failing the
    /// whole batch; callers treat missing symbols as "no quote available".
    async fn latest_close(&self, symbols: &[String]) -> Result<Vec<QuoteSnapshot>, QuoteError>;
}

// ---------------------------------------------------------------------------
// HTTP provider
// ---------------------------------------------------------------------------

/// Quote provider backed by a TwelveData-style `/price` endpoint.
#[derive(Debug)]
pub struct HttpQuoteProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct PriceBody {
    price: Option<String>,
    code: Option<i64>,
    message: Option<String>,
}

impl HttpQuoteProvider {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, QuoteError> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| QuoteError::Config("quote api key is not set".to_string()))?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
        })
    }

    async fn fetch_one(&self, symbol: &str) -> Result<Option<QuoteSnapshot>, QuoteError> {
        let url = format!("{}/price", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("symbol", symbol), ("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| QuoteError::Transport(e.to_string()))?;

        let body: PriceBody = resp
            .json()
            .await
            .map_err(|e| QuoteError::Decode(e.to_string()))?;

        match (body.price, body.code) {
            (Some(price), _) => {
                let close: f64 = price
                    .parse()
                    .map_err(|_| QuoteError::Decode(format!("unparseable price {price:?}")))?;
                Ok(Some(QuoteSnapshot {
                    symbol: symbol.to_string(),
                    close,
                    as_of_utc: Utc::now(),
                }))
            }
            // 404 from the upstream means "unknown symbol" — skip, don't fail
            (None, Some(404)) => Ok(None),
            (None, code) => Err(QuoteError::Api {
                code,
                message: body.message.unwrap_or_else(|| "no price in response".to_string()),
            }),
        }
    }
}

#[async_trait]
impl QuoteProvider for HttpQuoteProvider {
    fn name(&self) -> &'static str {
        "twelvedata"
    }

    async fn latest_close(&self, symbols: &[String]) -> Result<Vec<QuoteSnapshot>, QuoteError> {
        let mut out = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            if let Some(q) = self.fetch_one(symbol).await? {
                out.push(q);
            }
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Fixed provider (tests / keyless deployments)
// ---------------------------------------------------------------------------

/// In-memory provider returning preset closes. Used by tests and by
/// deployments without a quote API key.
#[derive(Default)]
pub struct FixedQuoteProvider {
    closes: BTreeMap<String, f64>,
}

impl FixedQuoteProvider {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            closes: items.into_iter().map(|(s, p)| (s.into(), p)).collect(),
        }
    }
}

#[async_trait]
impl QuoteProvider for FixedQuoteProvider {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn latest_close(&self, symbols: &[String]) -> Result<Vec<QuoteSnapshot>, QuoteError> {
        Ok(symbols
            .iter()
            .filter_map(|s| {
                self.closes.get(s).map(|close| QuoteSnapshot {
                    symbol: s.clone(),
                    close: *close,
                    as_of_utc: Utc::now(),
                })
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
