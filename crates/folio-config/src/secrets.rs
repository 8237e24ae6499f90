//! Runtime secret resolution.
//!
//! This module is the single source of truth for secrets.
//!
//! # Contract
//! - Config YAML stores only env var **names** (e.g. `"FOLIO_JWT_KEY"`).
//! - Callers invoke [`resolve_secrets`] once at startup.
//! - The returned [`ResolvedSecrets`] is passed into constructors; never
//!   scatter `std::env::var` calls across the codebase.
//! - `Debug` output **redacts** values.
//! - Error messages reference the env var **name**, never the value.

use anyhow::{bail, Result};

use crate::SecretNames;

/// All runtime-resolved secrets for one daemon instantiation.
///
/// **Values are redacted in `Debug` output.**
#[derive(Clone)]
pub struct ResolvedSecrets {
    pub database_url: String,
    pub jwt_signing_key: String,
    /// Optional: absent means the quote provider runs keyless (test/fixed
    /// providers) or the deployment disabled live quotes.
    pub quote_api_key: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("database_url", &"<REDACTED>")
            .field("jwt_signing_key", &"<REDACTED>")
            .field(
                "quote_api_key",
                &self.quote_api_key.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

/// Resolve all secrets from the environment using the names in `names`.
///
/// Database URL and JWT signing key are required; the quote API key is
/// optional in every mode.
pub fn resolve_secrets(names: &SecretNames) -> Result<ResolvedSecrets> {
    let database_url = require_env(&names.database_url)?;
    let jwt_signing_key = require_env(&names.jwt_signing_key)?;
    let quote_api_key = match &names.quote_api_key {
        Some(name) => std::env::var(name).ok().filter(|v| !v.trim().is_empty()),
        None => None,
    };

    Ok(ResolvedSecrets {
        database_url,
        jwt_signing_key,
        quote_api_key,
    })
}

fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => bail!("missing required env var {name}"),
    }
}
