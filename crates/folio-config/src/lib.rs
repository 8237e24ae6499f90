//! folio-config
//!
//! Layered YAML configuration with deterministic hashing.
//!
//! - YAML docs merge in order: earlier docs are base, later docs override.
//! - The merged config is hashed (sha256 of canonical JSON) so a running
//!   daemon can report exactly which configuration it was started with.
//! - Config files store only env var **names** for secrets; literal
//!   secret-looking values abort the load (see [`secrets`]).

pub mod secrets;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

pub use secrets::{resolve_secrets, ResolvedSecrets};

/// Known secret-like prefixes. If any leaf string value in the effective
/// config starts with one of these, we abort with CONFIG_SECRET_DETECTED.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // Stripe / OpenAI style
    "sk_live",    // Stripe live
    "sk_test",    // Stripe test
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "gho_",       // GitHub OAuth
    "glpat-",     // GitLab PAT
    "xoxb-",      // Slack bot token
    "xoxp-",      // Slack user token
];

// ---------------------------------------------------------------------------
// Typed config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub secrets: SecretNames,
    #[serde(default)]
    pub quotes: QuotesConfig,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP daemon.
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8700".to_string(),
        }
    }
}

/// Env var *names* from which secrets are resolved at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretNames {
    pub database_url: String,
    pub jwt_signing_key: String,
    pub quote_api_key: Option<String>,
}

impl Default for SecretNames {
    fn default() -> Self {
        Self {
            database_url: "FOLIO_DATABASE_URL".to_string(),
            jwt_signing_key: "FOLIO_JWT_KEY".to_string(),
            quote_api_key: Some("FOLIO_QUOTE_API_KEY".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotesConfig {
    pub provider: String,
    pub base_url: String,
}

impl Default for QuotesConfig {
    fn default() -> Self {
        Self {
            provider: "twelvedata".to_string(),
            base_url: "https://api.twelvedata.com".to_string(),
        }
    }
}

/// Hard item caps enforced at the service layer before anything is written.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Limits {
    pub max_trades_per_portfolio: usize,
    pub max_watchlist_items: usize,
    pub max_notes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_trades_per_portfolio: 1000,
            max_watchlist_items: 100,
            max_notes: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub token_ttl_secs: u64,
    pub issuer: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: 24 * 3600,
            issuer: "folio".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config: AppConfig,
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }
    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json = serde_json::to_string(&merged).context("canonical json serialize")?;
    let config_hash = sha256_hex(canonical_json.as_bytes());

    let config: AppConfig =
        serde_json::from_value(merged).context("config does not match expected shape")?;

    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_strings(v, "", &mut leaves);
    for (ptr, s) in leaves {
        if looks_like_secret(&s) {
            bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
        }
    }
    Ok(())
}

fn collect_leaf_strings(v: &Value, prefix: &str, out: &mut Vec<(String, String)>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map {
                let token = k.replace('~', "~0").replace('/', "~1");
                collect_leaf_strings(vv, &format!("{prefix}/{token}"), out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                collect_leaf_strings(vv, &format!("{prefix}/{i}"), out);
            }
        }
        Value::String(s) => out.push((prefix.to_string(), s.clone())),
        _ => {}
    }
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
