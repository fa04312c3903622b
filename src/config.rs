//! Account configuration.
//!
//! Settings come from environment variables:
//! - `COSMOS_ACCOUNT` / `COSMOS_KEY` (required)
//! - `COSMOS_DATABASE` (default: `TablesDB`)
//! - `COSMOS_DOCUMENTS_ENDPOINT` / `COSMOS_TABLE_ENDPOINT` (override the public cloud endpoints)
//! - `COSMOS_CONNECT_TIMEOUT` / `COSMOS_READ_TIMEOUT` (seconds)
//! - `COSMOS_KEEP_TABLE` (default: true)

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::time::Duration;
use url::Url;

use crate::errors::{Result, TableError};

/// Database that backs every table of a Cosmos Table API account.
pub const DEFAULT_DATABASE: &str = "TablesDB";

pub const ACCOUNT_VAR: &str = "COSMOS_ACCOUNT";
pub const KEY_VAR: &str = "COSMOS_KEY";
pub const DATABASE_VAR: &str = "COSMOS_DATABASE";
pub const DOCUMENTS_ENDPOINT_VAR: &str = "COSMOS_DOCUMENTS_ENDPOINT";
pub const TABLE_ENDPOINT_VAR: &str = "COSMOS_TABLE_ENDPOINT";
pub const CONNECT_TIMEOUT_VAR: &str = "COSMOS_CONNECT_TIMEOUT";
pub const READ_TIMEOUT_VAR: &str = "COSMOS_READ_TIMEOUT";
pub const KEEP_TABLE_VAR: &str = "COSMOS_KEEP_TABLE";

/// Resolved account settings.
#[derive(Clone)]
pub struct CosmosConfig {
    /// Account name without DNS suffix.
    pub account_name: String,
    /// Decoded account key bytes.
    pub account_key: Vec<u8>,
    pub database: String,
    pub documents_endpoint: Url,
    pub table_endpoint: Url,
    pub connect_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    /// Leave the demo table in place after the run.
    pub keep_table: bool,
}

impl std::fmt::Debug for CosmosConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CosmosConfig")
            .field("account_name", &self.account_name)
            .field("account_key", &"<redacted>")
            .field("database", &self.database)
            .field("documents_endpoint", &self.documents_endpoint.as_str())
            .field("table_endpoint", &self.table_endpoint.as_str())
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("keep_table", &self.keep_table)
            .finish()
    }
}

impl CosmosConfig {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let account_name = get(ACCOUNT_VAR)
            .ok_or_else(|| TableError::Config(format!("{} is not set", ACCOUNT_VAR)))?;
        if !account_name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(TableError::Config(format!(
                "{} must be the account name without DNS suffix, got '{}'",
                ACCOUNT_VAR, account_name
            )));
        }

        let raw_key =
            get(KEY_VAR).ok_or_else(|| TableError::Config(format!("{} is not set", KEY_VAR)))?;
        let account_key = STANDARD
            .decode(raw_key.as_bytes())
            .map_err(|e| TableError::Config(format!("{} is not valid base64: {}", KEY_VAR, e)))?;

        let documents_endpoint = match get(DOCUMENTS_ENDPOINT_VAR) {
            Some(url) => parse_endpoint(DOCUMENTS_ENDPOINT_VAR, &url)?,
            None => parse_endpoint(
                DOCUMENTS_ENDPOINT_VAR,
                &documents_endpoint_for(&account_name),
            )?,
        };
        let table_endpoint = match get(TABLE_ENDPOINT_VAR) {
            Some(url) => parse_endpoint(TABLE_ENDPOINT_VAR, &url)?,
            None => parse_endpoint(TABLE_ENDPOINT_VAR, &table_endpoint_for(&account_name))?,
        };

        let keep_table = match get(KEEP_TABLE_VAR) {
            Some(v) => parse_bool(KEEP_TABLE_VAR, &v)?,
            None => true,
        };

        Ok(CosmosConfig {
            account_name,
            account_key,
            database: get(DATABASE_VAR).unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            documents_endpoint,
            table_endpoint,
            connect_timeout: get(CONNECT_TIMEOUT_VAR)
                .map(|v| parse_seconds(CONNECT_TIMEOUT_VAR, &v))
                .transpose()?,
            read_timeout: get(READ_TIMEOUT_VAR)
                .map(|v| parse_seconds(READ_TIMEOUT_VAR, &v))
                .transpose()?,
            keep_table,
        })
    }
}

/// Documents endpoint of an account in the public cloud.
pub fn documents_endpoint_for(account: &str) -> String {
    format!("https://{}.documents.azure.com:443/", account)
}

/// Table endpoint of an account in the public cloud.
pub fn table_endpoint_for(account: &str) -> String {
    format!("https://{}.table.cosmos.azure.com:443/", account)
}

fn parse_endpoint(var: &str, value: &str) -> Result<Url> {
    // Joining relative paths needs a trailing slash.
    let normalized = if value.ends_with('/') {
        value.to_string()
    } else {
        format!("{}/", value)
    };
    Url::parse(&normalized)
        .map_err(|e| TableError::Config(format!("{} is not a valid URL '{}': {}", var, value, e)))
}

fn parse_seconds(var: &str, value: &str) -> Result<Duration> {
    value
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s > 0.0)
        .map(Duration::from_secs_f64)
        .ok_or_else(|| {
            TableError::Config(format!(
                "{} must be a positive number of seconds, got '{}'",
                var, value
            ))
        })
}

fn parse_bool(var: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(TableError::Config(format!(
            "{} must be true or false, got '{}'",
            var, value
        ))),
    }
}
