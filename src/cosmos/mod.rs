//! Cosmos DB REST adapter.
//!
//! `CosmosStore` implements:
//! - `TableStore` against the Table API endpoint (SharedKeyLite auth)
//! - `ThroughputStore` against the Documents API endpoint (master-key auth)

mod auth;
mod documents;
mod tables;

use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Instant;
use url::Url;

use crate::config::CosmosConfig;
use crate::errors::{CosmosApi, Result, TableError, map_transport_error};
use crate::metrics::OperationMetrics;

const USER_AGENT: &str = concat!("table-storage-samples/", env!("CARGO_PKG_VERSION"));

/// Client for one Cosmos DB account.
#[derive(Clone)]
pub struct CosmosStore {
    http: Client,
    account: String,
    key: Vec<u8>,
    table_endpoint: Url,
    documents_endpoint: Url,
}

impl std::fmt::Debug for CosmosStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CosmosStore")
            .field("account", &self.account)
            .field("table_endpoint", &self.table_endpoint.as_str())
            .field("documents_endpoint", &self.documents_endpoint.as_str())
            .finish_non_exhaustive()
    }
}

/// A completed HTTP exchange.
struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
    metrics: OperationMetrics,
}

impl CosmosStore {
    /// Build the HTTP client from account settings.
    pub fn new(config: &CosmosConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = config.read_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| TableError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(CosmosStore {
            http,
            account: config.account_name.clone(),
            key: config.account_key.clone(),
            table_endpoint: config.table_endpoint.clone(),
            documents_endpoint: config.documents_endpoint.clone(),
        })
    }

    fn table_url(&self, path: &str) -> Result<Url> {
        join(&self.table_endpoint, path)
    }

    fn documents_url(&self, path: &str) -> Result<Url> {
        join(&self.documents_endpoint, path)
    }

    /// Send a request and collect status, headers, body and metrics.
    async fn execute(&self, request: RequestBuilder, api: CosmosApi) -> Result<RawResponse> {
        let start = Instant::now();
        let response = request
            .send()
            .await
            .map_err(|e| map_transport_error(e, api))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| map_transport_error(e, api))?;
        let metrics = OperationMetrics::from_response(start, &headers);
        Ok(RawResponse {
            status,
            headers,
            body,
            metrics,
        })
    }
}

fn join(base: &Url, path: &str) -> Result<Url> {
    base.join(path)
        .map_err(|e| TableError::Validation(format!("cannot address '{}': {}", path, e)))
}
