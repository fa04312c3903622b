//! Documents API operations used for throughput offers.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::{CosmosStore, auth};
use crate::errors::{CosmosApi, Result, map_documents_error};
use crate::metrics::OperationMetrics;
use crate::model::{CollectionDescriptor, ThroughputOffer};
use crate::store::ThroughputStore;

const DOCUMENTS_API_VERSION: &str = "2018-12-31";
const CONTINUATION_HEADER: &str = "x-ms-continuation";

/// Upper bound on query pages, in case the service keeps returning a continuation.
const MAX_QUERY_PAGES: usize = 100;

const OFFER_BY_RESOURCE_QUERY: &str = "SELECT * FROM root r WHERE r.resource = @link";

/// One page of an offer query.
#[derive(Debug, Deserialize)]
struct OfferFeed {
    #[serde(rename = "Offers", default)]
    offers: Vec<ThroughputOffer>,
}

impl CosmosStore {
    /// Signed request against the Documents API endpoint.
    fn documents_request(
        &self,
        method: Method,
        path: &str,
        resource_type: &str,
        resource_link: &str,
    ) -> Result<RequestBuilder> {
        let url = self.documents_url(path)?;
        let date = auth::rfc1123_date(Utc::now());
        let token =
            auth::master_key_token(&self.key, method.as_str(), resource_type, resource_link, &date)?;
        Ok(self
            .http
            .request(method, url)
            .header("x-ms-date", date)
            .header("x-ms-version", DOCUMENTS_API_VERSION)
            .header(AUTHORIZATION, token)
            .header(ACCEPT, "application/json"))
    }
}

#[async_trait]
impl ThroughputStore for CosmosStore {
    async fn read_collection(
        &self,
        database: &str,
        table: &str,
    ) -> Result<(CollectionDescriptor, OperationMetrics)> {
        let link = format!("dbs/{}/colls/{}", database, table);
        let request = self.documents_request(Method::GET, &link, "colls", &link)?;
        let raw = self.execute(request, CosmosApi::Documents).await?;
        debug!(collection = %link, status = %raw.status, charge = ?raw.metrics.request_charge, "read collection");

        if raw.status != StatusCode::OK {
            return Err(map_documents_error(raw.status, &raw.body, Some(&link)));
        }
        let collection: CollectionDescriptor = serde_json::from_str(&raw.body)?;
        Ok((collection, raw.metrics))
    }

    async fn query_offer_by_resource_link(
        &self,
        self_link: &str,
    ) -> Result<(Vec<ThroughputOffer>, OperationMetrics)> {
        let query = serde_json::to_vec(&json!({
            "query": OFFER_BY_RESOURCE_QUERY,
            "parameters": [{ "name": "@link", "value": self_link }],
        }))?;

        let mut offers = Vec::new();
        let mut metrics = OperationMetrics::default();
        let mut continuation: Option<String> = None;

        for _ in 0..MAX_QUERY_PAGES {
            let mut request = self
                .documents_request(Method::POST, "offers", "offers", "")?
                .header("x-ms-documentdb-isquery", "True")
                .header(CONTENT_TYPE, "application/query+json")
                .body(query.clone());
            if let Some(token) = &continuation {
                request = request.header(CONTINUATION_HEADER, token.as_str());
            }

            let raw = self.execute(request, CosmosApi::Documents).await?;
            debug!(resource = self_link, status = %raw.status, charge = ?raw.metrics.request_charge, "query offers");
            if raw.status != StatusCode::OK {
                return Err(map_documents_error(raw.status, &raw.body, Some("offers")));
            }
            metrics.accumulate(&raw.metrics);

            let page: OfferFeed = serde_json::from_str(&raw.body)?;
            offers.extend(page.offers);

            continuation = raw
                .headers
                .get(CONTINUATION_HEADER)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string);
            if continuation.is_none() {
                break;
            }
        }

        if continuation.is_some() {
            warn!(
                resource = self_link,
                pages = MAX_QUERY_PAGES,
                offers = offers.len(),
                "offer query still had a continuation after the page limit; results are partial"
            );
        }
        Ok((offers, metrics))
    }

    async fn replace_offer(
        &self,
        offer: &ThroughputOffer,
    ) -> Result<(ThroughputOffer, OperationMetrics)> {
        let path = format!("offers/{}", offer.rid);
        let request = self
            .documents_request(Method::PUT, &path, "offers", &offer.rid.to_lowercase())?
            .json(offer);
        let raw = self.execute(request, CosmosApi::Documents).await?;
        debug!(offer = %offer.rid, status = %raw.status, charge = ?raw.metrics.request_charge, "replace offer");

        if !raw.status.is_success() {
            return Err(map_documents_error(raw.status, &raw.body, Some(&path)));
        }
        let replaced: ThroughputOffer = serde_json::from_str(&raw.body)?;
        Ok((replaced, raw.metrics))
    }
}
