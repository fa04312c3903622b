//! Table API operations.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{ACCEPT, AUTHORIZATION, ETAG, IF_MATCH};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::json;
use tracing::debug;

use super::{CosmosStore, auth};
use crate::conversions::{
    entity_from_payload, entity_path, entity_to_payload, validate_key, validate_table_name,
};
use crate::errors::{CosmosApi, Result, ServiceFault, TableError, map_table_error};
use crate::metrics::OperationMetrics;
use crate::model::{Entity, TableHandle};
use crate::store::TableStore;

const TABLE_API_VERSION: &str = "2019-02-02";
const ACCEPT_MINIMAL_METADATA: &str = "application/json;odata=minimalmetadata";
const DATA_SERVICE_VERSION: &str = "3.0;NetFx";

fn merge_method() -> Result<Method> {
    Method::from_bytes(b"MERGE")
        .map_err(|e| TableError::Validation(format!("invalid HTTP method MERGE: {}", e)))
}

impl CosmosStore {
    /// Signed request against the Table API endpoint.
    fn table_request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.table_url(path)?;
        let date = auth::rfc1123_date(Utc::now());
        let authorization = auth::shared_key_lite(&self.key, &self.account, url.path(), &date)?;
        Ok(self
            .http
            .request(method, url)
            .header("x-ms-date", date)
            .header("x-ms-version", TABLE_API_VERSION)
            .header(AUTHORIZATION, authorization)
            .header(ACCEPT, ACCEPT_MINIMAL_METADATA)
            .header("DataServiceVersion", DATA_SERVICE_VERSION)
            .header("MaxDataServiceVersion", DATA_SERVICE_VERSION))
    }
}

/// A 409 without an error code is taken as "already exists" too.
fn is_table_already_exists(body: &str) -> bool {
    matches!(
        ServiceFault::parse(body).code.as_deref(),
        None | Some("TableAlreadyExists")
    )
}

fn table_resource(name: &str) -> String {
    format!("Tables('{}')", name)
}

#[async_trait]
impl TableStore for CosmosStore {
    async fn create_table_if_not_exists(
        &self,
        name: &str,
    ) -> Result<(TableHandle, OperationMetrics)> {
        validate_table_name(name)?;
        let request = self
            .table_request(Method::POST, "Tables")?
            .header("Prefer", "return-no-content")
            .json(&json!({ "TableName": name }));
        let raw = self.execute(request, CosmosApi::Tables).await?;
        debug!(table = name, status = %raw.status, charge = ?raw.metrics.request_charge, "create table");

        let created = match raw.status {
            StatusCode::CREATED | StatusCode::NO_CONTENT => true,
            StatusCode::CONFLICT if is_table_already_exists(&raw.body) => false,
            status => return Err(map_table_error(status, &raw.body, Some(name))),
        };
        Ok((
            TableHandle {
                name: name.to_string(),
                created,
            },
            raw.metrics,
        ))
    }

    async fn delete_table_if_exists(&self, name: &str) -> Result<(bool, OperationMetrics)> {
        validate_table_name(name)?;
        let request = self.table_request(Method::DELETE, &table_resource(name))?;
        let raw = self.execute(request, CosmosApi::Tables).await?;
        debug!(table = name, status = %raw.status, "delete table");

        match raw.status {
            StatusCode::NO_CONTENT | StatusCode::OK => Ok((true, raw.metrics)),
            StatusCode::NOT_FOUND => Ok((false, raw.metrics)),
            status => Err(map_table_error(status, &raw.body, Some(name))),
        }
    }

    async fn table_exists(&self, name: &str) -> Result<(bool, OperationMetrics)> {
        validate_table_name(name)?;
        let request = self.table_request(Method::GET, &table_resource(name))?;
        let raw = self.execute(request, CosmosApi::Tables).await?;
        debug!(table = name, status = %raw.status, "query table");

        match raw.status {
            StatusCode::OK => Ok((true, raw.metrics)),
            StatusCode::NOT_FOUND => Ok((false, raw.metrics)),
            status => Err(map_table_error(status, &raw.body, Some(name))),
        }
    }

    async fn upsert(&self, table: &str, entity: &Entity) -> Result<(Entity, OperationMetrics)> {
        validate_key("PartitionKey", &entity.partition_key)?;
        validate_key("RowKey", &entity.row_key)?;
        let path = entity_path(table, &entity.partition_key, &entity.row_key);

        // No If-Match header: the service inserts or merges.
        let request = self
            .table_request(merge_method()?, &path)?
            .json(&entity_to_payload(entity));
        let raw = self.execute(request, CosmosApi::Tables).await?;
        debug!(table, status = %raw.status, charge = ?raw.metrics.request_charge, "insert or merge entity");

        if !raw.status.is_success() {
            return Err(map_table_error(raw.status, &raw.body, Some(table)));
        }
        let etag = raw
            .headers
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // The service answers with no body; the sent timestamp is stale.
        let mut stored = entity.clone();
        stored.etag = etag;
        stored.timestamp = None;
        Ok((stored, raw.metrics))
    }

    async fn point_query(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> Result<(Option<Entity>, OperationMetrics)> {
        validate_key("PartitionKey", partition_key)?;
        validate_key("RowKey", row_key)?;
        let path = entity_path(table, partition_key, row_key);
        let request = self.table_request(Method::GET, &path)?;
        let raw = self.execute(request, CosmosApi::Tables).await?;
        debug!(table, status = %raw.status, charge = ?raw.metrics.request_charge, "point query");

        match raw.status {
            StatusCode::OK => {
                let payload: serde_json::Value = serde_json::from_str(&raw.body)?;
                let etag = raw.headers.get(ETAG).and_then(|v| v.to_str().ok());
                Ok((Some(entity_from_payload(payload, etag)?), raw.metrics))
            }
            StatusCode::NOT_FOUND
                if ServiceFault::parse(&raw.body).code.as_deref() != Some("TableNotFound") =>
            {
                Ok((None, raw.metrics))
            }
            status => Err(map_table_error(status, &raw.body, Some(table))),
        }
    }

    async fn delete_if_unchanged(&self, table: &str, entity: &Entity) -> Result<OperationMetrics> {
        let Some(etag) = entity.etag.as_deref() else {
            return Err(TableError::Validation(format!(
                "entity ({}, {}) has no etag; read it before deleting",
                entity.partition_key, entity.row_key
            )));
        };
        validate_key("PartitionKey", &entity.partition_key)?;
        validate_key("RowKey", &entity.row_key)?;
        let path = entity_path(table, &entity.partition_key, &entity.row_key);
        let request = self
            .table_request(Method::DELETE, &path)?
            .header(IF_MATCH, etag);
        let raw = self.execute(request, CosmosApi::Tables).await?;
        debug!(table, status = %raw.status, charge = ?raw.metrics.request_charge, "delete entity");

        if raw.status.is_success() {
            Ok(raw.metrics)
        } else {
            Err(map_table_error(raw.status, &raw.body, Some(table)))
        }
    }
}
