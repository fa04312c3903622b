//! Error types for table-storage-samples.
//!
//! This module maps Cosmos DB REST failures to [`TableError`].
//! Transport failures are classified first, then the status code and the
//! service error code carried in the response body.

use reqwest::StatusCode;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, TableError>;

/// Every failure the samples can surface.
#[derive(Debug, Error)]
pub enum TableError {
    /// Missing or invalid configuration. Raised before any remote call.
    #[error("configuration error: {0}")]
    Config(String),

    /// Input rejected locally before it reached the service.
    #[error("validation error: {0}")]
    Validation(String),

    /// The service rejected the account key or the request signature.
    #[error("{0}")]
    Credentials(String),

    #[error("access denied to {api}: {message}")]
    AccessDenied { api: &'static str, message: String },

    #[error("{0}")]
    ResourceNotFound(String),

    #[error("{0}")]
    ResourceInUse(String),

    /// The entity changed since its etag was read.
    #[error("precondition failed on {table}: the entity was modified or deleted since it was read")]
    PreconditionFailed { table: String },

    #[error("{api} request rate too large; retry after backing off")]
    Throttled { api: &'static str },

    /// More than one offer is attached to the same collection link.
    #[error("expected a single offer for resource '{resource}', found {count}")]
    AmbiguousOffer { resource: String, count: usize },

    #[error("{0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("{api} returned {status}: {message}")]
    Service {
        api: &'static str,
        status: u16,
        code: Option<String>,
        message: String,
    },
}

impl TableError {
    /// True for failures that a caller may retry unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(self, TableError::Throttled { .. } | TableError::Connection(_))
    }
}

impl From<serde_json::Error> for TableError {
    fn from(err: serde_json::Error) -> Self {
        TableError::Serialization(err.to_string())
    }
}

/// Cosmos DB API surface, for error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CosmosApi {
    Tables,
    Documents,
}

impl CosmosApi {
    pub fn name(&self) -> &'static str {
        match self {
            CosmosApi::Tables => "Table API",
            CosmosApi::Documents => "Documents API",
        }
    }
}

// ========== TRANSPORT ERROR MAPPING ==========

/// Map a `reqwest` transport failure (no HTTP response was received).
pub fn map_transport_error(err: reqwest::Error, api: CosmosApi) -> TableError {
    if err.is_timeout() {
        TableError::Connection(format!(
            "Connection timed out to {}. Check your network or endpoint.",
            api.name()
        ))
    } else if err.is_connect() {
        TableError::Connection(format!(
            "Connection failed to {}. Check if the endpoint is reachable.",
            api.name()
        ))
    } else if err.is_decode() {
        TableError::Serialization(format!(
            "Invalid response from {}: {}",
            api.name(),
            err
        ))
    } else {
        TableError::Connection(format!("Request to {} failed: {}", api.name(), err))
    }
}

// ========== SERVICE ERROR MAPPING ==========

/// Error payload details pulled out of a failed response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceFault {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl ServiceFault {
    /// Parse the error body of either API.
    ///
    /// The Table API nests `odata.error.code` and `odata.error.message.value`;
    /// the Documents API returns top-level `code` and `message`.
    pub fn parse(body: &str) -> Self {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
            let trimmed = body.trim();
            return ServiceFault {
                code: None,
                message: (!trimmed.is_empty()).then(|| trimmed.to_string()),
            };
        };

        if let Some(odata) = value.get("odata.error") {
            let code = odata.get("code").and_then(|c| c.as_str()).map(str::to_string);
            let message = odata
                .get("message")
                .and_then(|m| m.get("value").or(Some(m)))
                .and_then(|m| m.as_str())
                .map(str::to_string);
            return ServiceFault { code, message };
        }

        ServiceFault {
            code: value.get("code").and_then(|c| c.as_str()).map(str::to_string),
            message: value
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string),
        }
    }
}

/// Map status codes and error codes shared by both APIs.
///
/// Returns `None` when the failure needs API-specific handling.
fn map_common_status(status: StatusCode, fault: &ServiceFault, api: CosmosApi) -> Option<TableError> {
    match status {
        StatusCode::UNAUTHORIZED => Some(TableError::Credentials(format!(
            "{} rejected the request signature. Check the account name and key.",
            api.name()
        ))),
        StatusCode::FORBIDDEN => Some(TableError::AccessDenied {
            api: api.name(),
            message: fault
                .message
                .clone()
                .unwrap_or_else(|| "Check the account permissions.".to_string()),
        }),
        StatusCode::TOO_MANY_REQUESTS => Some(TableError::Throttled { api: api.name() }),
        StatusCode::REQUEST_TIMEOUT | StatusCode::SERVICE_UNAVAILABLE => {
            Some(TableError::Connection(format!(
                "{} is temporarily unavailable ({}).",
                api.name(),
                status.as_u16()
            )))
        }
        _ => match fault.code.as_deref() {
            Some("AuthenticationFailed") | Some("Unauthorized") => {
                Some(TableError::Credentials(format!(
                    "{} rejected the request signature. Check the account name and key.",
                    api.name()
                )))
            }
            Some("TooManyRequests") | Some("RequestRateTooLarge") => {
                Some(TableError::Throttled { api: api.name() })
            }
            _ => None,
        },
    }
}

/// Map a failed Table API response to a [`TableError`].
pub fn map_table_error(status: StatusCode, body: &str, table: Option<&str>) -> TableError {
    let fault = ServiceFault::parse(body);
    if let Some(err) = map_common_status(status, &fault, CosmosApi::Tables) {
        return err;
    }

    match (status, fault.code.as_deref()) {
        (StatusCode::PRECONDITION_FAILED, _) | (_, Some("UpdateConditionNotSatisfied")) => {
            TableError::PreconditionFailed {
                table: table.unwrap_or("<unknown>").to_string(),
            }
        }
        (_, Some("TableNotFound")) => {
            let msg = match table {
                Some(t) => format!("Table '{}' not found", t),
                None => "Table not found".to_string(),
            };
            TableError::ResourceNotFound(msg)
        }
        (StatusCode::NOT_FOUND, _) => {
            let msg = match table {
                Some(t) => format!("Resource not found in table '{}'", t),
                None => "Resource not found".to_string(),
            };
            TableError::ResourceNotFound(msg)
        }
        (_, Some("TableAlreadyExists")) => {
            let msg = match table {
                Some(t) => format!("Table '{}' already exists", t),
                None => "Table already exists".to_string(),
            };
            TableError::ResourceInUse(msg)
        }
        (StatusCode::CONFLICT, code) => {
            let detail = fault
                .message
                .clone()
                .or_else(|| code.map(str::to_string))
                .unwrap_or_else(|| "conflict".to_string());
            let msg = match table {
                Some(t) => format!("Table '{}' is in use: {}", t, detail),
                None => format!("Resource already in use: {}", detail),
            };
            TableError::ResourceInUse(msg)
        }
        (StatusCode::BAD_REQUEST, _) => {
            TableError::Validation(fault.message.unwrap_or_else(|| "Bad request".to_string()))
        }
        _ => service_error(status, fault, CosmosApi::Tables),
    }
}

/// Map a failed Documents API response to a [`TableError`].
pub fn map_documents_error(status: StatusCode, body: &str, resource: Option<&str>) -> TableError {
    let fault = ServiceFault::parse(body);
    if let Some(err) = map_common_status(status, &fault, CosmosApi::Documents) {
        return err;
    }

    match status {
        StatusCode::NOT_FOUND => {
            let msg = match resource {
                Some(r) => format!("Resource '{}' not found", r),
                None => "Resource not found".to_string(),
            };
            TableError::ResourceNotFound(msg)
        }
        StatusCode::PRECONDITION_FAILED => TableError::PreconditionFailed {
            table: resource.unwrap_or("<unknown>").to_string(),
        },
        StatusCode::CONFLICT => TableError::ResourceInUse(
            fault
                .message
                .unwrap_or_else(|| "Resource already in use".to_string()),
        ),
        StatusCode::BAD_REQUEST => {
            TableError::Validation(fault.message.unwrap_or_else(|| "Bad request".to_string()))
        }
        _ => service_error(status, fault, CosmosApi::Documents),
    }
}

fn service_error(status: StatusCode, fault: ServiceFault, api: CosmosApi) -> TableError {
    let message = fault
        .message
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "unknown error".to_string());
    TableError::Service {
        api: api.name(),
        status: status.as_u16(),
        code: fault.code,
        message,
    }
}
