//! Conversions between customer records, entities and Table REST payloads.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::errors::{Result, TableError};
use crate::model::{CustomerRecord, Entity};

pub const PARTITION_KEY: &str = "PartitionKey";
pub const ROW_KEY: &str = "RowKey";
pub const TIMESTAMP: &str = "Timestamp";
pub const ODATA_ETAG: &str = "odata.etag";

const EMAIL: &str = "Email";
const PHONE_NUMBER: &str = "PhoneNumber";

/// Maximum size of a key column value, in bytes.
const MAX_KEY_BYTES: usize = 1024;

/// A record type that can be stored as a table entity.
pub trait TableEntity: Sized {
    fn to_entity(&self) -> Entity;
    fn from_entity(entity: Entity) -> Result<Self>;
}

impl TableEntity for Entity {
    fn to_entity(&self) -> Entity {
        self.clone()
    }

    fn from_entity(entity: Entity) -> Result<Self> {
        Ok(entity)
    }
}

impl TableEntity for CustomerRecord {
    fn to_entity(&self) -> Entity {
        Entity::from(self)
    }

    fn from_entity(entity: Entity) -> Result<Self> {
        CustomerRecord::try_from(entity)
    }
}

// ========== CUSTOMER <-> ENTITY ==========

impl From<&CustomerRecord> for Entity {
    /// Unset optional fields are left out so a merge keeps the stored value.
    fn from(customer: &CustomerRecord) -> Self {
        let mut properties = Map::new();
        if let Some(email) = &customer.email {
            properties.insert(EMAIL.to_string(), Value::String(email.clone()));
        }
        if let Some(phone) = &customer.phone_number {
            properties.insert(PHONE_NUMBER.to_string(), Value::String(phone.clone()));
        }
        Entity {
            partition_key: customer.last_name.clone(),
            row_key: customer.first_name.clone(),
            etag: customer.etag.clone(),
            timestamp: customer.timestamp,
            properties,
        }
    }
}

impl TryFrom<Entity> for CustomerRecord {
    type Error = TableError;

    fn try_from(entity: Entity) -> Result<Self> {
        Ok(CustomerRecord {
            email: string_property(&entity.properties, EMAIL)?,
            phone_number: string_property(&entity.properties, PHONE_NUMBER)?,
            last_name: entity.partition_key,
            first_name: entity.row_key,
            etag: entity.etag,
            timestamp: entity.timestamp,
        })
    }
}

fn string_property(properties: &Map<String, Value>, name: &str) -> Result<Option<String>> {
    match properties.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(TableError::Serialization(format!(
            "property '{}' should be a string, got {}",
            name, other
        ))),
    }
}

// ========== ENTITY <-> REST PAYLOAD ==========

/// Build the JSON body sent for an insert or merge.
pub fn entity_to_payload(entity: &Entity) -> Value {
    let mut body = Map::with_capacity(entity.properties.len() + 2);
    body.insert(
        PARTITION_KEY.to_string(),
        Value::String(entity.partition_key.clone()),
    );
    body.insert(ROW_KEY.to_string(), Value::String(entity.row_key.clone()));
    for (name, value) in &entity.properties {
        body.insert(name.clone(), value.clone());
    }
    Value::Object(body)
}

/// Parse a JSON entity returned by the Table API.
///
/// `etag_header` wins over the `odata.etag` body field when both are present.
pub fn entity_from_payload(payload: Value, etag_header: Option<&str>) -> Result<Entity> {
    let Value::Object(mut body) = payload else {
        return Err(TableError::Serialization(
            "entity payload is not a JSON object".to_string(),
        ));
    };

    let partition_key = take_string(&mut body, PARTITION_KEY)?;
    let row_key = take_string(&mut body, ROW_KEY)?;

    let timestamp = match body.remove(TIMESTAMP) {
        Some(Value::String(ts)) => Some(parse_timestamp(&ts)?),
        _ => None,
    };

    let body_etag = match body.remove(ODATA_ETAG) {
        Some(Value::String(etag)) => Some(etag),
        _ => None,
    };
    let etag = etag_header.map(str::to_string).or(body_etag);

    // Drop the remaining OData annotations (`odata.metadata`, `Prop@odata.type`, ...).
    body.retain(|name, _| !name.starts_with("odata.") && !name.contains("@odata."));

    Ok(Entity {
        partition_key,
        row_key,
        etag,
        timestamp,
        properties: body,
    })
}

fn take_string(body: &mut Map<String, Value>, name: &str) -> Result<String> {
    match body.remove(name) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(TableError::Serialization(format!(
            "'{}' should be a string, got {}",
            name, other
        ))),
        None => Err(TableError::Serialization(format!(
            "entity payload is missing '{}'",
            name
        ))),
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| TableError::Serialization(format!("invalid Timestamp '{}': {}", raw, e)))
}

// ========== ADDRESSING & VALIDATION ==========

/// Resource path of a single entity, e.g. `demo1(PartitionKey='Harp',RowKey='Walter')`.
pub fn entity_path(table: &str, partition_key: &str, row_key: &str) -> String {
    format!(
        "{}(PartitionKey='{}',RowKey='{}')",
        table,
        escape_key(partition_key),
        escape_key(row_key)
    )
}

fn escape_key(key: &str) -> String {
    key.replace('\'', "''")
}

/// Check a table name: 3-63 alphanumeric characters starting with a letter.
pub fn validate_table_name(name: &str) -> Result<()> {
    let valid_len = (3..=63).contains(&name.len());
    let starts_with_letter = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    let alphanumeric = name.chars().all(|c| c.is_ascii_alphanumeric());
    if valid_len && starts_with_letter && alphanumeric {
        Ok(())
    } else {
        Err(TableError::Validation(format!(
            "invalid table name '{}': use 3-63 letters or digits, starting with a letter",
            name
        )))
    }
}

/// Check a partition key or row key value.
pub fn validate_key(column: &str, value: &str) -> Result<()> {
    if value.len() > MAX_KEY_BYTES {
        return Err(TableError::Validation(format!(
            "{} exceeds {} bytes",
            column, MAX_KEY_BYTES
        )));
    }
    if let Some(bad) = value
        .chars()
        .find(|c| matches!(*c, '/' | '\\' | '#' | '?') || c.is_control())
    {
        return Err(TableError::Validation(format!(
            "{} contains a forbidden character {:?}",
            column, bad
        )));
    }
    Ok(())
}
