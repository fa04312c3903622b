//! Value types shared by the operations and the stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A table row in wire-neutral form.
///
/// `properties` never contains the key columns or service metadata; those
/// live in their own fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Entity {
    pub partition_key: String,
    pub row_key: String,
    /// Change-version token assigned by the service.
    pub etag: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub properties: Map<String, Value>,
}

impl Entity {
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Entity {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            ..Default::default()
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// The composite primary key.
    pub fn key(&self) -> (&str, &str) {
        (&self.partition_key, &self.row_key)
    }
}

/// Customer contact record. Last name is the partition key, first name the row key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CustomerRecord {
    pub last_name: String,
    pub first_name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub etag: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl CustomerRecord {
    pub fn new(last_name: impl Into<String>, first_name: impl Into<String>) -> Self {
        CustomerRecord {
            last_name: last_name.into(),
            first_name: first_name.into(),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone_number(mut self, phone_number: impl Into<String>) -> Self {
        self.phone_number = Some(phone_number.into());
        self
    }
}

/// Handle to a table that is known to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHandle {
    pub name: String,
    /// True when this call created the table.
    pub created: bool,
}

/// The collection that backs a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDescriptor {
    pub id: String,
    #[serde(rename = "_rid")]
    pub rid: String,
    #[serde(rename = "_self")]
    pub self_link: String,
}

/// Provisioned-throughput offer attached to a collection.
///
/// Unknown fields are kept in `extra` so a replace sends back what was read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughputOffer {
    pub id: String,
    #[serde(rename = "_rid")]
    pub rid: String,
    #[serde(rename = "_self", default)]
    pub self_link: String,
    #[serde(rename = "_etag", default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Self link of the collection this offer governs.
    pub resource: String,
    #[serde(rename = "offerResourceId", default)]
    pub offer_resource_id: String,
    #[serde(rename = "offerVersion", default = "default_offer_version")]
    pub offer_version: String,
    #[serde(rename = "offerType", default = "default_offer_type")]
    pub offer_type: String,
    /// Absent on legacy V1 offers.
    #[serde(default)]
    pub content: OfferContent,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OfferContent {
    /// Request units per second.
    #[serde(rename = "offerThroughput")]
    pub offer_throughput: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_offer_version() -> String {
    "V2".to_string()
}

fn default_offer_type() -> String {
    "Invalid".to_string()
}

impl ThroughputOffer {
    /// A copy of this offer as a V2 offer carrying `target_rus`.
    pub fn with_throughput(&self, target_rus: u32) -> ThroughputOffer {
        let mut offer = self.clone();
        offer.offer_version = default_offer_version();
        offer.offer_type = default_offer_type();
        offer.content.offer_throughput = target_rus;
        offer
    }

    pub fn throughput(&self) -> u32 {
        self.content.offer_throughput
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn offer_keeps_unknown_fields_through_replace() {
        let raw = json!({
            "id": "ABCD",
            "_rid": "ABCD",
            "_self": "offers/ABCD/",
            "_etag": "\"0000\"",
            "resource": "dbs/db==/colls/coll=/",
            "offerResourceId": "coll=",
            "offerVersion": "V2",
            "offerType": "Invalid",
            "content": {
                "offerThroughput": 400,
                "offerIsRUPerMinuteThroughputEnabled": false
            },
            "_ts": 1500000000
        });
        let offer: ThroughputOffer = serde_json::from_value(raw).unwrap();
        assert_eq!(offer.throughput(), 400);

        let raised = offer.with_throughput(1000);
        let out = serde_json::to_value(&raised).unwrap();
        assert_eq!(out["content"]["offerThroughput"], 1000);
        assert_eq!(out["content"]["offerIsRUPerMinuteThroughputEnabled"], false);
        assert_eq!(out["_ts"], 1500000000);
        assert_eq!(out["resource"], "dbs/db==/colls/coll=/");
    }

    #[test]
    fn v1_offer_is_upgraded_on_replace() {
        let raw = json!({
            "id": "X",
            "_rid": "X",
            "resource": "dbs/a/colls/b/",
            "offerVersion": "V1",
            "offerType": "S1"
        });
        let offer: ThroughputOffer = serde_json::from_value(raw).unwrap();
        assert_eq!(offer.throughput(), 0);

        let raised = offer.with_throughput(1000);
        assert_eq!(raised.offer_version, "V2");
        assert_eq!(raised.offer_type, "Invalid");
        let out = serde_json::to_value(&raised).unwrap();
        assert_eq!(out["content"]["offerThroughput"], 1000);
    }

    #[test]
    fn customer_builder_sets_optional_fields() {
        let customer = CustomerRecord::new("Harp", "Walter")
            .with_email("Walter@contoso.com")
            .with_phone_number("425-555-0101");
        assert_eq!(customer.last_name, "Harp");
        assert_eq!(customer.first_name, "Walter");
        assert_eq!(customer.email.as_deref(), Some("Walter@contoso.com"));
        assert_eq!(customer.etag, None);
    }
}
