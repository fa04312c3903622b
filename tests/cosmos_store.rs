//! `CosmosStore` against a local fake of the Cosmos DB REST endpoints.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use table_storage_samples::throughput_operations::update_table_throughput;
use table_storage_samples::{
    CosmosConfig, CosmosStore, CustomerRecord, Entity, TableError, TableStore, ThroughputStore,
};
use table_storage_samples::basic_operations::{delete_entity, insert_or_merge_entity, retrieve_entity};
use warp::Filter;
use warp::http::{HeaderMap, Method, Response};
use warp::hyper::body::Bytes;

/// A request as seen by the fake service.
#[derive(Debug, Clone)]
struct Seen {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    body: String,
}

/// Canned response: status, headers, body.
type Reply = (u16, Vec<(&'static str, String)>, String);

type Handler = dyn Fn(&Seen) -> Reply + Send + Sync;

struct FakeCosmos {
    endpoint: String,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl FakeCosmos {
    fn start(handler: impl Fn(&Seen) -> Reply + Send + Sync + 'static) -> Self {
        let seen: Arc<Mutex<Vec<Seen>>> = Arc::default();
        let handler: Arc<Handler> = Arc::new(handler);
        let log = seen.clone();

        let route = warp::method()
            .and(warp::path::full())
            .and(warp::header::headers_cloned())
            .and(warp::body::bytes())
            .map(move |method: Method, path: warp::path::FullPath, headers: HeaderMap, body: Bytes| {
                let request = Seen {
                    method: method.as_str().to_string(),
                    path: path.as_str().to_string(),
                    headers: headers
                        .iter()
                        .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or("").to_string()))
                        .collect(),
                    body: String::from_utf8_lossy(&body).to_string(),
                };
                let (status, reply_headers, reply_body) = handler(&request);
                log.lock().unwrap().push(request);

                let mut response = Response::builder().status(status);
                for (name, value) in reply_headers {
                    response = response.header(name, value);
                }
                response.body(reply_body).unwrap()
            });

        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        FakeCosmos {
            endpoint: format!("http://{}/", addr),
            seen,
        }
    }

    fn store(&self) -> CosmosStore {
        let endpoint = self.endpoint.clone();
        let config = CosmosConfig::from_lookup(move |name| match name {
            "COSMOS_ACCOUNT" => Some("contoso".to_string()),
            "COSMOS_KEY" => Some("a2V5".to_string()),
            "COSMOS_TABLE_ENDPOINT" | "COSMOS_DOCUMENTS_ENDPOINT" => Some(endpoint.clone()),
            _ => None,
        })
        .unwrap();
        CosmosStore::new(&config).unwrap()
    }

    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

fn reply(status: u16, body: &str) -> Reply {
    (status, vec![], body.to_string())
}

const ENTITY_PATH: &str = "/demo1(PartitionKey='Harp',RowKey='Walter')";

#[tokio::test]
async fn create_table_treats_conflict_as_existing() {
    let calls = Arc::new(Mutex::new(0));
    let counter = calls.clone();
    let fake = FakeCosmos::start(move |_| {
        let mut n = counter.lock().unwrap();
        *n += 1;
        if *n == 1 {
            (204, vec![("x-ms-request-charge", "1.5".to_string())], String::new())
        } else {
            reply(
                409,
                r#"{"odata.error":{"code":"TableAlreadyExists","message":{"value":"exists"}}}"#,
            )
        }
    });
    let store = fake.store();

    let (first, metrics) = store.create_table_if_not_exists("demo1").await.unwrap();
    let (second, _) = store.create_table_if_not_exists("demo1").await.unwrap();
    assert!(first.created);
    assert!(!second.created);
    assert_eq!(metrics.request_charge, Some(1.5));

    let seen = fake.seen();
    assert_eq!(seen[0].method, "POST");
    assert_eq!(seen[0].path, "/Tables");
    assert!(seen[0].body.contains("\"TableName\":\"demo1\""));
    assert!(seen[0].headers["authorization"].starts_with("SharedKeyLite contoso:"));
    assert_eq!(seen[0].headers["x-ms-version"], "2019-02-02");
    assert!(seen[0].headers.contains_key("x-ms-date"));
}

#[tokio::test]
async fn create_table_conflict_while_deleting_is_an_error() {
    let fake = FakeCosmos::start(|_| {
        reply(
            409,
            r#"{"odata.error":{"code":"TableBeingDeleted","message":{"value":"The specified table is being deleted."}}}"#,
        )
    });
    let store = fake.store();

    let err = store.create_table_if_not_exists("demo1").await.unwrap_err();
    assert!(matches!(err, TableError::ResourceInUse(_)));
    assert!(err.to_string().contains("being deleted"));
}

#[tokio::test]
async fn table_probe_and_delete_address_the_table_resource() {
    let fake = FakeCosmos::start(|req| match req.path.as_str() {
        "/Tables('demo1')" if req.method == "GET" => reply(200, r#"{"TableName":"demo1"}"#),
        "/Tables('demo1')" => reply(204, ""),
        _ => reply(
            404,
            r#"{"odata.error":{"code":"ResourceNotFound","message":{"value":"missing"}}}"#,
        ),
    });
    let store = fake.store();

    assert!(store.table_exists("demo1").await.unwrap().0);
    assert!(store.delete_table_if_exists("demo1").await.unwrap().0);
    assert!(!store.table_exists("gone").await.unwrap().0);
    assert!(!store.delete_table_if_exists("gone").await.unwrap().0);

    let seen: Vec<(String, String)> = fake
        .seen()
        .into_iter()
        .map(|r| (r.method, r.path))
        .collect();
    assert_eq!(
        seen,
        vec![
            ("GET".to_string(), "/Tables('demo1')".to_string()),
            ("DELETE".to_string(), "/Tables('demo1')".to_string()),
            ("GET".to_string(), "/Tables('gone')".to_string()),
            ("DELETE".to_string(), "/Tables('gone')".to_string()),
        ]
    );
}

#[tokio::test]
async fn upsert_sends_merge_without_if_match() {
    let fake = FakeCosmos::start(|_| (204, vec![("etag", "W/\"v2\"".to_string())], String::new()));
    let store = fake.store();
    let mut customer = CustomerRecord::new("Harp", "Walter").with_phone_number("425-555-0105");
    customer.timestamp = "2017-11-01T10:00:00Z".parse().ok();

    let (stored, _) = insert_or_merge_entity(&store, "demo1", &customer).await.unwrap();
    assert_eq!(stored.etag.as_deref(), Some("W/\"v2\""));
    assert_eq!(stored.timestamp, None);

    let seen = fake.seen();
    assert_eq!(seen[0].method, "MERGE");
    assert_eq!(seen[0].path, ENTITY_PATH);
    assert!(!seen[0].headers.contains_key("if-match"));
    let body: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
    assert_eq!(body["PartitionKey"], "Harp");
    assert_eq!(body["PhoneNumber"], "425-555-0105");
    assert!(body.get("Email").is_none());
}

#[tokio::test]
async fn point_query_distinguishes_missing_entity_from_missing_table() {
    let fake = FakeCosmos::start(|req| {
        if req.path.starts_with("/demo1") {
            reply(
                200,
                r#"{"odata.etag":"W/\"v2\"","PartitionKey":"Harp","RowKey":"Walter","Timestamp":"2017-11-01T10:00:00Z","Email":"Walter@contoso.com","PhoneNumber":"425-555-0105"}"#,
            )
        } else if req.path.starts_with("/gone") {
            reply(
                404,
                r#"{"odata.error":{"code":"ResourceNotFound","message":{"value":"missing"}}}"#,
            )
        } else {
            reply(
                404,
                r#"{"odata.error":{"code":"TableNotFound","message":{"value":"no table"}}}"#,
            )
        }
    });
    let store = fake.store();

    let (found, _) = retrieve_entity::<_, CustomerRecord>(&store, "demo1", "Harp", "Walter")
        .await
        .unwrap();
    let found = found.unwrap();
    assert_eq!(found.phone_number.as_deref(), Some("425-555-0105"));
    assert_eq!(found.etag.as_deref(), Some("W/\"v2\""));

    let (missing, _) = retrieve_entity::<_, Entity>(&store, "gone", "Harp", "Walter")
        .await
        .unwrap();
    assert!(missing.is_none());

    let err = retrieve_entity::<_, Entity>(&store, "nosuch", "Harp", "Walter")
        .await
        .unwrap_err();
    assert!(matches!(err, TableError::ResourceNotFound(_)));
}

#[tokio::test]
async fn delete_sends_if_match_and_maps_412() {
    let fake = FakeCosmos::start(|req| {
        if req.headers.get("if-match").map(String::as_str) == Some("W/\"v2\"") {
            reply(204, "")
        } else {
            reply(
                412,
                r#"{"odata.error":{"code":"UpdateConditionNotSatisfied","message":{"value":"stale"}}}"#,
            )
        }
    });
    let store = fake.store();

    let mut customer = CustomerRecord::new("Harp", "Walter");
    customer.etag = Some("W/\"v1\"".to_string());
    let err = delete_entity(&store, "demo1", &customer).await.unwrap_err();
    assert!(matches!(err, TableError::PreconditionFailed { .. }));

    customer.etag = Some("W/\"v2\"".to_string());
    delete_entity(&store, "demo1", &customer).await.unwrap();

    let seen = fake.seen();
    assert_eq!(seen[1].method, "DELETE");
    assert_eq!(seen[1].path, ENTITY_PATH);
}

#[tokio::test]
async fn throughput_update_reads_queries_and_replaces() {
    let fake = FakeCosmos::start(|req| match (req.method.as_str(), req.path.as_str()) {
        ("GET", "/dbs/TablesDB/colls/demo1") => reply(
            200,
            r#"{"id":"demo1","_rid":"1xs+AOLcUAA=","_self":"dbs/1xs+AA==/colls/1xs+AOLcUAA=/"}"#,
        ),
        ("POST", "/offers") => reply(
            200,
            r#"{"_rid":"","Offers":[{"id":"Xnvq","_rid":"Xnvq","_self":"offers/Xnvq/","resource":"dbs/1xs+AA==/colls/1xs+AOLcUAA=/","offerResourceId":"1xs+AOLcUAA=","offerVersion":"V2","offerType":"Invalid","content":{"offerThroughput":400}}],"_count":1}"#,
        ),
        ("PUT", "/offers/Xnvq") => (200, vec![], req.body.clone()),
        _ => reply(404, r#"{"code":"NotFound","message":"unexpected"}"#),
    });
    let store = fake.store();

    let (offer, _) = update_table_throughput(&store, "TablesDB", "demo1", 1000)
        .await
        .unwrap();
    assert_eq!(offer.unwrap().throughput(), 1000);

    let seen = fake.seen();
    assert_eq!(seen.len(), 3);
    assert!(seen[0].headers["authorization"].starts_with("type%3Dmaster%26ver%3D1.0%26sig%3D"));
    assert_eq!(seen[1].headers["x-ms-documentdb-isquery"], "True");
    assert_eq!(seen[1].headers["content-type"], "application/query+json");
    let query: serde_json::Value = serde_json::from_str(&seen[1].body).unwrap();
    assert_eq!(query["parameters"][0]["value"], "dbs/1xs+AA==/colls/1xs+AOLcUAA=/");
    let replaced: serde_json::Value = serde_json::from_str(&seen[2].body).unwrap();
    assert_eq!(replaced["content"]["offerThroughput"], 1000);
}

fn offer_feed(ids: &[&str]) -> String {
    let offers: Vec<serde_json::Value> = ids
        .iter()
        .map(|id| {
            serde_json::json!({
                "id": id,
                "_rid": id,
                "resource": "dbs/a/colls/r/",
                "offerVersion": "V2",
                "offerType": "Invalid",
                "content": { "offerThroughput": 400 }
            })
        })
        .collect();
    serde_json::json!({ "_rid": "", "Offers": offers, "_count": ids.len() }).to_string()
}

#[tokio::test]
async fn offer_query_follows_continuation_across_pages() {
    let fake = FakeCosmos::start(|req| match req.headers.get("x-ms-continuation") {
        None => (
            200,
            vec![
                ("x-ms-continuation", "page2".to_string()),
                ("x-ms-request-charge", "2".to_string()),
            ],
            offer_feed(&["A"]),
        ),
        Some(_) => (
            200,
            vec![("x-ms-request-charge", "3".to_string())],
            offer_feed(&["B"]),
        ),
    });
    let store = fake.store();

    let (offers, metrics) = store
        .query_offer_by_resource_link("dbs/a/colls/r/")
        .await
        .unwrap();
    let ids: Vec<&str> = offers.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B"]);
    assert_eq!(metrics.request_charge, Some(5.0));

    let seen = fake.seen();
    assert_eq!(seen.len(), 2);
    assert!(!seen[0].headers.contains_key("x-ms-continuation"));
    assert_eq!(seen[1].headers["x-ms-continuation"], "page2");
    assert_eq!(seen[0].body, seen[1].body);
}

#[tokio::test]
async fn offer_query_stops_at_page_limit() {
    let fake = FakeCosmos::start(|_| {
        (
            200,
            vec![("x-ms-continuation", "more".to_string())],
            offer_feed(&["A"]),
        )
    });
    let store = fake.store();

    let (offers, _) = store
        .query_offer_by_resource_link("dbs/a/colls/r/")
        .await
        .unwrap();
    assert_eq!(fake.seen().len(), 100);
    assert_eq!(offers.len(), 100);
}

#[tokio::test]
async fn throughput_update_without_offer_skips_replace() {
    let fake = FakeCosmos::start(|req| match req.method.as_str() {
        "GET" => reply(200, r#"{"id":"demo1","_rid":"r","_self":"dbs/a/colls/r/"}"#),
        "POST" => reply(200, r#"{"_rid":"","Offers":[],"_count":0}"#),
        _ => reply(500, r#"{"code":"Unexpected","message":"replace should not be called"}"#),
    });
    let store = fake.store();

    let (offer, _) = update_table_throughput(&store, "TablesDB", "demo1", 400)
        .await
        .unwrap();
    assert!(offer.is_none());
    assert_eq!(fake.seen().len(), 2);
}

#[tokio::test]
async fn auth_and_throttling_are_mapped() {
    let fake = FakeCosmos::start(|req| {
        if req.path == "/Tables" {
            reply(
                403,
                r#"{"odata.error":{"code":"AuthorizationFailure","message":{"value":"denied"}}}"#,
            )
        } else {
            reply(429, r#"{"code":"TooManyRequests","message":"slow down"}"#)
        }
    });
    let store = fake.store();

    let err = store.create_table_if_not_exists("demo1").await.unwrap_err();
    assert!(matches!(err, TableError::AccessDenied { ref message, .. } if message == "denied"));

    let err = update_table_throughput(&store, "TablesDB", "demo1", 400)
        .await
        .unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn unreachable_endpoint_is_a_connection_error() {
    let config = CosmosConfig::from_lookup(|name| match name {
        "COSMOS_ACCOUNT" => Some("contoso".to_string()),
        "COSMOS_KEY" => Some("a2V5".to_string()),
        // Port 9 (discard) is closed on test machines.
        "COSMOS_TABLE_ENDPOINT" => Some("http://127.0.0.1:9/".to_string()),
        _ => None,
    })
    .unwrap();
    let store = CosmosStore::new(&config).unwrap();
    let err = store.table_exists("demo1").await.unwrap_err();
    assert!(matches!(err, TableError::Connection(_)));
}
