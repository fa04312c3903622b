//! In-memory store implementing both capability traits.
//!
//! Etags are per-entity version counters. Collections and offers are
//! created alongside tables so throughput calls work against the same
//! state. Faults can be injected per operation for failure-path tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::config::DEFAULT_DATABASE;
use crate::errors::{Result, TableError};
use crate::metrics::OperationMetrics;
use crate::model::{CollectionDescriptor, Entity, OfferContent, TableHandle, ThroughputOffer};
use crate::store::{TableStore, ThroughputStore};

/// Throughput assigned to a newly created table.
pub const DEFAULT_THROUGHPUT: u32 = 400;

/// Store operation names, for fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    CreateTable,
    DeleteTable,
    TableExists,
    Upsert,
    PointQuery,
    Delete,
    ReadCollection,
    QueryOffer,
    ReplaceOffer,
}

type Key = (String, String);

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<Key, Entity>,
}

#[derive(Debug, Default)]
struct State {
    tables: BTreeMap<String, Table>,
    collections: HashMap<String, CollectionDescriptor>,
    offers: Vec<ThroughputOffer>,
    next_version: u64,
    faults: HashMap<StoreOp, (usize, fn() -> TableError)>,
    replace_history: Vec<(String, u32)>,
}

impl State {
    fn next_etag(&mut self) -> String {
        self.next_version += 1;
        format!("W/\"{}\"", self.next_version)
    }

    fn take_fault(&mut self, op: StoreOp) -> Result<()> {
        if let Some((remaining, make)) = self.faults.get_mut(&op)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(make());
        }
        Ok(())
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| TableError::ResourceNotFound(format!("Table '{}' not found", name)))
    }
}

/// Thread-safe in-memory table service.
#[derive(Debug)]
pub struct MemoryStore {
    database: String,
    state: Mutex<State>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_DATABASE)
    }
}

impl MemoryStore {
    pub fn new(database: impl Into<String>) -> Self {
        MemoryStore {
            database: database.into(),
            state: Mutex::new(State::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A panicking test thread must not hide the state from the others.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make the next `times` calls of `op` fail with the error built by `make`.
    pub fn fail_next(&self, op: StoreOp, times: usize, make: fn() -> TableError) {
        self.lock().faults.insert(op, (times, make));
    }

    /// Current throughput of the offer backing `table`.
    pub fn throughput_of(&self, table: &str) -> Option<u32> {
        let state = self.lock();
        let link = state.collections.get(table)?.self_link.clone();
        state
            .offers
            .iter()
            .find(|o| o.resource == link)
            .map(ThroughputOffer::throughput)
    }

    /// Every successful offer replace, as (resource link, throughput), in order.
    pub fn replace_history(&self) -> Vec<(String, u32)> {
        self.lock().replace_history.clone()
    }

    /// Detach the offer from `table`'s collection.
    pub fn remove_offer(&self, table: &str) {
        let mut state = self.lock();
        if let Some(link) = state.collections.get(table).map(|c| c.self_link.clone()) {
            state.offers.retain(|o| o.resource != link);
        }
    }

    /// Attach an extra offer to `table`'s collection.
    pub fn add_duplicate_offer(&self, table: &str) {
        let mut state = self.lock();
        let Some(link) = state.collections.get(table).map(|c| c.self_link.clone()) else {
            return;
        };
        let id = format!("dup{}", state.offers.len());
        let offer = new_offer(&id, &link, DEFAULT_THROUGHPUT);
        state.offers.push(offer);
    }

    /// Number of entities in `table`, or `None` if it does not exist.
    pub fn entity_count(&self, table: &str) -> Option<usize> {
        self.lock().tables.get(table).map(|t| t.rows.len())
    }
}

fn new_offer(id: &str, resource: &str, throughput: u32) -> ThroughputOffer {
    ThroughputOffer {
        id: id.to_string(),
        rid: id.to_string(),
        self_link: format!("offers/{}/", id),
        etag: None,
        resource: resource.to_string(),
        offer_resource_id: String::new(),
        offer_version: "V2".to_string(),
        offer_type: "Invalid".to_string(),
        content: OfferContent {
            offer_throughput: throughput,
            extra: Default::default(),
        },
        extra: Default::default(),
    }
}

fn metrics() -> OperationMetrics {
    OperationMetrics::with_charge(0.0, Some(1.0))
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn create_table_if_not_exists(
        &self,
        name: &str,
    ) -> Result<(TableHandle, OperationMetrics)> {
        let mut state = self.lock();
        state.take_fault(StoreOp::CreateTable)?;
        if state.tables.contains_key(name) {
            return Ok((
                TableHandle {
                    name: name.to_string(),
                    created: false,
                },
                metrics(),
            ));
        }

        state.tables.insert(name.to_string(), Table::default());
        let rid = format!("coll{}", state.collections.len() + 1);
        let collection = CollectionDescriptor {
            id: name.to_string(),
            self_link: format!("dbs/{}/colls/{}/", self.database, rid),
            rid: rid.clone(),
        };
        let offer = new_offer(&format!("offer{}", rid), &collection.self_link, DEFAULT_THROUGHPUT);
        state.offers.push(offer);
        state.collections.insert(name.to_string(), collection);
        Ok((
            TableHandle {
                name: name.to_string(),
                created: true,
            },
            metrics(),
        ))
    }

    async fn delete_table_if_exists(&self, name: &str) -> Result<(bool, OperationMetrics)> {
        let mut state = self.lock();
        state.take_fault(StoreOp::DeleteTable)?;
        if state.tables.remove(name).is_none() {
            return Ok((false, metrics()));
        }
        if let Some(collection) = state.collections.remove(name) {
            state.offers.retain(|o| o.resource != collection.self_link);
        }
        Ok((true, metrics()))
    }

    async fn table_exists(&self, name: &str) -> Result<(bool, OperationMetrics)> {
        let mut state = self.lock();
        state.take_fault(StoreOp::TableExists)?;
        Ok((state.tables.contains_key(name), metrics()))
    }

    async fn upsert(&self, table: &str, entity: &Entity) -> Result<(Entity, OperationMetrics)> {
        let mut state = self.lock();
        state.take_fault(StoreOp::Upsert)?;
        let etag = state.next_etag();
        let rows = &mut state.table_mut(table)?.rows;

        let key = (entity.partition_key.clone(), entity.row_key.clone());
        let stored = rows
            .entry(key)
            .or_insert_with(|| Entity::new(&entity.partition_key, &entity.row_key));
        for (name, value) in &entity.properties {
            stored.properties.insert(name.clone(), value.clone());
        }
        stored.etag = Some(etag);
        stored.timestamp = Some(Utc::now());
        Ok((stored.clone(), metrics()))
    }

    async fn point_query(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> Result<(Option<Entity>, OperationMetrics)> {
        let mut state = self.lock();
        state.take_fault(StoreOp::PointQuery)?;
        let rows = &state.table_mut(table)?.rows;
        let found = rows
            .get(&(partition_key.to_string(), row_key.to_string()))
            .cloned();
        Ok((found, metrics()))
    }

    async fn delete_if_unchanged(&self, table: &str, entity: &Entity) -> Result<OperationMetrics> {
        let mut state = self.lock();
        state.take_fault(StoreOp::Delete)?;
        let rows = &mut state.table_mut(table)?.rows;
        let key = (entity.partition_key.clone(), entity.row_key.clone());

        let Some(stored) = rows.get(&key) else {
            return Err(TableError::ResourceNotFound(format!(
                "Entity ({}, {}) not found in table '{}'",
                entity.partition_key, entity.row_key, table
            )));
        };
        // "*" matches any version, like an unconditional If-Match.
        let matches = match entity.etag.as_deref() {
            Some("*") => true,
            Some(etag) => stored.etag.as_deref() == Some(etag),
            None => false,
        };
        if !matches {
            return Err(TableError::PreconditionFailed {
                table: table.to_string(),
            });
        }
        rows.remove(&key);
        Ok(metrics())
    }
}

#[async_trait]
impl ThroughputStore for MemoryStore {
    async fn read_collection(
        &self,
        database: &str,
        table: &str,
    ) -> Result<(CollectionDescriptor, OperationMetrics)> {
        let mut state = self.lock();
        state.take_fault(StoreOp::ReadCollection)?;
        if database != self.database {
            return Err(TableError::ResourceNotFound(format!(
                "Resource 'dbs/{}' not found",
                database
            )));
        }
        state
            .collections
            .get(table)
            .cloned()
            .map(|c| (c, metrics()))
            .ok_or_else(|| {
                TableError::ResourceNotFound(format!(
                    "Resource 'dbs/{}/colls/{}' not found",
                    database, table
                ))
            })
    }

    async fn query_offer_by_resource_link(
        &self,
        self_link: &str,
    ) -> Result<(Vec<ThroughputOffer>, OperationMetrics)> {
        let mut state = self.lock();
        state.take_fault(StoreOp::QueryOffer)?;
        let offers = state
            .offers
            .iter()
            .filter(|o| o.resource == self_link)
            .cloned()
            .collect();
        Ok((offers, metrics()))
    }

    async fn replace_offer(
        &self,
        offer: &ThroughputOffer,
    ) -> Result<(ThroughputOffer, OperationMetrics)> {
        let mut state = self.lock();
        state.take_fault(StoreOp::ReplaceOffer)?;
        let etag = state.next_etag();
        let Some(stored) = state.offers.iter_mut().find(|o| o.rid == offer.rid) else {
            return Err(TableError::ResourceNotFound(format!(
                "Resource 'offers/{}' not found",
                offer.rid
            )));
        };
        *stored = offer.clone();
        stored.etag = Some(etag);
        let replaced = stored.clone();
        state
            .replace_history
            .push((replaced.resource.clone(), replaced.throughput()));
        Ok((replaced, metrics()))
    }
}
