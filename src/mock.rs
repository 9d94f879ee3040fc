//! In-memory store implementations for testing.
//!
//! [`MemoryStore`] behaves like a small document store: databases and
//! containers must exist before items can be written, missing resources
//! are reported with the same not-found classification a real client uses,
//! and queries page through items in insertion order. Call counters allow
//! tests to assert on the exact operations a binding issued.
//!
//! Available in unit tests and behind the `test-utils` feature for
//! downstream crates.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use serde_json::Value;

use crate::client::{ClientOptions, Connector, DocumentClient, QueryDefinition, QueryPage};
use crate::document::item_id;
use crate::error::{Error, Result};

#[derive(Default)]
struct ContainerState {
    partition_key_path: Option<String>,
    items: Vec<Value>,
}

#[derive(Default)]
struct StoreState {
    databases: HashMap<String, HashMap<String, ContainerState>>,
    poisoned: HashSet<(String, String)>,
    last_query: Option<QueryDefinition>,
    last_database_throughput: Option<u32>,
    last_container_throughput: Option<u32>,
    query_page_budget: Option<usize>,
}

/// An in-memory document store.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
    page_size: usize,
    upsert_calls: AtomicUsize,
    replace_calls: AtomicUsize,
    create_database_calls: AtomicUsize,
    create_container_calls: AtomicUsize,
    query_page_calls: AtomicUsize,
}

impl MemoryStore {
    /// Creates an empty store with a large default page size.
    pub fn new() -> Self {
        Self {
            page_size: 1000,
            ..Self::default()
        }
    }

    /// Sets the number of items returned per query page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Creates a database and container directly, bypassing the client API.
    pub fn seed_container(&self, database: &str, container: &str, partition_key_path: Option<&str>) {
        let mut state = self.state.lock().unwrap();
        state
            .databases
            .entry(database.to_owned())
            .or_default()
            .entry(container.to_owned())
            .or_insert_with(|| ContainerState {
                partition_key_path: partition_key_path.map(str::to_owned),
                items: Vec::new(),
            });
    }

    /// Inserts an item directly, bypassing the client API.
    ///
    /// The container must have been seeded first.
    pub fn seed_item(&self, database: &str, container: &str, item: Value) {
        let mut state = self.state.lock().unwrap();
        let container = state
            .databases
            .get_mut(database)
            .and_then(|db| db.get_mut(container))
            .expect("seed_item requires a seeded container");
        container.items.push(item);
    }

    /// Makes every upsert into the given container fail with a store error.
    ///
    /// A missing container still reports not-found first, so a poisoned,
    /// not-yet-created container exercises the provision-then-fail path.
    pub fn fail_upserts(&self, database: &str, container: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .poisoned
            .insert((database.to_owned(), container.to_owned()));
    }

    /// Fails every query page request after the first `pages` successes.
    pub fn fail_query_page_after(&self, pages: usize) {
        self.state.lock().unwrap().query_page_budget = Some(pages);
    }

    /// Returns a container's items in insertion order.
    pub fn items(&self, database: &str, container: &str) -> Vec<Value> {
        let state = self.state.lock().unwrap();
        state
            .databases
            .get(database)
            .and_then(|db| db.get(container))
            .map(|c| c.items.clone())
            .unwrap_or_default()
    }

    /// Returns the partition key path a container was created with.
    pub fn container_partition_key_path(&self, database: &str, container: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .databases
            .get(database)
            .and_then(|db| db.get(container))
            .and_then(|c| c.partition_key_path.clone())
    }

    /// Returns the query definition of the most recent page request.
    pub fn last_query(&self) -> Option<QueryDefinition> {
        self.state.lock().unwrap().last_query.clone()
    }

    /// Returns the throughput hint of the last database create call.
    pub fn last_database_throughput(&self) -> Option<u32> {
        self.state.lock().unwrap().last_database_throughput
    }

    /// Returns the throughput hint of the last container create call.
    pub fn last_container_throughput(&self) -> Option<u32> {
        self.state.lock().unwrap().last_container_throughput
    }

    /// Number of upsert calls issued so far.
    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    /// Number of replace calls issued so far.
    pub fn replace_calls(&self) -> usize {
        self.replace_calls.load(Ordering::SeqCst)
    }

    /// Number of database create calls issued so far.
    pub fn create_database_calls(&self) -> usize {
        self.create_database_calls.load(Ordering::SeqCst)
    }

    /// Number of container create calls issued so far.
    pub fn create_container_calls(&self) -> usize {
        self.create_container_calls.load(Ordering::SeqCst)
    }

    /// Number of query page calls issued so far.
    pub fn query_page_calls(&self) -> usize {
        self.query_page_calls.load(Ordering::SeqCst)
    }

    fn container_not_found(database: &str, container: &str) -> Error {
        Error::not_found(format!(
            "container '{container}' in database '{database}' does not exist"
        ))
    }
}

#[async_trait::async_trait]
impl DocumentClient for MemoryStore {
    async fn create_database_if_not_exists(
        &self,
        database: &str,
        throughput: Option<u32>,
    ) -> Result<()> {
        self.create_database_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        state.last_database_throughput = throughput;
        state.databases.entry(database.to_owned()).or_default();
        Ok(())
    }

    async fn create_container_if_not_exists(
        &self,
        database: &str,
        container: &str,
        partition_key_path: Option<&str>,
        throughput: Option<u32>,
    ) -> Result<()> {
        self.create_container_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        state.last_container_throughput = throughput;
        let db = state
            .databases
            .get_mut(database)
            .ok_or_else(|| Error::not_found(format!("database '{database}' does not exist")))?;
        db.entry(container.to_owned())
            .or_insert_with(|| ContainerState {
                partition_key_path: partition_key_path.map(str::to_owned),
                items: Vec::new(),
            });
        Ok(())
    }

    async fn upsert_item(&self, database: &str, container: &str, item: Value) -> Result<Value> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();

        if !state
            .databases
            .get(database)
            .is_some_and(|db| db.contains_key(container))
        {
            return Err(Self::container_not_found(database, container));
        }
        if state
            .poisoned
            .contains(&(database.to_owned(), container.to_owned()))
        {
            return Err(Error::store("injected upsert failure"));
        }

        let id = item_id(&item)
            .ok_or_else(|| Error::store("the store rejected a document without an 'id'"))?;
        let entry = state
            .databases
            .get_mut(database)
            .and_then(|db| db.get_mut(container))
            .expect("checked above");
        match entry
            .items
            .iter_mut()
            .find(|existing| item_id(existing).as_deref() == Some(id.as_str()))
        {
            Some(existing) => *existing = item.clone(),
            None => entry.items.push(item.clone()),
        }
        Ok(item)
    }

    async fn read_item(
        &self,
        database: &str,
        container: &str,
        id: &str,
        _partition_key: Option<&str>,
    ) -> Result<Value> {
        let state = self.state.lock().unwrap();
        let entry = state
            .databases
            .get(database)
            .and_then(|db| db.get(container))
            .ok_or_else(|| Self::container_not_found(database, container))?;
        entry
            .items
            .iter()
            .find(|item| item_id(item).as_deref() == Some(id))
            .cloned()
            .ok_or_else(|| {
                Error::not_found(format!(
                    "item '{id}' not found in '{database}/{container}'"
                ))
            })
    }

    async fn replace_item(
        &self,
        database: &str,
        container: &str,
        item: Value,
        id: &str,
        _partition_key: Option<&str>,
    ) -> Result<Value> {
        self.replace_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        let entry = state
            .databases
            .get_mut(database)
            .and_then(|db| db.get_mut(container))
            .ok_or_else(|| Self::container_not_found(database, container))?;
        let existing = entry
            .items
            .iter_mut()
            .find(|existing| item_id(existing).as_deref() == Some(id))
            .ok_or_else(|| {
                Error::not_found(format!(
                    "item '{id}' not found in '{database}/{container}'"
                ))
            })?;
        *existing = item.clone();
        Ok(item)
    }

    async fn query_page(
        &self,
        database: &str,
        container: &str,
        query: &QueryDefinition,
        continuation: Option<&str>,
    ) -> Result<QueryPage> {
        let calls = self.query_page_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.state.lock().unwrap();
        state.last_query = Some(query.clone());

        if let Some(budget) = state.query_page_budget
            && calls > budget
        {
            return Err(Error::store("injected query failure"));
        }

        let entry = state
            .databases
            .get(database)
            .and_then(|db| db.get(container))
            .ok_or_else(|| Self::container_not_found(database, container))?;

        // The mock evaluates no predicates; it pages the container's items
        // in insertion order.
        let offset: usize = match continuation {
            Some(token) => token.parse().map_err(|e| {
                Error::store(format!("malformed continuation token '{token}'")).with_source(e)
            })?,
            None => 0,
        };
        let end = (offset + self.page_size).min(entry.items.len());
        let items = entry.items[offset..end].to_vec();
        let next = (end < entry.items.len()).then(|| end.to_string());

        Ok(QueryPage {
            items,
            continuation: next,
        })
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

/// A connector handing out clones of one shared [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryConnector {
    store: Arc<MemoryStore>,
    fail_next: AtomicBool,
    connect_count: AtomicUsize,
    last_connection_string: Mutex<Option<String>>,
}

impl MemoryConnector {
    /// Creates a connector over a fresh store.
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Creates a connector over an existing store.
    pub fn with_store(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            fail_next: AtomicBool::new(false),
            connect_count: AtomicUsize::new(0),
            last_connection_string: Mutex::new(None),
        }
    }

    /// Makes the next connect attempt fail.
    pub fn fail_next_connect(self) -> Self {
        self.fail_next.store(true, Ordering::SeqCst);
        self
    }

    /// Returns the shared backing store.
    pub fn store(&self) -> Arc<MemoryStore> {
        Arc::clone(&self.store)
    }

    /// Number of successful and failed connect attempts.
    pub fn connect_count(&self) -> usize {
        self.connect_count.load(Ordering::SeqCst)
    }

    /// Connection string of the most recent connect attempt.
    pub fn last_connection_string(&self) -> Option<String> {
        self.last_connection_string.lock().unwrap().clone()
    }
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Connector for MemoryConnector {
    async fn connect(
        &self,
        connection_string: &str,
        _options: &ClientOptions,
    ) -> Result<Arc<dyn DocumentClient>> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        *self.last_connection_string.lock().unwrap() = Some(connection_string.to_owned());

        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(Error::store("injected connect failure"));
        }
        Ok(self.store())
    }
}
