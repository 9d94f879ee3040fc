//! The store client seam.
//!
//! The binding layer does not speak any wire protocol itself. It consumes a
//! [`DocumentClient`] capability for live operations and a [`Connector`]
//! capability for opening clients, and owns the cache that keeps one live
//! client per distinct connection identity.

mod cache;
mod identity;

use std::sync::Arc;

pub use cache::ClientCache;
pub use identity::ConnectionIdentity;
use serde_json::Value;

use crate::Result;
use crate::options::ConnectionMode;

/// Options applied when opening a store client.
///
/// Unset fields are left to the client implementation's defaults.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Connection mode for the opened client.
    pub connection_mode: Option<ConnectionMode>,
    /// Application name to tag store interactions with.
    pub application_name: Option<String>,
    /// Preferred geo-replicated region.
    pub application_region: Option<String>,
}

/// A named parameter attached to a query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParameter {
    /// Parameter marker, including the leading `@`.
    pub name: String,
    /// Runtime value for the marker.
    pub value: Value,
}

/// A query with its parameter values.
#[derive(Debug, Clone, Default)]
pub struct QueryDefinition {
    /// Final query text with parameter markers substituted in.
    pub text: String,
    /// One entry per distinct parameter marker.
    pub parameters: Vec<QueryParameter>,
}

impl QueryDefinition {
    /// Creates a query definition without parameters.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: Vec::new(),
        }
    }
}

/// One page of query results.
#[derive(Debug, Clone)]
pub struct QueryPage {
    /// Items in store page order.
    pub items: Vec<Value>,
    /// Continuation token for the next page. `None` or an empty string is
    /// the unambiguous terminal marker.
    pub continuation: Option<String>,
}

/// An opened, reusable client to a document store.
///
/// Implementations must classify "resource not found" failures as
/// [`ErrorKind::NotFound`](crate::ErrorKind::NotFound); the binders
/// intercept that signal and nothing else.
#[async_trait::async_trait]
pub trait DocumentClient: Send + Sync {
    /// Creates a database if it does not exist. Idempotent at the store.
    async fn create_database_if_not_exists(
        &self,
        database: &str,
        throughput: Option<u32>,
    ) -> Result<()>;

    /// Creates a container if it does not exist. Idempotent at the store.
    async fn create_container_if_not_exists(
        &self,
        database: &str,
        container: &str,
        partition_key_path: Option<&str>,
        throughput: Option<u32>,
    ) -> Result<()>;

    /// Inserts or replaces an item.
    async fn upsert_item(&self, database: &str, container: &str, item: Value) -> Result<Value>;

    /// Reads an item by id and partition key.
    async fn read_item(
        &self,
        database: &str,
        container: &str,
        id: &str,
        partition_key: Option<&str>,
    ) -> Result<Value>;

    /// Replaces an existing item by id and partition key.
    async fn replace_item(
        &self,
        database: &str,
        container: &str,
        item: Value,
        id: &str,
        partition_key: Option<&str>,
    ) -> Result<Value>;

    /// Fetches one page of query results, resuming from a continuation
    /// token when given.
    async fn query_page(
        &self,
        database: &str,
        container: &str,
        query: &QueryDefinition,
        continuation: Option<&str>,
    ) -> Result<QueryPage>;
}

/// Opens store clients from a connection string and client options.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    /// Opens a new client.
    async fn connect(
        &self,
        connection_string: &str,
        options: &ClientOptions,
    ) -> Result<Arc<dyn DocumentClient>>;
}
