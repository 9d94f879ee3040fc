//! Declarative binding layer for document-oriented databases.
//!
//! A host declares a small data-only [`BindingDescriptor`] per bound value
//! (target database/container, optional item id, partition key, query
//! template, create-on-demand flag) and this crate turns it into live,
//! retry-safe, connection-reusing store operations:
//!
//! - [`Collector`]: upsert of produced items, transparently provisioning a
//!   missing database/container and retrying once.
//! - [`ItemBinding`]: optimistic single-item read-modify-write with a
//!   snapshot diff and an identity-guarded replace.
//! - [`QueryBinding`]: parameterized query with full continuation-token
//!   pagination.
//! - [`ClientCache`]: one live client per logical connection identity for
//!   the process lifetime.
//!
//! The store itself stays behind the [`DocumentClient`] and [`Connector`]
//! traits; the crate never speaks a wire protocol.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod binding;
pub mod client;
pub mod descriptor;
pub mod document;
pub mod query;

mod context;
mod error;
mod options;

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;

pub use binding::{Collector, ItemBinding};
pub use client::{
    ClientCache, ClientOptions, ConnectionIdentity, Connector, DocumentClient, QueryDefinition,
    QueryPage, QueryParameter,
};
pub use context::{Binding, BindingContext, Bindings};
pub use descriptor::{BindingDescriptor, BindingKind, TargetShape};
pub use error::{BoxError, Error, ErrorKind, Result};
pub use options::{ConnectionMode, StoreOptions};
pub use query::QueryBinding;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::mock::MemoryConnector;

    /// Write through a collector into a container that does not exist yet,
    /// then read everything back through a query binding.
    #[tokio::test]
    async fn test_collector_query_round_trip() {
        let connector = Arc::new(MemoryConnector::new());
        let store = connector.store();
        let bindings = Bindings::new(
            Arc::clone(&connector) as Arc<dyn Connector>,
            StoreOptions::new().with_connection_string("conn"),
        );

        let output = BindingDescriptor::new("db", "items")
            .with_partition_key("pk")
            .with_create_if_missing(true);
        let Binding::Collector(collector) =
            bindings.bind(&output, TargetShape::Sink).await.unwrap()
        else {
            panic!("expected collector binding");
        };

        for i in 0..10 {
            collector
                .add(&json!({"id": i.to_string(), "pk": "p", "n": i}))
                .await
                .unwrap();
        }

        let input = BindingDescriptor::new("db", "items").with_query("SELECT * FROM c");
        let Binding::EnumerableQuery(query) =
            bindings.bind(&input, TargetShape::Sequence).await.unwrap()
        else {
            panic!("expected query binding");
        };

        let results = query.fetch_all_values().await.unwrap();
        assert_eq!(results.len(), 10);
        for (i, item) in results.iter().enumerate() {
            assert_eq!(item["n"], json!(i));
        }

        // Both bindings resolved to the same cached client.
        assert_eq!(connector.connect_count(), 1);
        assert_eq!(store.create_database_calls(), 1);
    }

    /// A full read-modify-write invocation through the facade.
    #[tokio::test]
    async fn test_item_binding_invocation() {
        let connector = Arc::new(MemoryConnector::new());
        let store = connector.store();
        store.seed_container("db", "items", None);
        store.seed_item("db", "items", json!({"id": "1", "state": "new"}));

        let bindings = Bindings::new(
            Arc::clone(&connector) as Arc<dyn Connector>,
            StoreOptions::new().with_connection_string("conn"),
        );
        let descriptor = BindingDescriptor::new("db", "items").with_id("1");
        let Binding::SingleItemInputOutput(mut item) = bindings
            .bind(&descriptor, TargetShape::SingleMutable)
            .await
            .unwrap()
        else {
            panic!("expected single-item binding");
        };

        let mut value: serde_json::Value = item.read().await.unwrap().unwrap();
        value["state"] = json!("done");
        item.commit(Some(&value)).await.unwrap();

        assert_eq!(store.items("db", "items")[0]["state"], json!("done"));
        assert_eq!(store.replace_calls(), 1);
    }
}
