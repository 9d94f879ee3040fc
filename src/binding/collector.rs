//! Output binding with auto-provisioning upsert semantics.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::BindingContext;
use crate::document::{normalize_partition_key_path, normalize_throughput, parse_raw, to_document};
use crate::error::{Error, Result};

/// Collects items produced by an invocation and upserts each one.
///
/// When an upsert fails because the target database or container does not
/// exist and the descriptor allows it, the missing resources are created
/// and the upsert is retried exactly once. A second failure of any kind is
/// surfaced; retrying further would mask persistent misconfiguration as
/// transient.
pub struct Collector {
    context: BindingContext,
}

impl Collector {
    /// Creates a collector over a resolved context.
    pub fn new(context: BindingContext) -> Self {
        Self { context }
    }

    /// Upserts one produced item.
    pub async fn add<T: Serialize>(&self, item: &T) -> Result<()> {
        self.add_document(to_document(item)?).await
    }

    /// Upserts one produced item given as raw JSON text.
    ///
    /// The store accepts structured documents only, so the text is parsed
    /// first.
    pub async fn add_raw(&self, item: &str) -> Result<()> {
        self.add_document(parse_raw(item)?).await
    }

    async fn add_document(&self, document: Value) -> Result<()> {
        let descriptor = self.context.descriptor();

        match self.upsert(document.clone()).await {
            Ok(()) => return Ok(()),
            Err(err) if err.is_not_found() => {
                if !descriptor.create_if_missing {
                    return Err(Error::configuration(format!(
                        "the container '{}' (in database '{}') does not exist; to create it \
                         automatically, set 'create_if_missing' to true",
                        descriptor.container, descriptor.database,
                    ))
                    .with_source(err));
                }
            }
            Err(err) => return Err(err),
        }

        self.provision().await?;

        // Exactly one retry; any further failure is fatal for the invocation.
        self.upsert(document).await
    }

    async fn upsert(&self, document: Value) -> Result<()> {
        let descriptor = self.context.descriptor();
        self.context
            .client()
            .upsert_item(&descriptor.database, &descriptor.container, document)
            .await?;
        Ok(())
    }

    /// Creates the descriptor's database and container if absent.
    async fn provision(&self) -> Result<()> {
        let descriptor = self.context.descriptor();
        let client = self.context.client();

        warn!(
            database = %descriptor.database,
            container = %descriptor.container,
            "target container missing, provisioning on demand"
        );

        client
            .create_database_if_not_exists(
                &descriptor.database,
                normalize_throughput(descriptor.database_throughput),
            )
            .await?;

        let partition_key_path = descriptor
            .partition_key
            .as_deref()
            .map(normalize_partition_key_path);
        client
            .create_container_if_not_exists(
                &descriptor.database,
                &descriptor.container,
                partition_key_path.as_deref(),
                normalize_throughput(descriptor.container_throughput),
            )
            .await?;

        debug!(
            database = %descriptor.database,
            container = %descriptor.container,
            "provisioning complete"
        );
        Ok(())
    }
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::descriptor::BindingDescriptor;
    use crate::error::ErrorKind;
    use crate::mock::MemoryStore;

    fn collector_for(store: &Arc<MemoryStore>, descriptor: BindingDescriptor) -> Collector {
        Collector::new(BindingContext::new(descriptor, Arc::clone(store) as _))
    }

    #[tokio::test]
    async fn test_round_trip_through_provisioned_container() {
        let store = Arc::new(MemoryStore::new());
        let descriptor = BindingDescriptor::new("db", "items")
            .with_partition_key("pk")
            .with_create_if_missing(true);
        let collector = collector_for(&store, descriptor);

        for i in 0..10 {
            collector
                .add(&json!({"id": i.to_string(), "n": i}))
                .await
                .unwrap();
        }

        let items = store.items("db", "items");
        assert_eq!(items.len(), 10);
        assert_eq!(items[3]["n"], json!(3));
        // One provisioning pass on the first add only.
        assert_eq!(store.create_database_calls(), 1);
        assert_eq!(store.create_container_calls(), 1);
        assert_eq!(
            store.container_partition_key_path("db", "items").as_deref(),
            Some("/pk")
        );
    }

    #[tokio::test]
    async fn test_missing_container_without_create_flag() {
        let store = Arc::new(MemoryStore::new());
        let descriptor = BindingDescriptor::new("db", "orders");
        let collector = collector_for(&store, descriptor);

        let err = collector.add(&json!({"id": "1"})).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.message().contains("'orders'"));
        assert!(err.message().contains("'db'"));
        assert!(err.message().contains("create_if_missing"));
        assert_eq!(store.create_database_calls(), 0);
        assert_eq!(store.create_container_calls(), 0);
    }

    #[tokio::test]
    async fn test_upsert_retried_exactly_once() {
        let store = Arc::new(MemoryStore::new());
        store.fail_upserts("db", "items");
        let descriptor = BindingDescriptor::new("db", "items").with_create_if_missing(true);
        let collector = collector_for(&store, descriptor);

        let err = collector.add(&json!({"id": "1"})).await.unwrap_err();

        // First attempt hits not-found, the post-provisioning retry hits the
        // injected failure and is surfaced as-is.
        assert_eq!(err.kind(), ErrorKind::Store);
        assert_eq!(store.upsert_calls(), 2);
        assert_eq!(store.create_container_calls(), 1);
    }

    #[tokio::test]
    async fn test_other_failures_skip_the_create_path() {
        let store = Arc::new(MemoryStore::new());
        store.seed_container("db", "items", None);
        store.fail_upserts("db", "items");
        let descriptor = BindingDescriptor::new("db", "items").with_create_if_missing(true);
        let collector = collector_for(&store, descriptor);

        let err = collector.add(&json!({"id": "1"})).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Store);
        assert_eq!(store.upsert_calls(), 1);
        assert_eq!(store.create_database_calls(), 0);
        assert_eq!(store.create_container_calls(), 0);
    }

    #[tokio::test]
    async fn test_existing_container_is_not_reprovisioned() {
        let store = Arc::new(MemoryStore::new());
        store.seed_container("db", "items", None);
        let descriptor = BindingDescriptor::new("db", "items").with_create_if_missing(true);
        let collector = collector_for(&store, descriptor);

        collector.add(&json!({"id": "1"})).await.unwrap();

        assert_eq!(store.create_database_calls(), 0);
        assert_eq!(store.create_container_calls(), 0);
        assert_eq!(store.upsert_calls(), 1);
    }

    #[tokio::test]
    async fn test_raw_text_items_are_parsed() {
        let store = Arc::new(MemoryStore::new());
        store.seed_container("db", "items", None);
        let collector = collector_for(&store, BindingDescriptor::new("db", "items"));

        collector.add_raw(r#"{"id": "1", "v": true}"#).await.unwrap();
        assert_eq!(store.items("db", "items")[0]["v"], json!(true));

        let err = collector.add_raw("{oops").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);
    }

    #[tokio::test]
    async fn test_zero_throughput_hint_is_dropped() {
        let store = Arc::new(MemoryStore::new());
        let descriptor = BindingDescriptor::new("db", "items")
            .with_create_if_missing(true)
            .with_throughput(Some(0), Some(400));
        let collector = collector_for(&store, descriptor);

        collector.add(&json!({"id": "1"})).await.unwrap();

        assert_eq!(store.last_database_throughput(), None);
        assert_eq!(store.last_container_throughput(), Some(400));
    }
}
