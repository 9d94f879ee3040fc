//! Context resolution and binding dispatch.

use std::sync::Arc;

use crate::binding::{Collector, ItemBinding};
use crate::client::{ClientCache, ClientOptions, ConnectionIdentity, Connector, DocumentClient};
use crate::descriptor::{BindingDescriptor, BindingKind, TargetShape};
use crate::error::{Error, Result};
use crate::options::StoreOptions;
use crate::query::QueryBinding;

/// A resolved execution context for one invocation.
///
/// Pairs a binding descriptor with the cached client serving its
/// connection. Owned by the invocation and discarded with it; the client
/// handle stays alive in the cache.
#[derive(Clone)]
pub struct BindingContext {
    descriptor: BindingDescriptor,
    client: Arc<dyn DocumentClient>,
}

impl BindingContext {
    /// Creates a context from a descriptor and a client.
    pub fn new(descriptor: BindingDescriptor, client: Arc<dyn DocumentClient>) -> Self {
        Self { descriptor, client }
    }

    /// Returns the resolved descriptor.
    pub fn descriptor(&self) -> &BindingDescriptor {
        &self.descriptor
    }

    /// Returns the store client serving this context.
    pub fn client(&self) -> &Arc<dyn DocumentClient> {
        &self.client
    }
}

impl std::fmt::Debug for BindingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingContext")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// A binding strategy instantiated for one invocation.
pub enum Binding {
    /// Output binding with auto-provisioning upsert semantics.
    Collector(Collector),
    /// Read-only single-item binding.
    SingleItemInput(ItemBinding),
    /// Read-modify-write single-item binding.
    SingleItemInputOutput(ItemBinding),
    /// Batched query binding with pagination.
    EnumerableQuery(QueryBinding),
    /// Direct access to the underlying client.
    RawClientHandle(Arc<dyn DocumentClient>),
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Collector(_) => "Collector",
            Self::SingleItemInput(_) => "SingleItemInput",
            Self::SingleItemInputOutput(_) => "SingleItemInputOutput",
            Self::EnumerableQuery(_) => "EnumerableQuery",
            Self::RawClientHandle(_) => "RawClientHandle",
        };
        f.debug_tuple("Binding").field(&kind).finish()
    }
}

/// The binding facade a host constructs once at process start.
///
/// Owns the process-wide [`ClientCache`] and default [`StoreOptions`];
/// every invocation resolves its contexts through a shared reference to
/// this value.
#[derive(Debug)]
pub struct Bindings {
    cache: ClientCache,
    options: StoreOptions,
}

impl Bindings {
    /// Creates the facade over a connector and process-wide options.
    pub fn new(connector: Arc<dyn Connector>, options: StoreOptions) -> Self {
        Self {
            cache: ClientCache::new(connector),
            options,
        }
    }

    /// Returns the client cache.
    pub fn cache(&self) -> &ClientCache {
        &self.cache
    }

    /// Resolves a descriptor into an execution context.
    ///
    /// Pure aside from the cache's lazy connect; performs no store I/O of
    /// its own.
    pub async fn resolve(&self, descriptor: &BindingDescriptor) -> Result<BindingContext> {
        let connection_string = self.resolve_connection_string(descriptor)?;
        let identity = ConnectionIdentity::new(
            connection_string,
            descriptor.application_name.as_deref(),
            descriptor.application_region.as_deref(),
        );
        let options = ClientOptions {
            connection_mode: self.options.connection_mode,
            application_name: descriptor.application_name.clone(),
            application_region: descriptor.application_region.clone(),
        };

        let client = self.cache.get(&identity, &options).await?;
        Ok(BindingContext::new(descriptor.clone(), client))
    }

    /// Returns the raw client for a descriptor's connection.
    pub async fn client(&self, descriptor: &BindingDescriptor) -> Result<Arc<dyn DocumentClient>> {
        Ok(Arc::clone(self.resolve(descriptor).await?.client()))
    }

    /// Resolves a descriptor and instantiates the strategy for its kind.
    pub async fn bind(&self, descriptor: &BindingDescriptor, shape: TargetShape) -> Result<Binding> {
        let kind = BindingKind::resolve(descriptor, shape)?;
        let context = self.resolve(descriptor).await?;

        Ok(match kind {
            BindingKind::Collector => Binding::Collector(Collector::new(context)),
            BindingKind::SingleItemInput => Binding::SingleItemInput(ItemBinding::new(context)),
            BindingKind::SingleItemInputOutput => {
                Binding::SingleItemInputOutput(ItemBinding::new(context))
            }
            BindingKind::EnumerableQuery => Binding::EnumerableQuery(QueryBinding::new(context)),
            BindingKind::RawClientHandle => {
                Binding::RawClientHandle(Arc::clone(context.client()))
            }
        })
    }

    /// Resolves the connection string for a descriptor.
    ///
    /// The per-binding override wins; otherwise the process default is
    /// used. Neither being set is a configuration error.
    fn resolve_connection_string<'a>(&'a self, descriptor: &'a BindingDescriptor) -> Result<&'a str> {
        descriptor
            .connection_string
            .as_deref()
            .or(self.options.connection_string.as_deref())
            .ok_or_else(|| {
                Error::configuration(
                    "the store connection string must be set either via \
                     StoreOptions.connection_string or via the binding's \
                     connection_string override",
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::mock::MemoryConnector;

    fn bindings_with_default(connection: Option<&str>) -> (Arc<MemoryConnector>, Bindings) {
        let connector = Arc::new(MemoryConnector::new());
        let mut options = StoreOptions::new();
        if let Some(connection) = connection {
            options = options.with_connection_string(connection);
        }
        let bindings = Bindings::new(Arc::clone(&connector) as Arc<dyn Connector>, options);
        (connector, bindings)
    }

    #[tokio::test]
    async fn test_missing_connection_string_is_configuration_error() {
        let (_, bindings) = bindings_with_default(None);
        let descriptor = BindingDescriptor::new("db", "items");

        let err = bindings.resolve(&descriptor).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.message().contains("connection_string"));
    }

    #[tokio::test]
    async fn test_binding_override_wins_over_default() {
        let (connector, bindings) = bindings_with_default(Some("default-conn"));
        let descriptor =
            BindingDescriptor::new("db", "items").with_connection_string("override-conn");

        bindings.resolve(&descriptor).await.unwrap();
        assert_eq!(connector.last_connection_string().as_deref(), Some("override-conn"));
    }

    #[tokio::test]
    async fn test_contexts_share_a_cached_client() {
        let (connector, bindings) = bindings_with_default(Some("conn"));
        let a = BindingDescriptor::new("db", "items");
        let b = BindingDescriptor::new("db", "other");

        bindings.resolve(&a).await.unwrap();
        bindings.resolve(&b).await.unwrap();

        assert_eq!(connector.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_raw_client_handle_shares_the_cache() {
        let (connector, bindings) = bindings_with_default(Some("conn"));
        let descriptor = BindingDescriptor::new("db", "items");

        let client = bindings.client(&descriptor).await.unwrap();
        let binding = bindings.bind(&descriptor, TargetShape::Client).await.unwrap();

        assert!(matches!(binding, Binding::RawClientHandle(_)));
        assert_eq!(connector.connect_count(), 1);
        drop(client);
    }

    #[tokio::test]
    async fn test_bind_dispatches_by_kind() {
        let (_, bindings) = bindings_with_default(Some("conn"));
        let descriptor = BindingDescriptor::new("db", "items").with_id("1");

        let binding = bindings
            .bind(&descriptor, TargetShape::SingleMutable)
            .await
            .unwrap();
        assert!(matches!(binding, Binding::SingleItemInputOutput(_)));

        let sink = BindingDescriptor::new("db", "items");
        let binding = bindings.bind(&sink, TargetShape::Sink).await.unwrap();
        assert!(matches!(binding, Binding::Collector(_)));
    }
}
