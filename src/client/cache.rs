//! Client cache keyed by connection identity.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use super::{ClientOptions, ConnectionIdentity, Connector, DocumentClient};
use crate::Result;

/// Memoizes one live client per distinct [`ConnectionIdentity`].
///
/// The first `get` for an identity opens a client through the configured
/// [`Connector`]; later calls return the same handle without reopening.
/// There is no eviction: clients live as long as the cache, which is
/// constructed once at process start and passed by reference into every
/// context resolution.
pub struct ClientCache {
    connector: Arc<dyn Connector>,
    clients: RwLock<HashMap<ConnectionIdentity, Arc<dyn DocumentClient>>>,
}

impl ClientCache {
    /// Creates an empty cache over the given connector.
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the client for an identity, opening it on first use.
    ///
    /// Concurrent first use for the same identity opens exactly one client;
    /// losers of the race receive the winner's handle. A failed open is not
    /// cached, so a later call retries construction.
    pub async fn get(
        &self,
        identity: &ConnectionIdentity,
        options: &ClientOptions,
    ) -> Result<Arc<dyn DocumentClient>> {
        {
            let clients = self.clients.read().await;
            if let Some(client) = clients.get(identity) {
                return Ok(Arc::clone(client));
            }
        }

        // The write guard is held across the connect so racing callers for
        // the same identity cannot each open a client.
        let mut clients = self.clients.write().await;
        if let Some(client) = clients.get(identity) {
            return Ok(Arc::clone(client));
        }

        debug!(identity = ?identity, "opening store client");
        let client = self
            .connector
            .connect(identity.connection_string(), options)
            .await?;
        clients.insert(identity.clone(), Arc::clone(&client));

        Ok(client)
    }

    /// Returns the number of cached clients.
    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Returns true when no client has been opened yet.
    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }
}

impl std::fmt::Debug for ClientCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCache").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MemoryConnector;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_first_use_opens_one_client() {
        let connector = Arc::new(MemoryConnector::new());
        let cache = Arc::new(ClientCache::new(
            Arc::clone(&connector) as Arc<dyn Connector>
        ));
        let identity = ConnectionIdentity::new("conn", Some("app"), None);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = Arc::clone(&cache);
            let identity = identity.clone();
            handles.push(tokio::spawn(async move {
                cache.get(&identity, &ClientOptions::default()).await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(connector.connect_count(), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_distinct_identities_get_distinct_clients() {
        let connector = Arc::new(MemoryConnector::new());
        let cache = ClientCache::new(Arc::clone(&connector) as Arc<dyn Connector>);
        let options = ClientOptions::default();

        cache
            .get(&ConnectionIdentity::new("conn", Some("a"), None), &options)
            .await
            .unwrap();
        cache
            .get(&ConnectionIdentity::new("conn", Some("b"), None), &options)
            .await
            .unwrap();
        cache
            .get(&ConnectionIdentity::new("conn", Some("a"), None), &options)
            .await
            .unwrap();

        assert_eq!(connector.connect_count(), 2);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_failed_connect_is_not_cached() {
        let connector = Arc::new(MemoryConnector::new().fail_next_connect());
        let cache = ClientCache::new(Arc::clone(&connector) as Arc<dyn Connector>);
        let identity = ConnectionIdentity::new("conn", None, None);
        let options = ClientOptions::default();

        assert!(cache.get(&identity, &options).await.is_err());
        assert!(cache.is_empty().await);

        cache.get(&identity, &options).await.unwrap();
        assert_eq!(cache.len().await, 1);
    }
}
