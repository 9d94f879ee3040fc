//! Binding descriptors and binding kind resolution.
//!
//! A [`BindingDescriptor`] is the data-only configuration a host declares
//! for one bound parameter: which database and container to target, and
//! optionally an item id, a partition key, a query template, provisioning
//! hints and a connection override. It is resolved once per invocation and
//! never mutated afterwards.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Declarative configuration for one binding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BindingDescriptor {
    /// Target database name.
    pub database: String,
    /// Target container name.
    pub container: String,
    /// Id of the item to bind, for single-item bindings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Partition key value for lookups; doubles as the partition key path
    /// when a container is provisioned on demand.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition_key: Option<String>,
    /// Query template for enumerable bindings, with `{name}` placeholders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Runtime values for the query template's placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub query_values: HashMap<String, Value>,
    /// Whether output bindings may create a missing database/container.
    #[serde(default)]
    pub create_if_missing: bool,
    /// Throughput hint for a database created on demand.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_throughput: Option<u32>,
    /// Throughput hint for a container created on demand.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_throughput: Option<u32>,
    /// Connection string override for this binding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
    /// Application name to tag store interactions with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_name: Option<String>,
    /// Preferred geo-replicated region for store interactions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_region: Option<String>,
}

impl BindingDescriptor {
    /// Creates a descriptor targeting the given database and container.
    pub fn new(database: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            container: container.into(),
            ..Self::default()
        }
    }

    /// Sets the item id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the partition key.
    pub fn with_partition_key(mut self, partition_key: impl Into<String>) -> Self {
        self.partition_key = Some(partition_key.into());
        self
    }

    /// Sets the query template.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Supplies a runtime value for a query placeholder.
    pub fn with_query_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query_values.insert(name.into(), value.into());
        self
    }

    /// Enables database/container creation on demand for output bindings.
    pub fn with_create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    /// Sets the throughput hints for provisioned resources.
    pub fn with_throughput(mut self, database: Option<u32>, container: Option<u32>) -> Self {
        self.database_throughput = database;
        self.container_throughput = container;
        self
    }

    /// Sets the connection string override.
    pub fn with_connection_string(mut self, connection_string: impl Into<String>) -> Self {
        self.connection_string = Some(connection_string.into());
        self
    }

    /// Sets the application name.
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Sets the application region.
    pub fn with_application_region(mut self, region: impl Into<String>) -> Self {
        self.application_region = Some(region.into());
        self
    }

    fn has_id(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

/// The shape of the host-side value a descriptor binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetShape {
    /// A sink the invocation pushes produced items into.
    Sink,
    /// A single item read at invocation start.
    Single,
    /// A single item read at invocation start and written back afterwards.
    SingleMutable,
    /// A sequence of items produced by a query.
    Sequence,
    /// The raw store client handle.
    Client,
}

/// The binding strategy selected for a descriptor.
///
/// Selection is deterministic from the descriptor's fields and the declared
/// target shape; there is no runtime type inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Output binding with auto-provisioning upsert semantics.
    Collector,
    /// Read-only single-item binding.
    SingleItemInput,
    /// Read-modify-write single-item binding.
    SingleItemInputOutput,
    /// Batched query binding with pagination.
    EnumerableQuery,
    /// Direct access to the underlying client.
    RawClientHandle,
}

impl BindingKind {
    /// Resolves the binding kind for a descriptor and target shape.
    ///
    /// Fails with a configuration error when the descriptor's fields do not
    /// fit the declared shape.
    pub fn resolve(descriptor: &BindingDescriptor, shape: TargetShape) -> Result<Self> {
        match shape {
            TargetShape::Client => Ok(Self::RawClientHandle),
            TargetShape::Sink => Ok(Self::Collector),
            TargetShape::Sequence => {
                if descriptor.has_id() {
                    return Err(Error::configuration(
                        "the 'id' property must not be set on an enumerable query binding",
                    ));
                }
                Ok(Self::EnumerableQuery)
            }
            TargetShape::Single | TargetShape::SingleMutable => {
                if !descriptor.has_id() {
                    return Err(Error::configuration(
                        "the 'id' property of a single-item binding cannot be null or empty",
                    ));
                }
                if descriptor.query.is_some() {
                    return Err(Error::configuration(
                        "the 'query' property must not be set on a single-item binding",
                    ));
                }
                if shape == TargetShape::Single {
                    Ok(Self::SingleItemInput)
                } else {
                    Ok(Self::SingleItemInputOutput)
                }
            }
        }
    }
}
