//! Optimistic single-item binding.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::context::BindingContext;
use crate::document::{from_document, item_id, to_document};
use crate::error::{Error, Result};

/// Read-snapshot / diff / guarded-replace binding for one item.
///
/// The item is point-read at invocation start and snapshotted; after the
/// caller's logic completes, [`commit`](Self::commit) compares the
/// post-invocation value against the snapshot and issues a replace only
/// when the value actually changed. The diff is advisory: it prevents
/// accidental no-op writes, not lost updates against concurrent writers.
pub struct ItemBinding {
    context: BindingContext,
    snapshot: Option<Value>,
}

impl ItemBinding {
    /// Creates an item binding over a resolved context.
    pub fn new(context: BindingContext) -> Self {
        Self {
            context,
            snapshot: None,
        }
    }

    /// Reads the bound item and captures the snapshot.
    ///
    /// Returns `None` when the item does not exist; the write phase is then
    /// a no-op. A missing or empty descriptor id is a configuration error.
    ///
    /// The snapshot is captured in the caller's projection: the stored
    /// document is deserialized into `T` and re-serialized, so store fields
    /// `T` does not model never register as changes at commit time.
    pub async fn read<T: DeserializeOwned + Serialize>(&mut self) -> Result<Option<T>> {
        match self.fetch().await? {
            Some(document) => {
                let item: T = from_document(document)?;
                self.snapshot = Some(to_document(&item)?);
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }

    /// Reads the bound item as compact JSON text.
    ///
    /// Text-shaped values are immutable; they are never written back and
    /// [`commit_text`](Self::commit_text) is a no-op. The raw document is
    /// retained as the snapshot.
    pub async fn read_text(&mut self) -> Result<Option<String>> {
        match self.fetch().await? {
            Some(document) => {
                let text = document.to_string();
                self.snapshot = Some(document);
                Ok(Some(text))
            }
            None => Ok(None),
        }
    }

    async fn fetch(&self) -> Result<Option<Value>> {
        let descriptor = self.context.descriptor();
        let id = match descriptor.id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => {
                return Err(Error::configuration(
                    "the 'id' property of a single-item binding cannot be null or empty",
                ));
            }
        };

        let document = match self
            .context
            .client()
            .read_item(
                &descriptor.database,
                &descriptor.container,
                id,
                descriptor.partition_key.as_deref(),
            )
            .await
        {
            Ok(document) => document,
            Err(err) if err.is_not_found() => {
                debug!(
                    database = %descriptor.database,
                    container = %descriptor.container,
                    id,
                    "bound item not found, yielding null"
                );
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        Ok(Some(document))
    }

    /// Evaluates the write-back after the caller's logic completes.
    ///
    /// No write is issued when nothing was read, when the caller produced
    /// no value, or when the value is structurally unchanged. A changed
    /// value is replaced by id and partition key, provided its identity
    /// field survived the invocation intact.
    pub async fn commit<T: Serialize>(&self, value: Option<&T>) -> Result<()> {
        let (Some(snapshot), Some(value)) = (self.snapshot.as_ref(), value) else {
            return Ok(());
        };

        let current = to_document(value)?;
        if current == *snapshot {
            return Ok(());
        }

        match (item_id(&current), item_id(snapshot)) {
            (Some(current_id), Some(original_id)) if !current_id.is_empty() && !original_id.is_empty() => {
                if current_id != original_id {
                    return Err(Error::invariant(
                        "the 'id' property of a bound document must not change",
                    ));
                }
            }
            _ => {
                return Err(Error::invariant(
                    "the bound document must carry an 'id' property",
                ));
            }
        }

        let descriptor = self.context.descriptor();
        let id = descriptor.id.as_deref().unwrap_or_default();
        self.context
            .client()
            .replace_item(
                &descriptor.database,
                &descriptor.container,
                current,
                id,
                descriptor.partition_key.as_deref(),
            )
            .await?;

        debug!(
            database = %descriptor.database,
            container = %descriptor.container,
            id,
            "changed item written back"
        );
        Ok(())
    }

    /// Write-back evaluation for text-shaped values.
    ///
    /// Strings are immutable; this never issues a write.
    pub async fn commit_text(&self, _value: Option<&str>) -> Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for ItemBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemBinding")
            .field("snapshot", &self.snapshot.is_some())
            .finish_non_exhaustive()
    }
}
