//! Paginated query aggregation.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::template::bind_template;
use crate::context::BindingContext;
use crate::document::from_document;
use crate::error::{Error, Result};

/// Batched query binding that materializes a complete result sequence.
///
/// Drives the store's continuation-token loop until the terminal empty
/// token and returns the items in page order. The whole result set is
/// buffered in memory before being returned; there is no page or item cap.
/// A configurable limit is a possible future addition, left out to keep
/// parity with the store's own paging contract.
pub struct QueryBinding {
    context: BindingContext,
}

impl QueryBinding {
    /// Creates a query binding over a resolved context.
    pub fn new(context: BindingContext) -> Self {
        Self { context }
    }

    /// Runs the descriptor's query and returns all result documents.
    ///
    /// Any store failure aborts the whole aggregation; partial results are
    /// never returned.
    pub async fn fetch_all_values(&self) -> Result<Vec<Value>> {
        let descriptor = self.context.descriptor();
        let text = descriptor.query.as_deref().ok_or_else(|| {
            Error::configuration(
                "the 'query' property must be set on an enumerable query binding",
            )
        })?;
        let query = bind_template(text, &descriptor.query_values)?;

        let mut results = Vec::new();
        let mut continuation: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .context
                .client()
                .query_page(
                    &descriptor.database,
                    &descriptor.container,
                    &query,
                    continuation.as_deref(),
                )
                .await?;

            pages += 1;
            results.extend(page.items);

            match page.continuation {
                Some(token) if !token.is_empty() => continuation = Some(token),
                _ => break,
            }
        }

        debug!(
            database = %descriptor.database,
            container = %descriptor.container,
            pages,
            items = results.len(),
            "query aggregation complete"
        );
        Ok(results)
    }

    /// Runs the descriptor's query and deserializes all results.
    pub async fn fetch_all<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.fetch_all_values()
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }
}

impl std::fmt::Debug for QueryBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBinding").finish_non_exhaustive()
    }
}
