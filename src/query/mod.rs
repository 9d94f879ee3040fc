//! Query template binding and paginated aggregation.

mod aggregator;
mod template;

pub use aggregator::QueryBinding;
pub use template::bind_template;
