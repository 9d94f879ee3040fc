//! Per-kind binding strategies.

mod collector;
mod item;

pub use collector::Collector;
pub use item::ItemBinding;
