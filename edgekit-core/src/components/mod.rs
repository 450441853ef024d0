//! Built-in components: data collection, identity bootstrap, privacy.

mod data_collector;
mod identity;
mod privacy;

pub use data_collector::DataCollector;
pub use identity::{Identity, ECID_NAMESPACE};
pub use privacy::Privacy;
