pub mod collector;
pub mod snapshot;

pub use collector::{ActiveWorker, MetricsCollector};
pub use snapshot::MetricsSnapshot;
