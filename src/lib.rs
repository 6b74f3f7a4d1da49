pub mod config;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod output;
pub mod report;

pub use dispatcher::{Dispatch, Dispatcher, LoadPlan};
pub use error::{Error, Result};
pub use executor::{Executor, Failure, FailureKind, HttpExecutor, Outcome};
pub use metrics::collector::MetricsCollector;
pub use metrics::snapshot::MetricsSnapshot;
pub use report::{FailureClasses, Report};
