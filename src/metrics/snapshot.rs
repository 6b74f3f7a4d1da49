use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub requests_queued: u64,
    pub requests_completed: u64,
    pub requests_success: u64,
    pub requests_failed: u64,
    pub active_workers: u64,
    pub peak_active_workers: u64,
    pub success_rate: f64,
    pub requests_per_second: f64,
    pub elapsed_seconds: f64,
}
