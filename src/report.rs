use crate::executor::Outcome;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Non-200 status codes bucketed by class. Always serialized with all three
/// keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureClasses {
    #[serde(rename = "3xx")]
    pub redirection: u64,
    #[serde(rename = "4xx")]
    pub client_error: u64,
    #[serde(rename = "5xx")]
    pub server_error: u64,
}

impl FailureClasses {
    pub fn total(&self) -> u64 {
        self.redirection + self.client_error + self.server_error
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub elapsed_time: String,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failures_by_class: FailureClasses,
}

impl Report {
    /// Tallies a finished batch.
    ///
    /// Only an exact 200 counts as success. Other 2xx codes, codes outside
    /// 200..=599 and transport failures land in no bucket at all; they are
    /// visible only through `total_requests`.
    pub fn build(outcomes: &[Outcome], elapsed: Duration) -> Self {
        let mut successful_requests = 0;
        let mut failures_by_class = FailureClasses::default();

        for outcome in outcomes {
            match outcome.status() {
                Some(200) => successful_requests += 1,
                Some(300..=399) => failures_by_class.redirection += 1,
                Some(400..=499) => failures_by_class.client_error += 1,
                Some(500..=599) => failures_by_class.server_error += 1,
                Some(_) | None => {}
            }
        }

        Self {
            elapsed_time: format_elapsed(elapsed),
            total_requests: outcomes.len() as u64,
            successful_requests,
            failures_by_class,
        }
    }

    /// Outcomes that were neither a 200 nor a classified failure.
    pub fn unclassified(&self) -> u64 {
        self.total_requests
            .saturating_sub(self.successful_requests + self.failures_by_class.total())
    }
}

/// Rounds to the nearest second (halves away from zero) and renders it as
/// `42s`, `1m5s` or `2h0m3s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = (elapsed.as_nanos() + 500_000_000) / 1_000_000_000;
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
