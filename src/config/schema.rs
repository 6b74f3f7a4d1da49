use crate::dispatcher::LoadPlan;
use crate::error::{Error, Result};
use crate::output::OutputFormat;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct LoadTestConfig {
    /// Target of every request. Only presence is checked here; a malformed
    /// URL shows up as per-request failures.
    #[serde(default)]
    #[validate(length(min = 1))]
    pub url: String,

    #[serde(default)]
    pub requests: Option<usize>,

    #[serde(default, alias = "workers")]
    #[validate(range(min = 1))]
    pub concurrency: Option<usize>,

    #[serde(default)]
    pub format: Option<OutputFormat>,
}

impl LoadTestConfig {
    pub fn to_plan(&self) -> Result<LoadPlan> {
        let requests = self
            .requests
            .ok_or_else(|| Error::Config("number of requests is required".to_string()))?;
        let concurrency = self
            .concurrency
            .ok_or_else(|| Error::Config("concurrency is required".to_string()))?;

        LoadPlan::new(self.url.clone(), requests, concurrency)
    }

    pub fn output_format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }
}
