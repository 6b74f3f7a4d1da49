use crate::config::schema::LoadTestConfig;
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;
use validator::Validate;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads and validates a complete configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<LoadTestConfig> {
        let config = Self::load_file(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// Layers command-line values over an optional file and validates the
    /// result.
    pub fn resolve<P: AsRef<Path>>(
        path: Option<P>,
        overrides: LoadTestConfig,
    ) -> Result<LoadTestConfig> {
        let base = match path {
            Some(path) => Self::load_file(path.as_ref())?,
            None => LoadTestConfig::default(),
        };

        let config = Self::merge_configs(base, overrides);
        config.validate()?;
        Ok(config)
    }

    fn load_file(path: &Path) -> Result<LoadTestConfig> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                let config: LoadTestConfig = serde_json::from_str(&content)?;
                Ok(config)
            }
            Some("yaml") | Some("yml") => {
                let config: LoadTestConfig = serde_yaml::from_str(&content)?;
                Ok(config)
            }
            Some("toml") => {
                let config: LoadTestConfig = toml::from_str(&content)?;
                Ok(config)
            }
            _ => Err(Error::Config(format!(
                "Unsupported file extension: {}",
                path.display()
            ))),
        }
    }

    fn merge_configs(mut base: LoadTestConfig, overrides: LoadTestConfig) -> LoadTestConfig {
        if !overrides.url.is_empty() {
            base.url = overrides.url;
        }
        if overrides.requests.is_some() {
            base.requests = overrides.requests;
        }
        if overrides.concurrency.is_some() {
            base.concurrency = overrides.concurrency;
        }
        if overrides.format.is_some() {
            base.format = overrides.format;
        }
        base
    }
}
