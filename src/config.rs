use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{TablePullError, TablePullResult};

/// Optional settings file checked in the working directory.
pub const CONFIG_FILE: &str = "tablepull.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TablePullConfig {
    pub storage: StorageConfig,
    pub analysis: AnalysisConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Azure storage connection string
    pub connection_string: String,

    /// Container holding the documents to analyze
    pub container: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Document intelligence endpoint URL
    pub endpoint: String,

    /// API key for the analysis service
    pub key: String,

    /// Analysis model to run
    pub model_id: String,

    /// Seconds between operation polls (Retry-After overrides this)
    pub poll_interval_secs: u64,

    /// Polls before a still-running operation counts as stuck
    pub max_polls: u32,

    /// Per-request HTTP timeout in seconds
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Column gap is twice this value
    pub padding: usize,

    /// Print a dashed rule between header and body
    pub separator: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            connection_string: String::new(),
            container: String::new(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            key: String::new(),
            model_id: "prebuilt-layout".to_string(),
            poll_interval_secs: 2,
            max_polls: 60,
            request_timeout_secs: 120,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            padding: 1,
            separator: true,
        }
    }
}

impl TablePullConfig {
    /// Defaults, then the optional settings file, then the environment.
    /// Environment variables always win so deployments can keep secrets out
    /// of files.
    pub fn load() -> TablePullResult<Self> {
        let mut config = if Path::new(CONFIG_FILE).exists() {
            Self::load_from_file(CONFIG_FILE)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> TablePullResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            TablePullError::configuration(format!("Failed to read config file: {}", e))
        })?;

        let config: TablePullConfig = toml::from_str(&content).map_err(|e| {
            TablePullError::configuration(format!("Failed to parse config file: {}", e))
        })?;

        Ok(config)
    }

    /// Override with environment variables
    pub fn apply_env(&mut self) {
        if let Ok(value) = std::env::var("STORAGE_CONN_STR") {
            self.storage.connection_string = value;
        }

        if let Ok(value) = std::env::var("CONTAINER_NAME") {
            self.storage.container = value;
        }

        if let Ok(value) = std::env::var("DOCUMENT_INTELLIGENCE_URL") {
            self.analysis.endpoint = value;
        }

        if let Ok(value) = std::env::var("DOCUMENT_INTELLIGENCE_KEY") {
            self.analysis.key = value;
        }

        if let Ok(value) = std::env::var("TABLEPULL_MODEL_ID") {
            self.analysis.model_id = value;
        }

        if let Ok(value) = std::env::var("TABLEPULL_POLL_INTERVAL_SECS") {
            if let Ok(secs) = value.parse::<u64>() {
                self.analysis.poll_interval_secs = secs;
            }
        }

        if let Ok(value) = std::env::var("TABLEPULL_MAX_POLLS") {
            if let Ok(count) = value.parse::<u32>() {
                self.analysis.max_polls = count;
            }
        }
    }

    /// Reject a config that cannot reach both collaborators.
    pub fn validate(&self) -> TablePullResult<()> {
        if self.storage.connection_string.is_empty() {
            return Err(TablePullError::configuration(
                "Storage connection string is not set (STORAGE_CONN_STR)",
            ));
        }

        if self.storage.container.is_empty() {
            return Err(TablePullError::configuration(
                "Storage container is not set (CONTAINER_NAME)",
            ));
        }

        if self.analysis.endpoint.is_empty() {
            return Err(TablePullError::configuration(
                "Analysis endpoint is not set (DOCUMENT_INTELLIGENCE_URL)",
            ));
        }

        if self.analysis.key.is_empty() {
            return Err(TablePullError::configuration(
                "Analysis API key is not set (DOCUMENT_INTELLIGENCE_KEY)",
            ));
        }

        Ok(())
    }
}
