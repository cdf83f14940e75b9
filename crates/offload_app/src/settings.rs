use std::fs;
use std::path::Path;
use std::time::Duration;

use offload_worker::WorkerSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorSettings {
    /// How long to wait for a worker reply. `None` waits forever.
    pub request_timeout_ms: Option<u64>,
    /// What to do when no background worker can be used.
    pub fallback: FallbackPolicy,
    /// When false the host is treated as lacking background execution.
    pub background: bool,
    pub worker_thread_name: String,
    /// Log a KPI block after every dispatched operation.
    pub log_kpis: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FallbackPolicy {
    /// Every operation fails with a transport error.
    #[default]
    Fail,
    /// Run the transformation on the calling thread.
    Inline,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: Some(30_000),
            fallback: FallbackPolicy::Fail,
            background: true,
            worker_thread_name: "offload-worker".to_string(),
            log_kpis: true,
        }
    }
}

impl CoordinatorSettings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            thread_name: self.worker_thread_name.clone(),
            ..WorkerSettings::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings from {path}: {message}")]
    Parse { path: String, message: String },
}

/// Reads settings from a RON file. Fields left out keep their defaults.
pub fn load_settings(path: &Path) -> Result<CoordinatorSettings, SettingsError> {
    let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.display().to_string(),
        source,
    })?;
    ron::from_str(&content).map_err(|err| SettingsError::Parse {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}
