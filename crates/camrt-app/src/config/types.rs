//! Configuration types for camera-runtime
//!
//! Defines:
//! - `Settings` - Contents of `.camrt/config.toml`
//! - `RuntimeSettings` - Executor choice, log level floor and watchdog timeouts
//! - `ExecutorKind` - Which executor runs provider resolution and teardown

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use camrt_core::{
    CameraInfo, DirectExecutor, Executor, LensFacing, ThreadExecutor, TokioExecutor,
};

/// Global runtime settings from `.camrt/config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub runtime: RuntimeSettings,

    /// Cameras exposed by the static camera factory
    #[serde(default)]
    pub cameras: Vec<CameraInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeSettings {
    /// Identifier handed to providers through the platform context
    #[serde(default = "default_application_id")]
    pub application_id: String,

    #[serde(default)]
    pub executor: ExecutorKind,

    /// Only expose cameras with this lens facing
    #[serde(default)]
    pub limit_lens_facing: Option<LensFacing>,

    /// Minimum log level while initialized (trace, debug, info, warn, error)
    #[serde(default)]
    pub log_level: Option<String>,

    /// How long the CLI waits for initialization
    #[serde(default = "default_timeout_ms")]
    pub init_timeout_ms: u64,

    /// How long the CLI waits for shutdown
    #[serde(default = "default_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            application_id: default_application_id(),
            executor: ExecutorKind::default(),
            limit_lens_facing: None,
            log_level: None,
            init_timeout_ms: default_timeout_ms(),
            shutdown_timeout_ms: default_timeout_ms(),
        }
    }
}

impl RuntimeSettings {
    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

fn default_application_id() -> String {
    "camrt".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// Executor selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    /// Tokio blocking pool when a runtime is active, threads otherwise
    #[default]
    Default,
    Direct,
    Thread,
    Tokio,
}

impl ExecutorKind {
    /// Build the executor, `None` meaning "let the lifecycle pick"
    ///
    /// `Tokio` outside a runtime also yields `None`.
    pub fn build(&self) -> Option<Arc<dyn Executor>> {
        match self {
            ExecutorKind::Default => None,
            ExecutorKind::Direct => Some(Arc::new(DirectExecutor)),
            ExecutorKind::Thread => Some(Arc::new(ThreadExecutor::default())),
            ExecutorKind::Tokio => {
                TokioExecutor::try_current().map(|e| Arc::new(e) as Arc<dyn Executor>)
            }
        }
    }
}

impl std::str::FromStr for ExecutorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(ExecutorKind::Default),
            "direct" => Ok(ExecutorKind::Direct),
            "thread" => Ok(ExecutorKind::Thread),
            "tokio" => Ok(ExecutorKind::Tokio),
            other => Err(format!("unknown executor '{}'", other)),
        }
    }
}
