//! Settings file handling for `.camrt/config.toml`

use std::path::Path;
use std::sync::Arc;

use tracing::Level;

use camrt_core::prelude::*;
use camrt_core::CameraSelector;
use camrt_device::{
    CameraFactory, DefaultUseCaseConfigFactory, DeviceSurfaceManager, NoopSurfaceManager,
    StaticCameraFactory, UseCaseConfigFactory,
};

use super::types::Settings;
use crate::record::ConfigurationRecord;

const CONFIG_FILENAME: &str = "config.toml";
pub const CAMRT_DIR: &str = ".camrt";

// ─────────────────────────────────────────────────────────────────────────────
// Settings Loading
// ─────────────────────────────────────────────────────────────────────────────

/// Load settings from .camrt/config.toml
///
/// Returns default settings if file doesn't exist or can't be parsed.
pub fn load_settings(project_path: &Path) -> Settings {
    let config_path = project_path.join(CAMRT_DIR).join(CONFIG_FILENAME);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match read_settings(&config_path) {
        Ok(settings) => {
            debug!("Loaded settings from {:?}", config_path);
            settings
        }
        Err(e) => {
            warn!("Failed to load {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Read and parse one settings file, reporting I/O and TOML errors
pub fn read_settings(config_path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(config_path)?;
    Ok(toml::from_str(&content)?)
}

/// Create a default config file in the .camrt/ directory
pub fn init_config_dir(project_path: &Path) -> Result<()> {
    let camrt_dir = project_path.join(CAMRT_DIR);

    if !camrt_dir.exists() {
        std::fs::create_dir_all(&camrt_dir)
            .map_err(|e| Error::config(format!("Failed to create .camrt dir: {}", e)))?;
    }

    let config_path = camrt_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        let default_content = r#"# camera-runtime configuration

[runtime]
application_id = "camrt"
executor = "default"      # default | direct | thread | tokio
# limit_lens_facing = "back"
# log_level = "warn"         # suppress less severe events while initialized
init_timeout_ms = 10000
shutdown_timeout_ms = 10000

[[cameras]]
camera_id = "0"
lens_facing = "back"
sensor_rotation_degrees = 90

[[cameras]]
camera_id = "1"
lens_facing = "front"
sensor_rotation_degrees = 270
"#;
        std::fs::write(&config_path, default_content)
            .map_err(|e| Error::config(format!("Failed to write config.toml: {}", e)))?;
    }

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Record Construction
// ─────────────────────────────────────────────────────────────────────────────

/// Build a configuration record serving the settings' static camera list
///
/// Without any `[[cameras]]` entry the record has no camera factory provider
/// and initialization fails with a missing-provider cause.
pub fn configuration_record(settings: &Settings) -> ConfigurationRecord {
    let mut builder = ConfigurationRecord::builder()
        .surface_manager_provider(|_| {
            Ok(Arc::new(NoopSurfaceManager) as Arc<dyn DeviceSurfaceManager>)
        })
        .use_case_config_factory_provider(|_| {
            Ok(Arc::new(DefaultUseCaseConfigFactory::standard()) as Arc<dyn UseCaseConfigFactory>)
        });

    if !settings.cameras.is_empty() {
        let cameras = settings.cameras.clone();
        builder = builder.camera_factory_provider(move |_, _| {
            Ok(Arc::new(StaticCameraFactory::new(cameras.clone())) as Arc<dyn CameraFactory>)
        });
    }

    if let Some(executor) = settings.runtime.executor.build() {
        builder = builder.executor(executor);
    }

    if let Some(facing) = settings.runtime.limit_lens_facing {
        builder = builder.available_cameras_limiter(CameraSelector::new().require_lens_facing(facing));
    }

    if let Some(level) = &settings.runtime.log_level {
        match level.parse::<Level>() {
            Ok(level) => builder = builder.min_log_level(level),
            Err(_) => warn!("Ignoring unknown log_level {:?}", level),
        }
    }

    builder.build()
}
