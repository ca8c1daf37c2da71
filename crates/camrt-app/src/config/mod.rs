//! Configuration file parsing for camera-runtime
//!
//! Supports:
//! - `.camrt/config.toml` - Runtime settings and the static camera list

pub mod settings;
pub mod types;

pub use settings::{
    configuration_record, init_config_dir, load_settings, read_settings, CAMRT_DIR,
};
pub use types::*;
