//! Process-wide camera runtime
//!
//! A single lazily created [`Lifecycle`] plus free functions that forward to
//! it. Code that needs isolation (tests, embedders running several runtimes)
//! should create its own [`Lifecycle`] and pass it around instead.

use std::sync::{Arc, OnceLock};

use tokio::sync::broadcast;

use camrt_core::prelude::*;
use camrt_core::{
    CameraInfo, CameraSelector, LifecyclePhase, PlatformContext, UseCaseConfig, UseCaseKind,
};

use crate::completion::Completion;
use crate::events::LifecycleEvent;
use crate::instance::{CameraInstance, InitHandle};
use crate::lifecycle::Lifecycle;
use crate::record::ConfigurationRecord;

static GLOBAL: OnceLock<Lifecycle> = OnceLock::new();

/// The process-wide lifecycle, created on first use
pub fn global() -> &'static Lifecycle {
    GLOBAL.get_or_init(Lifecycle::new)
}

/// Install the process-wide configuration
pub fn configure_instance(record: ConfigurationRecord) -> Result<()> {
    global().configure(record)
}

/// Configure with `record` and start initializing in one step
pub fn initialize(context: PlatformContext, record: ConfigurationRecord) -> Result<InitHandle> {
    global().configure_and_initialize(context, record)
}

pub fn get_or_create_instance(context: PlatformContext) -> Result<InitHandle> {
    global().get_or_create_instance(context)
}

pub fn shutdown() -> Completion<()> {
    global().shutdown()
}

pub fn is_initialized() -> bool {
    global().is_initialized()
}

pub fn phase() -> LifecyclePhase {
    global().phase()
}

pub fn subscribe() -> broadcast::Receiver<LifecycleEvent> {
    global().subscribe()
}

pub fn instance() -> Result<Arc<CameraInstance>> {
    global().instance()
}

pub fn context() -> Result<PlatformContext> {
    global().context()
}

pub fn camera_info(camera_id: &str) -> Result<CameraInfo> {
    global().camera_info(camera_id)
}

pub fn has_camera(selector: &CameraSelector) -> Result<bool> {
    global().has_camera(selector)
}

pub fn default_use_case_config(
    kind: UseCaseKind,
    camera: Option<&CameraInfo>,
) -> Result<Option<UseCaseConfig>> {
    global().default_use_case_config(kind, camera)
}
