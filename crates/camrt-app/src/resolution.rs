//! Provider resolution
//!
//! Turns a [`ConfigurationRecord`] into concrete collaborators by calling its
//! provider functions in order: camera factory, surface manager, use-case
//! config factory. Providers may block (hardware enumeration), so this runs on
//! an executor, never under the lifecycle lock.
//!
//! Only the camera factory provider is mandatory. The other two fall back to
//! no-op implementations. When a later provider fails, whatever was already
//! resolved is handed back inside the [`ResolutionFailure`] so the lifecycle
//! can release it at shutdown.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use camrt_core::prelude::*;
use camrt_core::{CameraInfo, PlatformContext};
use camrt_device::{
    CameraFactory, CameraThreadConfig, DeviceSurfaceManager, EmptyUseCaseConfigFactory,
    NoopSurfaceManager, UseCaseConfigFactory,
};

use crate::record::ConfigurationRecord;

const CAMERA_FACTORY: &str = "camera factory";
const SURFACE_MANAGER: &str = "surface manager";
const USE_CASE_CONFIG_FACTORY: &str = "use case config factory";

/// Collaborators resolved for one epoch
#[derive(Debug, Clone)]
pub struct ResolvedProviders {
    pub camera_factory: Arc<dyn CameraFactory>,
    pub surface_manager: Arc<dyn DeviceSurfaceManager>,
    pub use_case_configs: Arc<dyn UseCaseConfigFactory>,

    /// Cameras exposed this epoch (after the available-cameras limiter)
    pub cameras: Vec<CameraInfo>,
}

impl ResolvedProviders {
    /// Release every collaborator, newest first. Failures are collected, not raised.
    pub fn release(&self) -> Vec<Error> {
        let mut errors = Vec::new();
        release_into(&mut errors, USE_CASE_CONFIG_FACTORY, || {
            self.use_case_configs.release()
        });
        release_into(&mut errors, SURFACE_MANAGER, || self.surface_manager.release());
        release_into(&mut errors, CAMERA_FACTORY, || self.camera_factory.release());
        errors
    }
}

/// Whatever had been resolved before resolution failed
#[derive(Debug, Clone, Default)]
pub struct PartialProviders {
    pub camera_factory: Option<Arc<dyn CameraFactory>>,
    pub surface_manager: Option<Arc<dyn DeviceSurfaceManager>>,
    pub use_case_configs: Option<Arc<dyn UseCaseConfigFactory>>,
}

impl PartialProviders {
    pub fn is_empty(&self) -> bool {
        self.camera_factory.is_none()
            && self.surface_manager.is_none()
            && self.use_case_configs.is_none()
    }

    /// Release the resolved subset, newest first
    pub fn release(&self) -> Vec<Error> {
        let mut errors = Vec::new();
        if let Some(factory) = &self.use_case_configs {
            release_into(&mut errors, USE_CASE_CONFIG_FACTORY, || factory.release());
        }
        if let Some(manager) = &self.surface_manager {
            release_into(&mut errors, SURFACE_MANAGER, || manager.release());
        }
        if let Some(factory) = &self.camera_factory {
            release_into(&mut errors, CAMERA_FACTORY, || factory.release());
        }
        errors
    }
}

/// Resolution error plus the providers resolved before it happened
#[derive(Debug)]
pub struct ResolutionFailure {
    pub cause: Error,
    pub partial: PartialProviders,
}

impl ResolutionFailure {
    fn new(cause: Error, partial: PartialProviders) -> Self {
        Self { cause, partial }
    }
}

/// Invoke the record's providers and assemble the resolved bundle
pub fn resolve_providers(
    record: &ConfigurationRecord,
    context: &PlatformContext,
    threads: &CameraThreadConfig,
) -> std::result::Result<ResolvedProviders, ResolutionFailure> {
    let mut partial = PartialProviders::default();

    let Some(factory_provider) = record.camera_factory_provider() else {
        return Err(ResolutionFailure::new(
            Error::MissingProvider {
                kind: CAMERA_FACTORY,
            },
            partial,
        ));
    };

    let camera_factory = match guarded(CAMERA_FACTORY, || factory_provider(context, threads)) {
        Ok(factory) => factory,
        Err(e) => return Err(ResolutionFailure::new(e, partial)),
    };
    partial.camera_factory = Some(Arc::clone(&camera_factory));

    let mut cameras = match guarded(CAMERA_FACTORY, || Ok(camera_factory.available_cameras())) {
        Ok(cameras) => cameras,
        Err(e) => return Err(ResolutionFailure::new(e, partial)),
    };
    if let Some(limiter) = record.available_cameras_limiter() {
        cameras = limiter.filter(&cameras).into_iter().cloned().collect();
        if cameras.is_empty() {
            return Err(ResolutionFailure::new(
                Error::provider(
                    CAMERA_FACTORY,
                    "no available camera matches the configured limiter",
                ),
                partial,
            ));
        }
    }
    debug!(
        count = cameras.len(),
        application = %context.application_id,
        "Camera factory resolved"
    );

    let surface_manager: Arc<dyn DeviceSurfaceManager> = match record.surface_manager_provider() {
        Some(provider) => match guarded(SURFACE_MANAGER, || provider(context)) {
            Ok(manager) => manager,
            Err(e) => return Err(ResolutionFailure::new(e, partial)),
        },
        None => Arc::new(NoopSurfaceManager),
    };
    partial.surface_manager = Some(Arc::clone(&surface_manager));

    let use_case_configs: Arc<dyn UseCaseConfigFactory> =
        match record.use_case_config_factory_provider() {
            Some(provider) => match guarded(USE_CASE_CONFIG_FACTORY, || provider(context)) {
                Ok(factory) => factory,
                Err(e) => return Err(ResolutionFailure::new(e, partial)),
            },
            None => Arc::new(EmptyUseCaseConfigFactory),
        };

    Ok(ResolvedProviders {
        camera_factory,
        surface_manager,
        use_case_configs,
        cameras,
    })
}

/// Run collaborator code, turning a panic into a provider error
fn guarded<T>(kind: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(Error::provider(kind, panic_message(payload.as_ref()))),
    }
}

fn release_into(errors: &mut Vec<Error>, kind: &'static str, f: impl FnOnce() -> Result<()>) {
    if let Err(e) = guarded(kind, f) {
        warn!(kind, error = %e, "Failed to release provider");
        errors.push(e);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
