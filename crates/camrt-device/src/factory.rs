//! Collaborator traits the lifecycle resolves through providers
//!
//! The lifecycle never enumerates hardware itself. A configuration supplies
//! provider functions; initialization calls them to obtain the concrete
//! implementations of the traits below.

use std::fmt;
use std::sync::Arc;

use camrt_core::prelude::*;
use camrt_core::{CameraInfo, Executor, PlatformContext, UseCaseConfig, UseCaseKind};

/// Source of the cameras available to the runtime
pub trait CameraFactory: Send + Sync + fmt::Debug {
    /// All cameras this factory can open, in factory order
    fn available_cameras(&self) -> Vec<CameraInfo>;

    /// Look up one camera by id
    fn camera_info(&self, camera_id: &str) -> Option<CameraInfo> {
        self.available_cameras()
            .into_iter()
            .find(|c| c.camera_id == camera_id)
    }

    /// Release hardware handles. Called once when the owning epoch shuts down.
    fn release(&self) -> Result<()> {
        Ok(())
    }
}

/// Decides which surface combinations a camera device can stream to
pub trait DeviceSurfaceManager: Send + Sync + fmt::Debug {
    /// Whether `camera_id` can feed `surface_count` concurrent surfaces
    fn check_supported(&self, camera_id: &str, surface_count: usize) -> bool;

    fn release(&self) -> Result<()> {
        Ok(())
    }
}

/// Produces default configurations for camera use cases
pub trait UseCaseConfigFactory: Send + Sync + fmt::Debug {
    /// Default config for `kind`, or `None` when this factory has no default
    fn config(&self, kind: UseCaseKind, camera: Option<&CameraInfo>) -> Option<UseCaseConfig>;

    fn release(&self) -> Result<()> {
        Ok(())
    }
}

/// Threading information handed to camera factory providers
#[derive(Debug, Clone)]
pub struct CameraThreadConfig {
    /// Executor the runtime uses for camera work in this epoch
    pub executor: Arc<dyn Executor>,
}

impl CameraThreadConfig {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self { executor }
    }
}

/// Builds the camera factory for an epoch
pub type CameraFactoryProvider = Arc<
    dyn Fn(&PlatformContext, &CameraThreadConfig) -> Result<Arc<dyn CameraFactory>> + Send + Sync,
>;

/// Builds the device surface manager for an epoch
pub type SurfaceManagerProvider =
    Arc<dyn Fn(&PlatformContext) -> Result<Arc<dyn DeviceSurfaceManager>> + Send + Sync>;

/// Builds the use-case config factory for an epoch
pub type UseCaseConfigFactoryProvider =
    Arc<dyn Fn(&PlatformContext) -> Result<Arc<dyn UseCaseConfigFactory>> + Send + Sync>;
