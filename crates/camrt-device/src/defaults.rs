//! Stock collaborator implementations
//!
//! - [`StaticCameraFactory`] serves a fixed camera list (from settings files)
//! - [`NoopSurfaceManager`] stands in when no surface manager provider is configured
//! - [`DefaultUseCaseConfigFactory`] maps use-case kinds to installed default builders
//! - [`EmptyUseCaseConfigFactory`] stands in when no use-case provider is configured

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use camrt_core::prelude::*;
use camrt_core::{CameraInfo, UseCaseConfig, UseCaseKind};

use crate::factory::{CameraFactory, DeviceSurfaceManager, UseCaseConfigFactory};

/// Camera factory backed by a fixed list of camera descriptors
#[derive(Debug, Clone, Default)]
pub struct StaticCameraFactory {
    cameras: Vec<CameraInfo>,
}

impl StaticCameraFactory {
    pub fn new(cameras: Vec<CameraInfo>) -> Self {
        Self { cameras }
    }
}

impl CameraFactory for StaticCameraFactory {
    fn available_cameras(&self) -> Vec<CameraInfo> {
        self.cameras.clone()
    }

    fn release(&self) -> Result<()> {
        debug!("Releasing static camera factory ({} cameras)", self.cameras.len());
        Ok(())
    }
}

/// Surface manager that accepts every surface combination
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSurfaceManager;

impl DeviceSurfaceManager for NoopSurfaceManager {
    fn check_supported(&self, _camera_id: &str, _surface_count: usize) -> bool {
        true
    }
}

/// Use-case config factory without any defaults
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyUseCaseConfigFactory;

impl UseCaseConfigFactory for EmptyUseCaseConfigFactory {
    fn config(&self, _kind: UseCaseKind, _camera: Option<&CameraInfo>) -> Option<UseCaseConfig> {
        None
    }
}

type DefaultBuilder = Arc<dyn Fn(Option<&CameraInfo>) -> UseCaseConfig + Send + Sync>;

/// Use-case config factory that defers to per-kind default builders
#[derive(Clone, Default)]
pub struct DefaultUseCaseConfigFactory {
    builders: HashMap<UseCaseKind, DefaultBuilder>,
}

impl DefaultUseCaseConfigFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory with a default for every use-case kind, rotated to the camera sensor
    pub fn standard() -> Self {
        let mut factory = Self::new();
        for kind in [
            UseCaseKind::Preview,
            UseCaseKind::ImageCapture,
            UseCaseKind::ImageAnalysis,
            UseCaseKind::VideoCapture,
        ] {
            factory.install_default_provider(kind, move |camera| {
                let config = UseCaseConfig::new(kind, kind.as_str());
                match camera {
                    Some(info) => config.with_target_rotation(info.sensor_rotation_degrees),
                    None => config,
                }
            });
        }
        factory
    }

    /// Install (or replace) the default builder for `kind`
    pub fn install_default_provider<F>(&mut self, kind: UseCaseKind, builder: F)
    where
        F: Fn(Option<&CameraInfo>) -> UseCaseConfig + Send + Sync + 'static,
    {
        self.builders.insert(kind, Arc::new(builder));
    }
}

impl fmt::Debug for DefaultUseCaseConfigFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.builders.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("DefaultUseCaseConfigFactory")
            .field("kinds", &kinds)
            .finish()
    }
}

impl UseCaseConfigFactory for DefaultUseCaseConfigFactory {
    fn config(&self, kind: UseCaseKind, camera: Option<&CameraInfo>) -> Option<UseCaseConfig> {
        self.builders.get(&kind).map(|build| build(camera))
    }
}
