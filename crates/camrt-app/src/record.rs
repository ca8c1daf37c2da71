//! Configuration record for one lifecycle epoch
//!
//! A [`ConfigurationRecord`] bundles the provider functions the runtime calls
//! during initialization with an optional executor override and a minimum log
//! level applied while the epoch is initialized. It is immutable
//! once built and cheap to clone (every field is reference counted).
//!
//! Building never fails: a record without a camera factory provider is
//! structurally empty ([`ConfigurationRecord::is_empty`]), is accepted by
//! `configure`, and fails at initialization with a missing-provider cause.

use std::fmt;
use std::sync::Arc;

use tracing::Level;

use camrt_core::prelude::*;
use camrt_core::{CameraSelector, Executor, PlatformContext};
use camrt_device::{
    CameraFactory, CameraFactoryProvider, CameraThreadConfig, DeviceSurfaceManager,
    SurfaceManagerProvider, UseCaseConfigFactory, UseCaseConfigFactoryProvider,
};

/// Immutable provider bundle handed to `configure`
#[derive(Clone, Default)]
pub struct ConfigurationRecord {
    camera_factory_provider: Option<CameraFactoryProvider>,
    surface_manager_provider: Option<SurfaceManagerProvider>,
    use_case_config_factory_provider: Option<UseCaseConfigFactoryProvider>,
    executor: Option<Arc<dyn Executor>>,
    available_cameras_limiter: Option<CameraSelector>,
    min_log_level: Option<Level>,
}

impl ConfigurationRecord {
    pub fn builder() -> ConfigurationRecordBuilder {
        ConfigurationRecordBuilder::default()
    }

    /// True when no camera factory provider was supplied
    pub fn is_empty(&self) -> bool {
        self.camera_factory_provider.is_none()
    }

    pub fn camera_factory_provider(&self) -> Option<&CameraFactoryProvider> {
        self.camera_factory_provider.as_ref()
    }

    pub fn surface_manager_provider(&self) -> Option<&SurfaceManagerProvider> {
        self.surface_manager_provider.as_ref()
    }

    pub fn use_case_config_factory_provider(&self) -> Option<&UseCaseConfigFactoryProvider> {
        self.use_case_config_factory_provider.as_ref()
    }

    /// Executor override, if the caller supplied one
    pub fn executor(&self) -> Option<&Arc<dyn Executor>> {
        self.executor.as_ref()
    }

    /// Selector restricting which of the factory's cameras the runtime exposes
    pub fn available_cameras_limiter(&self) -> Option<&CameraSelector> {
        self.available_cameras_limiter.as_ref()
    }

    /// Log level floor installed at initialization and cleared at shutdown
    pub fn min_log_level(&self) -> Option<Level> {
        self.min_log_level
    }
}

impl fmt::Debug for ConfigurationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationRecord")
            .field(
                "camera_factory_provider",
                &self.camera_factory_provider.is_some(),
            )
            .field(
                "surface_manager_provider",
                &self.surface_manager_provider.is_some(),
            )
            .field(
                "use_case_config_factory_provider",
                &self.use_case_config_factory_provider.is_some(),
            )
            .field("executor", &self.executor.as_ref().map(|e| e.name()))
            .field("available_cameras_limiter", &self.available_cameras_limiter)
            .field("min_log_level", &self.min_log_level)
            .finish()
    }
}

/// Builder for [`ConfigurationRecord`]
#[derive(Default)]
pub struct ConfigurationRecordBuilder {
    record: ConfigurationRecord,
}

impl ConfigurationRecordBuilder {
    pub fn camera_factory_provider<F>(mut self, provider: F) -> Self
    where
        F: Fn(&PlatformContext, &CameraThreadConfig) -> Result<Arc<dyn CameraFactory>>
            + Send
            + Sync
            + 'static,
    {
        self.record.camera_factory_provider = Some(Arc::new(provider));
        self
    }

    pub fn surface_manager_provider<F>(mut self, provider: F) -> Self
    where
        F: Fn(&PlatformContext) -> Result<Arc<dyn DeviceSurfaceManager>> + Send + Sync + 'static,
    {
        self.record.surface_manager_provider = Some(Arc::new(provider));
        self
    }

    pub fn use_case_config_factory_provider<F>(mut self, provider: F) -> Self
    where
        F: Fn(&PlatformContext) -> Result<Arc<dyn UseCaseConfigFactory>> + Send + Sync + 'static,
    {
        self.record.use_case_config_factory_provider = Some(Arc::new(provider));
        self
    }

    /// Run provider resolution and teardown on `executor` instead of the default
    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.record.executor = Some(executor);
        self
    }

    pub fn available_cameras_limiter(mut self, selector: CameraSelector) -> Self {
        self.record.available_cameras_limiter = Some(selector);
        self
    }

    pub fn min_log_level(mut self, level: Level) -> Self {
        self.record.min_log_level = Some(level);
        self
    }

    pub fn build(self) -> ConfigurationRecord {
        if self.record.is_empty() {
            debug!("Built configuration record without a camera factory provider");
        }
        self.record
    }
}
