//! The initialized camera runtime
//!
//! A [`CameraInstance`] exists once per successful initialization and owns the
//! resolved collaborators for that epoch. After shutdown has released it, the
//! accessors report [`Error::NotInitialized`] even through handles obtained
//! earlier.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use camrt_core::prelude::*;
use camrt_core::{CameraInfo, CameraSelector, PlatformContext, UseCaseConfig, UseCaseKind};
use camrt_device::{CameraFactory, DeviceSurfaceManager, UseCaseConfigFactory};

use crate::completion::Completion;
use crate::resolution::ResolvedProviders;

/// Resolved collaborators of one lifecycle epoch
#[derive(Debug)]
pub struct CameraInstance {
    epoch: u64,
    context: PlatformContext,
    providers: ResolvedProviders,
    released: AtomicBool,
}

impl CameraInstance {
    pub(crate) fn new(epoch: u64, context: PlatformContext, providers: ResolvedProviders) -> Self {
        Self {
            epoch,
            context,
            providers,
            released: AtomicBool::new(false),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Context the instance was initialized with
    pub fn context(&self) -> &PlatformContext {
        &self.context
    }

    pub fn camera_factory(&self) -> &Arc<dyn CameraFactory> {
        &self.providers.camera_factory
    }

    pub fn surface_manager(&self) -> &Arc<dyn DeviceSurfaceManager> {
        &self.providers.surface_manager
    }

    pub fn use_case_config_factory(&self) -> &Arc<dyn UseCaseConfigFactory> {
        &self.providers.use_case_configs
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Cameras available this epoch
    pub fn cameras(&self) -> Result<&[CameraInfo]> {
        self.ensure_live()?;
        Ok(&self.providers.cameras)
    }

    /// Look up a camera by id
    ///
    /// Cameras hidden by the available-cameras limiter are reported as unknown.
    pub fn camera_info(&self, camera_id: &str) -> Result<CameraInfo> {
        self.cameras()?
            .iter()
            .find(|c| c.camera_id == camera_id)
            .cloned()
            .ok_or_else(|| Error::invalid_argument(format!("unknown camera id: {}", camera_id)))
    }

    /// Whether any available camera satisfies `selector`
    pub fn has_camera(&self, selector: &CameraSelector) -> Result<bool> {
        Ok(!selector.filter(self.cameras()?).is_empty())
    }

    /// Default configuration for a use-case kind, if the factory provides one
    pub fn default_use_case_config(
        &self,
        kind: UseCaseKind,
        camera: Option<&CameraInfo>,
    ) -> Result<Option<UseCaseConfig>> {
        self.ensure_live()?;
        Ok(self.providers.use_case_configs.config(kind, camera))
    }

    /// Release the collaborators. Only the first call does anything.
    pub(crate) fn release(&self) -> Vec<Error> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Vec::new();
        }
        debug!(epoch = self.epoch, "Releasing camera instance");
        self.providers.release()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_released() {
            return Err(Error::NotInitialized);
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Initialization Handle
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) type InitOutcome = std::result::Result<Arc<CameraInstance>, Arc<Error>>;

/// Completion handle of one initialization attempt
///
/// Every caller that asks for initialization within the same epoch receives a
/// handle to the same attempt. A failed attempt yields
/// [`Error::Initialization`] wrapping the provider cause.
#[derive(Debug, Clone)]
pub struct InitHandle {
    inner: Completion<InitOutcome>,
}

impl InitHandle {
    pub(crate) fn new(inner: Completion<InitOutcome>) -> Self {
        Self { inner }
    }

    pub fn epoch(&self) -> u64 {
        self.inner.epoch()
    }

    pub fn is_complete(&self) -> bool {
        self.inner.is_complete()
    }

    /// Non-blocking poll; `None` while initialization is in flight
    pub fn try_get(&self) -> Option<Result<Arc<CameraInstance>>> {
        self.inner.try_get().map(into_result)
    }

    /// Block the calling thread until initialization settles
    pub fn wait(&self) -> Result<Arc<CameraInstance>> {
        into_result(self.inner.wait())
    }

    /// Block for at most `timeout`; `None` if still in flight
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<Arc<CameraInstance>>> {
        self.inner.wait_timeout(timeout).map(into_result)
    }

    pub async fn wait_async(&self) -> Result<Arc<CameraInstance>> {
        into_result(self.inner.wait_async().await)
    }

    /// Run `f` once initialization settles
    pub fn on_complete<F>(&self, f: F)
    where
        F: FnOnce(Result<Arc<CameraInstance>>) + Send + 'static,
    {
        self.inner.on_complete(move |outcome| f(into_result(outcome)));
    }

    /// Whether both handles observe the same initialization attempt
    pub fn same_as(&self, other: &InitHandle) -> bool {
        self.inner.same_as(&other.inner)
    }
}

fn into_result(outcome: InitOutcome) -> Result<Arc<CameraInstance>> {
    outcome.map_err(|cause| Error::Initialization { cause })
}
