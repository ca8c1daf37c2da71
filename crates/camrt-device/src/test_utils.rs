//! Test utilities for camera collaborators
//!
//! Fakes that record how often they were released, plus a [`Gate`] for
//! holding a provider inside initialization until a test lets it continue.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use camrt_core::prelude::*;
use camrt_core::{CameraInfo, LensFacing, UseCaseConfig, UseCaseKind};

use crate::factory::{CameraFactory, DeviceSurfaceManager, UseCaseConfigFactory};

/// Camera factory whose camera list can be filled after construction
#[derive(Debug, Default)]
pub struct FakeCameraFactory {
    cameras: Mutex<Vec<CameraInfo>>,
    releases: AtomicUsize,
    fail_release: AtomicBool,
}

impl FakeCameraFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory with camera "0" facing back, the usual fixture
    pub fn with_back_camera() -> Self {
        let factory = Self::new();
        factory.insert_camera(LensFacing::Back, "0");
        factory
    }

    pub fn insert_camera(&self, facing: LensFacing, camera_id: &str) {
        self.cameras.lock().push(CameraInfo::new(camera_id, facing));
    }

    /// Make every subsequent `release` call fail
    pub fn fail_on_release(&self) {
        self.fail_release.store(true, Ordering::SeqCst);
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl CameraFactory for FakeCameraFactory {
    fn available_cameras(&self) -> Vec<CameraInfo> {
        self.cameras.lock().clone()
    }

    fn release(&self) -> Result<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        if self.fail_release.load(Ordering::SeqCst) {
            return Err(Error::release("camera factory", "fake release failure"));
        }
        Ok(())
    }
}

/// Surface manager that supports up to a fixed number of surfaces
#[derive(Debug)]
pub struct FakeSurfaceManager {
    max_surfaces: usize,
    releases: AtomicUsize,
    release_gate: Mutex<Option<Arc<Gate>>>,
}

impl FakeSurfaceManager {
    pub fn new(max_surfaces: usize) -> Self {
        Self {
            max_surfaces,
            releases: AtomicUsize::new(0),
            release_gate: Mutex::new(None),
        }
    }

    /// Make `release` block until `gate` opens
    pub fn hold_release(&self, gate: Arc<Gate>) {
        *self.release_gate.lock() = Some(gate);
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl Default for FakeSurfaceManager {
    fn default() -> Self {
        Self::new(3)
    }
}

impl DeviceSurfaceManager for FakeSurfaceManager {
    fn check_supported(&self, _camera_id: &str, surface_count: usize) -> bool {
        surface_count <= self.max_surfaces
    }

    fn release(&self) -> Result<()> {
        let gate = self.release_gate.lock().clone();
        if let Some(gate) = gate {
            gate.wait();
        }
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Use-case config factory answering every kind with a fixed target name
#[derive(Debug, Default)]
pub struct FakeUseCaseConfigFactory {
    releases: AtomicUsize,
}

impl FakeUseCaseConfigFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl UseCaseConfigFactory for FakeUseCaseConfigFactory {
    fn config(&self, kind: UseCaseKind, _camera: Option<&CameraInfo>) -> Option<UseCaseConfig> {
        Some(UseCaseConfig::new(kind, "FakeUseCase"))
    }

    fn release(&self) -> Result<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// One-shot latch: `wait` blocks until `open` is called
#[derive(Debug, Default)]
pub struct Gate {
    open: Mutex<bool>,
    cond: Condvar,
    waiters: AtomicUsize,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn wait(&self) {
        self.waiters.fetch_add(1, Ordering::SeqCst);
        let mut open = self.open.lock();
        while !*open {
            self.cond.wait(&mut open);
        }
    }

    pub fn open(&self) {
        *self.open.lock() = true;
        self.cond.notify_all();
    }

    /// Block until at least one thread is waiting on the gate
    pub fn wait_for_waiter(&self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while self.waiters.load(Ordering::SeqCst) == 0 {
            if std::time::Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }
}
