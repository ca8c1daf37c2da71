//! # camrt-device - Camera Collaborators
//!
//! The narrow interfaces the camera runtime consumes from the hardware side:
//! camera factories, device surface managers and use-case config factories,
//! together with the provider function types a configuration uses to build
//! them.
//!
//! Depends on [`camrt_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Collaborator Traits
//! - [`CameraFactory`] - Enumerates cameras and releases hardware handles
//! - [`DeviceSurfaceManager`] - Answers surface combination queries
//! - [`UseCaseConfigFactory`] - Produces default use-case configurations
//!
//! ### Providers
//! - [`CameraFactoryProvider`], [`SurfaceManagerProvider`],
//!   [`UseCaseConfigFactoryProvider`] - Functions resolved during initialization
//! - [`CameraThreadConfig`] - Threading information handed to factory providers
//!
//! ### Stock Implementations
//! - [`StaticCameraFactory`] - Fixed camera list
//! - [`NoopSurfaceManager`], [`EmptyUseCaseConfigFactory`] - Defaults for absent providers
//! - [`DefaultUseCaseConfigFactory`] - Per-kind default builders

pub mod defaults;
pub mod factory;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

// Public API re-exports
pub use defaults::{
    DefaultUseCaseConfigFactory, EmptyUseCaseConfigFactory, NoopSurfaceManager,
    StaticCameraFactory,
};
pub use factory::{
    CameraFactory, CameraFactoryProvider, CameraThreadConfig, DeviceSurfaceManager,
    SurfaceManagerProvider, UseCaseConfigFactory, UseCaseConfigFactoryProvider,
};
