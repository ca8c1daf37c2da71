//! camrt-app - Lifecycle orchestration for camera-runtime
//!
//! This crate implements the configure → initialize → shutdown state machine,
//! provider resolution, completion handles, lifecycle events, the
//! process-wide holder and settings loading.

pub mod completion;
pub mod config;
pub mod events;
pub mod holder;
pub mod instance;
pub mod lifecycle;
pub mod record;
pub mod resolution;

// Re-export primary types
pub use completion::{Completer, Completion};
pub use events::LifecycleEvent;
pub use instance::{CameraInstance, InitHandle};
pub use lifecycle::Lifecycle;
pub use record::{ConfigurationRecord, ConfigurationRecordBuilder};
pub use resolution::{resolve_providers, PartialProviders, ResolutionFailure, ResolvedProviders};

// Re-export core types used in the public API
pub use camrt_core::{
    CameraInfo, CameraSelector, LensFacing, LifecyclePhase, PlatformContext, UseCaseConfig,
    UseCaseKind,
};
