//! # camrt-core - Core Domain Types
//!
//! Foundation crate for camera-runtime. Provides the error taxonomy, logging
//! bootstrap, camera domain types and the executor abstraction.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, tokio, tracing).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`LifecyclePhase`] - Phase of the runtime lifecycle (Configured, Ready, ...)
//! - [`CameraInfo`], [`LensFacing`] - Description of one camera
//! - [`CameraSelector`] - Constraint set used to pick cameras
//! - [`UseCaseKind`], [`UseCaseConfig`] - Default use-case configuration
//! - [`PlatformContext`] - Host application context handed to providers
//!
//! ### Executors (`executor`)
//! - [`Executor`] - Schedules provider resolution and teardown tasks
//! - [`DirectExecutor`], [`ThreadExecutor`], [`TokioExecutor`]
//! - [`default_executor()`] - Background executor used when none is configured
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum; [`Error::is_fatal`] marks epoch-ending failures
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//!
//! ### Logging (`logging`)
//! - [`logging::init()`] - File logging filtered by `CAMRT_LOG`
//! - [`logging::set_min_level()`] - Process-wide level floor for one epoch
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use camrt_core::prelude::*;
//! ```

pub mod error;
pub mod executor;
pub mod logging;
pub mod types;

/// Prelude for common imports used throughout all camera-runtime crates
pub mod prelude {
    pub use super::error::{Error, Result};
    pub use tracing::{debug, error, info, warn};
}

// Re-export commonly used types at crate root for convenience
pub use error::{Error, Result};
pub use executor::{
    default_executor, DirectExecutor, Executor, Task, ThreadExecutor, TokioExecutor,
};
pub use types::{
    CameraInfo, CameraSelector, LensFacing, LifecyclePhase, PlatformContext, UseCaseConfig,
    UseCaseKind,
};
