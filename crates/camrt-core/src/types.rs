//! Domain value types shared by every camera-runtime crate

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle Phase
// ─────────────────────────────────────────────────────────────────────────────

/// Phase of the camera runtime lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    /// Nothing configured; `configure` is permitted
    #[default]
    Unconfigured,
    /// A configuration record is installed, providers not yet resolved
    Configured,
    /// Provider resolution is in flight
    Initializing,
    /// Providers resolved, accessors available
    Ready,
    /// Provider resolution failed; only shutdown moves on from here
    InitFailed,
    /// Resolved providers are being released
    ShuttingDown,
}

impl LifecyclePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecyclePhase::Unconfigured => "unconfigured",
            LifecyclePhase::Configured => "configured",
            LifecyclePhase::Initializing => "initializing",
            LifecyclePhase::Ready => "ready",
            LifecyclePhase::InitFailed => "init_failed",
            LifecyclePhase::ShuttingDown => "shutting_down",
        }
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cameras
// ─────────────────────────────────────────────────────────────────────────────

/// Direction a camera lens points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LensFacing {
    Front,
    Back,
    External,
}

impl LensFacing {
    pub fn as_str(&self) -> &'static str {
        match self {
            LensFacing::Front => "front",
            LensFacing::Back => "back",
            LensFacing::External => "external",
        }
    }
}

impl fmt::Display for LensFacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LensFacing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "front" => Ok(LensFacing::Front),
            "back" => Ok(LensFacing::Back),
            "external" => Ok(LensFacing::External),
            other => Err(format!("unknown lens facing '{}'", other)),
        }
    }
}

/// Static description of one camera exposed by a camera factory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraInfo {
    /// Factory-assigned camera identifier
    pub camera_id: String,

    /// Lens direction
    pub lens_facing: LensFacing,

    /// Clockwise sensor orientation in degrees (0, 90, 180, 270)
    #[serde(default)]
    pub sensor_rotation_degrees: u32,
}

impl CameraInfo {
    pub fn new(camera_id: impl Into<String>, lens_facing: LensFacing) -> Self {
        Self {
            camera_id: camera_id.into(),
            lens_facing,
            sensor_rotation_degrees: 0,
        }
    }

    pub fn with_sensor_rotation(mut self, degrees: u32) -> Self {
        self.sensor_rotation_degrees = degrees;
        self
    }
}

/// Set of constraints a camera has to satisfy to be selected
///
/// Every constraint must hold for a camera to match. Requiring two different
/// lens facings therefore matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraSelector {
    /// Required lens facings (all of them must match)
    #[serde(default)]
    pub lens_facing: Vec<LensFacing>,

    /// Required camera id
    #[serde(default)]
    pub camera_id: Option<String>,
}

impl CameraSelector {
    /// Selector without constraints; matches every camera
    pub fn new() -> Self {
        Self::default()
    }

    pub fn back() -> Self {
        Self::new().require_lens_facing(LensFacing::Back)
    }

    pub fn front() -> Self {
        Self::new().require_lens_facing(LensFacing::Front)
    }

    pub fn require_lens_facing(mut self, facing: LensFacing) -> Self {
        if !self.lens_facing.contains(&facing) {
            self.lens_facing.push(facing);
        }
        self
    }

    pub fn require_camera_id(mut self, camera_id: impl Into<String>) -> Self {
        self.camera_id = Some(camera_id.into());
        self
    }

    /// Whether any camera could possibly satisfy this selector
    pub fn is_satisfiable(&self) -> bool {
        self.lens_facing.len() <= 1
    }

    /// Check a single camera against every constraint
    pub fn matches(&self, camera: &CameraInfo) -> bool {
        let facing_ok = self
            .lens_facing
            .iter()
            .all(|facing| *facing == camera.lens_facing);
        let id_ok = self
            .camera_id
            .as_deref()
            .map_or(true, |id| id == camera.camera_id);
        facing_ok && id_ok
    }

    /// Cameras satisfying this selector, in input order
    pub fn filter<'a, I>(&self, cameras: I) -> Vec<&'a CameraInfo>
    where
        I: IntoIterator<Item = &'a CameraInfo>,
    {
        if !self.is_satisfiable() {
            return Vec::new();
        }
        cameras.into_iter().filter(|c| self.matches(c)).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Use Cases
// ─────────────────────────────────────────────────────────────────────────────

/// Kind of camera use case a default configuration is requested for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UseCaseKind {
    Preview,
    ImageCapture,
    ImageAnalysis,
    VideoCapture,
}

impl UseCaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UseCaseKind::Preview => "preview",
            UseCaseKind::ImageCapture => "image_capture",
            UseCaseKind::ImageAnalysis => "image_analysis",
            UseCaseKind::VideoCapture => "video_capture",
        }
    }
}

impl fmt::Display for UseCaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default configuration produced for a use case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseCaseConfig {
    pub kind: UseCaseKind,

    /// Name of the use case this configuration targets
    pub target_name: String,

    /// Rotation applied to outputs, when known
    #[serde(default)]
    pub target_rotation_degrees: Option<u32>,
}

impl UseCaseConfig {
    pub fn new(kind: UseCaseKind, target_name: impl Into<String>) -> Self {
        Self {
            kind,
            target_name: target_name.into(),
            target_rotation_degrees: None,
        }
    }

    pub fn with_target_rotation(mut self, degrees: u32) -> Self {
        self.target_rotation_degrees = Some(degrees);
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Platform Context
// ─────────────────────────────────────────────────────────────────────────────

/// Host application context handed to providers during initialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformContext {
    /// Identifier of the embedding application
    pub application_id: String,

    /// Directory providers may use for scratch data
    pub data_dir: Option<PathBuf>,
}

impl PlatformContext {
    pub fn new(application_id: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            data_dir: None,
        }
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }
}
