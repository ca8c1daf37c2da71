//! Probe report output
//!
//! The `camrt` binary describes what it did as a stream of [`ReportEvent`]s.
//! With `--json` every event is written as one NDJSON line, otherwise as a
//! short human-readable line.
//!
//! ```json
//! {"event":"phase_changed","epoch":0,"from":"configured","to":"initializing","timestamp":1704700001000}
//! {"event":"camera","camera_id":"0","lens_facing":"back","sensor_rotation_degrees":90,"timestamp":1704700001004}
//! ```

use chrono::Utc;
use serde::Serialize;
use std::io::{self, Write};
use tracing::error;

use camrt_app::LifecycleEvent;
use camrt_core::{CameraInfo, LensFacing, LifecyclePhase, UseCaseConfig, UseCaseKind};

/// Events emitted while probing the camera runtime
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReportEvent {
    PhaseChanged {
        epoch: u64,
        from: LifecyclePhase,
        to: LifecyclePhase,
        timestamp: i64,
    },

    InitializationFailed {
        epoch: u64,
        reason: String,
        timestamp: i64,
    },

    ReleaseFailed {
        epoch: u64,
        reason: String,
        timestamp: i64,
    },

    /// A camera available this epoch
    Camera {
        camera_id: String,
        lens_facing: LensFacing,
        sensor_rotation_degrees: u32,
        timestamp: i64,
    },

    /// Answer to `--select`
    Selection {
        lens_facing: LensFacing,
        available: bool,
        timestamp: i64,
    },

    /// Default use-case configuration for a camera
    UseCaseDefault {
        camera_id: String,
        kind: UseCaseKind,
        target_name: Option<String>,
        target_rotation_degrees: Option<u32>,
        timestamp: i64,
    },

    Error {
        message: String,
        fatal: bool,
        timestamp: i64,
    },
}

impl ReportEvent {
    /// Get current timestamp in milliseconds
    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    // ─────────────────────────────────────────────────────────
    // Convenience constructors
    // ─────────────────────────────────────────────────────────

    pub fn lifecycle(event: &LifecycleEvent) -> Self {
        match event {
            LifecycleEvent::PhaseChanged { epoch, from, to } => Self::PhaseChanged {
                epoch: *epoch,
                from: *from,
                to: *to,
                timestamp: Self::now(),
            },
            LifecycleEvent::InitializationFailed { epoch, reason } => {
                Self::InitializationFailed {
                    epoch: *epoch,
                    reason: reason.clone(),
                    timestamp: Self::now(),
                }
            }
            LifecycleEvent::ReleaseFailed { epoch, reason } => Self::ReleaseFailed {
                epoch: *epoch,
                reason: reason.clone(),
                timestamp: Self::now(),
            },
        }
    }

    pub fn camera(info: &CameraInfo) -> Self {
        Self::Camera {
            camera_id: info.camera_id.clone(),
            lens_facing: info.lens_facing,
            sensor_rotation_degrees: info.sensor_rotation_degrees,
            timestamp: Self::now(),
        }
    }

    pub fn selection(lens_facing: LensFacing, available: bool) -> Self {
        Self::Selection {
            lens_facing,
            available,
            timestamp: Self::now(),
        }
    }

    pub fn use_case_default(
        camera_id: &str,
        kind: UseCaseKind,
        config: Option<&UseCaseConfig>,
    ) -> Self {
        Self::UseCaseDefault {
            camera_id: camera_id.to_string(),
            kind,
            target_name: config.map(|c| c.target_name.clone()),
            target_rotation_degrees: config.and_then(|c| c.target_rotation_degrees),
            timestamp: Self::now(),
        }
    }

    pub fn error(message: impl Into<String>, fatal: bool) -> Self {
        Self::Error {
            message: message.into(),
            fatal,
            timestamp: Self::now(),
        }
    }

    /// One-line human-readable form
    pub fn summary(&self) -> String {
        match self {
            Self::PhaseChanged { epoch, from, to, .. } => {
                format!("[epoch {}] {} -> {}", epoch, from, to)
            }
            Self::InitializationFailed { epoch, reason, .. } => {
                format!("[epoch {}] initialization failed: {}", epoch, reason)
            }
            Self::ReleaseFailed { epoch, reason, .. } => {
                format!("[epoch {}] release failed: {}", epoch, reason)
            }
            Self::Camera {
                camera_id,
                lens_facing,
                sensor_rotation_degrees,
                ..
            } => format!(
                "camera {} ({}, rotated {}°)",
                camera_id, lens_facing, sensor_rotation_degrees
            ),
            Self::Selection {
                lens_facing,
                available,
                ..
            } => format!(
                "{} camera {}",
                lens_facing,
                if *available { "available" } else { "not available" }
            ),
            Self::UseCaseDefault {
                camera_id,
                kind,
                target_name,
                ..
            } => match target_name {
                Some(name) => format!("camera {} {} default: {}", camera_id, kind, name),
                None => format!("camera {} {} default: none", camera_id, kind),
            },
            Self::Error { message, fatal, .. } => {
                if *fatal {
                    format!("error: {}", message)
                } else {
                    format!("warning: {}", message)
                }
            }
        }
    }
}

/// Writes report events to stdout and keeps a copy of each
#[derive(Debug, Default)]
pub struct Reporter {
    json: bool,
    quiet: bool,
    events: Vec<ReportEvent>,
}

impl Reporter {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            quiet: false,
            events: Vec::new(),
        }
    }

    /// Reporter that only records, for tests
    pub fn silent() -> Self {
        Self {
            json: false,
            quiet: true,
            events: Vec::new(),
        }
    }

    pub fn events(&self) -> &[ReportEvent] {
        &self.events
    }

    pub fn emit(&mut self, event: ReportEvent) {
        if !self.quiet {
            if self.json {
                write_json_line(&event);
            } else {
                println!("{}", event.summary());
            }
        }
        self.events.push(event);
    }
}

fn write_json_line(event: &ReportEvent) {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize report event: {}", e);
            return;
        }
    };

    let mut stdout = io::stdout().lock();
    if let Err(e) = writeln!(stdout, "{}", json) {
        error!("Failed to write report event to stdout: {}", e);
        return;
    }
    if let Err(e) = stdout.flush() {
        error!("Failed to flush report stdout: {}", e);
    }
}
