//! Logging configuration using tracing

use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};

use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{filter, fmt, prelude::*, EnvFilter};

use crate::error::Result;

const LOG_FILENAME: &str = "camrt.log";

/// Minimum level floor on top of `CAMRT_LOG`; 0 means no floor
static MIN_LEVEL: AtomicU8 = AtomicU8::new(0);

/// Initialize the logging subsystem
///
/// Logs are written to `~/.local/share/camera-runtime/logs/`
/// Log level is controlled by `CAMRT_LOG` environment variable. A floor set
/// with [`set_min_level`] applies on top of it.
///
/// # Examples
/// ```bash
/// CAMRT_LOG=debug camrt
/// CAMRT_LOG=camrt_app=trace camrt
/// ```
pub fn init() -> Result<()> {
    let log_dir = get_log_directory();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILENAME);

    // Default to info, allow override via CAMRT_LOG
    let env_filter = EnvFilter::try_from_env("CAMRT_LOG")
        .unwrap_or_else(|_| EnvFilter::new("camera_runtime=info,camrt_app=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(filter::filter_fn(|meta| level_enabled(meta.level())))
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .init();

    tracing::info!("═══════════════════════════════════════════════════════");
    tracing::info!("camera-runtime starting");
    tracing::info!("Log directory: {}", log_dir.display());
    tracing::info!("═══════════════════════════════════════════════════════");

    Ok(())
}

/// Suppress events less severe than `level` until [`reset_min_level`]
pub fn set_min_level(level: Level) {
    MIN_LEVEL.store(encode(Some(level)), Ordering::SeqCst);
}

pub fn reset_min_level() {
    MIN_LEVEL.store(encode(None), Ordering::SeqCst);
}

/// The floor currently in effect, if any
pub fn min_level() -> Option<Level> {
    decode(MIN_LEVEL.load(Ordering::SeqCst))
}

/// Whether an event at `level` passes the floor
pub fn level_enabled(level: &Level) -> bool {
    match min_level() {
        // More verbose levels compare greater
        Some(floor) => *level <= floor,
        None => true,
    }
}

/// Floor encoding: index into this table plus one
const LEVELS: [Level; 5] = [
    Level::TRACE,
    Level::DEBUG,
    Level::INFO,
    Level::WARN,
    Level::ERROR,
];

fn encode(level: Option<Level>) -> u8 {
    level
        .and_then(|level| LEVELS.iter().position(|l| *l == level))
        .map_or(0, |i| i as u8 + 1)
}

fn decode(raw: u8) -> Option<Level> {
    (raw as usize).checked_sub(1).and_then(|i| LEVELS.get(i).copied())
}

fn get_log_directory() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("camera-runtime").join("logs")
}
