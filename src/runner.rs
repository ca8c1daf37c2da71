//! Probe runner - one full configure → initialize → query → shutdown cycle

use std::path::Path;

use tokio::sync::broadcast;

use camrt_app::config::{configuration_record, load_settings, ExecutorKind, Settings, CAMRT_DIR};
use camrt_app::{
    CameraInstance, CameraSelector, LensFacing, Lifecycle, LifecycleEvent, PlatformContext,
    UseCaseKind,
};
use camrt_core::prelude::*;

use crate::report::{ReportEvent, Reporter};

/// Command-line choices that override the settings file
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub executor: Option<ExecutorKind>,
    pub json: bool,
    pub select: Option<LensFacing>,

    /// Write a default `.camrt/config.toml` first if none exists
    pub init_config: bool,
}

/// Binary entry point: logging, settings and a probe of the global runtime
pub async fn run(project_path: &Path, options: RunOptions) -> Result<()> {
    camrt_core::logging::init()?;

    info!("Project: {}", project_path.display());

    if options.init_config {
        camrt_app::config::init_config_dir(project_path)?;
    }

    let mut settings = load_settings(project_path);
    if let Some(executor) = options.executor {
        settings.runtime.executor = executor;
    }

    let mut reporter = Reporter::new(options.json);
    let result = probe(
        camrt_app::holder::global(),
        project_path,
        &settings,
        &options,
        &mut reporter,
    )
    .await;

    if let Err(ref e) = result {
        error!("Probe failed: {:?}", e);
    }
    info!("camera-runtime exiting");
    result
}

/// Drive `lifecycle` through one epoch and report what the runtime exposes
///
/// The lifecycle is always shut down again, also when initialization failed
/// or timed out. The initialization error, if any, is returned afterwards.
pub async fn probe(
    lifecycle: &Lifecycle,
    project_path: &Path,
    settings: &Settings,
    options: &RunOptions,
    reporter: &mut Reporter,
) -> Result<()> {
    let mut events = lifecycle.subscribe();
    let record = configuration_record(settings);
    let context = PlatformContext::new(settings.runtime.application_id.clone())
        .with_data_dir(project_path.join(CAMRT_DIR));

    let handle = match lifecycle.configure_and_initialize(context, record) {
        Ok(handle) => handle,
        Err(e) => {
            reporter.emit(ReportEvent::error(e.to_string(), true));
            return Err(e);
        }
    };

    let init_timeout = settings.runtime.init_timeout();
    let outcome = match tokio::time::timeout(init_timeout, handle.wait_async()).await {
        Ok(outcome) => outcome,
        Err(_) => Err(Error::Timeout {
            operation: "initialization",
            after_ms: settings.runtime.init_timeout_ms,
        }),
    };
    drain_events(&mut events, reporter);

    let result = outcome.and_then(|instance| report_instance(&instance, options, reporter));
    if let Err(ref e) = result {
        reporter.emit(ReportEvent::error(e.to_string(), e.is_fatal()));
    }

    let shutdown_timeout = settings.runtime.shutdown_timeout();
    if tokio::time::timeout(shutdown_timeout, lifecycle.shutdown().wait_async())
        .await
        .is_err()
    {
        warn!("Shutdown did not finish within {:?}", shutdown_timeout);
        reporter.emit(ReportEvent::error(
            Error::Timeout {
                operation: "shutdown",
                after_ms: settings.runtime.shutdown_timeout_ms,
            }
            .to_string(),
            false,
        ));
    }
    drain_events(&mut events, reporter);

    result
}

fn report_instance(
    instance: &CameraInstance,
    options: &RunOptions,
    reporter: &mut Reporter,
) -> Result<()> {
    for camera in instance.cameras()? {
        reporter.emit(ReportEvent::camera(camera));
        let config = instance.default_use_case_config(UseCaseKind::Preview, Some(camera))?;
        reporter.emit(ReportEvent::use_case_default(
            &camera.camera_id,
            UseCaseKind::Preview,
            config.as_ref(),
        ));
    }

    if let Some(facing) = options.select {
        let selector = CameraSelector::new().require_lens_facing(facing);
        reporter.emit(ReportEvent::selection(facing, instance.has_camera(&selector)?));
    }
    Ok(())
}

fn drain_events(events: &mut broadcast::Receiver<LifecycleEvent>, reporter: &mut Reporter) {
    loop {
        match events.try_recv() {
            Ok(event) => reporter.emit(ReportEvent::lifecycle(&event)),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                warn!("Dropped {} lifecycle events", skipped);
            }
            Err(_) => break,
        }
    }
}
