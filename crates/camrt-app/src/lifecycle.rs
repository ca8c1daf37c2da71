//! Lifecycle state machine
//!
//! [`Lifecycle`] owns the configure → initialize → shutdown cycle of the
//! camera runtime. Every check-and-set happens under one mutex; provider
//! resolution and teardown run on an [`Executor`] after the lock is dropped, so
//! a blocking provider never stalls callers asking for the current phase.
//!
//! ```text
//! Unconfigured ──configure──▶ Configured ──initialize──▶ Initializing
//!      ▲                          │                       │        │
//!      │                       shutdown                 ok│        │err
//!      │                          │                       ▼        ▼
//!      ├──────────────────────────┘                    Ready   InitFailed
//!      │                                                  │        │
//!      │◀──── ShuttingDown ◀────────shutdown──────────────┘        │
//!      │◀───────────────────────────shutdown───────────────────────┘
//! ```
//!
//! A shutdown requested while initializing is queued and runs as soon as the
//! in-flight resolution settles. The epoch counter increases by one with
//! every completed shutdown.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use camrt_core::prelude::*;
use camrt_core::{
    default_executor, logging, CameraInfo, CameraSelector, Executor, LifecyclePhase, PlatformContext,
    UseCaseConfig, UseCaseKind,
};
use camrt_device::CameraThreadConfig;

use crate::completion::{Completer, Completion};
use crate::events::{LifecycleEvent, EVENT_CHANNEL_CAPACITY};
use crate::instance::{CameraInstance, InitHandle, InitOutcome};
use crate::record::ConfigurationRecord;
use crate::resolution::{
    resolve_providers, PartialProviders, ResolutionFailure, ResolvedProviders,
};

/// Handle to a camera runtime lifecycle
///
/// Cheap to clone; clones drive the same state machine.
#[derive(Clone)]
pub struct Lifecycle {
    shared: Arc<Shared>,
}

struct Shared {
    inner: Mutex<Inner>,
    events: broadcast::Sender<LifecycleEvent>,
}

#[derive(Debug)]
struct Inner {
    epoch: u64,
    state: State,
}

#[derive(Debug)]
enum State {
    Unconfigured,
    Configured {
        record: ConfigurationRecord,
    },
    Initializing {
        record: ConfigurationRecord,
        init: InitHandle,
        pending_shutdown: Option<Completer<()>>,
    },
    Ready {
        record: ConfigurationRecord,
        instance: Arc<CameraInstance>,
        init: InitHandle,
    },
    InitFailed {
        record: ConfigurationRecord,
        init: InitHandle,
        partial: PartialProviders,
    },
    ShuttingDown {
        shutdown: Completion<()>,
    },
}

impl State {
    fn phase(&self) -> LifecyclePhase {
        match self {
            State::Unconfigured => LifecyclePhase::Unconfigured,
            State::Configured { .. } => LifecyclePhase::Configured,
            State::Initializing { .. } => LifecyclePhase::Initializing,
            State::Ready { .. } => LifecyclePhase::Ready,
            State::InitFailed { .. } => LifecyclePhase::InitFailed,
            State::ShuttingDown { .. } => LifecyclePhase::ShuttingDown,
        }
    }
}

/// Initialization scheduled under the lock, started after it is released
struct PendingInit {
    epoch: u64,
    record: ConfigurationRecord,
    context: PlatformContext,
    completer: Completer<InitOutcome>,
}

/// What a teardown has to release
enum Resources {
    Instance(Arc<CameraInstance>),
    Partial(PartialProviders),
}

impl Lifecycle {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    epoch: 0,
                    state: State::Unconfigured,
                }),
                events,
            }),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────────────────

    /// Install a configuration record
    ///
    /// Only allowed while unconfigured. Performs no I/O; an empty record is
    /// accepted here and fails later at initialization.
    pub fn configure(&self, record: ConfigurationRecord) -> Result<()> {
        let mut inner = self.shared.inner.lock();
        self.install(&mut inner, record)
    }

    /// Start provider resolution, or join the attempt already made this epoch
    pub fn initialize(&self, context: PlatformContext) -> Result<InitHandle> {
        let (handle, pending) = {
            let mut inner = self.shared.inner.lock();
            self.begin_initialize(&mut inner, context)?
        };
        if let Some(pending) = pending {
            self.spawn_initialization(pending);
        }
        Ok(handle)
    }

    /// Handle resolving to the camera instance, initializing if needed
    pub fn get_or_create_instance(&self, context: PlatformContext) -> Result<InitHandle> {
        self.initialize(context)
    }

    /// Configure and initialize in one step
    ///
    /// Both checks happen under a single lock acquisition, so no other caller
    /// can shut down between them.
    pub fn configure_and_initialize(
        &self,
        context: PlatformContext,
        record: ConfigurationRecord,
    ) -> Result<InitHandle> {
        let (handle, pending) = {
            let mut inner = self.shared.inner.lock();
            self.install(&mut inner, record)?;
            self.begin_initialize(&mut inner, context)?
        };
        if let Some(pending) = pending {
            self.spawn_initialization(pending);
        }
        Ok(handle)
    }

    /// Tear the runtime down and return to `Unconfigured`
    ///
    /// Never fails and may be called from any phase. Concurrent callers get
    /// handles to the same teardown.
    pub fn shutdown(&self) -> Completion<()> {
        let mut inner = self.shared.inner.lock();
        let epoch = inner.epoch;

        match std::mem::replace(&mut inner.state, State::Unconfigured) {
            State::Unconfigured => Completion::completed(epoch, ()),
            State::Configured { .. } => {
                inner.epoch += 1;
                self.transition(epoch, LifecyclePhase::Configured, LifecyclePhase::Unconfigured);
                Completion::completed(epoch, ())
            }
            State::InitFailed {
                record, partial, ..
            } => {
                inner.epoch += 1;
                self.transition(epoch, LifecyclePhase::InitFailed, LifecyclePhase::Unconfigured);
                drop(inner);
                self.release(epoch, Resources::Partial(partial));
                restore_log_level(&record);
                Completion::completed(epoch, ())
            }
            State::Initializing {
                record,
                init,
                pending_shutdown,
            } => {
                let completer = pending_shutdown.unwrap_or_else(|| {
                    debug!(epoch, "Shutdown queued behind in-flight initialization");
                    Completion::pair(epoch).0
                });
                let handle = completer.handle();
                inner.state = State::Initializing {
                    record,
                    init,
                    pending_shutdown: Some(completer),
                };
                handle
            }
            State::Ready {
                record, instance, ..
            } => {
                let (completer, handle) = Completion::pair(epoch);
                inner.state = State::ShuttingDown {
                    shutdown: handle.clone(),
                };
                self.transition(epoch, LifecyclePhase::Ready, LifecyclePhase::ShuttingDown);
                drop(inner);

                let executor = executor_for(&record);
                let lifecycle = self.clone();
                executor.execute(Box::new(move || {
                    lifecycle.release(epoch, Resources::Instance(instance));
                    restore_log_level(&record);
                    lifecycle.finish_shutdown(epoch, completer);
                }));
                handle
            }
            State::ShuttingDown { shutdown } => {
                inner.state = State::ShuttingDown {
                    shutdown: shutdown.clone(),
                };
                shutdown
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────

    pub fn phase(&self) -> LifecyclePhase {
        self.shared.inner.lock().state.phase()
    }

    /// Number of completed shutdowns
    pub fn epoch(&self) -> u64 {
        self.shared.inner.lock().epoch
    }

    pub fn is_initialized(&self) -> bool {
        self.phase() == LifecyclePhase::Ready
    }

    /// Receive lifecycle events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.shared.events.subscribe()
    }

    /// The initialized instance; `NotInitialized` outside `Ready`
    pub fn instance(&self) -> Result<Arc<CameraInstance>> {
        match &self.shared.inner.lock().state {
            State::Ready { instance, .. } => Ok(Arc::clone(instance)),
            _ => Err(Error::NotInitialized),
        }
    }

    pub fn context(&self) -> Result<PlatformContext> {
        Ok(self.instance()?.context().clone())
    }

    pub fn camera_info(&self, camera_id: &str) -> Result<CameraInfo> {
        self.instance()?.camera_info(camera_id)
    }

    pub fn has_camera(&self, selector: &CameraSelector) -> Result<bool> {
        self.instance()?.has_camera(selector)
    }

    pub fn default_use_case_config(
        &self,
        kind: UseCaseKind,
        camera: Option<&CameraInfo>,
    ) -> Result<Option<UseCaseConfig>> {
        self.instance()?.default_use_case_config(kind, camera)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    fn install(&self, inner: &mut Inner, record: ConfigurationRecord) -> Result<()> {
        if !matches!(inner.state, State::Unconfigured) {
            return Err(Error::AlreadyConfigured);
        }
        if record.is_empty() {
            warn!("Configured without a camera factory provider; initialization will fail");
        }
        inner.state = State::Configured { record };
        self.transition(
            inner.epoch,
            LifecyclePhase::Unconfigured,
            LifecyclePhase::Configured,
        );
        Ok(())
    }

    fn begin_initialize(
        &self,
        inner: &mut Inner,
        context: PlatformContext,
    ) -> Result<(InitHandle, Option<PendingInit>)> {
        let record = match &inner.state {
            State::Unconfigured | State::ShuttingDown { .. } => return Err(Error::NotConfigured),
            State::Initializing { init, .. }
            | State::Ready { init, .. }
            | State::InitFailed { init, .. } => return Ok((init.clone(), None)),
            State::Configured { record } => record.clone(),
        };

        let epoch = inner.epoch;
        let (completer, completion) = Completion::pair(epoch);
        let init = InitHandle::new(completion);
        inner.state = State::Initializing {
            record: record.clone(),
            init: init.clone(),
            pending_shutdown: None,
        };
        self.transition(epoch, LifecyclePhase::Configured, LifecyclePhase::Initializing);

        Ok((
            init,
            Some(PendingInit {
                epoch,
                record,
                context,
                completer,
            }),
        ))
    }

    fn spawn_initialization(&self, pending: PendingInit) {
        if let Some(level) = pending.record.min_log_level() {
            logging::set_min_level(level);
        }
        let executor = executor_for(&pending.record);
        info!(
            epoch = pending.epoch,
            executor = executor.name(),
            "Initializing camera runtime"
        );

        let threads = CameraThreadConfig::new(Arc::clone(&executor));
        let lifecycle = self.clone();
        executor.execute(Box::new(move || {
            let PendingInit {
                epoch,
                record,
                context,
                completer,
            } = pending;
            let outcome = resolve_providers(&record, &context, &threads);
            lifecycle.finish_initialization(epoch, context, completer, outcome);
        }));
    }

    fn finish_initialization(
        &self,
        epoch: u64,
        context: PlatformContext,
        completer: Completer<InitOutcome>,
        outcome: std::result::Result<ResolvedProviders, ResolutionFailure>,
    ) {
        let mut inner = self.shared.inner.lock();

        let (record, init, pending_shutdown) =
            match std::mem::replace(&mut inner.state, State::Unconfigured) {
                State::Initializing {
                    record,
                    init,
                    pending_shutdown,
                } if inner.epoch == epoch => (record, init, pending_shutdown),
                other => {
                    inner.state = other;
                    drop(inner);
                    warn!(epoch, "Discarding initialization result of a finished epoch");
                    let resources = match outcome {
                        Ok(providers) => Resources::Instance(Arc::new(CameraInstance::new(
                            epoch, context, providers,
                        ))),
                        Err(failure) => Resources::Partial(failure.partial),
                    };
                    self.release(epoch, resources);
                    completer.complete(Err(Arc::new(Error::NotConfigured)));
                    return;
                }
            };

        let (value, teardown) = match outcome {
            Ok(providers) => {
                let instance = Arc::new(CameraInstance::new(epoch, context, providers));
                let value: InitOutcome = Ok(Arc::clone(&instance));
                match pending_shutdown {
                    None => {
                        inner.state = State::Ready {
                            record,
                            instance,
                            init,
                        };
                        self.transition(epoch, LifecyclePhase::Initializing, LifecyclePhase::Ready);
                        info!(epoch, "Camera runtime ready");
                        (value, None)
                    }
                    Some(shutdown) => {
                        inner.state = State::ShuttingDown {
                            shutdown: shutdown.handle(),
                        };
                        self.transition(
                            epoch,
                            LifecyclePhase::Initializing,
                            LifecyclePhase::ShuttingDown,
                        );
                        (
                            value,
                            Some((record, Resources::Instance(instance), shutdown)),
                        )
                    }
                }
            }
            Err(failure) => {
                let cause = Arc::new(failure.cause);
                error!(epoch, error = %cause, "Camera runtime initialization failed");
                self.emit(LifecycleEvent::InitializationFailed {
                    epoch,
                    reason: cause.to_string(),
                });
                let value: InitOutcome = Err(cause);
                match pending_shutdown {
                    None => {
                        inner.state = State::InitFailed {
                            record,
                            init,
                            partial: failure.partial,
                        };
                        self.transition(
                            epoch,
                            LifecyclePhase::Initializing,
                            LifecyclePhase::InitFailed,
                        );
                        (value, None)
                    }
                    Some(shutdown) => {
                        inner.state = State::ShuttingDown {
                            shutdown: shutdown.handle(),
                        };
                        self.transition(
                            epoch,
                            LifecyclePhase::Initializing,
                            LifecyclePhase::ShuttingDown,
                        );
                        (
                            value,
                            Some((record, Resources::Partial(failure.partial), shutdown)),
                        )
                    }
                }
            }
        };
        drop(inner);

        // Initialization settles before a queued shutdown starts releasing
        completer.complete(value);
        if let Some((record, resources, shutdown)) = teardown {
            self.release(epoch, resources);
            restore_log_level(&record);
            self.finish_shutdown(epoch, shutdown);
        }
    }

    fn finish_shutdown(&self, epoch: u64, completer: Completer<()>) {
        {
            let mut inner = self.shared.inner.lock();
            if inner.epoch == epoch && matches!(inner.state, State::ShuttingDown { .. }) {
                inner.epoch += 1;
                inner.state = State::Unconfigured;
                self.transition(
                    epoch,
                    LifecyclePhase::ShuttingDown,
                    LifecyclePhase::Unconfigured,
                );
            }
        }
        info!(epoch, "Camera runtime shut down");
        completer.complete(());
    }

    /// Best-effort release; failures are logged and broadcast, never raised
    fn release(&self, epoch: u64, resources: Resources) {
        let errors = match resources {
            Resources::Instance(instance) => instance.release(),
            Resources::Partial(partial) => partial.release(),
        };
        for e in errors {
            self.emit(LifecycleEvent::ReleaseFailed {
                epoch,
                reason: e.to_string(),
            });
        }
    }

    fn transition(&self, epoch: u64, from: LifecyclePhase, to: LifecyclePhase) {
        debug!(epoch, %from, %to, "Lifecycle transition");
        self.emit(LifecycleEvent::PhaseChanged { epoch, from, to });
    }

    fn emit(&self, event: LifecycleEvent) {
        // No subscribers is fine
        let _ = self.shared.events.send(event);
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("Lifecycle")
            .field("epoch", &inner.epoch)
            .field("phase", &inner.state.phase())
            .finish()
    }
}

fn executor_for(record: &ConfigurationRecord) -> Arc<dyn Executor> {
    record.executor().cloned().unwrap_or_else(default_executor)
}

fn restore_log_level(record: &ConfigurationRecord) {
    if record.min_log_level().is_some() {
        logging::reset_min_level();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use camrt_core::{DirectExecutor, LensFacing, ThreadExecutor, TokioExecutor};
    use camrt_device::test_utils::{
        FakeCameraFactory, FakeSurfaceManager, FakeUseCaseConfigFactory, Gate,
    };
    use camrt_device::{CameraFactory, DeviceSurfaceManager, UseCaseConfigFactory};
    use serial_test::serial;
    use tracing::Level;

    const WAIT: Duration = Duration::from_secs(5);

    fn context() -> PlatformContext {
        PlatformContext::new("lifecycle-test")
    }

    fn record(factory: Arc<FakeCameraFactory>, executor: Arc<dyn Executor>) -> ConfigurationRecord {
        ConfigurationRecord::builder()
            .camera_factory_provider(move |_, _| Ok(factory.clone() as Arc<dyn CameraFactory>))
            .executor(executor)
            .build()
    }

    fn direct_record() -> ConfigurationRecord {
        record(
            Arc::new(FakeCameraFactory::with_back_camera()),
            Arc::new(DirectExecutor),
        )
    }

    /// Record whose factory provider blocks on `gate`
    fn gated_record(gate: Arc<Gate>, factory: Arc<FakeCameraFactory>) -> ConfigurationRecord {
        ConfigurationRecord::builder()
            .camera_factory_provider(move |_, _| {
                gate.wait();
                Ok(factory.clone() as Arc<dyn CameraFactory>)
            })
            .executor(Arc::new(ThreadExecutor::new("lifecycle-test")))
            .build()
    }

    fn drain(rx: &mut broadcast::Receiver<LifecycleEvent>) -> Vec<LifecycleEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    // ─────────────────────────────────────────────────────────
    // configure
    // ─────────────────────────────────────────────────────────

    #[test]
    fn test_configure_from_unconfigured() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.phase(), LifecyclePhase::Unconfigured);

        lifecycle.configure(direct_record()).unwrap();
        assert_eq!(lifecycle.phase(), LifecyclePhase::Configured);
        assert!(!lifecycle.is_initialized());
    }

    #[test]
    fn test_configure_twice_fails() {
        let lifecycle = Lifecycle::new();
        lifecycle.configure(direct_record()).unwrap();

        let err = lifecycle.configure(direct_record()).unwrap_err();
        assert!(matches!(err, Error::AlreadyConfigured));
        assert_eq!(lifecycle.phase(), LifecyclePhase::Configured);
    }

    #[test]
    fn test_configure_rejected_while_ready() {
        let lifecycle = Lifecycle::new();
        lifecycle.configure(direct_record()).unwrap();
        lifecycle.initialize(context()).unwrap().wait().unwrap();

        assert!(matches!(
            lifecycle.configure(direct_record()),
            Err(Error::AlreadyConfigured)
        ));
    }

    #[test]
    fn test_configure_after_shutdown() {
        let lifecycle = Lifecycle::new();
        lifecycle.configure(direct_record()).unwrap();
        lifecycle.shutdown().wait();

        assert!(lifecycle.configure(direct_record()).is_ok());
    }

    // ─────────────────────────────────────────────────────────
    // initialize
    // ─────────────────────────────────────────────────────────

    #[test]
    fn test_initialize_without_configure_fails() {
        let lifecycle = Lifecycle::new();
        let err = lifecycle.initialize(context()).unwrap_err();
        assert!(matches!(err, Error::NotConfigured));

        let err = lifecycle.get_or_create_instance(context()).unwrap_err();
        assert!(matches!(err, Error::NotConfigured));
    }

    #[test]
    fn test_initialize_direct_reaches_ready() {
        let lifecycle = Lifecycle::new();
        lifecycle.configure(direct_record()).unwrap();

        let handle = lifecycle.initialize(context()).unwrap();
        // Direct executor: already settled when initialize returns
        assert!(handle.is_complete());
        assert!(lifecycle.is_initialized());

        let instance = handle.wait().unwrap();
        assert_eq!(instance.epoch(), 0);
        assert_eq!(instance.context().application_id, "lifecycle-test");
    }

    #[test]
    fn test_initialize_returns_same_handle() {
        let lifecycle = Lifecycle::new();
        lifecycle.configure(direct_record()).unwrap();

        let first = lifecycle.initialize(context()).unwrap();
        let second = lifecycle.initialize(context()).unwrap();
        let third = lifecycle.get_or_create_instance(context()).unwrap();

        assert!(first.same_as(&second));
        assert!(first.same_as(&third));
        assert!(Arc::ptr_eq(&first.wait().unwrap(), &third.wait().unwrap()));
    }

    #[test]
    fn test_concurrent_initialize_converges_on_one_attempt() {
        let lifecycle = Lifecycle::new();
        let gate = Gate::new();
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let provider_gate = Arc::clone(&gate);
        let provider_calls = Arc::clone(&calls);
        let record = ConfigurationRecord::builder()
            .camera_factory_provider(move |_, _| {
                provider_calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                provider_gate.wait();
                Ok(Arc::new(FakeCameraFactory::with_back_camera()) as Arc<dyn CameraFactory>)
            })
            .executor(Arc::new(ThreadExecutor::default()))
            .build();
        lifecycle.configure(record).unwrap();

        let callers: Vec<_> = (0..4)
            .map(|_| {
                let lifecycle = lifecycle.clone();
                std::thread::spawn(move || lifecycle.initialize(context()).unwrap())
            })
            .collect();
        let handles: Vec<InitHandle> = callers.into_iter().map(|t| t.join().unwrap()).collect();

        assert!(gate.wait_for_waiter(WAIT));
        gate.open();
        for handle in &handles {
            assert!(handle.same_as(&handles[0]));
            assert!(handle.wait_timeout(WAIT).unwrap().is_ok());
        }
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_init_does_not_retry_or_need_reconfigure() {
        let lifecycle = Lifecycle::new();
        let empty = ConfigurationRecord::builder()
            .executor(Arc::new(DirectExecutor))
            .build();
        lifecycle.configure(empty).unwrap();

        let handle = lifecycle.initialize(context()).unwrap();
        let err = handle.wait().unwrap_err();
        assert!(matches!(
            err.initialization_cause(),
            Some(Error::MissingProvider { .. })
        ));
        assert_eq!(lifecycle.phase(), LifecyclePhase::InitFailed);

        // The failed attempt is returned again instead of retried
        let again = lifecycle.initialize(context()).unwrap();
        assert!(again.same_as(&handle));
        assert!(matches!(
            lifecycle.configure(direct_record()),
            Err(Error::AlreadyConfigured)
        ));

        // Shutdown is the way out
        lifecycle.shutdown().wait();
        lifecycle.configure(direct_record()).unwrap();
        assert!(lifecycle.initialize(context()).unwrap().wait().is_ok());
    }

    #[test]
    fn test_provider_panic_becomes_initialization_error() {
        let lifecycle = Lifecycle::new();
        let record = ConfigurationRecord::builder()
            .camera_factory_provider(|_, _| panic!("camera HAL exploded"))
            .executor(Arc::new(ThreadExecutor::default()))
            .build();
        lifecycle.configure(record).unwrap();

        let err = lifecycle
            .initialize(context())
            .unwrap()
            .wait_timeout(WAIT)
            .unwrap()
            .unwrap_err();
        assert!(err.to_string().contains("camera HAL exploded"));
        assert_eq!(lifecycle.phase(), LifecyclePhase::InitFailed);
    }

    #[test]
    fn test_direct_and_thread_executors_agree() {
        for executor in [
            Arc::new(DirectExecutor) as Arc<dyn Executor>,
            Arc::new(ThreadExecutor::default()) as Arc<dyn Executor>,
        ] {
            let lifecycle = Lifecycle::new();
            let mut rx = lifecycle.subscribe();
            lifecycle
                .configure(record(
                    Arc::new(FakeCameraFactory::with_back_camera()),
                    executor,
                ))
                .unwrap();
            lifecycle
                .initialize(context())
                .unwrap()
                .wait_timeout(WAIT)
                .unwrap()
                .unwrap();
            lifecycle.shutdown().wait_timeout(WAIT).unwrap();

            let phases: Vec<_> = drain(&mut rx)
                .into_iter()
                .filter_map(|e| match e {
                    LifecycleEvent::PhaseChanged { to, .. } => Some(to),
                    _ => None,
                })
                .collect();
            assert_eq!(
                phases,
                vec![
                    LifecyclePhase::Configured,
                    LifecyclePhase::Initializing,
                    LifecyclePhase::Ready,
                    LifecyclePhase::ShuttingDown,
                    LifecyclePhase::Unconfigured,
                ]
            );
            assert_eq!(lifecycle.epoch(), 1);
        }
    }

    // ─────────────────────────────────────────────────────────
    // shutdown
    // ─────────────────────────────────────────────────────────

    #[test]
    fn test_shutdown_when_unconfigured_is_noop() {
        let lifecycle = Lifecycle::new();
        let handle = lifecycle.shutdown();
        assert!(handle.is_complete());
        assert_eq!(lifecycle.epoch(), 0);
        assert_eq!(lifecycle.phase(), LifecyclePhase::Unconfigured);
    }

    #[test]
    fn test_shutdown_from_configured_completes_immediately() {
        let lifecycle = Lifecycle::new();
        lifecycle.configure(direct_record()).unwrap();

        let handle = lifecycle.shutdown();
        assert!(handle.is_complete());
        assert_eq!(handle.epoch(), 0);
        assert_eq!(lifecycle.epoch(), 1);
        assert_eq!(lifecycle.phase(), LifecyclePhase::Unconfigured);
    }

    #[test]
    fn test_shutdown_releases_providers_once() {
        let lifecycle = Lifecycle::new();
        let factory = Arc::new(FakeCameraFactory::with_back_camera());
        let surfaces = Arc::new(FakeSurfaceManager::default());
        let use_cases = Arc::new(FakeUseCaseConfigFactory::new());

        let (f, s, u) = (factory.clone(), surfaces.clone(), use_cases.clone());
        let record = ConfigurationRecord::builder()
            .camera_factory_provider(move |_, _| Ok(f.clone() as Arc<dyn CameraFactory>))
            .surface_manager_provider(move |_| Ok(s.clone() as Arc<dyn DeviceSurfaceManager>))
            .use_case_config_factory_provider(move |_| {
                Ok(u.clone() as Arc<dyn UseCaseConfigFactory>)
            })
            .executor(Arc::new(ThreadExecutor::default()))
            .build();
        lifecycle.configure(record).unwrap();
        let instance = lifecycle
            .initialize(context())
            .unwrap()
            .wait_timeout(WAIT)
            .unwrap()
            .unwrap();

        let first = lifecycle.shutdown();
        let second = lifecycle.shutdown();
        first.wait_timeout(WAIT).unwrap();
        second.wait_timeout(WAIT).unwrap();

        assert_eq!(factory.release_count(), 1);
        assert_eq!(surfaces.release_count(), 1);
        assert_eq!(use_cases.release_count(), 1);
        assert!(instance.is_released());
        assert!(matches!(instance.camera_info("0"), Err(Error::NotInitialized)));
    }

    #[test]
    fn test_concurrent_shutdown_shares_handle() {
        let lifecycle = Lifecycle::new();
        let gate = Gate::new();
        let factory = Arc::new(FakeCameraFactory::with_back_camera());
        lifecycle
            .configure(gated_record(Arc::clone(&gate), factory))
            .unwrap();
        let init = lifecycle.initialize(context()).unwrap();

        let first = lifecycle.shutdown();
        let second = lifecycle.shutdown();
        assert!(first.same_as(&second));

        gate.open();
        init.wait_timeout(WAIT).unwrap().unwrap();
        first.wait_timeout(WAIT).unwrap();
        assert!(second.is_complete());
    }

    #[test]
    fn test_shutdown_during_initialization_is_deferred() {
        let lifecycle = Lifecycle::new();
        let gate = Gate::new();
        let factory = Arc::new(FakeCameraFactory::with_back_camera());
        lifecycle
            .configure(gated_record(Arc::clone(&gate), Arc::clone(&factory)))
            .unwrap();

        let init = lifecycle.initialize(context()).unwrap();
        assert!(gate.wait_for_waiter(WAIT));
        assert_eq!(lifecycle.phase(), LifecyclePhase::Initializing);

        let shutdown = lifecycle.shutdown();
        assert!(!shutdown.is_complete());
        assert_eq!(lifecycle.phase(), LifecyclePhase::Initializing);
        assert!(matches!(
            lifecycle.configure(direct_record()),
            Err(Error::AlreadyConfigured)
        ));

        gate.open();
        // Initialization settles first, then the queued teardown releases it
        assert!(init.wait_timeout(WAIT).unwrap().is_ok());
        shutdown.wait_timeout(WAIT).unwrap();

        assert_eq!(factory.release_count(), 1);
        assert_eq!(lifecycle.phase(), LifecyclePhase::Unconfigured);
        assert_eq!(lifecycle.epoch(), 1);
    }

    #[test]
    fn test_deferred_shutdown_releases_partial_providers() {
        let lifecycle = Lifecycle::new();
        let gate = Gate::new();
        let factory = Arc::new(FakeCameraFactory::with_back_camera());

        let provided = Arc::clone(&factory);
        let surface_gate = Arc::clone(&gate);
        let record = ConfigurationRecord::builder()
            .camera_factory_provider(move |_, _| Ok(provided.clone() as Arc<dyn CameraFactory>))
            .surface_manager_provider(move |_| {
                surface_gate.wait();
                Err(Error::provider("surface manager", "device busy"))
            })
            .executor(Arc::new(ThreadExecutor::default()))
            .build();
        lifecycle.configure(record).unwrap();

        let init = lifecycle.initialize(context()).unwrap();
        assert!(gate.wait_for_waiter(WAIT));
        let shutdown = lifecycle.shutdown();
        gate.open();

        assert!(init.wait_timeout(WAIT).unwrap().is_err());
        shutdown.wait_timeout(WAIT).unwrap();
        assert_eq!(factory.release_count(), 1);
        assert_eq!(lifecycle.phase(), LifecyclePhase::Unconfigured);
    }

    #[test]
    fn test_shutdown_from_init_failed_releases_partial_once() {
        let lifecycle = Lifecycle::new();
        let factory = Arc::new(FakeCameraFactory::with_back_camera());
        let provided = Arc::clone(&factory);
        let record = ConfigurationRecord::builder()
            .camera_factory_provider(move |_, _| Ok(provided.clone() as Arc<dyn CameraFactory>))
            .use_case_config_factory_provider(|_| {
                Err(Error::provider("use case config factory", "unsupported"))
            })
            .executor(Arc::new(DirectExecutor))
            .build();
        lifecycle.configure(record).unwrap();
        assert!(lifecycle.initialize(context()).unwrap().wait().is_err());
        assert_eq!(factory.release_count(), 0);

        let handle = lifecycle.shutdown();
        assert!(handle.is_complete());
        assert_eq!(factory.release_count(), 1);

        lifecycle.shutdown().wait();
        assert_eq!(factory.release_count(), 1);
    }

    #[test]
    fn test_release_failure_does_not_fail_shutdown() {
        let lifecycle = Lifecycle::new();
        let mut rx = lifecycle.subscribe();
        let factory = Arc::new(FakeCameraFactory::with_back_camera());
        factory.fail_on_release();
        lifecycle
            .configure(record(factory, Arc::new(DirectExecutor)))
            .unwrap();
        lifecycle.initialize(context()).unwrap().wait().unwrap();

        lifecycle.shutdown().wait();
        assert_eq!(lifecycle.phase(), LifecyclePhase::Unconfigured);
        assert!(drain(&mut rx)
            .iter()
            .any(|e| matches!(e, LifecycleEvent::ReleaseFailed { .. })));
    }

    #[test]
    fn test_initialize_while_shutting_down_fails() {
        let lifecycle = Lifecycle::new();
        let gate = Gate::new();
        let factory = Arc::new(FakeCameraFactory::with_back_camera());
        lifecycle
            .configure(gated_record(Arc::clone(&gate), factory))
            .unwrap();
        let init = lifecycle.initialize(context()).unwrap();
        let shutdown = lifecycle.shutdown();
        gate.open();
        init.wait_timeout(WAIT).unwrap().unwrap();
        shutdown.wait_timeout(WAIT).unwrap();

        assert!(matches!(
            lifecycle.initialize(context()),
            Err(Error::NotConfigured)
        ));
    }

    #[test]
    fn test_configure_rejected_until_background_release_finishes() {
        let lifecycle = Lifecycle::new();
        let gate = Gate::new();
        let surfaces = Arc::new(FakeSurfaceManager::default());
        surfaces.hold_release(Arc::clone(&gate));

        let provided = Arc::clone(&surfaces);
        let record = ConfigurationRecord::builder()
            .camera_factory_provider(|_, _| {
                Ok(Arc::new(FakeCameraFactory::with_back_camera()) as Arc<dyn CameraFactory>)
            })
            .surface_manager_provider(move |_| {
                Ok(provided.clone() as Arc<dyn DeviceSurfaceManager>)
            })
            .executor(Arc::new(ThreadExecutor::default()))
            .build();
        lifecycle.configure(record).unwrap();
        lifecycle
            .initialize(context())
            .unwrap()
            .wait_timeout(WAIT)
            .unwrap()
            .unwrap();

        let shutdown = lifecycle.shutdown();
        assert!(gate.wait_for_waiter(WAIT));
        assert_eq!(lifecycle.phase(), LifecyclePhase::ShuttingDown);
        assert!(!lifecycle.is_initialized());
        assert!(matches!(lifecycle.camera_info("0"), Err(Error::NotInitialized)));

        let racer = lifecycle.clone();
        let attempt = std::thread::spawn(move || racer.configure(direct_record()));
        assert!(matches!(
            attempt.join().unwrap(),
            Err(Error::AlreadyConfigured)
        ));

        gate.open();
        shutdown.wait_timeout(WAIT).unwrap();
        assert_eq!(surfaces.release_count(), 1);
        assert!(lifecycle.configure(direct_record()).is_ok());
    }

    #[test]
    fn test_panicking_observer_does_not_stall_deferred_shutdown() {
        let lifecycle = Lifecycle::new();
        let gate = Gate::new();
        let factory = Arc::new(FakeCameraFactory::with_back_camera());
        lifecycle
            .configure(gated_record(Arc::clone(&gate), Arc::clone(&factory)))
            .unwrap();

        let init = lifecycle.initialize(context()).unwrap();
        init.on_complete(|_| panic!("observer bug"));
        assert!(gate.wait_for_waiter(WAIT));
        let shutdown = lifecycle.shutdown();
        gate.open();

        shutdown.wait_timeout(WAIT).unwrap();
        assert!(init.wait_timeout(WAIT).unwrap().is_ok());
        assert_eq!(factory.release_count(), 1);
        assert_eq!(lifecycle.phase(), LifecyclePhase::Unconfigured);
        assert!(lifecycle.configure(direct_record()).is_ok());
    }

    #[test]
    fn test_executor_of_stopped_runtime_still_settles() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let executor = Arc::new(TokioExecutor::new(runtime.handle().clone()));
        drop(runtime);

        let lifecycle = Lifecycle::new();
        let factory = Arc::new(FakeCameraFactory::with_back_camera());
        lifecycle
            .configure(record(Arc::clone(&factory), executor))
            .unwrap();

        let init = lifecycle.initialize(context()).unwrap();
        assert!(init.wait_timeout(WAIT).unwrap().is_ok());
        lifecycle.shutdown().wait_timeout(WAIT).unwrap();

        assert_eq!(factory.release_count(), 1);
        assert_eq!(lifecycle.phase(), LifecyclePhase::Unconfigured);
        assert_eq!(lifecycle.epoch(), 1);
    }

    // ─────────────────────────────────────────────────────────
    // epochs
    // ─────────────────────────────────────────────────────────

    #[test]
    fn test_reconfigure_uses_new_factory() {
        let lifecycle = Lifecycle::new();
        let factory_a = Arc::new(FakeCameraFactory::with_back_camera());
        let factory_b = Arc::new(FakeCameraFactory::new());
        factory_b.insert_camera(LensFacing::Front, "7");

        lifecycle
            .configure(record(Arc::clone(&factory_a), Arc::new(DirectExecutor)))
            .unwrap();
        let a = lifecycle.initialize(context()).unwrap().wait().unwrap();
        assert!(lifecycle.camera_info("0").is_ok());

        lifecycle.shutdown().wait();
        lifecycle
            .configure(record(Arc::clone(&factory_b), Arc::new(DirectExecutor)))
            .unwrap();
        let b = lifecycle.initialize(context()).unwrap().wait().unwrap();

        assert_eq!(a.epoch(), 0);
        assert_eq!(b.epoch(), 1);
        assert!(lifecycle.camera_info("7").is_ok());
        assert!(matches!(
            lifecycle.camera_info("0"),
            Err(Error::InvalidArgument { .. })
        ));
        assert_eq!(factory_a.release_count(), 1);
        assert_eq!(factory_b.release_count(), 0);
    }

    #[test]
    fn test_handles_carry_epoch() {
        let lifecycle = Lifecycle::new();
        lifecycle.configure(direct_record()).unwrap();
        let first = lifecycle.initialize(context()).unwrap();
        lifecycle.shutdown().wait();

        lifecycle.configure(direct_record()).unwrap();
        let second = lifecycle.initialize(context()).unwrap();
        assert_eq!(first.epoch(), 0);
        assert_eq!(second.epoch(), 1);
        assert!(!first.same_as(&second));
    }

    /// Lifecycle in `Ready` for epoch 1, after one full configure/shutdown
    fn ready_in_second_epoch() -> (Lifecycle, Arc<CameraInstance>) {
        let lifecycle = Lifecycle::new();
        lifecycle.configure(direct_record()).unwrap();
        lifecycle.shutdown().wait();
        lifecycle.configure(direct_record()).unwrap();
        let instance = lifecycle.initialize(context()).unwrap().wait().unwrap();
        assert_eq!(instance.epoch(), 1);
        (lifecycle, instance)
    }

    #[test]
    fn test_late_initialization_from_previous_epoch_is_discarded() {
        let (lifecycle, current) = ready_in_second_epoch();

        let stale_factory = Arc::new(FakeCameraFactory::with_back_camera());
        let providers = resolve_providers(
            &record(Arc::clone(&stale_factory), Arc::new(DirectExecutor)),
            &context(),
            &CameraThreadConfig::new(Arc::new(DirectExecutor)),
        )
        .unwrap();
        let (completer, stale) = Completion::<InitOutcome>::pair(0);
        let stale = InitHandle::new(stale);

        lifecycle.finish_initialization(0, context(), completer, Ok(providers));

        let err = stale.wait().unwrap_err();
        assert!(matches!(
            err.initialization_cause(),
            Some(Error::NotConfigured)
        ));
        assert_eq!(stale_factory.release_count(), 1);
        assert_eq!(lifecycle.phase(), LifecyclePhase::Ready);
        assert!(Arc::ptr_eq(&lifecycle.instance().unwrap(), &current));
        assert!(!current.is_released());
    }

    #[test]
    fn test_late_shutdown_from_previous_epoch_is_ignored() {
        let (lifecycle, current) = ready_in_second_epoch();

        let (completer, stale) = Completion::pair(0);
        lifecycle.finish_shutdown(0, completer);

        assert!(stale.is_complete());
        assert_eq!(lifecycle.phase(), LifecyclePhase::Ready);
        assert_eq!(lifecycle.epoch(), 1);
        assert!(!current.is_released());
    }

    // ─────────────────────────────────────────────────────────
    // log level
    // ─────────────────────────────────────────────────────────

    #[test]
    #[serial]
    fn test_min_log_level_holds_for_the_initialized_epoch() {
        let lifecycle = Lifecycle::new();
        let record = ConfigurationRecord::builder()
            .camera_factory_provider(|_, _| {
                Ok(Arc::new(FakeCameraFactory::with_back_camera()) as Arc<dyn CameraFactory>)
            })
            .min_log_level(Level::WARN)
            .executor(Arc::new(DirectExecutor))
            .build();
        lifecycle.configure(record).unwrap();
        assert_eq!(logging::min_level(), None);

        lifecycle.initialize(context()).unwrap().wait().unwrap();
        assert_eq!(logging::min_level(), Some(Level::WARN));

        lifecycle.shutdown().wait();
        assert_eq!(logging::min_level(), None);
    }

    #[test]
    #[serial]
    fn test_min_log_level_cleared_after_failed_epoch() {
        let lifecycle = Lifecycle::new();
        let record = ConfigurationRecord::builder()
            .min_log_level(Level::ERROR)
            .executor(Arc::new(DirectExecutor))
            .build();
        lifecycle.configure(record).unwrap();

        assert!(lifecycle.initialize(context()).unwrap().wait().is_err());
        assert_eq!(logging::min_level(), Some(Level::ERROR));

        lifecycle.shutdown().wait();
        assert_eq!(logging::min_level(), None);
    }

    // ─────────────────────────────────────────────────────────
    // accessors
    // ─────────────────────────────────────────────────────────

    #[test]
    fn test_accessors_require_ready() {
        let lifecycle = Lifecycle::new();
        assert!(matches!(lifecycle.camera_info("0"), Err(Error::NotInitialized)));
        assert!(matches!(
            lifecycle.has_camera(&CameraSelector::back()),
            Err(Error::NotInitialized)
        ));
        assert!(matches!(lifecycle.context(), Err(Error::NotInitialized)));

        lifecycle.configure(direct_record()).unwrap();
        assert!(matches!(
            lifecycle.default_use_case_config(UseCaseKind::Preview, None),
            Err(Error::NotInitialized)
        ));
    }

    #[test]
    fn test_accessors_when_ready() {
        let lifecycle = Lifecycle::new();
        lifecycle.configure(direct_record()).unwrap();
        lifecycle.initialize(context()).unwrap().wait().unwrap();

        assert_eq!(
            lifecycle.camera_info("0").unwrap().lens_facing,
            LensFacing::Back
        );
        assert!(lifecycle.has_camera(&CameraSelector::back()).unwrap());
        assert!(!lifecycle.has_camera(&CameraSelector::front()).unwrap());
        assert_eq!(
            lifecycle.context().unwrap().application_id,
            "lifecycle-test"
        );
        // No use-case provider configured: the empty default answers None
        assert_eq!(
            lifecycle
                .default_use_case_config(UseCaseKind::ImageCapture, None)
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_limiter_hides_cameras() {
        let lifecycle = Lifecycle::new();
        let factory = Arc::new(FakeCameraFactory::with_back_camera());
        factory.insert_camera(LensFacing::Front, "1");
        let provided = Arc::clone(&factory);
        let record = ConfigurationRecord::builder()
            .camera_factory_provider(move |_, _| Ok(provided.clone() as Arc<dyn CameraFactory>))
            .available_cameras_limiter(CameraSelector::back())
            .executor(Arc::new(DirectExecutor))
            .build();
        lifecycle.configure(record).unwrap();
        lifecycle.initialize(context()).unwrap().wait().unwrap();

        assert!(lifecycle.camera_info("0").is_ok());
        assert!(matches!(
            lifecycle.camera_info("1"),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(!lifecycle.has_camera(&CameraSelector::front()).unwrap());
    }

    // ─────────────────────────────────────────────────────────
    // events
    // ─────────────────────────────────────────────────────────

    #[test]
    fn test_failed_init_emits_failure_event() {
        let lifecycle = Lifecycle::new();
        let mut rx = lifecycle.subscribe();
        lifecycle
            .configure(
                ConfigurationRecord::builder()
                    .executor(Arc::new(DirectExecutor))
                    .build(),
            )
            .unwrap();
        let _ = lifecycle.initialize(context()).unwrap().wait();

        let events = drain(&mut rx);
        let types: Vec<_> = events.iter().map(|e| e.event_type()).collect();
        assert_eq!(
            types,
            vec![
                "phase_changed",
                "phase_changed",
                "initialization_failed",
                "phase_changed"
            ]
        );
        assert_eq!(
            events.last(),
            Some(&LifecycleEvent::PhaseChanged {
                epoch: 0,
                from: LifecyclePhase::Initializing,
                to: LifecyclePhase::InitFailed,
            })
        );
    }

    #[tokio::test]
    async fn test_wait_async_with_default_executor() {
        let lifecycle = Lifecycle::new();
        let factory = Arc::new(FakeCameraFactory::with_back_camera());
        let provided = Arc::clone(&factory);
        lifecycle
            .configure(
                ConfigurationRecord::builder()
                    .camera_factory_provider(move |_, _| {
                        Ok(provided.clone() as Arc<dyn CameraFactory>)
                    })
                    .build(),
            )
            .unwrap();

        let instance = lifecycle
            .get_or_create_instance(context())
            .unwrap()
            .wait_async()
            .await
            .unwrap();
        assert!(instance.has_camera(&CameraSelector::back()).unwrap());

        lifecycle.shutdown().wait_async().await;
        assert_eq!(factory.release_count(), 1);
    }
}
