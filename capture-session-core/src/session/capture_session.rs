use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::config::{CaptureConfiguration, CaptureRequest, DevicePolicy};
use crate::models::error::{SessionError, TeardownFailure, TeardownStep};
use crate::models::route::{ActiveRoute, RouteId};
use crate::models::state::SessionState;
use crate::session::continuity::ContinuitySignal;
use crate::session::device_selector::DeviceSelector;
use crate::session::interruption_monitor::InterruptionMonitor;
use crate::session::route_manager::RouteManager;
use crate::traits::audio_platform::AudioPlatform;
use crate::traits::continuity_keeper::ContinuityKeeper;
use crate::traits::interruption_source::InterruptionSource;
use crate::traits::session_delegate::SessionDelegate;

/// Mutable session state, protected by `parking_lot::Mutex`.
///
/// `generation` is bumped by every `start`, `resume` and `stop`. A running
/// start/resume sequence re-checks it after each platform call and stops
/// as soon as it no longer matches.
struct Inner {
    state: SessionState,
    generation: u64,
    session_id: Option<Uuid>,
    config: Option<CaptureConfiguration>,
    route: Option<RouteId>,
}

/// A delegate callback waiting to be delivered.
enum Notification {
    State(SessionState),
    Error(SessionError),
}

struct Shared {
    selector: DeviceSelector,
    routes: RouteManager,
    monitor: InterruptionMonitor,
    continuity: ContinuitySignal,
    inner: Mutex<Inner>,
    /// Held by a start/resume sequence until it has finished or unwound.
    sequence: Mutex<()>,
    delegate: Mutex<Option<Arc<dyn SessionDelegate>>>,
    /// Queued under the `inner` lock, so queue order is transition order.
    pending: Mutex<VecDeque<Notification>>,
    /// Held by whichever thread is currently delivering `pending`.
    delivering: Mutex<()>,
}

/// Orchestrates configuration, routing, interruptions and background
/// continuity as one lifecycle.
///
/// ```text
/// start:  configuration → resolve input → apply route → subscribe → continuity
/// stop:   continuity → unsubscribe → release route → idle
/// ```
///
/// Every transition is applied under a single lock and only if the current
/// state is the expected pre-state, so racing signals resolve to whichever
/// arrives first.
pub struct CaptureSession {
    shared: Arc<Shared>,
}

impl CaptureSession {
    pub fn new(
        platform: Arc<dyn AudioPlatform>,
        interruptions: Arc<dyn InterruptionSource>,
        keeper: Arc<dyn ContinuityKeeper>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                selector: DeviceSelector::new(Arc::clone(&platform)),
                routes: RouteManager::new(platform),
                monitor: InterruptionMonitor::new(interruptions),
                continuity: ContinuitySignal::new(keeper),
                inner: Mutex::new(Inner {
                    state: SessionState::Idle,
                    generation: 0,
                    session_id: None,
                    config: None,
                    route: None,
                }),
                sequence: Mutex::new(()),
                delegate: Mutex::new(None),
                pending: Mutex::new(VecDeque::new()),
                delivering: Mutex::new(()),
            }),
        }
    }

    pub fn set_delegate(&self, delegate: Arc<dyn SessionDelegate>) {
        *self.shared.delegate.lock() = Some(delegate);
    }

    pub fn state(&self) -> SessionState {
        self.shared.inner.lock().state.clone()
    }

    /// Id of the current (or last failed) session.
    pub fn session_id(&self) -> Option<Uuid> {
        self.shared.inner.lock().session_id
    }

    pub fn configuration(&self) -> Option<CaptureConfiguration> {
        self.shared.inner.lock().config.clone()
    }

    pub fn active_route(&self) -> Option<ActiveRoute> {
        self.shared.routes.current_route()
    }

    pub fn is_subscribed(&self) -> bool {
        self.shared.monitor.is_subscribed()
    }

    pub fn is_background_kept(&self) -> bool {
        self.shared.continuity.is_active()
    }

    /// Begin a session. Transitions: idle/failed → configuring → recording.
    ///
    /// On failure the session is `Failed` and nothing acquired along the way
    /// is left live.
    pub fn start(&self, request: CaptureRequest) -> Result<Uuid, SessionError> {
        let shared = &self.shared;
        let Some(_sequence) = shared.sequence.try_lock() else {
            return Err(SessionError::SessionBusy(
                "a previous sequence is still unwinding".into(),
            ));
        };

        let (generation, session_id) = {
            let mut inner = shared.inner.lock();
            if !inner.state.accepts_start() {
                return Err(SessionError::SessionBusy(format!(
                    "session is {}",
                    inner.state.name()
                )));
            }
            let session_id = Uuid::new_v4();
            inner.generation += 1;
            inner.session_id = Some(session_id);
            inner.config = None;
            inner.route = None;
            shared.set_state(&mut inner, SessionState::Configuring);
            (inner.generation, session_id)
        };
        shared.flush_notifications();
        log::info!("Session {} starting", session_id);

        match shared.run_start(generation, request) {
            Ok(route) => {
                log::info!(
                    "Session {} recording: {} Hz, {} ch, input {}",
                    session_id,
                    route.sample_rate,
                    route.channels,
                    route
                        .device
                        .as_ref()
                        .map(|d| d.label.as_str())
                        .unwrap_or("default")
                );
                Ok(session_id)
            }
            Err(err) => Err(shared.fail(generation, err)),
        }
    }

    /// Pause capture. Transitions: recording → paused.
    ///
    /// The route is released; subscription and continuity stay live.
    pub fn pause(&self) -> Result<(), SessionError> {
        if self.shared.pause_recording() {
            Ok(())
        } else {
            Err(SessionError::InvalidState(format!(
                "cannot pause while {}",
                self.state().name()
            )))
        }
    }

    /// Resume after a pause. Transitions: paused → configuring → recording.
    ///
    /// Device resolution and the route pipeline run again because inputs
    /// may have changed while paused.
    pub fn resume(&self) -> Result<(), SessionError> {
        let shared = &self.shared;
        let Some(_sequence) = shared.sequence.try_lock() else {
            return Err(SessionError::SessionBusy(
                "a previous sequence is still unwinding".into(),
            ));
        };

        let (generation, config) = {
            let mut inner = shared.inner.lock();
            if !inner.state.is_paused() {
                return Err(SessionError::InvalidState(format!(
                    "cannot resume while {}",
                    inner.state.name()
                )));
            }
            let Some(config) = inner.config.clone() else {
                return Err(SessionError::InvalidState("paused without configuration".into()));
            };
            inner.generation += 1;
            shared.set_state(&mut inner, SessionState::Configuring);
            (inner.generation, config)
        };
        shared.flush_notifications();

        let result = shared.establish_route(generation, &config).and_then(|_| {
            shared.commit(generation, |inner| shared.set_state(inner, SessionState::Recording))
        });

        match result {
            Ok(()) => {
                shared.flush_notifications();
                log::info!("Session resumed");
                Ok(())
            }
            Err(err) => Err(shared.fail(generation, err)),
        }
    }

    /// Stop and release everything. Transitions: configuring/recording/paused
    /// → stopping → idle.
    ///
    /// Supersedes an in-flight start or resume. Every teardown step runs even
    /// if an earlier one fails; failures come back as one
    /// `TeardownAggregateFailure` with the session already idle. Stopping an
    /// idle or failed session is a no-op.
    pub fn stop(&self) -> Result<(), SessionError> {
        let shared = &self.shared;
        let (generation, route) = {
            let mut inner = shared.inner.lock();
            match inner.state {
                SessionState::Idle | SessionState::Failed(_) | SessionState::Stopping => {
                    log::debug!("Stop ignored while {}", inner.state.name());
                    return Ok(());
                }
                _ => {}
            }
            inner.generation += 1;
            let route = inner.route.take();
            shared.set_state(&mut inner, SessionState::Stopping);
            (inner.generation, route)
        };
        shared.flush_notifications();

        let failures = shared.teardown(route);
        let outcome = if failures.is_empty() {
            log::info!("Session stopped");
            Ok(())
        } else {
            let err = SessionError::TeardownAggregateFailure(failures);
            log::error!("Session stopped with errors: {}", err);
            Err(err)
        };

        {
            let mut inner = shared.inner.lock();
            if inner.generation == generation && matches!(inner.state, SessionState::Stopping) {
                inner.config = None;
                shared.set_state(&mut inner, SessionState::Idle);
                if let Err(err) = &outcome {
                    shared.queue(Notification::Error(err.clone()));
                }
            }
        }
        shared.flush_notifications();
        outcome
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("Teardown on drop reported: {}", e);
        }
    }
}

impl Shared {
    fn run_start(
        self: &Arc<Self>,
        generation: u64,
        request: CaptureRequest,
    ) -> Result<ActiveRoute, SessionError> {
        let config = CaptureConfiguration::from_request(request)?;
        self.commit(generation, |inner| inner.config = Some(config.clone()))?;

        let route = self.establish_route(generation, &config)?;

        let weak = Arc::downgrade(self);
        self.monitor.subscribe(Arc::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.on_interruption_began();
            }
        }))?;
        if self.superseded(generation) {
            self.release_quietly(TeardownStep::Interruptions, self.monitor.unsubscribe());
            return Err(SessionError::Cancelled);
        }

        if config.background_recording() {
            self.continuity.start(config.notification())?;
            if self.superseded(generation) {
                self.release_quietly(TeardownStep::Continuity, self.continuity.stop());
                return Err(SessionError::Cancelled);
            }
        }

        self.commit(generation, |inner| self.set_state(inner, SessionState::Recording))?;
        self.flush_notifications();
        Ok(route)
    }

    /// Resolve the input, apply the route pipeline and record the route.
    fn establish_route(
        &self,
        generation: u64,
        config: &CaptureConfiguration,
    ) -> Result<ActiveRoute, SessionError> {
        let device = self.selector.resolve_input(config.device_id())?;
        if let (None, Some(requested)) = (&device, config.device_id()) {
            if config.device_policy() == DevicePolicy::Strict {
                return Err(SessionError::InputRoutingFailed(format!(
                    "requested input {} is not available",
                    requested
                )));
            }
        }
        if self.superseded(generation) {
            return Err(SessionError::Cancelled);
        }

        let route = self
            .routes
            .apply_configuration(config, device.as_ref(), &|| self.superseded(generation))?;
        if self
            .commit(generation, |inner| inner.route = Some(route.id))
            .is_err()
        {
            self.release_quietly(TeardownStep::Route, self.routes.release(route.id).map(|_| ()));
            return Err(SessionError::Cancelled);
        }
        Ok(route)
    }

    fn on_interruption_began(&self) {
        if self.pause_recording() {
            log::info!("Session paused by interruption");
        } else {
            log::debug!("Interruption ignored while {}", self.inner.lock().state.name());
        }
    }

    /// Recording → paused. Returns `false` if the session was not recording.
    fn pause_recording(&self) -> bool {
        {
            let mut inner = self.inner.lock();
            if !inner.state.is_recording() {
                return false;
            }
            self.set_state(&mut inner, SessionState::Paused);
            if let Some(id) = inner.route.take() {
                // Released under the lock so a resume cannot observe the old route.
                self.release_quietly(TeardownStep::Route, self.routes.release(id).map(|_| ()));
            }
        }
        self.flush_notifications();
        true
    }

    /// Record `apply` if the sequence started under `generation` is still current.
    fn commit(&self, generation: u64, apply: impl FnOnce(&mut Inner)) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        if inner.generation != generation || !matches!(inner.state, SessionState::Configuring) {
            return Err(SessionError::Cancelled);
        }
        apply(&mut inner);
        Ok(())
    }

    fn superseded(&self, generation: u64) -> bool {
        self.inner.lock().generation != generation
    }

    /// Configuring → failed, with everything the session holds rolled back.
    ///
    /// If a stop already superseded the sequence, the stop owns teardown and
    /// the caller gets `Cancelled`.
    fn fail(&self, generation: u64, err: SessionError) -> SessionError {
        let route = {
            let mut inner = self.inner.lock();
            if inner.generation != generation || !matches!(inner.state, SessionState::Configuring) {
                log::info!("Sequence superseded by stop");
                return SessionError::Cancelled;
            }
            self.set_state(&mut inner, SessionState::Failed(err.clone()));
            self.queue(Notification::Error(err.clone()));
            inner.route.take()
        };

        for failure in self.teardown(route) {
            log::warn!("Rollback after failure: {}", failure);
        }

        log::error!("Session failed: {}", err);
        self.flush_notifications();
        err
    }

    /// Reverse-order release of continuity, subscription and route.
    fn teardown(&self, route: Option<RouteId>) -> Vec<TeardownFailure> {
        let mut failures = Vec::new();

        if let Err(e) = self.continuity.stop() {
            failures.push(TeardownFailure {
                step: TeardownStep::Continuity,
                message: e.to_string(),
            });
        }

        if let Err(e) = self.monitor.unsubscribe() {
            log::warn!("Interruption unsubscribe failed: {}", e);
            failures.push(TeardownFailure {
                step: TeardownStep::Interruptions,
                message: e.to_string(),
            });
        }

        if let Some(id) = route {
            if let Err(e) = self.routes.release(id) {
                failures.push(TeardownFailure {
                    step: TeardownStep::Route,
                    message: e.to_string(),
                });
            }
        }

        failures
    }

    fn release_quietly<E: std::fmt::Display>(&self, step: TeardownStep, result: Result<(), E>) {
        if let Err(e) = result {
            log::warn!("Releasing {} failed: {}", step, e);
        }
    }

    /// Change state and queue the notification. Callers hold `inner`.
    fn set_state(&self, inner: &mut Inner, state: SessionState) {
        inner.state = state.clone();
        self.queue(Notification::State(state));
    }

    fn queue(&self, notification: Notification) {
        self.pending.lock().push_back(notification);
    }

    /// Deliver queued notifications in order, outside the `inner` lock.
    ///
    /// One thread delivers at a time. A thread that finds delivery in
    /// progress leaves its entries to the current deliverer, which drains
    /// until the queue is empty.
    fn flush_notifications(&self) {
        loop {
            let Some(guard) = self.delivering.try_lock() else {
                return;
            };
            loop {
                let Some(next) = self.pending.lock().pop_front() else {
                    break;
                };
                let delegate = self.delegate.lock().clone();
                if let Some(delegate) = delegate {
                    match &next {
                        Notification::State(state) => delegate.on_state_changed(state),
                        Notification::Error(err) => delegate.on_error(err),
                    }
                }
            }
            drop(guard);
            if self.pending.lock().is_empty() {
                return;
            }
        }
    }
}
