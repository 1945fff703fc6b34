//! Recovery manager: health checks, state machine, corrective actions.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::RecoveryConfig;
use crate::core::{IssueKind, IssueSeverity, SurfaceType};
use crate::scanner::Scanner;
use crate::session::{ArSession, SessionState, TrackingState};

use super::{
    HealthProblem, RecoveryAction, RecoveryError, RecoveryEvent, RecoveryPhase, RecoveryProgress,
    RecoveryState, ScanSnapshot,
};

/// How long `Recovered` lingers before returning to `Monitoring`.
const RECOVERED_HOLD: Duration = Duration::from_secs(2);

/// Poll step for bounded waits, keeping them promptly cancellable.
const WAIT_POLL: Duration = Duration::from_millis(50);

/// Tracking quality that counts as "improved" for the tracking wait.
const TRACKING_RECOVERED_THRESHOLD: f32 = 0.5;

#[derive(Debug, Default)]
struct ManagerState {
    recovery: RecoveryState,
    attempts: usize,
    snapshot: Option<ScanSnapshot>,
    progress: RecoveryProgress,
    problems: Vec<HealthProblem>,
    recovered_at: Option<Instant>,
}

struct ManagerInner {
    scanner: Scanner,
    session: Arc<dyn ArSession>,
    config: RecoveryConfig,
    state: Mutex<ManagerState>,
    shutdown: AtomicBool,
    cancel: AtomicBool,
}

/// Watches scan health and drives bounded recovery attempts.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct RecoveryManager {
    inner: Arc<ManagerInner>,
}

impl RecoveryManager {
    /// Create a manager observing the given scanner.
    pub fn new(scanner: Scanner, config: RecoveryConfig) -> Self {
        let session = scanner.session().clone();
        Self {
            inner: Arc::new(ManagerInner {
                scanner,
                session,
                config,
                state: Mutex::new(ManagerState::default()),
                shutdown: AtomicBool::new(false),
                cancel: AtomicBool::new(false),
            }),
        }
    }

    /// Current recovery state.
    pub fn state(&self) -> RecoveryState {
        self.inner.state.lock().recovery
    }

    /// Progress of the current or last attempt.
    pub fn progress(&self) -> RecoveryProgress {
        self.inner.state.lock().progress.clone()
    }

    /// Attempts used so far this scan.
    pub fn attempts_used(&self) -> usize {
        self.inner.state.lock().attempts
    }

    /// Begin monitoring: moves to `Monitoring` and spawns the periodic
    /// health-check loop.
    pub fn start_monitoring(&self) {
        {
            let mut state = self.inner.state.lock();
            state.recovery = RecoveryState::Monitoring;
            state.attempts = 0;
            state.snapshot = None;
            state.recovered_at = None;
        }
        self.inner.shutdown.store(false, Ordering::SeqCst);
        self.mirror();
        log::info!("recovery monitoring started");

        let manager = self.clone();
        let interval = Duration::from_secs_f32(self.inner.config.check_interval_secs.max(0.05));
        thread::spawn(move || {
            while !manager.inner.shutdown.load(Ordering::SeqCst) {
                thread::sleep(interval);
                if manager.inner.shutdown.load(Ordering::SeqCst) {
                    break;
                }
                manager.run_health_check();
            }
            log::debug!("health-check loop stopped");
        });
    }

    /// Stop monitoring, cancel in-flight work, and discard the snapshot.
    pub fn stop(&self) {
        self.inner.shutdown.store(true, Ordering::SeqCst);
        self.inner.cancel.store(true, Ordering::SeqCst);
        let mut state = self.inner.state.lock();
        state.recovery = RecoveryState::None;
        state.snapshot = None;
        state.progress = RecoveryProgress::default();
        drop(state);
        self.mirror();
        log::info!("recovery monitoring stopped");
    }

    /// Cancel any in-flight recovery attempt without stopping monitoring.
    pub fn cancel_attempt(&self) {
        self.inner.cancel.store(true, Ordering::SeqCst);
    }

    /// Evaluate scan health once and advance the monitoring state machine.
    ///
    /// Runs on the periodic loop; also callable directly for an immediate
    /// check.
    pub fn run_health_check(&self) {
        if !self.inner.scanner.lifecycle().is_active() {
            return;
        }
        let problems = self.evaluate_health();

        let mut state = self.inner.state.lock();
        state.problems = problems.clone();
        match state.recovery {
            RecoveryState::Monitoring => {
                if !problems.is_empty() {
                    log::warn!("degradation detected: {problems:?}");
                    drop(state);
                    // Snapshot before anything changes further
                    let snapshot = self.inner.scanner.take_snapshot();
                    let mut state = self.inner.state.lock();
                    state.snapshot = Some(snapshot);
                    state.recovery = RecoveryState::NeedsRecovery;
                    drop(state);
                    self.mirror();
                }
            }
            RecoveryState::NeedsRecovery => {
                if problems.is_empty() {
                    log::info!("degradation resolved without recovery");
                    state.recovery = RecoveryState::Monitoring;
                    drop(state);
                    self.mirror();
                }
            }
            RecoveryState::Recovered => {
                let held = state
                    .recovered_at
                    .map(|t| t.elapsed() >= RECOVERED_HOLD)
                    .unwrap_or(true);
                if held {
                    state.recovery = RecoveryState::Monitoring;
                    drop(state);
                    self.mirror();
                }
            }
            RecoveryState::None | RecoveryState::Recovering | RecoveryState::Failed => {}
        }
    }

    /// Problems currently observed, as found by the last health check.
    pub fn problems(&self) -> Vec<HealthProblem> {
        self.inner.state.lock().problems.clone()
    }

    /// Human-readable suggestions for the current problems.
    pub fn recommendations(&self) -> Vec<String> {
        self.evaluate_health()
            .iter()
            .map(|p| match p {
                HealthProblem::LowQuality(q) => {
                    format!("Scan quality is low ({q:.2}); rescan problem areas slowly")
                }
                HealthProblem::LowCompleteness(c) => {
                    format!("Room coverage is incomplete ({c:.2}); capture the remaining surfaces")
                }
                HealthProblem::SessionFailed => {
                    "The AR session failed; recovery will restart it".to_string()
                }
                HealthProblem::SessionInterrupted => {
                    "The AR session was interrupted; return to the app to continue".to_string()
                }
                HealthProblem::TrackingUnavailable => {
                    "Tracking is unavailable; improve lighting and hold still".to_string()
                }
                HealthProblem::CriticalIssues(n) => {
                    format!("{n} critical issues detected; recovery is recommended")
                }
            })
            .collect()
    }

    /// Attempt recovery synchronously.
    ///
    /// Only permitted from a recoverable state and within the attempt
    /// budget; otherwise fails without touching scan state. Runs bounded,
    /// cancellable actions and verifies health afterwards. Intended to run
    /// off the owner thread; see [`RecoveryManager::spawn_attempt`].
    pub fn attempt_recovery(&self) -> Result<(), RecoveryError> {
        self.attempt_inner(None)
    }

    /// Run a recovery attempt on a background thread, streaming
    /// [`RecoveryEvent`]s as it progresses.
    pub fn spawn_attempt(&self) -> Receiver<RecoveryEvent> {
        let (tx, rx) = unbounded();
        let manager = self.clone();
        thread::spawn(move || {
            let result = manager.attempt_inner(Some(&tx));
            let _ = match result {
                Ok(()) => tx.send(RecoveryEvent::Completed),
                Err(e) => tx.send(RecoveryEvent::Failed(e)),
            };
        });
        rx
    }

    fn attempt_inner(&self, events: Option<&Sender<RecoveryEvent>>) -> Result<(), RecoveryError> {
        let problems = {
            let mut state = self.inner.state.lock();
            if !state.recovery.is_recoverable() {
                return Err(RecoveryError::NotRecoverable(state.recovery));
            }
            if state.attempts >= self.inner.config.max_attempts {
                return Err(RecoveryError::MaxAttemptsReached);
            }
            state.attempts += 1;
            state.recovery = RecoveryState::Recovering;
            state.progress = RecoveryProgress {
                phase: RecoveryPhase::Analyzing,
                current_action: None,
                actions_completed: 0,
                actions_total: 0,
                attempts_used: state.attempts,
            };
            state.problems.clone()
        };
        self.inner.cancel.store(false, Ordering::SeqCst);
        self.mirror();
        emit(events, RecoveryEvent::PhaseChanged(RecoveryPhase::Analyzing));
        log::info!(
            "recovery attempt {} starting ({} problems)",
            self.attempts_used(),
            problems.len()
        );

        let actions = derive_actions(&problems);
        {
            let mut state = self.inner.state.lock();
            state.progress.phase = RecoveryPhase::Executing;
            state.progress.actions_total = actions.len();
        }
        self.mirror();
        emit(events, RecoveryEvent::PhaseChanged(RecoveryPhase::Executing));

        for action in &actions {
            if self.inner.cancel.load(Ordering::SeqCst) {
                return self.finish_failed(RecoveryError::Cancelled);
            }
            {
                let mut state = self.inner.state.lock();
                state.progress.current_action = Some(*action);
            }
            self.mirror();
            emit(events, RecoveryEvent::ActionStarted(*action));
            log::info!("recovery action: {}", action.label());

            if let Err(e) = self.execute_action(*action) {
                log::warn!("recovery action {} failed: {e}", action.label());
                return self.finish_failed(e);
            }

            let mut state = self.inner.state.lock();
            state.progress.actions_completed += 1;
            state.progress.current_action = None;
        }

        {
            let mut state = self.inner.state.lock();
            state.progress.phase = RecoveryPhase::Verifying;
        }
        self.mirror();
        emit(events, RecoveryEvent::PhaseChanged(RecoveryPhase::Verifying));

        if let Err(e) = self.verify() {
            return self.finish_failed(e);
        }

        {
            let mut state = self.inner.state.lock();
            state.recovery = RecoveryState::Recovered;
            state.recovered_at = Some(Instant::now());
            state.progress.phase = RecoveryPhase::Completed;
        }
        self.mirror();
        log::info!("recovery succeeded");
        Ok(())
    }

    fn finish_failed(&self, error: RecoveryError) -> Result<(), RecoveryError> {
        {
            let mut state = self.inner.state.lock();
            state.recovery = RecoveryState::Failed;
            state.progress.phase = RecoveryPhase::Failed;
            state.progress.current_action = None;
        }
        self.mirror();
        log::warn!("recovery attempt failed: {error}");
        Err(error)
    }

    fn evaluate_health(&self) -> Vec<HealthProblem> {
        let mut problems = Vec::new();

        match self.inner.session.state() {
            SessionState::Failed => problems.push(HealthProblem::SessionFailed),
            SessionState::Interrupted => problems.push(HealthProblem::SessionInterrupted),
            SessionState::NotStarted | SessionState::Running => {}
        }
        if self.inner.session.tracking_state() == TrackingState::Unavailable {
            problems.push(HealthProblem::TrackingUnavailable);
        }

        let published = self.inner.scanner.published();
        if let Some(quality) = &published.quality {
            if quality.overall < self.inner.config.quality_threshold {
                problems.push(HealthProblem::LowQuality(quality.overall));
            }
            if quality.completeness < self.inner.config.completeness_threshold {
                problems.push(HealthProblem::LowCompleteness(quality.completeness));
            }
        }
        let criticals = published
            .issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Critical)
            .count();
        if criticals > self.inner.config.max_critical_issues {
            problems.push(HealthProblem::CriticalIssues(criticals));
        }

        problems
    }

    fn execute_action(&self, action: RecoveryAction) -> Result<(), RecoveryError> {
        match action {
            RecoveryAction::RestartSession => {
                self.inner
                    .session
                    .restart()
                    .map_err(|e| RecoveryError::SessionRestartFailed(e.to_string()))?;
                self.bounded_sleep(Duration::from_secs_f32(self.inner.config.session_settle_secs))
            }
            RecoveryAction::ImproveTracking => {
                let deadline = Instant::now()
                    + Duration::from_secs_f32(self.inner.config.tracking_wait_timeout_secs);
                loop {
                    if self.inner.session.tracking_quality() >= TRACKING_RECOVERED_THRESHOLD {
                        return Ok(());
                    }
                    if self.inner.cancel.load(Ordering::SeqCst) {
                        return Err(RecoveryError::Cancelled);
                    }
                    if Instant::now() >= deadline {
                        return Err(RecoveryError::Timeout("tracking improvement"));
                    }
                    thread::sleep(WAIT_POLL);
                }
            }
            RecoveryAction::RescanMissingSurfaces => {
                let published = self.inner.scanner.published();
                if published.merged_planes.is_empty() {
                    return Err(RecoveryError::InsufficientSurfaces);
                }
                let has_floor = published
                    .merged_planes
                    .iter()
                    .any(|p| p.surface_type == SurfaceType::Floor);
                let wall_count = published
                    .merged_planes
                    .iter()
                    .filter(|p| p.surface_type == SurfaceType::Wall)
                    .count();
                if !has_floor {
                    self.inner.scanner.push_issue(
                        IssueKind::IncompleteFloor,
                        IssueSeverity::High,
                        "Floor not captured; point the camera at the floor",
                        None,
                    );
                }
                if wall_count < self.inner.scanner.config().quality.expected_wall_count {
                    self.inner.scanner.push_issue(
                        IssueKind::MissingWall,
                        IssueSeverity::Medium,
                        "Some walls are missing; turn to capture every wall",
                        None,
                    );
                }
                Ok(())
            }
            RecoveryAction::RecalibrateGeometry => {
                self.inner.scanner.reprocess();
                Ok(())
            }
            RecoveryAction::DiscardPoorPlanes => {
                self.inner
                    .scanner
                    .discard_low_confidence_planes(self.inner.config.discard_confidence_threshold);
                self.inner.scanner.reprocess();
                Ok(())
            }
            RecoveryAction::RestoreSnapshot => {
                let snapshot = self.inner.state.lock().snapshot.clone();
                match snapshot {
                    Some(snapshot) => {
                        self.inner.scanner.restore_snapshot(&snapshot);
                        Ok(())
                    }
                    None => Err(RecoveryError::NoSnapshotAvailable),
                }
            }
        }
    }

    /// Re-check session health, quality threshold, and critical-issue count.
    fn verify(&self) -> Result<(), RecoveryError> {
        match self.inner.session.state() {
            SessionState::Failed => {
                return Err(RecoveryError::VerificationFailed(
                    "session still failed".to_string(),
                ))
            }
            SessionState::Interrupted => {
                return Err(RecoveryError::VerificationFailed(
                    "session still interrupted".to_string(),
                ))
            }
            SessionState::NotStarted | SessionState::Running => {}
        }

        let published = self.inner.scanner.published();
        if let Some(quality) = &published.quality {
            if quality.overall < self.inner.config.quality_threshold {
                return Err(RecoveryError::VerificationFailed(format!(
                    "quality still below threshold ({:.2})",
                    quality.overall
                )));
            }
        }
        let criticals = published
            .issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Critical)
            .count();
        if criticals > self.inner.config.max_critical_issues {
            return Err(RecoveryError::VerificationFailed(format!(
                "{criticals} critical issues remain"
            )));
        }
        Ok(())
    }

    /// Sleep in cancellable steps.
    fn bounded_sleep(&self, duration: Duration) -> Result<(), RecoveryError> {
        let deadline = Instant::now() + duration;
        while Instant::now() < deadline {
            if self.inner.cancel.load(Ordering::SeqCst) {
                return Err(RecoveryError::Cancelled);
            }
            thread::sleep(WAIT_POLL.min(duration));
        }
        Ok(())
    }

    /// Mirror recovery state and progress into the scanner's published
    /// state.
    fn mirror(&self) {
        let (recovery, progress) = {
            let state = self.inner.state.lock();
            (state.recovery, state.progress.clone())
        };
        self.inner.scanner.set_recovery_status(recovery, progress);
    }
}

fn emit(events: Option<&Sender<RecoveryEvent>>, event: RecoveryEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}

/// Map detected problems to an ordered, deduplicated action list.
fn derive_actions(problems: &[HealthProblem]) -> Vec<RecoveryAction> {
    let mut actions = Vec::new();
    let push = |list: &mut Vec<RecoveryAction>, action: RecoveryAction| {
        if !list.contains(&action) {
            list.push(action);
        }
    };

    for problem in problems {
        match problem {
            HealthProblem::SessionFailed | HealthProblem::SessionInterrupted => {
                push(&mut actions, RecoveryAction::RestartSession);
                push(&mut actions, RecoveryAction::RestoreSnapshot);
            }
            HealthProblem::TrackingUnavailable => {
                push(&mut actions, RecoveryAction::ImproveTracking);
            }
            HealthProblem::LowQuality(_) | HealthProblem::CriticalIssues(_) => {
                push(&mut actions, RecoveryAction::DiscardPoorPlanes);
                push(&mut actions, RecoveryAction::RecalibrateGeometry);
            }
            HealthProblem::LowCompleteness(_) => {
                push(&mut actions, RecoveryAction::RescanMissingSurfaces);
            }
        }
    }

    // A manually requested attempt with no recorded problems still does
    // something useful
    if actions.is_empty() {
        actions.push(RecoveryAction::RecalibrateGeometry);
    }
    actions
}
