//! Scan orchestration.
//!
//! [`Scanner`] is the single owner of all mutable scan state. Plane-stream
//! updates, timer ticks, and recovery commands all serialize through one
//! mutex-guarded state block; external consumers only ever observe immutable
//! [`PublishedState`] clones, pulled on demand or pushed over subscription
//! channels.
//!
//! Per update the scanner filters sub-minimum planes, re-merges, recomputes
//! dimensions when enough surfaces exist, and re-assesses quality. Geometry
//! and quality failures degrade into scan issues; only AR-session failure
//! fails the scan itself.

mod state;

pub use state::{PublishedState, ScanLifecycle, ScanResult};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::ScanConfig;
use crate::core::{
    DetectedPlane, IssueKind, IssueList, IssueSeverity, MergedPlane, PlaneId, RoomDimensions,
    ScanPhase, ScanProgress, ScanQuality, SurfaceType, Vec3,
};
use crate::dimensions::{DimensionCalculator, DimensionError};
use crate::merge::PlaneMerger;
use crate::quality::QualityAssessor;
use crate::recovery::{RecoveryProgress, RecoveryState, ScanSnapshot};
use crate::session::{ArSession, SessionState};

/// Tracking quality below this raises a high-severity issue.
const TRACKING_DEGRADED_THRESHOLD: f32 = 0.4;

/// Tracking quality below this raises a critical issue.
const TRACKING_LOST_THRESHOLD: f32 = 0.15;

/// Mutable scan state, guarded by the scanner's mutex.
#[derive(Debug, Default)]
struct ScanState {
    lifecycle: ScanLifecycle,
    raw_planes: Vec<DetectedPlane>,
    merged_planes: Vec<MergedPlane>,
    merged_signature: Vec<(SurfaceType, Vec<PlaneId>)>,
    dimensions: Option<RoomDimensions>,
    quality: Option<ScanQuality>,
    issues: IssueList,
    progress: ScanProgress,
    started_at: Option<Instant>,
    tracking_quality: f32,
    recovery_state: RecoveryState,
    recovery_progress: RecoveryProgress,
}

impl ScanState {
    fn elapsed(&self) -> Duration {
        self.started_at.map(|t| t.elapsed()).unwrap_or(Duration::ZERO)
    }

    fn to_published(&self) -> PublishedState {
        PublishedState {
            lifecycle: self.lifecycle,
            progress: self.progress.clone(),
            raw_planes: self.raw_planes.clone(),
            merged_planes: self.merged_planes.clone(),
            dimensions: self.dimensions,
            quality: self.quality.clone(),
            issues: self.issues.issues().to_vec(),
            recovery_state: self.recovery_state,
            recovery_progress: self.recovery_progress.clone(),
        }
    }
}

struct ScannerInner {
    config: ScanConfig,
    session: Arc<dyn ArSession>,
    merger: PlaneMerger,
    calculator: DimensionCalculator,
    assessor: QualityAssessor,
    state: Mutex<ScanState>,
    subscribers: Mutex<Vec<Sender<PublishedState>>>,
    shutdown: AtomicBool,
}

/// Orchestrates the scan pipeline and owns all mutable scan state.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct Scanner {
    inner: Arc<ScannerInner>,
}

impl Scanner {
    /// Create a scanner over an injected AR session.
    pub fn new(config: ScanConfig, session: Arc<dyn ArSession>) -> Self {
        let merger = PlaneMerger::new(config.merging.clone());
        let calculator = DimensionCalculator::new(config.dimensions.clone());
        let assessor = QualityAssessor::new(config.quality.clone());
        Self {
            inner: Arc::new(ScannerInner {
                config,
                session,
                merger,
                calculator,
                assessor,
                state: Mutex::new(ScanState::default()),
                subscribers: Mutex::new(Vec::new()),
                shutdown: AtomicBool::new(false),
            }),
        }
    }

    /// The scanner's configuration.
    pub fn config(&self) -> &ScanConfig {
        &self.inner.config
    }

    /// The injected AR session.
    pub fn session(&self) -> &Arc<dyn ArSession> {
        &self.inner.session
    }

    /// Begin a scan, resetting any previous state and spawning the progress
    /// and timeout timers.
    pub fn start(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.lifecycle.is_active() {
                log::warn!("start ignored: scan already active");
                return;
            }
            state.lifecycle = ScanLifecycle::Initializing;
            state.raw_planes.clear();
            state.merged_planes.clear();
            state.merged_signature.clear();
            state.dimensions = None;
            state.quality = None;
            state.issues.clear();
            state.progress = ScanProgress::default();
            state.started_at = Some(Instant::now());
            state.tracking_quality = 0.0;
            state.recovery_state = RecoveryState::None;
            state.recovery_progress = RecoveryProgress::default();
        }
        self.inner.shutdown.store(false, Ordering::SeqCst);

        if self.inner.session.state() == SessionState::Failed {
            log::error!("cannot start scan: AR session failed");
            self.fail("AR session failed before scan start");
            return;
        }

        self.spawn_progress_timer();
        self.spawn_timeout_timer();

        self.inner.state.lock().lifecycle = ScanLifecycle::Scanning;
        log::info!("scan started");
        self.publish();
    }

    /// Stop the scan: one final synchronous merge/assess pass, then
    /// `Completed`.
    pub fn stop(&self) {
        {
            let mut state = self.inner.state.lock();
            if !state.lifecycle.is_active() {
                log::warn!("stop ignored: no active scan");
                return;
            }
            state.lifecycle = ScanLifecycle::Processing;
            state.progress.advance_phase(ScanPhase::Finalization);
        }
        self.publish();

        // Final pass over whatever raw planes we have
        self.reprocess();

        {
            let mut state = self.inner.state.lock();
            state.lifecycle = ScanLifecycle::Completed;
            state.progress.completion = 1.0;
            state.progress.estimated_remaining = Some(Duration::ZERO);
        }
        self.inner.shutdown.store(true, Ordering::SeqCst);
        log::info!("scan completed");
        self.publish();
    }

    /// Cancel the scan, halting timers and discarding in-flight recovery
    /// work. The last published state stays intact.
    pub fn cancel(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.lifecycle.is_terminal() {
                return;
            }
            state.lifecycle = ScanLifecycle::Cancelled;
        }
        self.inner.shutdown.store(true, Ordering::SeqCst);
        log::info!("scan cancelled");
        self.publish();
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> ScanLifecycle {
        self.inner.state.lock().lifecycle
    }

    /// Process one plane-detection update from the AR subsystem.
    ///
    /// Ignored unless the scan is active. Geometry and quality failures are
    /// absorbed into issues; only session failure ends the scan.
    pub fn process_frame(&self, planes: Vec<DetectedPlane>, tracking_quality: f32) {
        if self.inner.session.state() == SessionState::Failed {
            self.fail("AR session failed");
            return;
        }

        let mut state = self.inner.state.lock();
        if !state.lifecycle.is_active() {
            log::debug!("frame dropped: scan not active");
            return;
        }

        let min_area = self.inner.config.merging.min_plane_area;
        state.raw_planes = planes.into_iter().filter(|p| p.area >= min_area).collect();
        state.tracking_quality = tracking_quality;

        self.update_pipeline(&mut state);
        self.raise_tracking_issues(&mut state);
        self.update_progress(&mut state);

        let published = state.to_published();
        drop(state);
        self.send_to_subscribers(published);
    }

    /// Pull the current published state.
    pub fn published(&self) -> PublishedState {
        self.inner.state.lock().to_published()
    }

    /// Subscribe to change notifications.
    ///
    /// Every publish delivers a full immutable snapshot; disconnected
    /// receivers are pruned on the next publish.
    pub fn subscribe(&self) -> Receiver<PublishedState> {
        let (tx, rx) = unbounded();
        self.inner.subscribers.lock().push(tx);
        rx
    }

    /// Summarize the current scan as a result for downstream consumers.
    ///
    /// `None` until a quality report exists.
    pub fn result(&self) -> Option<ScanResult> {
        let state = self.inner.state.lock();
        let quality = state.quality.clone()?;
        Some(ScanResult {
            phase: state.progress.phase,
            dimensions: state.dimensions,
            quality,
            duration: state.elapsed(),
            raw_plane_count: state.raw_planes.len(),
            merged_plane_count: state.merged_planes.len(),
        })
    }

    // =========================================================================
    // RECOVERY HOOKS
    //
    // Called by the recovery manager; all state mutation still happens under
    // the scanner's own lock.
    // =========================================================================

    /// Capture a consistent snapshot of the current scan state.
    pub fn take_snapshot(&self) -> ScanSnapshot {
        let state = self.inner.state.lock();
        ScanSnapshot {
            raw_planes: state.raw_planes.clone(),
            merged_planes: state.merged_planes.clone(),
            dimensions: state.dimensions,
            quality: state.quality.clone(),
            progress: state.progress.clone(),
            issues: state.issues.clone(),
            session_state: self.inner.session.state(),
            tracking_state: self.inner.session.tracking_state(),
            tracking_quality: state.tracking_quality,
            taken_at: Instant::now(),
        }
    }

    /// Roll scan state back to a snapshot.
    pub fn restore_snapshot(&self, snapshot: &ScanSnapshot) {
        let mut state = self.inner.state.lock();
        state.raw_planes = snapshot.raw_planes.clone();
        state.merged_planes = snapshot.merged_planes.clone();
        state.merged_signature = identity_signature(&state.merged_planes);
        state.dimensions = snapshot.dimensions;
        state.quality = snapshot.quality.clone();
        state.progress = snapshot.progress.clone();
        state.issues = snapshot.issues.clone();
        state.tracking_quality = snapshot.tracking_quality;
        log::info!("scan state restored from snapshot");
        let published = state.to_published();
        drop(state);
        self.send_to_subscribers(published);
    }

    /// Re-run the merge/dimension/assess pipeline over the current raw
    /// planes.
    pub fn reprocess(&self) {
        let mut state = self.inner.state.lock();
        self.update_pipeline(&mut state);
        self.update_progress(&mut state);
        let published = state.to_published();
        drop(state);
        self.send_to_subscribers(published);
    }

    /// Drop raw planes below a confidence threshold. Returns how many were
    /// discarded; the caller is expected to reprocess afterwards.
    pub fn discard_low_confidence_planes(&self, threshold: f32) -> usize {
        let mut state = self.inner.state.lock();
        let before = state.raw_planes.len();
        state.raw_planes.retain(|p| p.confidence >= threshold);
        let discarded = before - state.raw_planes.len();
        if discarded > 0 {
            log::info!("discarded {discarded} low-confidence planes");
        }
        discarded
    }

    /// Record an issue (deduplicated) against the scan.
    pub fn push_issue(
        &self,
        kind: IssueKind,
        severity: IssueSeverity,
        description: impl Into<String>,
        location: Option<Vec3>,
    ) {
        self.inner
            .state
            .lock()
            .issues
            .push(kind, severity, description, location);
    }

    /// Mirror recovery status into the published state.
    pub fn set_recovery_status(&self, recovery: RecoveryState, progress: RecoveryProgress) {
        let mut state = self.inner.state.lock();
        state.recovery_state = recovery;
        state.recovery_progress = progress;
        let published = state.to_published();
        drop(state);
        self.send_to_subscribers(published);
    }

    /// Time since scan start.
    pub fn elapsed(&self) -> Duration {
        self.inner.state.lock().elapsed()
    }

    // =========================================================================
    // PIPELINE
    // =========================================================================

    /// Merge, dimension, and quality stages over the state's raw planes.
    fn update_pipeline(&self, state: &mut ScanState) {
        let merged = self.inner.merger.merge(&state.raw_planes);
        let signature = identity_signature(&merged);
        if signature != state.merged_signature {
            state.merged_planes = merged;
            state.merged_signature = signature;
        }

        let floors = count_type(&state.merged_planes, SurfaceType::Floor);
        let walls = count_type(&state.merged_planes, SurfaceType::Wall);
        if floors >= 1 && walls >= self.inner.config.scanner.min_walls_for_dimensions {
            match self.inner.calculator.calculate(&state.merged_planes) {
                Ok(dims) => state.dimensions = Some(dims),
                Err(DimensionError::InsufficientData(_)) => {}
                Err(DimensionError::CalculationFailed) => {
                    state.issues.push(
                        IssueKind::UnstableGeometry,
                        IssueSeverity::Medium,
                        "Dimension estimation failed for this pass",
                        None,
                    );
                }
                Err(DimensionError::InvalidDimensions(msg)) => {
                    // Keep the previous estimate for this cycle
                    log::debug!("dimensions rejected: {msg}");
                    state.issues.push(
                        IssueKind::UnstableGeometry,
                        IssueSeverity::Low,
                        "Estimated dimensions were implausible and discarded",
                        None,
                    );
                }
            }
        }

        state.quality = Some(self.inner.assessor.assess(
            &state.raw_planes,
            &state.merged_planes,
            state.dimensions.as_ref(),
            state.elapsed(),
            state.tracking_quality,
            &state.issues,
        ));
    }

    fn raise_tracking_issues(&self, state: &mut ScanState) {
        if state.tracking_quality < TRACKING_LOST_THRESHOLD {
            state.issues.push(
                IssueKind::PoorTracking,
                IssueSeverity::Critical,
                "Tracking lost",
                None,
            );
        } else if state.tracking_quality < TRACKING_DEGRADED_THRESHOLD {
            state.issues.push(
                IssueKind::PoorTracking,
                IssueSeverity::High,
                "Tracking quality degraded",
                None,
            );
        } else if self.inner.session.tracking_state().is_degraded() {
            // Platform limitation reported before the scalar quality drops
            state.issues.push(
                IssueKind::PoorTracking,
                IssueSeverity::Medium,
                "Platform reports limited tracking",
                None,
            );
        }
    }

    /// Derive coverage, completion, phase, and the time-remaining estimate.
    fn update_progress(&self, state: &mut ScanState) {
        let quality_cfg = &self.inner.config.quality;
        let floor_area: f32 = state
            .merged_planes
            .iter()
            .filter(|p| p.surface_type == SurfaceType::Floor)
            .map(|p| p.area)
            .sum();
        let wall_count = count_type(&state.merged_planes, SurfaceType::Wall);

        let floor_coverage = (floor_area / quality_cfg.expected_min_room_area).min(1.0);
        let wall_coverage =
            (wall_count as f32 / quality_cfg.expected_wall_count as f32).min(1.0);
        let detail = (state.merged_planes.len() as f32 / 8.0).min(1.0);
        let elapsed = state.elapsed();
        let time_term = (elapsed.as_secs_f32() / 60.0).min(1.0);

        state.progress.floor_coverage = floor_coverage;
        state.progress.wall_coverage = wall_coverage;
        state.progress.completion =
            0.3 * floor_coverage + 0.4 * wall_coverage + 0.2 * detail + 0.1 * time_term;
        state.progress.elapsed = elapsed;

        let phase = if floor_coverage <= 0.0 {
            ScanPhase::FloorDetection
        } else if wall_coverage < 1.0 {
            ScanPhase::WallDetection
        } else if state.progress.completion < 0.85 {
            ScanPhase::DetailScanning
        } else {
            ScanPhase::Optimization
        };
        state.progress.advance_phase(phase);
        state.progress.estimated_remaining = state.progress.estimate_remaining();
    }

    /// Move the scan to `Failed`. Only session-level failure calls this.
    fn fail(&self, reason: &str) {
        {
            let mut state = self.inner.state.lock();
            if state.lifecycle.is_terminal() {
                return;
            }
            state.lifecycle = ScanLifecycle::Failed;
            state.issues.push(
                IssueKind::PoorTracking,
                IssueSeverity::Critical,
                reason.to_string(),
                None,
            );
        }
        self.inner.shutdown.store(true, Ordering::SeqCst);
        log::error!("scan failed: {reason}");
        self.publish();
    }

    // =========================================================================
    // TIMERS AND PUBLISHING
    // =========================================================================

    fn spawn_progress_timer(&self) {
        let scanner = self.clone();
        let interval =
            Duration::from_secs_f32(self.inner.config.scanner.progress_interval_secs.max(0.01));
        thread::spawn(move || {
            log::debug!("progress timer started");
            while !scanner.inner.shutdown.load(Ordering::SeqCst) {
                thread::sleep(interval);
                let mut state = scanner.inner.state.lock();
                if !state.lifecycle.is_active() {
                    continue;
                }
                scanner.update_progress(&mut state);
                let published = state.to_published();
                drop(state);
                scanner.send_to_subscribers(published);
            }
            log::debug!("progress timer stopped");
        });
    }

    fn spawn_timeout_timer(&self) {
        let scanner = self.clone();
        let interval = Duration::from_secs_f32(
            self.inner.config.scanner.timeout_check_interval_secs.max(0.01),
        );
        let timeout = Duration::from_secs_f32(self.inner.config.scanner.scan_timeout_secs);
        thread::spawn(move || {
            while !scanner.inner.shutdown.load(Ordering::SeqCst) {
                thread::sleep(interval);
                if scanner.lifecycle().is_active() && scanner.elapsed() > timeout {
                    log::warn!("scan timeout after {:?}, stopping", timeout);
                    scanner.stop();
                    break;
                }
            }
        });
    }

    fn publish(&self) {
        let published = self.inner.state.lock().to_published();
        self.send_to_subscribers(published);
    }

    fn send_to_subscribers(&self, published: PublishedState) {
        let mut subscribers = self.inner.subscribers.lock();
        subscribers.retain(|tx| tx.send(published.clone()).is_ok());
    }
}

/// Identity of a merged set across passes: merged ids are regenerated every
/// pass, so identity is the sorted (type, contributing raw ids) signature.
fn identity_signature(planes: &[MergedPlane]) -> Vec<(SurfaceType, Vec<PlaneId>)> {
    let mut signature: Vec<(SurfaceType, Vec<PlaneId>)> = planes
        .iter()
        .map(|p| (p.surface_type, p.source_ids.clone()))
        .collect();
    signature.sort();
    signature
}

fn count_type(planes: &[MergedPlane], surface_type: SurfaceType) -> usize {
    planes
        .iter()
        .filter(|p| p.surface_type == surface_type)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PlaneAlignment, Transform3};
    use crate::session::{SessionError, TrackingState};
    use parking_lot::RwLock;

    /// Deterministic stand-in for the platform session.
    struct TestSession {
        state: RwLock<SessionState>,
        quality: RwLock<f32>,
    }

    impl TestSession {
        fn running() -> Arc<Self> {
            Arc::new(Self {
                state: RwLock::new(SessionState::Running),
                quality: RwLock::new(0.9),
            })
        }
    }

    impl ArSession for TestSession {
        fn state(&self) -> SessionState {
            *self.state.read()
        }
        fn tracking_state(&self) -> TrackingState {
            TrackingState::Normal
        }
        fn tracking_quality(&self) -> f32 {
            *self.quality.read()
        }
        fn restart(&self) -> Result<(), SessionError> {
            *self.state.write() = SessionState::Running;
            Ok(())
        }
    }

    fn floor_plane(id: u64, half: f32) -> DetectedPlane {
        DetectedPlane {
            id: PlaneId(id),
            alignment: PlaneAlignment::Horizontal,
            center: Vec3::ZERO,
            boundary: vec![
                Vec3::new(-half, 0.0, -half),
                Vec3::new(half, 0.0, -half),
                Vec3::new(half, 0.0, half),
                Vec3::new(-half, 0.0, half),
            ],
            area: 4.0 * half * half,
            confidence: 0.9,
            transform: Transform3::identity(),
        }
    }

    fn scanner() -> Scanner {
        Scanner::new(ScanConfig::default(), TestSession::running())
    }

    #[test]
    fn test_lifecycle_start_process_stop() {
        let scanner = scanner();
        assert_eq!(scanner.lifecycle(), ScanLifecycle::NotStarted);

        scanner.start();
        assert_eq!(scanner.lifecycle(), ScanLifecycle::Scanning);

        scanner.process_frame(vec![floor_plane(1, 1.5)], 0.9);
        let published = scanner.published();
        assert_eq!(published.raw_planes.len(), 1);
        assert_eq!(published.merged_planes.len(), 1);
        assert!(published.quality.is_some());

        scanner.stop();
        assert_eq!(scanner.lifecycle(), ScanLifecycle::Completed);
        let published = scanner.published();
        assert!((published.progress.completion - 1.0).abs() < 1e-6);
        assert_eq!(published.progress.phase, ScanPhase::Finalization);
    }

    #[test]
    fn test_frames_ignored_when_not_scanning() {
        let scanner = scanner();
        scanner.process_frame(vec![floor_plane(1, 1.5)], 0.9);
        assert!(scanner.published().raw_planes.is_empty());
    }

    #[test]
    fn test_sub_minimum_planes_filtered() {
        let scanner = scanner();
        scanner.start();
        // 0.04 m² is below the 0.1 m² minimum
        scanner.process_frame(vec![floor_plane(1, 0.1)], 0.9);
        assert!(scanner.published().raw_planes.is_empty());
    }

    #[test]
    fn test_poor_tracking_raises_issue() {
        let scanner = scanner();
        scanner.start();
        scanner.process_frame(vec![floor_plane(1, 1.5)], 0.1);
        let published = scanner.published();
        assert!(published
            .issues
            .iter()
            .any(|i| i.kind == IssueKind::PoorTracking
                && i.severity == IssueSeverity::Critical));
    }

    #[test]
    fn test_cancel_preserves_published_state() {
        let scanner = scanner();
        scanner.start();
        scanner.process_frame(vec![floor_plane(1, 1.5)], 0.9);
        scanner.cancel();
        assert_eq!(scanner.lifecycle(), ScanLifecycle::Cancelled);
        // State remains observable after cancellation
        assert_eq!(scanner.published().merged_planes.len(), 1);
    }

    #[test]
    fn test_subscription_receives_snapshots() {
        let scanner = scanner();
        let rx = scanner.subscribe();
        scanner.start();
        scanner.process_frame(vec![floor_plane(1, 1.5)], 0.9);
        let mut saw_merge = false;
        while let Ok(published) = rx.try_recv() {
            if !published.merged_planes.is_empty() {
                saw_merge = true;
            }
        }
        assert!(saw_merge);
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let scanner = scanner();
        scanner.start();
        scanner.process_frame(vec![floor_plane(1, 1.5)], 0.9);
        let snapshot = scanner.take_snapshot();

        scanner.process_frame(Vec::new(), 0.9);
        assert!(scanner.published().merged_planes.is_empty());

        scanner.restore_snapshot(&snapshot);
        let published = scanner.published();
        assert_eq!(published.raw_planes.len(), 1);
        assert_eq!(published.merged_planes.len(), 1);
    }

    #[test]
    fn test_discard_low_confidence() {
        let scanner = scanner();
        scanner.start();
        let mut weak = floor_plane(2, 1.2);
        weak.confidence = 0.2;
        weak.center = Vec3::new(4.0, 0.0, 4.0);
        for p in &mut weak.boundary {
            *p = *p + Vec3::new(4.0, 0.0, 4.0);
        }
        scanner.process_frame(vec![floor_plane(1, 1.5), weak], 0.9);
        assert_eq!(scanner.discard_low_confidence_planes(0.35), 1);
        scanner.reprocess();
        assert_eq!(scanner.published().raw_planes.len(), 1);
    }

    #[test]
    fn test_progress_phase_advances_with_surfaces() {
        let scanner = scanner();
        scanner.start();
        scanner.process_frame(vec![floor_plane(1, 1.5)], 0.9);
        let published = scanner.published();
        // Floor present, walls missing: wall-detection phase
        assert_eq!(published.progress.phase, ScanPhase::WallDetection);
        assert!(published.progress.floor_coverage > 0.0);
        assert!(published.progress.completion > 0.0);
    }

    #[test]
    fn test_result_summary() {
        let scanner = scanner();
        scanner.start();
        scanner.process_frame(vec![floor_plane(1, 1.5)], 0.9);
        scanner.stop();
        let result = scanner.result().unwrap();
        assert_eq!(result.raw_plane_count, 1);
        assert_eq!(result.merged_plane_count, 1);
        assert!(result.quality.overall > 0.0);
    }
}
