//! Degradation monitoring and recovery orchestration.
//!
//! The [`RecoveryManager`] watches the scanner's published state plus
//! session/tracking health on a periodic check, decides when reconstruction
//! has degraded, and drives a bounded sequence of corrective actions. It
//! never mutates scan state from its own threads directly; every correction
//! goes through the scanner's serialized owner.

mod manager;
mod snapshot;

pub use manager::RecoveryManager;
pub use snapshot::ScanSnapshot;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Recovery state machine.
///
/// ```text
/// None -> Monitoring -> NeedsRecovery -> Recovering -> Recovered -> Monitoring
///                                                  \-> Failed (until retried)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RecoveryState {
    /// Not monitoring
    #[default]
    None,
    /// Healthy, watching for degradation
    Monitoring,
    /// Degradation detected, snapshot taken
    NeedsRecovery,
    /// Recovery attempt in progress
    Recovering,
    /// Last attempt succeeded; transient, returns to monitoring
    Recovered,
    /// Last attempt failed; stays until explicitly retried
    Failed,
}

impl RecoveryState {
    /// True when `attempt_recovery` is permitted from this state.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RecoveryState::NeedsRecovery | RecoveryState::Failed)
    }
}

/// Phase within a single recovery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RecoveryPhase {
    /// No attempt running
    #[default]
    Idle,
    /// Deriving the action list from detected problems
    Analyzing,
    /// Running corrective actions
    Executing,
    /// Re-checking health after the actions
    Verifying,
    /// Attempt finished successfully
    Completed,
    /// Attempt failed
    Failed,
}

/// A corrective action derived from detected problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryAction {
    /// Restart the AR session and wait for it to settle
    RestartSession,
    /// Wait (bounded) for tracking quality to come back
    ImproveTracking,
    /// Guide the user to rescan missing surfaces
    RescanMissingSurfaces,
    /// Re-run the merge/assess pipeline over current raw planes
    RecalibrateGeometry,
    /// Drop low-confidence raw planes, then recalibrate
    DiscardPoorPlanes,
    /// Roll the scanner back to the last snapshot
    RestoreSnapshot,
}

impl RecoveryAction {
    /// Short description for logs and progress reporting.
    pub fn label(&self) -> &'static str {
        match self {
            RecoveryAction::RestartSession => "restart session",
            RecoveryAction::ImproveTracking => "improve tracking",
            RecoveryAction::RescanMissingSurfaces => "rescan missing surfaces",
            RecoveryAction::RecalibrateGeometry => "recalibrate geometry",
            RecoveryAction::DiscardPoorPlanes => "discard poor planes",
            RecoveryAction::RestoreSnapshot => "restore snapshot",
        }
    }
}

/// A problem found by the periodic health check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HealthProblem {
    /// Overall quality below the recovery threshold
    LowQuality(f32),
    /// Completeness below the recovery threshold
    LowCompleteness(f32),
    /// AR session failed
    SessionFailed,
    /// AR session interrupted by the platform
    SessionInterrupted,
    /// Tracking unavailable
    TrackingUnavailable,
    /// Too many critical issues
    CriticalIssues(usize),
}

/// Progress of the current (or last) recovery attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RecoveryProgress {
    /// Current phase
    pub phase: RecoveryPhase,
    /// Action being executed, if any
    pub current_action: Option<RecoveryAction>,
    /// Actions completed so far in this attempt
    pub actions_completed: usize,
    /// Total actions planned for this attempt
    pub actions_total: usize,
    /// Attempts used so far this scan
    pub attempts_used: usize,
}

/// Recovery failure surfaced to the caller of `attempt_recovery`.
///
/// None of these crash the scanner; the caller decides whether to retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecoveryError {
    /// The AR session refused to restart
    #[error("session restart failed: {0}")]
    SessionRestartFailed(String),

    /// Not enough scanned surfaces to act on
    #[error("insufficient surfaces for recovery")]
    InsufficientSurfaces,

    /// Restore requested but no snapshot exists
    #[error("no snapshot available to restore")]
    NoSnapshotAvailable,

    /// A bounded step ran out of time
    #[error("recovery step timed out: {0}")]
    Timeout(&'static str),

    /// The per-scan attempt budget is spent
    #[error("maximum recovery attempts reached")]
    MaxAttemptsReached,

    /// `attempt_recovery` called from a non-recoverable state
    #[error("recovery not permitted from state {0:?}")]
    NotRecoverable(RecoveryState),

    /// Post-recovery verification still found problems
    #[error("recovery verification failed: {0}")]
    VerificationFailed(String),

    /// The attempt was cancelled
    #[error("recovery cancelled")]
    Cancelled,
}

/// Event streamed by a background recovery attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryEvent {
    /// The attempt moved to a new phase
    PhaseChanged(RecoveryPhase),
    /// An action started executing
    ActionStarted(RecoveryAction),
    /// The attempt finished successfully
    Completed,
    /// The attempt failed
    Failed(RecoveryError),
}
