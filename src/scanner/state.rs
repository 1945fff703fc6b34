//! Scan lifecycle, published state, and scan results.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::{
    DetectedPlane, MergedPlane, RoomDimensions, ScanIssue, ScanPhase, ScanProgress, ScanQuality,
};
use crate::recovery::{RecoveryProgress, RecoveryState};

/// Overall scan lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ScanLifecycle {
    /// No scan yet
    #[default]
    NotStarted,
    /// Start requested, state being reset
    Initializing,
    /// Receiving plane updates
    Scanning,
    /// Final merge/assess pass running
    Processing,
    /// Scan finished normally
    Completed,
    /// Scan cancelled by the consumer
    Cancelled,
    /// AR session failure ended the scan
    Failed,
}

impl ScanLifecycle {
    /// True while the scan accepts plane updates.
    pub fn is_active(&self) -> bool {
        matches!(self, ScanLifecycle::Scanning)
    }

    /// True once the scan reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanLifecycle::Completed | ScanLifecycle::Cancelled | ScanLifecycle::Failed
        )
    }
}

/// Immutable snapshot of everything consumers may observe.
///
/// Published by clone: readers never see a partial update, and holding a
/// snapshot never blocks the scanner.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PublishedState {
    /// Scan lifecycle
    pub lifecycle: ScanLifecycle,
    /// Phase/completion/coverage progress
    pub progress: ScanProgress,
    /// Current raw planes
    pub raw_planes: Vec<DetectedPlane>,
    /// Current merged surfaces
    pub merged_planes: Vec<MergedPlane>,
    /// Latest valid dimensions, if any
    pub dimensions: Option<RoomDimensions>,
    /// Latest quality report, if any
    pub quality: Option<ScanQuality>,
    /// Live issue list
    pub issues: Vec<ScanIssue>,
    /// Recovery state mirrored from the recovery manager
    pub recovery_state: RecoveryState,
    /// Recovery progress mirrored from the recovery manager
    pub recovery_progress: RecoveryProgress,
}

/// Summary of a finished (or in-flight) scan for downstream consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Final phase reached
    pub phase: ScanPhase,
    /// Estimated dimensions, if computed
    pub dimensions: Option<RoomDimensions>,
    /// Final quality report
    pub quality: ScanQuality,
    /// Total scan duration
    pub duration: Duration,
    /// Raw planes at the end of the scan
    pub raw_plane_count: usize,
    /// Merged surfaces at the end of the scan
    pub merged_plane_count: usize,
}
