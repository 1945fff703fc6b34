//! Recovery snapshots.

use std::time::Instant;

use crate::core::{DetectedPlane, IssueList, MergedPlane, RoomDimensions, ScanProgress, ScanQuality};
use crate::session::{SessionState, TrackingState};

/// A consistent copy of scan state captured before corrective action.
///
/// Owned exclusively by the recovery manager: replaced when the next
/// snapshot is taken, dropped on manager teardown. Used as the restore
/// target when recovery has to roll the scanner back.
#[derive(Debug, Clone)]
pub struct ScanSnapshot {
    /// Raw planes at capture time
    pub raw_planes: Vec<DetectedPlane>,
    /// Merged planes at capture time
    pub merged_planes: Vec<MergedPlane>,
    /// Dimensions at capture time, if any
    pub dimensions: Option<RoomDimensions>,
    /// Quality report at capture time, if any
    pub quality: Option<ScanQuality>,
    /// Progress at capture time
    pub progress: ScanProgress,
    /// Issue list at capture time
    pub issues: IssueList,
    /// Session state at capture time
    pub session_state: SessionState,
    /// Tracking state at capture time
    pub tracking_state: TrackingState,
    /// Tracking quality at capture time
    pub tracking_quality: f32,
    /// When the snapshot was taken
    pub taken_at: Instant,
}
