//! Scan phases and progress reporting.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ordered stage of the scanning workflow.
///
/// Phases only ever advance during a scan; an explicit reset is the only way
/// back to [`ScanPhase::FloorDetection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ScanPhase {
    /// Looking for the primary floor surface
    FloorDetection,
    /// Floor found, capturing walls
    WallDetection,
    /// Core surfaces found, capturing detail
    DetailScanning,
    /// Refining geometry
    Optimization,
    /// Wrapping up
    Finalization,
}

impl ScanPhase {
    /// Human-readable phase name.
    pub fn label(&self) -> &'static str {
        match self {
            ScanPhase::FloorDetection => "floor detection",
            ScanPhase::WallDetection => "wall detection",
            ScanPhase::DetailScanning => "detail scanning",
            ScanPhase::Optimization => "optimization",
            ScanPhase::Finalization => "finalization",
        }
    }
}

/// Live progress of an active scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Current workflow phase
    pub phase: ScanPhase,
    /// Overall completion in [0, 1]
    pub completion: f32,
    /// Floor coverage ratio in [0, 1]
    pub floor_coverage: f32,
    /// Wall coverage ratio in [0, 1]
    pub wall_coverage: f32,
    /// Time since scan start
    pub elapsed: Duration,
    /// Estimated time to completion, when derivable
    pub estimated_remaining: Option<Duration>,
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self {
            phase: ScanPhase::FloorDetection,
            completion: 0.0,
            floor_coverage: 0.0,
            wall_coverage: 0.0,
            elapsed: Duration::ZERO,
            estimated_remaining: None,
        }
    }
}

impl ScanProgress {
    /// Advance the phase, never regressing the ordering.
    pub fn advance_phase(&mut self, phase: ScanPhase) {
        if phase > self.phase {
            self.phase = phase;
        }
    }

    /// Estimate remaining time from the observed completion rate.
    ///
    /// Returns `None` until enough of the scan has completed for the rate to
    /// mean anything.
    pub fn estimate_remaining(&self) -> Option<Duration> {
        if self.completion < 0.05 || self.elapsed < Duration::from_secs(2) {
            return None;
        }
        let rate = self.completion / self.elapsed.as_secs_f32();
        if rate <= 0.0 {
            return None;
        }
        let remaining = (1.0 - self.completion) / rate;
        Some(Duration::from_secs_f32(remaining.max(0.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_never_regresses() {
        let mut progress = ScanProgress::default();
        progress.advance_phase(ScanPhase::DetailScanning);
        assert_eq!(progress.phase, ScanPhase::DetailScanning);
        progress.advance_phase(ScanPhase::WallDetection);
        assert_eq!(progress.phase, ScanPhase::DetailScanning);
        progress.advance_phase(ScanPhase::Finalization);
        assert_eq!(progress.phase, ScanPhase::Finalization);
    }

    #[test]
    fn test_remaining_estimate() {
        let progress = ScanProgress {
            completion: 0.5,
            elapsed: Duration::from_secs(30),
            ..Default::default()
        };
        let remaining = progress.estimate_remaining().unwrap();
        assert!((remaining.as_secs_f32() - 30.0).abs() < 0.5);

        // Too early to estimate
        let early = ScanProgress {
            completion: 0.01,
            elapsed: Duration::from_secs(30),
            ..Default::default()
        };
        assert!(early.estimate_remaining().is_none());
    }
}
