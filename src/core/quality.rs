//! Scan quality report types.
//!
//! [`ScanQuality`] is a derived value: fully recomputed by the assessor on
//! every plane update and replaced wholesale, never merged in place.

use serde::{Deserialize, Serialize};

use super::issue::ScanIssue;

/// Quality grade bands used for summary advice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityBand {
    /// Overall score >= 0.85
    Excellent,
    /// Overall score >= 0.7
    Good,
    /// Overall score >= 0.5
    Fair,
    /// Everything below
    Poor,
}

impl QualityBand {
    /// Band for an overall score.
    pub fn from_score(score: f32) -> Self {
        if score >= 0.85 {
            QualityBand::Excellent
        } else if score >= 0.7 {
            QualityBand::Good
        } else if score >= 0.5 {
            QualityBand::Fair
        } else {
            QualityBand::Poor
        }
    }
}

/// Quality report for the current scan state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScanQuality {
    /// Weighted overall score in [0, 1]
    pub overall: f32,
    /// Surface-type completeness in [0, 1]
    pub completeness: f32,
    /// Measurement accuracy in [0, 1]
    pub accuracy: f32,
    /// Spatial coverage in [0, 1]
    pub coverage: f32,
    /// Raw/merged plane quality in [0, 1]
    pub plane_quality: f32,
    /// Tracking stability in [0, 1]
    pub tracking_stability: f32,
    /// Issues at the time of assessment
    pub issues: Vec<ScanIssue>,
    /// Human-readable remediation advice
    pub recommendations: Vec<String>,
}

impl ScanQuality {
    /// Summary band for the overall score.
    pub fn band(&self) -> QualityBand {
        QualityBand::from_score(self.overall)
    }
}
