//! Scan quality scoring and remediation advice.
//!
//! [`QualityAssessor::assess`] is a total function: whatever the inputs, it
//! produces a [`ScanQuality`] with five sub-scores, a duration- and
//! issue-adjusted overall score, and recommendations. Degraded inputs lower
//! scores, they never fail the assessment.

use std::time::Duration;

use crate::config::QualityConfig;
use crate::core::{
    clamp01, DetectedPlane, IssueKind, IssueList, IssueSeverity, MergedPlane, QualityBand,
    RoomDimensions, ScanQuality, SurfaceType,
};

/// Fixed weights of the five sub-scores in the overall score.
const WEIGHT_COMPLETENESS: f32 = 0.25;
const WEIGHT_ACCURACY: f32 = 0.25;
const WEIGHT_COVERAGE: f32 = 0.20;
const WEIGHT_PLANE_QUALITY: f32 = 0.15;
const WEIGHT_TRACKING: f32 = 0.15;

/// Issue penalties by severity, additive and capped.
const PENALTY_CRITICAL: f32 = 0.20;
const PENALTY_HIGH: f32 = 0.15;
const PENALTY_MEDIUM: f32 = 0.10;
const PENALTY_LOW: f32 = 0.05;
const PENALTY_CAP: f32 = 0.60;

/// Sub-scores below this threshold generate remediation advice.
const RECOMMENDATION_THRESHOLD: f32 = 0.7;

/// Scores a scan along five independent axes.
#[derive(Debug, Clone)]
pub struct QualityAssessor {
    config: QualityConfig,
}

impl QualityAssessor {
    /// Create an assessor with the given scene expectations.
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    /// Current scene expectations.
    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Score the current scan state. Total function, never fails.
    pub fn assess(
        &self,
        detected: &[DetectedPlane],
        merged: &[MergedPlane],
        dimensions: Option<&RoomDimensions>,
        scan_duration: Duration,
        tracking_quality: f32,
        issues: &IssueList,
    ) -> ScanQuality {
        let completeness = self.completeness(merged);
        let accuracy = self.accuracy(detected, merged, dimensions);
        let coverage = self.coverage(merged);
        let plane_quality = self.plane_quality(detected, merged);
        let tracking_stability = clamp01(tracking_quality);

        let weighted = completeness * WEIGHT_COMPLETENESS
            + accuracy * WEIGHT_ACCURACY
            + coverage * WEIGHT_COVERAGE
            + plane_quality * WEIGHT_PLANE_QUALITY
            + tracking_stability * WEIGHT_TRACKING;

        let modifier = duration_modifier(scan_duration, &self.config);
        let penalty = issue_penalty(issues);
        let overall = clamp01(weighted * modifier * (1.0 - penalty));

        let mut quality = ScanQuality {
            overall,
            completeness,
            accuracy,
            coverage,
            plane_quality,
            tracking_stability,
            issues: issues.issues().to_vec(),
            recommendations: Vec::new(),
        };
        quality.recommendations = self.recommendations(&quality);
        quality
    }

    /// A scan is unacceptable when overall, completeness, or accuracy drop
    /// below 0.3, or more than two critical issues are present.
    pub fn is_acceptable(&self, quality: &ScanQuality) -> bool {
        let criticals = quality
            .issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Critical)
            .count();
        quality.overall >= 0.3
            && quality.completeness >= 0.3
            && quality.accuracy >= 0.3
            && criticals <= 2
    }

    /// Weighted presence of floor (40%), walls toward the expected count
    /// (50%), ceiling (10%), plus a 5% all-types bonus.
    fn completeness(&self, merged: &[MergedPlane]) -> f32 {
        let has_floor = merged.iter().any(|p| p.surface_type == SurfaceType::Floor);
        let has_ceiling = merged.iter().any(|p| p.surface_type == SurfaceType::Ceiling);
        let wall_count = merged
            .iter()
            .filter(|p| p.surface_type == SurfaceType::Wall)
            .count();

        let mut score = 0.0;
        if has_floor {
            score += 0.4;
        }
        score += 0.5 * (wall_count as f32 / self.config.expected_wall_count as f32).min(1.0);
        if has_ceiling {
            score += 0.1;
        }
        if has_floor && has_ceiling && wall_count > 0 {
            score += 0.05;
        }
        clamp01(score)
    }

    /// Blend of raw confidence (30%), merged confidence (30%), dimension
    /// confidence (25%), and geometric consistency (15%). Absent terms drop
    /// out and the remaining weights renormalize.
    fn accuracy(
        &self,
        detected: &[DetectedPlane],
        merged: &[MergedPlane],
        dimensions: Option<&RoomDimensions>,
    ) -> f32 {
        if detected.is_empty() && merged.is_empty() {
            return 0.0;
        }

        let mut score_sum = 0.0;
        let mut weight_sum = 0.0;

        if !detected.is_empty() {
            let mean = detected.iter().map(|p| p.confidence).sum::<f32>() / detected.len() as f32;
            score_sum += 0.30 * mean;
            weight_sum += 0.30;
        }
        if !merged.is_empty() {
            let mean = merged.iter().map(|p| p.confidence).sum::<f32>() / merged.len() as f32;
            score_sum += 0.30 * mean;
            weight_sum += 0.30;
        }
        if let Some(dims) = dimensions {
            score_sum += 0.25 * clamp01(dims.confidence);
            weight_sum += 0.25;
        }
        score_sum += 0.15 * geometric_consistency(merged);
        weight_sum += 0.15;

        if weight_sum <= 0.0 {
            0.0
        } else {
            clamp01(score_sum / weight_sum)
        }
    }

    /// Floor area versus the expected minimum room area (50%) plus wall
    /// area versus an estimate from floor perimeter and standard ceiling
    /// height (50%).
    fn coverage(&self, merged: &[MergedPlane]) -> f32 {
        let floor_area: f32 = merged
            .iter()
            .filter(|p| p.surface_type == SurfaceType::Floor)
            .map(|p| p.area)
            .sum();
        let wall_area: f32 = merged
            .iter()
            .filter(|p| p.surface_type == SurfaceType::Wall)
            .map(|p| p.area)
            .sum();

        let floor_term = (floor_area / self.config.expected_min_room_area).min(1.0);

        let expected_wall_area = if floor_area > 0.0 {
            let floor = merged
                .iter()
                .filter(|p| p.surface_type == SurfaceType::Floor)
                .max_by(|a, b| {
                    a.area
                        .partial_cmp(&b.area)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            let perimeter = floor
                .map(|f| {
                    let e = f.bounds.extent();
                    2.0 * (e.x + e.z)
                })
                .unwrap_or(0.0);
            perimeter * self.config.standard_ceiling_height
        } else {
            self.config.min_wall_area * self.config.expected_wall_count as f32
        };
        let wall_term = if expected_wall_area > 0.0 {
            (wall_area / expected_wall_area).min(1.0)
        } else {
            0.0
        };

        clamp01(0.5 * floor_term + 0.5 * wall_term)
    }

    /// Raw plane size (40%), merge efficiency toward the optimal reduction
    /// ratio (30%), and merged-size consistency (30%).
    fn plane_quality(&self, detected: &[DetectedPlane], merged: &[MergedPlane]) -> f32 {
        if detected.is_empty() {
            return 0.0;
        }

        let mean_area = detected.iter().map(|p| p.area).sum::<f32>() / detected.len() as f32;
        let size_term = (mean_area / self.config.good_plane_area).min(1.0);

        let efficiency_term = if merged.is_empty() {
            0.0
        } else {
            let ratio = merged.len() as f32 / detected.len() as f32;
            let optimal = self.config.optimal_merge_ratio;
            if ratio >= optimal {
                // No reduction at all scores zero
                1.0 - (ratio - optimal) / (1.0 - optimal)
            } else {
                1.0 - (optimal - ratio) / optimal
            }
        };

        let consistency_term = if merged.len() < 2 {
            1.0
        } else {
            let mean = merged.iter().map(|p| p.area).sum::<f32>() / merged.len() as f32;
            if mean <= 0.0 {
                0.0
            } else {
                let variance = merged
                    .iter()
                    .map(|p| (p.area - mean) * (p.area - mean))
                    .sum::<f32>()
                    / merged.len() as f32;
                let cv = variance.sqrt() / mean;
                1.0 / (1.0 + cv)
            }
        };

        clamp01(0.4 * size_term + 0.3 * clamp01(efficiency_term) + 0.3 * consistency_term)
    }

    fn recommendations(&self, quality: &ScanQuality) -> Vec<String> {
        let mut recs = Vec::new();

        if quality.completeness < RECOMMENDATION_THRESHOLD {
            recs.push(
                "Scan more of the room: capture the floor and all walls before finishing"
                    .to_string(),
            );
        }
        if quality.accuracy < RECOMMENDATION_THRESHOLD {
            recs.push(
                "Move slowly and keep surfaces in view longer to refine measurements".to_string(),
            );
        }
        if quality.coverage < RECOMMENDATION_THRESHOLD {
            recs.push("Walk closer to walls and sweep the camera across uncovered areas".to_string());
        }
        if quality.plane_quality < RECOMMENDATION_THRESHOLD {
            recs.push("Hold the device steady to let small surface fragments merge".to_string());
        }
        if quality.tracking_stability < RECOMMENDATION_THRESHOLD {
            recs.push("Improve lighting and avoid fast motion to stabilize tracking".to_string());
        }

        for issue in &quality.issues {
            if let Some(advice) = issue_advice(issue.kind) {
                let advice = advice.to_string();
                if !recs.contains(&advice) {
                    recs.push(advice);
                }
            }
        }

        recs.push(match quality.band() {
            QualityBand::Excellent => "Scan quality is excellent; ready to finish".to_string(),
            QualityBand::Good => "Scan quality is good; a little more coverage would help".to_string(),
            QualityBand::Fair => {
                "Scan quality is fair; keep scanning to improve the result".to_string()
            }
            QualityBand::Poor => {
                "Scan quality is poor; consider restarting in better conditions".to_string()
            }
        });

        recs
    }
}

/// Wall-to-wall perpendicularity plus wall-to-floor height alignment.
fn geometric_consistency(merged: &[MergedPlane]) -> f32 {
    let walls: Vec<&MergedPlane> = merged
        .iter()
        .filter(|p| p.surface_type == SurfaceType::Wall)
        .collect();

    // Room walls should be pairwise parallel or perpendicular; anything in
    // between counts against consistency
    let angle_term = if walls.len() < 2 {
        1.0
    } else {
        let mut error_sum = 0.0;
        let mut pairs = 0;
        for i in 0..walls.len() {
            for j in (i + 1)..walls.len() {
                let dot = walls[i].normal.dot(&walls[j].normal).abs();
                error_sum += dot.min(1.0 - dot) * 2.0;
                pairs += 1;
            }
        }
        1.0 - error_sum / pairs as f32
    };

    // Wall tops should line up
    let height_term = if walls.len() < 2 {
        1.0
    } else {
        let tops: Vec<f32> = walls.iter().map(|w| w.bounds.max.y).collect();
        let mean = tops.iter().sum::<f32>() / tops.len() as f32;
        if mean.abs() < 1e-6 {
            1.0
        } else {
            let variance =
                tops.iter().map(|t| (t - mean) * (t - mean)).sum::<f32>() / tops.len() as f32;
            clamp01(1.0 - variance.sqrt() / mean.abs())
        }
    };

    clamp01(0.5 * angle_term + 0.5 * height_term)
}

/// Modifier for scan duration: short scans scale proportionally down to
/// 0.2, overlong scans lose up to 30% linearly with the excess.
fn duration_modifier(duration: Duration, config: &QualityConfig) -> f32 {
    let secs = duration.as_secs_f32();
    if secs < config.min_scan_duration_secs {
        (secs / config.min_scan_duration_secs).max(0.2)
    } else if secs > config.max_scan_duration_secs {
        let excess = (secs - config.max_scan_duration_secs) / config.max_scan_duration_secs;
        1.0 - 0.3 * excess.min(1.0)
    } else {
        1.0
    }
}

/// Additive severity penalty, capped at 60%.
fn issue_penalty(issues: &IssueList) -> f32 {
    let total: f32 = issues
        .issues()
        .iter()
        .map(|i| match i.severity {
            IssueSeverity::Critical => PENALTY_CRITICAL,
            IssueSeverity::High => PENALTY_HIGH,
            IssueSeverity::Medium => PENALTY_MEDIUM,
            IssueSeverity::Low => PENALTY_LOW,
        })
        .sum();
    total.min(PENALTY_CAP)
}

fn issue_advice(kind: IssueKind) -> Option<&'static str> {
    match kind {
        IssueKind::PoorTracking => Some("Point the camera at textured surfaces to regain tracking"),
        IssueKind::MissingWall => Some("Turn toward unscanned walls and capture them fully"),
        IssueKind::IncompleteFloor => Some("Sweep the camera across the remaining floor area"),
        IssueKind::OverlappingPlanes => None,
        IssueKind::LowLighting => Some("Turn on more lights or open curtains"),
        IssueKind::ExcessiveMotion => Some("Slow down; fast motion blurs surface detection"),
        IssueKind::OccludedSurfaces => Some("Move around furniture blocking the walls"),
        IssueKind::UnstableGeometry => Some("Rescan areas where surfaces keep shifting"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Bounds3, PlaneId, Vec3};

    fn merged(surface_type: SurfaceType, area: f32, confidence: f32) -> MergedPlane {
        let normal = match surface_type {
            SurfaceType::Wall => Vec3::new(0.0, 0.0, 1.0),
            SurfaceType::Ceiling => Vec3::new(0.0, -1.0, 0.0),
            _ => Vec3::UP,
        };
        let half = area.sqrt() / 2.0;
        let (min, max) = match surface_type {
            SurfaceType::Wall => (
                Vec3::new(-half, 0.0, 0.0),
                Vec3::new(half, 2.4, 0.0),
            ),
            SurfaceType::Ceiling => (
                Vec3::new(-half, 2.4, -half),
                Vec3::new(half, 2.4, half),
            ),
            _ => (Vec3::new(-half, 0.0, -half), Vec3::new(half, 0.0, half)),
        };
        MergedPlane {
            id: PlaneId::next_merged(),
            surface_type,
            source_ids: vec![],
            center: Vec3::ZERO,
            normal,
            bounds: Bounds3 { min, max },
            area,
            confidence,
            boundary: vec![min, Vec3::ZERO, max],
        }
    }

    fn full_room() -> Vec<MergedPlane> {
        let mut planes = vec![
            merged(SurfaceType::Floor, 12.0, 0.9),
            merged(SurfaceType::Ceiling, 12.0, 0.8),
        ];
        for i in 0..4 {
            let mut wall = merged(SurfaceType::Wall, 9.0, 0.85);
            if i % 2 == 1 {
                wall.normal = Vec3::new(1.0, 0.0, 0.0);
            }
            planes.push(wall);
        }
        planes
    }

    fn assessor() -> QualityAssessor {
        QualityAssessor::new(QualityConfig::default())
    }

    #[test]
    fn test_empty_scan_scores_low() {
        let quality = assessor().assess(
            &[],
            &[],
            None,
            Duration::from_secs(60),
            0.0,
            &IssueList::new(),
        );
        assert!(quality.overall < 0.2);
        assert!(!assessor().is_acceptable(&quality));
    }

    #[test]
    fn test_completeness_weights() {
        let a = assessor();
        let floor_only = vec![merged(SurfaceType::Floor, 12.0, 0.9)];
        assert!((a.completeness(&floor_only) - 0.4).abs() < 1e-5);

        let two_walls = vec![
            merged(SurfaceType::Wall, 9.0, 0.8),
            merged(SurfaceType::Wall, 9.0, 0.8),
        ];
        assert!((a.completeness(&two_walls) - 0.25).abs() < 1e-5);

        // Full room: 0.4 + 0.5 + 0.1 + 0.05 bonus
        assert!((a.completeness(&full_room()) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_zero_duration_modifier() {
        let config = QualityConfig::default();
        assert!((duration_modifier(Duration::ZERO, &config) - 0.2).abs() < 1e-5);
        assert!((duration_modifier(Duration::from_secs(15), &config) - 0.5).abs() < 1e-5);
        assert!((duration_modifier(Duration::from_secs(60), &config) - 1.0).abs() < 1e-5);
        // 270s = 90s excess over 180s -> 1 - 0.3 * 0.5
        assert!((duration_modifier(Duration::from_secs(270), &config) - 0.85).abs() < 1e-5);
    }

    #[test]
    fn test_issue_penalty_cap() {
        let mut issues = IssueList::new();
        for i in 0..3 {
            issues.push(
                IssueKind::PoorTracking,
                IssueSeverity::Critical,
                format!("critical {i}"),
                None,
            );
        }
        // 3 x 0.20 = 0.60, exactly at the cap
        assert!((issue_penalty(&issues) - 0.6).abs() < 1e-6);

        issues.push(IssueKind::LowLighting, IssueSeverity::High, "dark", None);
        assert!((issue_penalty(&issues) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_overall_monotone_in_critical_issues() {
        let a = assessor();
        let room = full_room();
        let duration = Duration::from_secs(60);

        let mut issues = IssueList::new();
        let mut previous = f32::MAX;
        for i in 0..5 {
            let quality = a.assess(&[], &room, None, duration, 0.9, &issues);
            assert!(quality.overall <= previous);
            previous = quality.overall;
            issues.push(
                IssueKind::UnstableGeometry,
                IssueSeverity::Critical,
                format!("drift {i}"),
                None,
            );
        }
    }

    #[test]
    fn test_good_scan_is_acceptable() {
        let a = assessor();
        let dims = RoomDimensions::new(3.0, 4.0, 2.4, 0.8);
        let quality = a.assess(
            &[],
            &full_room(),
            Some(&dims),
            Duration::from_secs(90),
            0.95,
            &IssueList::new(),
        );
        assert!(quality.overall > 0.5);
        assert!(a.is_acceptable(&quality));
        // Healthy sub-scores produce only the band summary
        assert!(!quality.recommendations.is_empty());
    }

    #[test]
    fn test_three_criticals_unacceptable() {
        let a = assessor();
        let mut issues = IssueList::new();
        for i in 0..3 {
            issues.push(
                IssueKind::PoorTracking,
                IssueSeverity::Critical,
                format!("c{i}"),
                None,
            );
        }
        let quality = a.assess(&[], &full_room(), None, Duration::from_secs(60), 0.9, &issues);
        assert!(!a.is_acceptable(&quality));
    }

    #[test]
    fn test_low_subscores_generate_recommendations() {
        let quality = assessor().assess(
            &[],
            &[],
            None,
            Duration::from_secs(5),
            0.1,
            &IssueList::new(),
        );
        // Completeness, coverage, tracking advice plus the band summary
        assert!(quality.recommendations.len() >= 3);
        assert!(quality
            .recommendations
            .iter()
            .any(|r| r.contains("poor")));
    }
}
