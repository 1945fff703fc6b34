//! Room dimension inference from merged surfaces.
//!
//! Four independent strategies each produce an estimate with a fixed prior
//! confidence (floor 0.8, walls 0.7, ceiling 0.6, bounding box 0.5); all
//! that succeed are blended by confidence-weighted averaging. A strategy
//! whose preconditions fail simply drops out; only when none produce a
//! result does calculation fail.

use thiserror::Error;

use crate::config::DimensionConfig;
use crate::core::{MergedPlane, RoomDimensions, SurfaceType};

/// Plausible band for an estimated ceiling height (meters).
const PLAUSIBLE_HEIGHT: std::ops::RangeInclusive<f32> = 1.8..=4.0;

/// Dimension calculation failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DimensionError {
    /// Too few inputs for any strategy
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Every strategy's preconditions failed
    #[error("no dimension strategy produced a result")]
    CalculationFailed,

    /// Post-hoc validation rejected the blended result
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),
}

/// Infers room width/length/height from merged surfaces.
#[derive(Debug, Clone)]
pub struct DimensionCalculator {
    config: DimensionConfig,
}

impl DimensionCalculator {
    /// Create a calculator with the given limits.
    pub fn new(config: DimensionConfig) -> Self {
        Self { config }
    }

    /// Current limits.
    pub fn config(&self) -> &DimensionConfig {
        &self.config
    }

    /// Estimate room dimensions from merged surfaces.
    pub fn calculate(&self, planes: &[MergedPlane]) -> Result<RoomDimensions, DimensionError> {
        if planes.is_empty() {
            return Err(DimensionError::InsufficientData(
                "no merged planes".to_string(),
            ));
        }

        let mut estimates = Vec::new();
        if let Some(e) = self.floor_strategy(planes) {
            estimates.push(e);
        }
        if let Some(e) = self.wall_strategy(planes) {
            estimates.push(e);
        }
        if let Some(e) = self.ceiling_strategy(planes) {
            estimates.push(e);
        }
        if let Some(e) = self.bounding_box_strategy(planes) {
            estimates.push(e);
        }

        if estimates.is_empty() {
            return Err(DimensionError::CalculationFailed);
        }

        let blended = blend(&estimates);
        self.validate(&blended)?;

        log::debug!(
            "dimensions {:.2}x{:.2}x{:.2}m (confidence {:.2}, {} strategies)",
            blended.width,
            blended.length,
            blended.height,
            blended.confidence,
            estimates.len()
        );
        Ok(blended)
    }

    /// Floor-based estimate (prior 0.8): largest floor's bounds give
    /// width/length; height from a plane positioned 1.8-4.0m above it.
    fn floor_strategy(&self, planes: &[MergedPlane]) -> Option<RoomDimensions> {
        let floor = largest_of(planes, SurfaceType::Floor)?;
        let extent = floor.bounds.extent();
        let (width, length) = sorted_pair(extent.x, extent.z);

        let floor_y = floor.center.y;
        let found_height = planes
            .iter()
            .filter(|p| p.id != floor.id)
            .map(|p| p.bounds.max.y - floor_y)
            .filter(|h| PLAUSIBLE_HEIGHT.contains(h))
            .fold(None, |best: Option<f32>, h| {
                Some(best.map_or(h, |b| b.max(h)))
            });
        let height = found_height.unwrap_or_else(|| {
            self.config.default_ceiling_height.clamp(
                self.config.min_ceiling_height,
                self.config.max_ceiling_height,
            )
        });

        let mut confidence: f32 = 0.8;
        if floor.area > 15.0 {
            confidence += 0.05;
        }
        if rectangularity(floor) > 0.85 {
            confidence += 0.05;
        }
        if found_height.is_some() {
            confidence += 0.05;
        }

        Some(RoomDimensions::new(
            width,
            length,
            height,
            confidence.min(1.0),
        ))
    }

    /// Wall-based estimate (prior 0.7, needs two wall groups): the two most
    /// perpendicular wall groups span width and length.
    fn wall_strategy(&self, planes: &[MergedPlane]) -> Option<RoomDimensions> {
        let walls: Vec<&MergedPlane> = planes
            .iter()
            .filter(|p| p.surface_type == SurfaceType::Wall)
            .collect();
        if walls.len() < 2 {
            return None;
        }

        // Group by normal direction; opposite-facing normals describe the
        // same wall orientation, so similarity uses |cos|
        let mut groups: Vec<Vec<&MergedPlane>> = Vec::new();
        for wall in &walls {
            match groups.iter_mut().find(|g| {
                g[0].normal.dot(&wall.normal).abs() > self.config.wall_normal_similarity
            }) {
                Some(group) => group.push(wall),
                None => groups.push(vec![wall]),
            }
        }
        if groups.len() < 2 {
            return None;
        }

        // Pick the two most perpendicular groups
        let mut best: Option<(usize, usize, f32)> = None;
        for i in 0..groups.len() {
            for j in (i + 1)..groups.len() {
                let dot = groups[i][0].normal.dot(&groups[j][0].normal).abs();
                if best.map_or(true, |(_, _, d)| dot < d) {
                    best = Some((i, j, dot));
                }
            }
        }
        let (i, j, _) = best?;

        let span_a = max_pairwise_center_distance(&groups[i]);
        let span_b = max_pairwise_center_distance(&groups[j]);
        if span_a < 0.1 || span_b < 0.1 {
            return None;
        }
        let (width, length) = sorted_pair(span_a, span_b);

        let avg_height: f32 =
            walls.iter().map(|w| w.height_extent()).sum::<f32>() / walls.len() as f32;
        let max_height = walls
            .iter()
            .map(|w| w.height_extent())
            .fold(0.0f32, f32::max);
        // A full-height outlier wall is a better ceiling witness than the
        // average of partial detections
        let height = if max_height > 1.5 * avg_height {
            max_height
        } else {
            avg_height
        };

        Some(RoomDimensions::new(width, length, height, 0.7))
    }

    /// Ceiling-based estimate (prior 0.6): largest ceiling's bounds give
    /// width/length, its absolute center height gives room height.
    fn ceiling_strategy(&self, planes: &[MergedPlane]) -> Option<RoomDimensions> {
        let ceiling = largest_of(planes, SurfaceType::Ceiling)?;
        let extent = ceiling.bounds.extent();
        let (width, length) = sorted_pair(extent.x, extent.z);
        let height = ceiling.center.y;

        let mut confidence = 0.6;
        if !PLAUSIBLE_HEIGHT.contains(&height) {
            confidence *= 0.7;
        }

        Some(RoomDimensions::new(width, length, height, confidence))
    }

    /// Bounding-box fallback (prior 0.5): axis-aligned box over all planes.
    fn bounding_box_strategy(&self, planes: &[MergedPlane]) -> Option<RoomDimensions> {
        let mut bounds = planes.first()?.bounds;
        for plane in &planes[1..] {
            bounds.union(&plane.bounds);
        }
        let extent = bounds.extent();
        let (width, length) = sorted_pair(extent.x, extent.z);
        // With only horizontal surfaces the box is flat; fall back to the
        // default ceiling height rather than reporting a zero-height room
        let height = if extent.y < 0.5 {
            self.config.default_ceiling_height
        } else {
            extent.y
        };

        Some(RoomDimensions::new(width, length, height, 0.5))
    }

    fn validate(&self, dims: &RoomDimensions) -> Result<(), DimensionError> {
        if dims.width <= 0.0 || dims.length <= 0.0 || dims.height <= 0.0 {
            return Err(DimensionError::InvalidDimensions(format!(
                "non-positive dimension: {:.2}x{:.2}x{:.2}",
                dims.width, dims.length, dims.height
            )));
        }
        let max = self.config.max_room_size;
        if dims.width > max || dims.length > max || dims.height > max {
            return Err(DimensionError::InvalidDimensions(format!(
                "dimension exceeds {max}m maximum"
            )));
        }
        if dims.confidence <= 0.0 {
            return Err(DimensionError::InvalidDimensions(
                "non-positive confidence".to_string(),
            ));
        }
        Ok(())
    }
}

/// Confidence-weighted average of each dimension; final confidence is the
/// mean of the best and the average strategy confidence.
fn blend(estimates: &[RoomDimensions]) -> RoomDimensions {
    let weight_sum: f32 = estimates.iter().map(|e| e.confidence).sum();
    let width = estimates.iter().map(|e| e.width * e.confidence).sum::<f32>() / weight_sum;
    let length = estimates
        .iter()
        .map(|e| e.length * e.confidence)
        .sum::<f32>()
        / weight_sum;
    let height = estimates
        .iter()
        .map(|e| e.height * e.confidence)
        .sum::<f32>()
        / weight_sum;

    let max_conf = estimates.iter().map(|e| e.confidence).fold(0.0f32, f32::max);
    let mean_conf = weight_sum / estimates.len() as f32;
    RoomDimensions::new(width, length, height, (max_conf + mean_conf) / 2.0)
}

fn largest_of(planes: &[MergedPlane], surface_type: SurfaceType) -> Option<&MergedPlane> {
    planes
        .iter()
        .filter(|p| p.surface_type == surface_type)
        .max_by(|a, b| a.area.partial_cmp(&b.area).unwrap_or(std::cmp::Ordering::Equal))
}

fn max_pairwise_center_distance(group: &[&MergedPlane]) -> f32 {
    let mut max = 0.0f32;
    for i in 0..group.len() {
        for j in (i + 1)..group.len() {
            max = max.max(group[i].center.distance(&group[j].center));
        }
    }
    max
}

/// How much of the plane's horizontal bounding box its hull fills.
fn rectangularity(plane: &MergedPlane) -> f32 {
    let extent = plane.bounds.extent();
    let box_area = extent.x * extent.z;
    if box_area < 1e-6 {
        0.0
    } else {
        (plane.area / box_area).min(1.0)
    }
}

fn sorted_pair(a: f32, b: f32) -> (f32, f32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
