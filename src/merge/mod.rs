//! Plane merging: fusing raw detections into semantic room surfaces.
//!
//! The AR subsystem reports many overlapping plane fragments for each
//! physical surface. [`PlaneMerger`] groups them by alignment and spatial
//! bucket, clusters connected fragments, and consolidates each cluster's
//! combined boundary into a single convex surface with a semantic type.
//!
//! Merging is pure given its configuration: it never mutates inputs and
//! produces a fully fresh set of [`MergedPlane`]s per pass.

pub mod cluster;
pub mod hull;

use std::collections::HashMap;
use std::f32::consts::PI;

use crate::config::MergingConfig;
use crate::core::{
    Bounds3, DetectedPlane, MergedPlane, PlaneAlignment, PlaneId, Point2D, SurfaceType, Vec3,
};

use cluster::connected_components;
use hull::{convex_hull, polygon_area};

/// Horizontal planes at or below this height qualify as floor candidates
/// (meters, world Y).
const FLOOR_HEIGHT_CUTOFF: f32 = 0.5;

/// Minimum area for a low horizontal plane to be typed as floor rather than
/// a furniture surface (square meters).
const FLOOR_MIN_AREA: f32 = 1.0;

/// Smallest orientation grid step for wall normal quantization (radians,
/// 5 degrees). Keeps the bucket count bounded for near-1.0 similarity
/// thresholds.
const MIN_ORIENTATION_STEP: f32 = PI / 36.0;

/// Groups and fuses detected planes into semantic room surfaces.
#[derive(Debug, Clone)]
pub struct PlaneMerger {
    config: MergingConfig,
}

impl PlaneMerger {
    /// Create a merger with the given tolerances.
    pub fn new(config: MergingConfig) -> Self {
        Self { config }
    }

    /// Current tolerances.
    pub fn config(&self) -> &MergingConfig {
        &self.config
    }

    /// Merge raw detections into semantic surfaces.
    ///
    /// Returns an empty list for empty input. Every output plane has area at
    /// least `min_plane_area` and a boundary of at least 3 points.
    pub fn merge(&self, planes: &[DetectedPlane]) -> Vec<MergedPlane> {
        if planes.is_empty() {
            return Vec::new();
        }

        let horizontal: Vec<&DetectedPlane> = planes
            .iter()
            .filter(|p| p.alignment == PlaneAlignment::Horizontal)
            .collect();
        let vertical: Vec<&DetectedPlane> = planes
            .iter()
            .filter(|p| p.alignment == PlaneAlignment::Vertical)
            .collect();

        let mut merged = self.merge_horizontal(&horizontal);
        merged.extend(self.merge_vertical(&vertical));

        log::debug!(
            "merged {} raw planes into {} surfaces",
            planes.len(),
            merged.len()
        );
        merged
    }

    /// Center-to-center distance limit for clustering.
    ///
    /// Clustering always runs within a same-alignment bucket, so the limit
    /// tightens from `max_merge_distance` to 3x the merge threshold.
    fn adjacency_limit(&self) -> f32 {
        self.config
            .max_merge_distance
            .min(3.0 * self.config.merge_threshold)
    }

    /// Orientation grid step for wall normal quantization, derived from the
    /// configured cosine-similarity threshold.
    fn orientation_step(&self) -> f32 {
        self.config
            .normal_similarity
            .clamp(-1.0, 1.0)
            .acos()
            .max(MIN_ORIENTATION_STEP)
    }

    fn merge_horizontal(&self, planes: &[&DetectedPlane]) -> Vec<MergedPlane> {
        // Bucket by height quantized to the merge-threshold grid
        let mut buckets: HashMap<i64, Vec<&DetectedPlane>> = HashMap::new();
        for plane in planes {
            let key = (plane.center.y / self.config.merge_threshold).round() as i64;
            buckets.entry(key).or_default().push(plane);
        }

        let limit_sq = self.adjacency_limit() * self.adjacency_limit();
        let mut merged = Vec::new();
        for bucket in buckets.values() {
            let components = connected_components(bucket.len(), |i, j| {
                bucket[i].center.distance_squared(&bucket[j].center) < limit_sq
            });
            for component in components {
                let members: Vec<&DetectedPlane> =
                    component.iter().map(|&i| bucket[i]).collect();
                if let Some(plane) = self.build_horizontal(&members) {
                    merged.push(plane);
                }
            }
        }
        merged
    }

    /// Consolidate one horizontal cluster into a merged plane.
    ///
    /// The cluster's combined points are hulled in the XZ plane and
    /// re-embedded at the cluster's area-weighted mean height. Clusters with
    /// a degenerate hull or sub-minimum area are dropped.
    fn build_horizontal(&self, members: &[&DetectedPlane]) -> Option<MergedPlane> {
        let points_2d: Vec<Point2D> = gather_points(members)
            .iter()
            .map(|p| Point2D::new(p.x, p.z))
            .collect();

        let hull = convex_hull(&points_2d);
        if hull.len() < 3 {
            return None;
        }
        let area = polygon_area(&hull);
        if area < self.config.min_plane_area {
            return None;
        }

        let (height, confidence) = {
            let mut weight_sum = 0.0;
            let mut height_sum = 0.0;
            let mut conf_sum = 0.0;
            for m in members {
                let w = m.area.max(1e-6);
                weight_sum += w;
                height_sum += m.center.y * w;
                conf_sum += m.confidence * w;
            }
            (height_sum / weight_sum, conf_sum / weight_sum)
        };

        let boundary: Vec<Vec3> = hull
            .iter()
            .map(|p| Vec3::new(p.x, height, p.y))
            .collect();
        let center = centroid(&boundary);
        let bounds = Bounds3::from_points(&boundary)?;

        let surface_type = if height > self.config.ceiling_height_cutoff {
            SurfaceType::Ceiling
        } else if height < FLOOR_HEIGHT_CUTOFF && area >= FLOOR_MIN_AREA {
            SurfaceType::Floor
        } else {
            SurfaceType::Surface
        };
        let normal = match surface_type {
            SurfaceType::Ceiling => Vec3::new(0.0, -1.0, 0.0),
            _ => Vec3::UP,
        };

        Some(MergedPlane {
            id: PlaneId::next_merged(),
            surface_type,
            source_ids: source_ids(members),
            center,
            normal,
            bounds,
            area,
            confidence,
            boundary,
        })
    }

    fn merge_vertical(&self, planes: &[&DetectedPlane]) -> Vec<MergedPlane> {
        // Bucket by (quantized orientation, quantized signed distance from
        // origin along the normal)
        let orientation_step = self.orientation_step();
        let orientation_buckets = (2.0 * PI / orientation_step).round() as i32;
        let mut buckets: HashMap<(i32, i64), Vec<(&DetectedPlane, Vec3)>> = HashMap::new();
        for plane in planes {
            let Some(normal) = wall_normal(plane) else {
                continue;
            };
            let angle = normal.z.atan2(normal.x);
            let orient_key =
                ((angle / orientation_step).round() as i32).rem_euclid(orientation_buckets);
            let distance = normal.dot(&plane.center);
            let dist_key = (distance / self.config.merge_threshold).round() as i64;
            buckets
                .entry((orient_key, dist_key))
                .or_default()
                .push((plane, normal));
        }

        let limit_sq = self.adjacency_limit() * self.adjacency_limit();
        let mut merged = Vec::new();
        for bucket in buckets.values() {
            let components = connected_components(bucket.len(), |i, j| {
                bucket[i].1.dot(&bucket[j].1) >= self.config.normal_similarity
                    && bucket[i].0.center.distance_squared(&bucket[j].0.center) < limit_sq
            });
            for component in components {
                let members: Vec<(&DetectedPlane, Vec3)> =
                    component.iter().map(|&i| bucket[i]).collect();
                if let Some(plane) = self.build_vertical(&members) {
                    merged.push(plane);
                }
            }
        }
        merged
    }

    /// Consolidate one vertical cluster into a merged wall.
    ///
    /// Points are projected into a local 2D frame spanned by two vectors
    /// orthogonal to the cluster normal, hulled, and mapped back to 3D by
    /// inverting the stored basis exactly.
    fn build_vertical(&self, members: &[(&DetectedPlane, Vec3)]) -> Option<MergedPlane> {
        let mut weight_sum = 0.0;
        let mut normal_sum = Vec3::ZERO;
        let mut origin_sum = Vec3::ZERO;
        let mut conf_sum = 0.0;
        for (m, n) in members {
            let w = m.area.max(1e-6);
            weight_sum += w;
            normal_sum = normal_sum + n.scale(w);
            origin_sum = origin_sum + m.center.scale(w);
            conf_sum += m.confidence * w;
        }
        let normal = normal_sum.normalized();
        if normal == Vec3::ZERO {
            return None;
        }
        let origin = origin_sum.scale(1.0 / weight_sum);
        let confidence = conf_sum / weight_sum;

        // Local in-plane frame: u horizontal, v near-vertical
        let u = Vec3::UP.cross(&normal).normalized();
        if u == Vec3::ZERO {
            return None;
        }
        let v = normal.cross(&u).normalized();

        let planes: Vec<&DetectedPlane> = members.iter().map(|(m, _)| *m).collect();
        let points_2d: Vec<Point2D> = gather_points(&planes)
            .iter()
            .map(|p| {
                let rel = *p - origin;
                Point2D::new(rel.dot(&u), rel.dot(&v))
            })
            .collect();

        let hull = convex_hull(&points_2d);
        if hull.len() < 3 {
            return None;
        }
        let area = polygon_area(&hull);
        if area < self.config.min_plane_area {
            return None;
        }

        let boundary: Vec<Vec3> = hull
            .iter()
            .map(|p| origin + u.scale(p.x) + v.scale(p.y))
            .collect();
        let center = centroid(&boundary);
        let bounds = Bounds3::from_points(&boundary)?;

        Some(MergedPlane {
            id: PlaneId::next_merged(),
            surface_type: SurfaceType::Wall,
            source_ids: source_ids(&planes),
            center,
            normal,
            bounds,
            area,
            confidence,
            boundary,
        })
    }
}

/// Combined boundary points of cluster members; centers stand in for planes
/// delivered without a boundary polygon.
fn gather_points(members: &[&DetectedPlane]) -> Vec<Vec3> {
    let mut points = Vec::new();
    for m in members {
        if m.boundary.is_empty() {
            points.push(m.center);
        } else {
            points.extend_from_slice(&m.boundary);
        }
    }
    points
}

fn source_ids(members: &[&DetectedPlane]) -> Vec<PlaneId> {
    let mut ids: Vec<PlaneId> = members.iter().map(|m| m.id).collect();
    ids.sort_unstable();
    ids
}

fn centroid(points: &[Vec3]) -> Vec3 {
    let mut sum = Vec3::ZERO;
    for p in points {
        sum = sum + *p;
    }
    sum.scale(1.0 / points.len() as f32)
}

/// Outward horizontal normal of a vertical plane.
///
/// Derived from the boundary polygon (Newell's method), falling back to the
/// transform's local Y axis, then flattened into the horizontal plane.
fn wall_normal(plane: &DetectedPlane) -> Option<Vec3> {
    let mut normal = newell_normal(&plane.boundary);
    if normal.length_squared() < 1e-8 {
        normal = plane.transform.y_axis;
    }
    normal.y = 0.0;
    let flattened = normal.normalized();
    if flattened == Vec3::ZERO {
        None
    } else {
        Some(flattened)
    }
}

fn newell_normal(boundary: &[Vec3]) -> Vec3 {
    if boundary.len() < 3 {
        return Vec3::ZERO;
    }
    let mut n = Vec3::ZERO;
    for i in 0..boundary.len() {
        let a = boundary[i];
        let b = boundary[(i + 1) % boundary.len()];
        n.x += (a.y - b.y) * (a.z + b.z);
        n.y += (a.z - b.z) * (a.x + b.x);
        n.z += (a.x - b.x) * (a.y + b.y);
    }
    n
}
