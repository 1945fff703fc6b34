//! Raw and merged plane types.
//!
//! [`DetectedPlane`] is what the AR tracking subsystem emits each frame:
//! immutable, superseded wholesale on every update cycle. [`MergedPlane`] is
//! what the merger produces from them: one semantic room surface per
//! physical surface, fully replaced on every merge pass.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use super::math::{Bounds3, Vec3};

/// Stable identity for a plane (raw or merged).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct PlaneId(pub u64);

static NEXT_MERGED_ID: AtomicU64 = AtomicU64::new(1);

impl PlaneId {
    /// Allocate a fresh id for a merged plane.
    ///
    /// Raw plane ids come from the AR subsystem; merged ids are regenerated
    /// on every merge pass, so identity comparisons across passes go through
    /// contributing raw ids instead.
    pub fn next_merged() -> Self {
        PlaneId(NEXT_MERGED_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Orientation class of a detected plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaneAlignment {
    /// Floor/ceiling-like, normal along gravity
    Horizontal,
    /// Wall-like, normal in the horizontal plane
    Vertical,
}

/// Rigid transform of a detected plane: origin plus orthonormal basis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform3 {
    /// Translation (plane anchor position)
    pub origin: Vec3,
    /// Local X axis
    pub x_axis: Vec3,
    /// Local Y axis
    pub y_axis: Vec3,
    /// Local Z axis
    pub z_axis: Vec3,
}

impl Transform3 {
    /// Identity transform at the world origin.
    pub fn identity() -> Self {
        Self {
            origin: Vec3::ZERO,
            x_axis: Vec3::new(1.0, 0.0, 0.0),
            y_axis: Vec3::new(0.0, 1.0, 0.0),
            z_axis: Vec3::new(0.0, 0.0, 1.0),
        }
    }

    /// Identity orientation translated to `origin`.
    pub fn at_origin(origin: Vec3) -> Self {
        Self {
            origin,
            ..Self::identity()
        }
    }

    /// Map a local point to world coordinates.
    #[inline]
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.origin
            + self.x_axis.scale(local.x)
            + self.y_axis.scale(local.y)
            + self.z_axis.scale(local.z)
    }
}

/// A raw planar surface detection from the AR subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedPlane {
    /// Identity assigned by the tracking subsystem
    pub id: PlaneId,
    /// Horizontal or vertical
    pub alignment: PlaneAlignment,
    /// Center in world coordinates
    pub center: Vec3,
    /// Ordered boundary polygon in world coordinates
    pub boundary: Vec<Vec3>,
    /// Surface area in square meters
    pub area: f32,
    /// Detection confidence in [0, 1]
    pub confidence: f32,
    /// Source transform from the tracking subsystem
    pub transform: Transform3,
}

impl DetectedPlane {
    /// World-space axis-aligned bounds of the boundary polygon.
    ///
    /// Falls back to the center point when the boundary is empty.
    pub fn bounds(&self) -> Bounds3 {
        Bounds3::from_points(&self.boundary).unwrap_or_else(|| Bounds3::at_point(self.center))
    }
}

/// Semantic classification of a merged surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SurfaceType {
    /// Primary walkable surface
    Floor,
    /// Vertical room boundary
    Wall,
    /// Overhead surface above standing height
    Ceiling,
    /// Other horizontal surface (table, shelf, ...)
    Surface,
}

impl SurfaceType {
    /// Short lowercase label for logging and descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            SurfaceType::Floor => "floor",
            SurfaceType::Wall => "wall",
            SurfaceType::Ceiling => "ceiling",
            SurfaceType::Surface => "surface",
        }
    }
}

/// A fused semantic room surface produced by the merger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedPlane {
    /// Fresh identity for this merge pass
    pub id: PlaneId,
    /// Semantic surface type
    pub surface_type: SurfaceType,
    /// Ids of the contributing raw planes
    pub source_ids: Vec<PlaneId>,
    /// Centroid of the merged boundary
    pub center: Vec3,
    /// Outward unit normal
    pub normal: Vec3,
    /// Axis-aligned bounds of the merged boundary
    pub bounds: Bounds3,
    /// Hull area in square meters
    pub area: f32,
    /// Area-weighted mean of contributor confidences
    pub confidence: f32,
    /// Convex boundary polygon in world coordinates
    pub boundary: Vec<Vec3>,
}

impl MergedPlane {
    /// Vertical extent of the plane in meters.
    #[inline]
    pub fn height_extent(&self) -> f32 {
        self.bounds.extent().y
    }
}
