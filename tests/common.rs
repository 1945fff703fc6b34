//! Test utilities for KakshaScan integration tests.
//!
//! This module provides synthetic room geometry and a scriptable AR session.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use kaksha_scan::{
    ArSession, DetectedPlane, MergedPlane, PlaneAlignment, PlaneId, SessionError, SessionState,
    SurfaceType, TrackingState, Transform3, Vec3,
};

static NEXT_PLANE_ID: AtomicU64 = AtomicU64::new(1);

/// Fresh detection id, unique within the test binary.
pub fn next_id() -> PlaneId {
    PlaneId(NEXT_PLANE_ID.fetch_add(1, Ordering::Relaxed))
}

/// Horizontal rectangular detection centered at `center`, spanning
/// `width` along X and `depth` along Z.
pub fn horizontal_plane(center: Vec3, width: f32, depth: f32, confidence: f32) -> DetectedPlane {
    let hw = width / 2.0;
    let hd = depth / 2.0;
    DetectedPlane {
        id: next_id(),
        alignment: PlaneAlignment::Horizontal,
        center,
        boundary: vec![
            Vec3::new(center.x - hw, center.y, center.z - hd),
            Vec3::new(center.x + hw, center.y, center.z - hd),
            Vec3::new(center.x + hw, center.y, center.z + hd),
            Vec3::new(center.x - hw, center.y, center.z + hd),
        ],
        area: width * depth,
        confidence,
        transform: Transform3::at_origin(center),
    }
}

/// Vertical rectangular detection: `along` spans the wall horizontally,
/// `normal` faces into the room.
pub fn wall_plane(
    center: Vec3,
    along: Vec3,
    normal: Vec3,
    half_len: f32,
    half_height: f32,
    confidence: f32,
) -> DetectedPlane {
    let h = along.scale(half_len);
    let v = Vec3::new(0.0, half_height, 0.0);
    DetectedPlane {
        id: next_id(),
        alignment: PlaneAlignment::Vertical,
        center,
        boundary: vec![center - h - v, center - h + v, center + h + v, center + h - v],
        area: 4.0 * half_len * half_height,
        confidence,
        transform: Transform3 {
            origin: center,
            x_axis: along,
            y_axis: normal,
            z_axis: Vec3::UP,
        },
    }
}

/// A closed rectangular room centered on the origin: floor at y=0, four
/// walls, ceiling at `height`. `width` spans X, `length` spans Z.
pub fn rect_room(width: f32, length: f32, height: f32) -> Vec<DetectedPlane> {
    let hw = width / 2.0;
    let hl = length / 2.0;
    let mid = height / 2.0;
    let x = Vec3::new(1.0, 0.0, 0.0);
    let z = Vec3::new(0.0, 0.0, 1.0);

    vec![
        horizontal_plane(Vec3::ZERO, width, length, 0.9),
        horizontal_plane(Vec3::new(0.0, height, 0.0), width, length, 0.85),
        wall_plane(Vec3::new(0.0, mid, -hl), x, z, hw, mid, 0.85),
        wall_plane(Vec3::new(0.0, mid, hl), x, z.scale(-1.0), hw, mid, 0.85),
        wall_plane(Vec3::new(-hw, mid, 0.0), z, x, hl, mid, 0.85),
        wall_plane(Vec3::new(hw, mid, 0.0), z, x.scale(-1.0), hl, mid, 0.85),
    ]
}

/// Re-expresses a merged surface as a fresh detection, the way a later frame
/// covering the same geometry would report it.
pub fn redetect(plane: &MergedPlane) -> DetectedPlane {
    let (alignment, transform) = match plane.surface_type {
        SurfaceType::Wall => (
            PlaneAlignment::Vertical,
            Transform3 {
                origin: plane.center,
                x_axis: Vec3::UP.cross(&plane.normal),
                y_axis: plane.normal,
                z_axis: Vec3::UP,
            },
        ),
        _ => (
            PlaneAlignment::Horizontal,
            Transform3::at_origin(plane.center),
        ),
    };
    DetectedPlane {
        id: next_id(),
        alignment,
        center: plane.center,
        boundary: plane.boundary.clone(),
        area: plane.area,
        confidence: plane.confidence,
        transform,
    }
}

/// Scriptable AR session for orchestration and recovery tests.
pub struct MockSession {
    state: RwLock<SessionState>,
    tracking: RwLock<TrackingState>,
    quality: RwLock<f32>,
    restart_ok: RwLock<bool>,
}

impl MockSession {
    /// A healthy running session with good tracking.
    pub fn running() -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(SessionState::Running),
            tracking: RwLock::new(TrackingState::Normal),
            quality: RwLock::new(0.9),
            restart_ok: RwLock::new(true),
        })
    }

    pub fn set_state(&self, state: SessionState) {
        *self.state.write() = state;
    }

    pub fn set_tracking(&self, tracking: TrackingState, quality: f32) {
        *self.tracking.write() = tracking;
        *self.quality.write() = quality;
    }

    pub fn refuse_restarts(&self) {
        *self.restart_ok.write() = false;
    }
}

impl ArSession for MockSession {
    fn state(&self) -> SessionState {
        *self.state.read()
    }

    fn tracking_state(&self) -> TrackingState {
        *self.tracking.read()
    }

    fn tracking_quality(&self) -> f32 {
        *self.quality.read()
    }

    fn restart(&self) -> Result<(), SessionError> {
        if *self.restart_ok.read() {
            *self.state.write() = SessionState::Running;
            *self.tracking.write() = TrackingState::Normal;
            *self.quality.write() = 0.9;
            Ok(())
        } else {
            Err(SessionError::RestartFailed(
                "session refused to restart".to_string(),
            ))
        }
    }
}
