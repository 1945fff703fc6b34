//! # KakshaScan
//!
//! Room-geometry reconstruction core for AR-based interior scanning.
//!
//! ## Overview
//!
//! KakshaScan turns a stream of detected planar surfaces into a coherent
//! room model:
//!
//! - **Merging** - Clusters raw plane detections into unified floor, wall,
//!   ceiling, and surface regions
//! - **Dimensions** - Infers room width, length, and height by blending
//!   several measurement strategies
//! - **Quality** - Scores the scan and produces actionable recommendations
//! - **Recovery** - Monitors scan health and runs bounded corrective
//!   attempts when a scan degrades
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use kaksha_scan::{ScanConfig, Scanner};
//!
//! // Wrap your platform AR session behind the ArSession trait
//! let session = std::sync::Arc::new(MyArSession::new());
//!
//! let scanner = Scanner::new(ScanConfig::default(), session);
//! scanner.start();
//!
//! // Feed plane detections as the platform reports them
//! scanner.process_frame(planes, tracking_quality);
//!
//! let state = scanner.published();
//! println!("merged {} surfaces", state.merged_planes.len());
//! ```
//!
//! ## Coordinate System
//!
//! Uses the Y-up AR convention:
//! - X/Z: Horizontal ground plane
//! - Y: Up (positive above the floor)
//! - Horizontal surfaces extend in X/Z; wall normals lie near the X/Z plane

#![warn(missing_docs)]

// Core types
pub mod core;

// Unified configuration
pub mod config;

// Plane clustering and merging
pub mod merge;

// Room dimension inference
pub mod dimensions;

// Scan quality assessment
pub mod quality;

// Health monitoring and recovery
pub mod recovery;

// Scan orchestration
pub mod scanner;

// AR session abstraction
pub mod session;

// Re-export commonly used types
pub use crate::core::{
    Bounds3, DetectedPlane, IssueKind, IssueSeverity, MergedPlane, PlaneAlignment, PlaneId,
    Point2D, QualityBand, RoomDimensions, ScanIssue, ScanPhase, ScanProgress, ScanQuality,
    SurfaceType, Transform3, Vec3,
};

pub use config::{ConfigError, ScanConfig};

pub use merge::PlaneMerger;

pub use dimensions::{DimensionCalculator, DimensionError};

pub use quality::QualityAssessor;

pub use recovery::{
    HealthProblem, RecoveryAction, RecoveryError, RecoveryEvent, RecoveryManager, RecoveryPhase,
    RecoveryProgress, RecoveryState, ScanSnapshot,
};

pub use scanner::{PublishedState, ScanLifecycle, ScanResult, Scanner};

pub use session::{ArSession, SessionError, SessionState, TrackingLimitation, TrackingState};
