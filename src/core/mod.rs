//! Core data types for room reconstruction.

pub mod dimensions;
pub mod issue;
pub mod math;
pub mod plane;
pub mod progress;
pub mod quality;

pub use dimensions::RoomDimensions;
pub use issue::{IssueKind, IssueList, IssueSeverity, ScanIssue};
pub use math::{clamp01, Bounds3, Point2D, Vec3};
pub use plane::{DetectedPlane, MergedPlane, PlaneAlignment, PlaneId, SurfaceType, Transform3};
pub use progress::{ScanPhase, ScanProgress};
pub use quality::{QualityBand, ScanQuality};
