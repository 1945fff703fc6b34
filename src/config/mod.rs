//! Unified configuration for the scanning pipeline.
//!
//! All tunables load from a single TOML file with per-field defaults, so an
//! empty file (or no file at all) yields a working configuration.
//!
//! ## Example TOML
//!
//! ```toml
//! [merging]
//! merge_threshold = 0.1        # 10cm height/distance grid
//! min_plane_area = 0.1         # m²
//! max_merge_distance = 0.5     # m
//!
//! [dimensions]
//! max_room_size = 50.0         # m
//!
//! [recovery]
//! max_attempts = 3
//! check_interval_secs = 2.0
//!
//! [scanner]
//! scan_timeout_secs = 300.0
//! ```

mod error;

pub use error::ConfigError;

use serde::Deserialize;
use std::path::Path;

/// Plane merging tolerances.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MergingConfig {
    /// Quantization grid for plane heights and distances (meters).
    /// Default: 0.1m
    pub merge_threshold: f32,

    /// Minimum area for a merged plane to survive (square meters).
    /// Default: 0.1m²
    pub min_plane_area: f32,

    /// Maximum center-to-center distance for two planes to merge (meters).
    /// Tightened to 3x `merge_threshold` when alignments match.
    /// Default: 0.5m
    pub max_merge_distance: f32,

    /// Cosine-similarity threshold for treating wall normals as parallel.
    /// Default: 0.9
    pub normal_similarity: f32,

    /// Height above which a horizontal plane is typed as ceiling (meters).
    /// Default: 2.0m
    pub ceiling_height_cutoff: f32,
}

impl Default for MergingConfig {
    fn default() -> Self {
        Self {
            merge_threshold: 0.1,
            min_plane_area: 0.1,
            max_merge_distance: 0.5,
            normal_similarity: 0.9,
            ceiling_height_cutoff: 2.0,
        }
    }
}

impl MergingConfig {
    /// Builder-style setter for the merge threshold.
    pub fn with_merge_threshold(mut self, threshold: f32) -> Self {
        self.merge_threshold = threshold;
        self
    }

    /// Builder-style setter for the minimum plane area.
    pub fn with_min_plane_area(mut self, area: f32) -> Self {
        self.min_plane_area = area;
        self
    }

    /// Builder-style setter for the maximum merge distance.
    pub fn with_max_merge_distance(mut self, distance: f32) -> Self {
        self.max_merge_distance = distance;
        self
    }

    /// Builder-style setter for the wall-normal similarity threshold.
    pub fn with_normal_similarity(mut self, similarity: f32) -> Self {
        self.normal_similarity = similarity;
        self
    }
}

/// Dimension inference limits.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DimensionConfig {
    /// Largest believable room dimension (meters). Default: 50m
    pub max_room_size: f32,

    /// Fallback ceiling height when no overhead plane is found (meters).
    /// Default: 2.4m
    pub default_ceiling_height: f32,

    /// Lower clamp for estimated heights (meters). Default: 2.0m
    pub min_ceiling_height: f32,

    /// Upper clamp for estimated heights (meters). Default: 5.0m
    pub max_ceiling_height: f32,

    /// Normal cosine similarity for grouping walls. Default: 0.9
    pub wall_normal_similarity: f32,

    /// Relative tolerance used by dimension accuracy tests. Default: 0.05
    pub tolerance: f32,
}

impl Default for DimensionConfig {
    fn default() -> Self {
        Self {
            max_room_size: 50.0,
            default_ceiling_height: 2.4,
            min_ceiling_height: 2.0,
            max_ceiling_height: 5.0,
            wall_normal_similarity: 0.9,
            tolerance: 0.05,
        }
    }
}

/// Quality model reference values.
///
/// The score weights themselves are fixed in the assessor; these are the
/// scene expectations the sub-scores are measured against.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Expected number of walls in a room. Default: 4
    pub expected_wall_count: usize,

    /// Minimum expected floor area (square meters). Default: 4.0m²
    pub expected_min_room_area: f32,

    /// Reference area for a "good" raw plane (square meters). Default: 0.5m²
    pub good_plane_area: f32,

    /// Fixed minimum wall area used when no floor exists (square meters).
    /// Default: 2.0m² per expected wall
    pub min_wall_area: f32,

    /// Standard ceiling height for wall-area estimation (meters).
    /// Default: 2.4m
    pub standard_ceiling_height: f32,

    /// Optimal merged/raw plane count ratio. Default: 0.3
    pub optimal_merge_ratio: f32,

    /// Scans shorter than this are penalized (seconds). Default: 30s
    pub min_scan_duration_secs: f32,

    /// Scans longer than this are penalized (seconds). Default: 180s
    pub max_scan_duration_secs: f32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            expected_wall_count: 4,
            expected_min_room_area: 4.0,
            good_plane_area: 0.5,
            min_wall_area: 2.0,
            standard_ceiling_height: 2.4,
            optimal_merge_ratio: 0.3,
            min_scan_duration_secs: 30.0,
            max_scan_duration_secs: 180.0,
        }
    }
}

/// Recovery monitoring and execution parameters.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Health-check interval (seconds). Default: 2.0s
    pub check_interval_secs: f32,

    /// Maximum recovery attempts per scan. Default: 3
    pub max_attempts: usize,

    /// Overall quality below this triggers recovery. Default: 0.3
    pub quality_threshold: f32,

    /// Completeness below this triggers recovery. Default: 0.4
    pub completeness_threshold: f32,

    /// More than this many critical issues triggers recovery. Default: 1
    pub max_critical_issues: usize,

    /// Bound on the tracking-improvement wait (seconds). Default: 15s
    pub tracking_wait_timeout_secs: f32,

    /// Settle time after a session restart (seconds). Default: 3s
    pub session_settle_secs: f32,

    /// Raw planes below this confidence are discarded by the
    /// discard-poor-planes action. Default: 0.35
    pub discard_confidence_threshold: f32,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 2.0,
            max_attempts: 3,
            quality_threshold: 0.3,
            completeness_threshold: 0.4,
            max_critical_issues: 1,
            tracking_wait_timeout_secs: 15.0,
            session_settle_secs: 3.0,
            discard_confidence_threshold: 0.35,
        }
    }
}

/// Scanner orchestration parameters.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Automatic stop after this long (seconds). Default: 300s
    pub scan_timeout_secs: f32,

    /// Progress update interval (seconds). Default: 0.1s (~10Hz)
    pub progress_interval_secs: f32,

    /// Timeout check interval (seconds). Default: 1.0s
    pub timeout_check_interval_secs: f32,

    /// Walls required before dimensions are computed. Default: 2
    pub min_walls_for_dimensions: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            scan_timeout_secs: 300.0,
            progress_interval_secs: 0.1,
            timeout_check_interval_secs: 1.0,
            min_walls_for_dimensions: 2,
        }
    }
}

/// Root configuration for the scanning pipeline.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Plane merging tolerances
    pub merging: MergingConfig,
    /// Dimension inference limits
    pub dimensions: DimensionConfig,
    /// Quality model reference values
    pub quality: QualityConfig,
    /// Recovery parameters
    pub recovery: RecoveryConfig,
    /// Scanner orchestration parameters
    pub scanner: ScannerConfig,
}

impl ScanConfig {
    /// Load configuration from a TOML file.
    ///
    /// Missing sections and fields fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(ConfigError::from)
    }
}
