//! Scan issues and the deduplicated issue list.
//!
//! Issues accumulate over a scan and are append-only until reset. The list
//! deduplicates on (kind, description) at insert so the same underlying
//! problem reported every frame stays a single entry.

use serde::{Deserialize, Serialize};

use super::math::Vec3;

/// Category of a scan problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    /// AR tracking quality is degraded
    PoorTracking,
    /// Expected wall surface not yet detected
    MissingWall,
    /// Floor coverage below expectations
    IncompleteFloor,
    /// Raw planes overlap without merging cleanly
    OverlappingPlanes,
    /// Scene too dark for reliable detection
    LowLighting,
    /// Device moving too fast for stable tracking
    ExcessiveMotion,
    /// Surfaces blocked from view
    OccludedSurfaces,
    /// Merged geometry changing between passes
    UnstableGeometry,
}

/// How strongly an issue degrades the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IssueSeverity {
    /// Cosmetic, scan still usable
    Low,
    /// Noticeable degradation
    Medium,
    /// Significant degradation
    High,
    /// Scan likely unusable without intervention
    Critical,
}

/// A single reported scan problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanIssue {
    /// Stable id within this scan
    pub id: u64,
    /// Problem category
    pub kind: IssueKind,
    /// Degradation level
    pub severity: IssueSeverity,
    /// Human-readable description
    pub description: String,
    /// Approximate world location, when known
    pub location: Option<Vec3>,
}

/// Append-only arena of scan issues, deduplicated on (kind, description).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueList {
    issues: Vec<ScanIssue>,
    next_id: u64,
}

impl IssueList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an issue unless an identical (kind, description) entry exists.
    ///
    /// Returns the id of the inserted or pre-existing entry.
    pub fn push(
        &mut self,
        kind: IssueKind,
        severity: IssueSeverity,
        description: impl Into<String>,
        location: Option<Vec3>,
    ) -> u64 {
        let description = description.into();
        if let Some(existing) = self
            .issues
            .iter()
            .find(|i| i.kind == kind && i.description == description)
        {
            return existing.id;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.issues.push(ScanIssue {
            id,
            kind,
            severity,
            description,
            location,
        });
        id
    }

    /// All issues in insertion order.
    pub fn issues(&self) -> &[ScanIssue] {
        &self.issues
    }

    /// Number of issues at the given severity.
    pub fn count_severity(&self, severity: IssueSeverity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Number of critical issues.
    pub fn critical_count(&self) -> usize {
        self.count_severity(IssueSeverity::Critical)
    }

    /// True if no issues are recorded.
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Number of recorded issues.
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Drop all issues (scan reset).
    pub fn clear(&mut self) {
        self.issues.clear();
        self.next_id = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_on_kind_and_description() {
        let mut list = IssueList::new();
        let a = list.push(IssueKind::PoorTracking, IssueSeverity::High, "shaky", None);
        let b = list.push(IssueKind::PoorTracking, IssueSeverity::High, "shaky", None);
        assert_eq!(a, b);
        assert_eq!(list.len(), 1);

        // Same kind, different description is a new entry
        let c = list.push(IssueKind::PoorTracking, IssueSeverity::Low, "dark", None);
        assert_ne!(a, c);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_severity_counts() {
        let mut list = IssueList::new();
        list.push(IssueKind::MissingWall, IssueSeverity::Critical, "north", None);
        list.push(IssueKind::MissingWall, IssueSeverity::Critical, "south", None);
        list.push(IssueKind::LowLighting, IssueSeverity::Low, "dim", None);
        assert_eq!(list.critical_count(), 2);
        assert_eq!(list.count_severity(IssueSeverity::Low), 1);
    }

    #[test]
    fn test_clear_resets_ids() {
        let mut list = IssueList::new();
        list.push(IssueKind::LowLighting, IssueSeverity::Low, "dim", None);
        list.clear();
        assert!(list.is_empty());
        let id = list.push(IssueKind::LowLighting, IssueSeverity::Low, "dim", None);
        assert_eq!(id, 0);
    }
}
