//! Mathematical utilities for 3D plane geometry.
//!
//! Coordinate frame follows the AR convention:
//! - Y-up (gravity-aligned), X/Z span the horizontal plane
//! - All distances in meters

use serde::{Deserialize, Serialize};

/// A 3D vector or point in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// X coordinate in meters
    pub x: f32,
    /// Y coordinate in meters (up)
    pub y: f32,
    /// Z coordinate in meters
    pub z: f32,
}

impl Vec3 {
    /// Zero vector.
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Unit Y (up).
    pub const UP: Vec3 = Vec3 {
        x: 0.0,
        y: 1.0,
        z: 0.0,
    };

    /// Create a new vector.
    #[inline]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Dot product.
    #[inline]
    pub fn dot(&self, other: &Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product.
    #[inline]
    pub fn cross(&self, other: &Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Squared length (avoids sqrt).
    #[inline]
    pub fn length_squared(&self) -> f32 {
        self.dot(self)
    }

    /// Euclidean length.
    #[inline]
    pub fn length(&self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Squared distance to another point.
    #[inline]
    pub fn distance_squared(&self, other: &Vec3) -> f32 {
        (*self - *other).length_squared()
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(&self, other: &Vec3) -> f32 {
        self.distance_squared(other).sqrt()
    }

    /// Unit vector in the same direction. Returns `Vec3::ZERO` for a
    /// degenerate (near-zero) input.
    #[inline]
    pub fn normalized(&self) -> Vec3 {
        let len = self.length();
        if len < 1e-8 {
            Vec3::ZERO
        } else {
            Vec3::new(self.x / len, self.y / len, self.z / len)
        }
    }

    /// Scale by a scalar.
    #[inline]
    pub fn scale(&self, s: f32) -> Vec3 {
        Vec3::new(self.x * s, self.y * s, self.z * s)
    }
}

impl Default for Vec3 {
    fn default() -> Self {
        Self::ZERO
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;

    #[inline]
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Vec3;

    #[inline]
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// A 2D point used for in-plane hull computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    /// First in-plane coordinate in meters
    pub x: f32,
    /// Second in-plane coordinate in meters
    pub y: f32,
}

impl Point2D {
    /// Create a new point.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned 3D bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds3 {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Bounds3 {
    /// Bounds enclosing a single point.
    #[inline]
    pub fn at_point(p: Vec3) -> Self {
        Self { min: p, max: p }
    }

    /// Bounds enclosing a point set. Returns `None` for an empty set.
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let first = *points.first()?;
        let mut bounds = Self::at_point(first);
        for p in &points[1..] {
            bounds.expand(*p);
        }
        Some(bounds)
    }

    /// Grow to include a point.
    #[inline]
    pub fn expand(&mut self, p: Vec3) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Grow to include another bounds.
    #[inline]
    pub fn union(&mut self, other: &Bounds3) {
        self.expand(other.min);
        self.expand(other.max);
    }

    /// Size along each axis.
    #[inline]
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Center point.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max).scale(0.5)
    }
}

/// Clamp a value to [0, 1].
#[inline]
pub fn clamp01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_product_orthogonal() {
        let x = Vec3::new(1.0, 0.0, 0.0);
        let z = Vec3::new(0.0, 0.0, 1.0);
        let c = z.cross(&x);
        assert!((c.x - 0.0).abs() < 1e-6);
        assert!((c.y - 1.0).abs() < 1e-6);
        assert!((c.z - 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalized_degenerate() {
        assert_eq!(Vec3::ZERO.normalized(), Vec3::ZERO);
        let v = Vec3::new(3.0, 0.0, 4.0).normalized();
        assert!((v.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_bounds_from_points() {
        let points = [
            Vec3::new(1.0, 0.0, -2.0),
            Vec3::new(-1.0, 2.0, 0.0),
            Vec3::new(0.5, 1.0, 3.0),
        ];
        let b = Bounds3::from_points(&points).unwrap();
        assert_eq!(b.min, Vec3::new(-1.0, 0.0, -2.0));
        assert_eq!(b.max, Vec3::new(1.0, 2.0, 3.0));
        let e = b.extent();
        assert!((e.x - 2.0).abs() < 1e-6);
        assert!((e.z - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_bounds_empty() {
        assert!(Bounds3::from_points(&[]).is_none());
    }
}
