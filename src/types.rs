//! Common types and traits for 2D table geometry.
//!
//! All spatial entities live in the table plane; `Vec2` serves as point,
//! offset and size, and `BoundingBox` is the axis-aligned box every
//! collision check is built on.

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Global numerical tolerance for floating-point comparisons.
///
/// Used when converting world lengths into whole grid cells and when
/// comparing layout edges against the table.
pub const EPSILON_GENERAL: f64 = 1e-6;

/// A 2D vector or point in the table plane.
///
/// # Examples
/// ```
/// use basket_table::types::Vec2;
///
/// let position = Vec2::new(1.0, 2.0);
/// let size = Vec2::new(4.0, 6.0);
/// assert_eq!(position + size * 0.5, Vec2::new(3.0, 5.0));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    /// Creates a new 2D vector.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Creates a zero vector (origin).
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Checks if both components are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar)
    }
}

impl From<(f64, f64)> for Vec2 {
    #[inline]
    fn from(tuple: (f64, f64)) -> Self {
        Self::new(tuple.0, tuple.1)
    }
}

/// Trait for objects with an extent in the table plane.
pub trait Dimensional {
    /// Returns the world size (width, height).
    fn dimensions(&self) -> Vec2;
}

/// Axis-aligned bounding box in the table plane.
///
/// `min <= max` holds for every box built from a centre and a size. Boxes
/// produced by [`crate::geometry::intersect`] on disjoint inputs are
/// inverted; check [`BoundingBox::is_empty`] before using them.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BoundingBox {
    /// Minimum corner
    pub min: Vec2,
    /// Maximum corner
    pub max: Vec2,
}

impl BoundingBox {
    #[inline]
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Creates a box of the given size centred at `center`.
    #[inline]
    pub fn from_center_and_size(center: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Returns the size (width, height).
    #[inline]
    pub fn dimensions(&self) -> Vec2 {
        Vec2::new(self.width(), self.height())
    }

    /// True if the box has no interior (zero extent or inverted corners).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max.x <= self.min.x || self.max.y <= self.min.y
    }

    /// Checks if a point is inside the box, edges included.
    #[inline]
    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Checks if `other` lies completely within this box.
    #[inline]
    pub fn contains_box(&self, other: &Self, tolerance: f64) -> bool {
        other.min.x + tolerance >= self.min.x
            && other.min.y + tolerance >= self.min.y
            && other.max.x <= self.max.x + tolerance
            && other.max.y <= self.max.y + tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec2_operations() {
        let a = Vec2::new(1.0, 2.0);
        let b = Vec2::new(4.0, 5.0);

        assert_eq!(a + b, Vec2::new(5.0, 7.0));
        assert_eq!(b - a, Vec2::new(3.0, 3.0));
        assert_eq!(a * 2.0, Vec2::new(2.0, 4.0));
    }

    #[test]
    fn test_bounding_box_from_center() {
        let bbox = BoundingBox::from_center_and_size(Vec2::new(1.0, -1.0), Vec2::new(2.0, 4.0));
        assert_eq!(bbox.min, Vec2::new(0.0, -3.0));
        assert_eq!(bbox.max, Vec2::new(2.0, 1.0));
        assert!((bbox.width() - 2.0).abs() < EPSILON_GENERAL);
        assert!((bbox.height() - 4.0).abs() < EPSILON_GENERAL);
    }

    #[test]
    fn test_inverted_box_is_empty() {
        let inverted = BoundingBox::new(Vec2::new(2.0, 0.0), Vec2::new(1.0, 1.0));
        assert!(inverted.is_empty());

        let flat = BoundingBox::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0));
        assert!(flat.is_empty());
    }

    #[test]
    fn test_contains_point_includes_edges() {
        let bbox = BoundingBox::new(Vec2::new(0.0, 0.0), Vec2::new(2.0, 2.0));
        assert!(bbox.contains_point(Vec2::new(1.0, 1.0)));
        assert!(bbox.contains_point(Vec2::new(2.0, 0.0)));
        assert!(!bbox.contains_point(Vec2::new(2.1, 1.0)));
    }

    #[test]
    fn test_contains_box() {
        let outer = BoundingBox::new(Vec2::new(-6.0, -5.0), Vec2::new(6.0, 5.0));
        let inner = BoundingBox::new(Vec2::new(-1.0, -1.0), Vec2::new(1.0, 1.0));
        let spilling = BoundingBox::new(Vec2::new(5.0, 0.0), Vec2::new(7.0, 1.0));

        assert!(outer.contains_box(&inner, EPSILON_GENERAL));
        assert!(!outer.contains_box(&spilling, EPSILON_GENERAL));
    }
}
