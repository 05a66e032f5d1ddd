//! Geometric primitives shared by the smoother, the store and the renderer.

use serde::{Deserialize, Serialize};

/// A pressure-weighted point in canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X position in canvas logical units.
    pub x: f32,
    /// Y position in canvas logical units.
    pub y: f32,
    /// Pen pressure, real or synthesized, in `[0, 1]`.
    pub pressure: f32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f32, y: f32, pressure: f32) -> Self {
        Self { x, y, pressure }
    }

    /// Distance to another point, ignoring pressure.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f32 {
        self.position().sub(&other.position()).length()
    }

    /// The 2D position of this point.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// A 2D vector for positions and directions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
}

impl Vec2 {
    /// Create a new vector.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Add two vectors.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }

    /// Subtract two vectors.
    #[must_use]
    pub fn sub(&self, other: &Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    /// Scale vector by a scalar.
    #[must_use]
    pub fn scale(&self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s)
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(&self, other: &Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Length (magnitude) of the vector.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Squared distance between two points.
    #[must_use]
    pub fn distance_squared(&self, other: &Self) -> f32 {
        let d = self.sub(other);
        d.dot(&d)
    }

    /// Normalize the vector to unit length. Zero vectors are returned unchanged.
    #[must_use]
    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self::new(self.x / len, self.y / len)
        } else {
            *self
        }
    }

    /// Perpendicular vector, rotated a quarter turn.
    #[must_use]
    pub fn perpendicular(&self) -> Self {
        Self::new(self.y, -self.x)
    }

    /// Linear interpolation towards `other`.
    #[must_use]
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        self.add(&other.sub(self).scale(t))
    }

    /// Rotate this point around `center` by `radians`.
    #[must_use]
    pub fn rotate_around(&self, center: &Self, radians: f32) -> Self {
        let (sin, cos) = radians.sin_cos();
        let px = self.x - center.x;
        let py = self.y - center.y;
        Self::new(px * cos - py * sin + center.x, px * sin + py * cos + center.y)
    }

    /// Midpoint between two points.
    #[must_use]
    pub fn midpoint(&self, other: &Self) -> Self {
        self.lerp(other, 0.5)
    }

    /// Whether both components are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl BoundingBox {
    /// Create a bounding box from its origin and size.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest box containing every vertex, or `None` for an empty iterator.
    pub fn from_vertices(vertices: impl IntoIterator<Item = Vec2>) -> Option<Self> {
        let mut iter = vertices.into_iter();
        let first = iter.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for v in iter {
            min_x = min_x.min(v.x);
            min_y = min_y.min(v.y);
            max_x = max_x.max(v.x);
            max_y = max_y.max(v.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    /// Grow the box by `amount` on every side.
    #[must_use]
    pub fn expanded(&self, amount: f32) -> Self {
        Self::new(
            self.x - amount,
            self.y - amount,
            self.width + amount * 2.0,
            self.height + amount * 2.0,
        )
    }

    /// Check if a point lies inside the box (edges inclusive).
    #[must_use]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }

    /// Eraser hit test: the box grown by `radius` contains the disc center.
    ///
    /// This over-approximates the true disc/outline intersection near corners.
    #[must_use]
    pub fn hit_by_disc(&self, x: f32, y: f32, radius: f32) -> bool {
        self.expanded(radius).contains(x, y)
    }

    /// Right edge.
    #[must_use]
    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge.
    #[must_use]
    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_from_vertices() {
        let bounds = BoundingBox::from_vertices([
            Vec2::new(10.0, 5.0),
            Vec2::new(-2.0, 8.0),
            Vec2::new(4.0, 20.0),
        ])
        .expect("non-empty");
        assert!((bounds.x + 2.0).abs() < f32::EPSILON);
        assert!((bounds.y - 5.0).abs() < f32::EPSILON);
        assert!((bounds.width - 12.0).abs() < f32::EPSILON);
        assert!((bounds.height - 15.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_bounds_from_nothing() {
        assert!(BoundingBox::from_vertices(std::iter::empty()).is_none());
    }

    #[test]
    fn test_disc_hit_uses_expanded_rect() {
        let bounds = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(bounds.hit_by_disc(5.0, 5.0, 1.0));
        assert!(bounds.hit_by_disc(13.0, 5.0, 3.0));
        assert!(!bounds.hit_by_disc(13.5, 5.0, 3.0));
        // Corner of the expanded rect counts even though the disc misses the box.
        assert!(bounds.hit_by_disc(12.9, 12.9, 3.0));
    }

    #[test]
    fn test_rotate_around() {
        let p = Vec2::new(1.0, 0.0).rotate_around(&Vec2::new(0.0, 0.0), std::f32::consts::FRAC_PI_2);
        assert!(p.x.abs() < 1e-6);
        assert!((p.y - 1.0).abs() < 1e-6);
    }
}
