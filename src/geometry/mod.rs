mod aabb;
mod clipping;
mod segment;
mod tri_accel;
mod triangle;

pub use aabb::AABB;
pub use clipping::{clip_segment, clip_triangle};
pub use segment::Segment;
pub use tri_accel::TriAccel;
pub use triangle::{BarycentricCoordinates, Triangle};

use nalgebra::{Point2, Point3, Vector2, Vector3};

pub type FloatType = f32;

pub type ScreenPoint = Point2<u32>;
pub type ScreenSize = Vector2<u32>;
pub type ScreenBlock = AABB<ScreenPoint>;

pub type WorldPoint = Point3<FloatType>;
pub type WorldVector = Vector3<FloatType>;
pub type WorldBox = AABB<WorldPoint>;

pub const EPSILON: FloatType = 1e-6;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
    pub origin: WorldPoint,
    /// Direction of the ray, not necessarily normalized.
    /// Rays transformed into object space keep the world space parametrization.
    pub direction: WorldVector,
}

impl Ray {
    pub fn new(origin: WorldPoint, direction: WorldVector) -> Ray {
        Ray { origin, direction }
    }

    pub fn point_at(&self, t: FloatType) -> WorldPoint {
        self.origin + self.direction * t
    }
}
