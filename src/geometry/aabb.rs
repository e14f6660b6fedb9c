use std::ops::Sub;

use nalgebra::{Point2, Scalar};

use super::{FloatType, Triangle, WorldBox, WorldPoint, WorldVector};

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct AABB<Point> {
    pub min: Point,
    pub max: Point,
}

impl<Point> AABB<Point> {
    pub fn new(min: Point, max: Point) -> AABB<Point> {
        AABB { min, max }
    }
}

impl<Point: Sub + Copy> AABB<Point> {
    pub fn size(&self) -> Point::Output {
        self.max - self.min
    }
}

impl<T: Scalar + Copy + Sub> AABB<Point2<T>> {
    pub fn width(&self) -> T::Output {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> T::Output {
        self.max[1] - self.min[1]
    }
}

impl<T: Scalar + Copy + PartialOrd> AABB<Point2<T>> {
    /// Returns true if the block doesn't contain any points (half open on the max side).
    pub fn is_empty_or_negative(&self) -> bool {
        self.max[0] <= self.min[0] || self.max[1] <= self.min[1]
    }

    /// Half open containment test, max edges are not part of the block.
    pub fn contains_point(&self, p: &Point2<T>) -> bool {
        self.min[0] <= p[0] && p[0] < self.max[0] && self.min[1] <= p[1] && p[1] < self.max[1]
    }

    pub fn contains_block(&self, other: &Self) -> bool {
        other.is_empty_or_negative()
            || (self.min[0] <= other.min[0]
                && self.min[1] <= other.min[1]
                && other.max[0] <= self.max[0]
                && other.max[1] <= self.max[1])
    }
}

/// Closed world space boxes, both min and max faces belong to the box.
impl WorldBox {
    /// The canonical empty box, extending it by anything yields the thing itself.
    pub fn empty() -> WorldBox {
        WorldBox {
            min: WorldPoint::from(WorldVector::repeat(FloatType::INFINITY)),
            max: WorldPoint::from(WorldVector::repeat(FloatType::NEG_INFINITY)),
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a WorldPoint>) -> WorldBox {
        let mut ret = WorldBox::empty();
        for p in points {
            ret.extend_point(p);
        }
        ret
    }

    pub fn from_triangle(triangle: &Triangle<WorldPoint>) -> WorldBox {
        WorldBox::from_points(triangle.iter())
    }

    /// Box is empty if min is larger than max on any axis.
    /// Degenerate boxes with min == max are not empty.
    pub fn is_empty(&self) -> bool {
        (0..3).any(|axis| self.min[axis] > self.max[axis])
    }

    pub fn extend_point(&mut self, p: &WorldPoint) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    pub fn extend_box(&mut self, other: &WorldBox) {
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
    }

    pub fn contains_point(&self, p: &WorldPoint) -> bool {
        (0..3).all(|axis| self.min[axis] <= p[axis] && p[axis] <= self.max[axis])
    }

    /// Empty boxes are contained in every box.
    pub fn contains_box(&self, other: &WorldBox) -> bool {
        other.is_empty()
            || (0..3)
                .all(|axis| self.min[axis] <= other.min[axis] && other.max[axis] <= self.max[axis])
    }

    pub fn intersection(&self, other: &WorldBox) -> WorldBox {
        WorldBox {
            min: self.min.sup(&other.min),
            max: self.max.inf(&other.max),
        }
    }

    pub fn intersects(&self, other: &WorldBox) -> bool {
        !self.intersection(other).is_empty()
    }

    pub fn extent(&self) -> WorldVector {
        self.size()
    }

    pub fn set_min(&mut self, axis: usize, value: FloatType) {
        self.min[axis] = value;
    }

    pub fn set_max(&mut self, axis: usize, value: FloatType) {
        self.max[axis] = value;
    }

    /// Clamps a point into the box.
    pub fn clamp_point(&self, p: &WorldPoint) -> WorldPoint {
        p.sup(&self.min).inf(&self.max)
    }

    /// Half of the surface area.
    pub fn half_area(&self) -> FloatType {
        let e = self.extent();
        e.x * e.y + e.y * e.z + e.z * e.x
    }
}
