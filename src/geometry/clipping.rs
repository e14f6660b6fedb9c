use assert2::debug_assert;

use super::{FloatType, Ray, Segment, TriAccel, Triangle, WorldBox, WorldPoint, WorldVector};

/// Clips the ray segment to the part that lies inside the box.
///
/// Slab tests that produce NaN (ray parallel to a slab, starting on its boundary)
/// leave the segment unchanged on that axis.
pub fn clip_segment(segment: &mut Segment, ray: &Ray, bounding_box: &WorldBox) {
    for axis in 0..3 {
        let mut t_min = (bounding_box.min[axis] - ray.origin[axis]) / ray.direction[axis];
        let mut t_max = (bounding_box.max[axis] - ray.origin[axis]) / ray.direction[axis];
        if t_min > t_max {
            std::mem::swap(&mut t_min, &mut t_max);
        }

        if segment.min < t_min {
            segment.min = t_min;
        }
        if segment.max > t_max {
            segment.max = t_max;
        }
    }
}

/// Bounding box of the part of a triangle that lies inside the box.
///
/// Collects the triangle edges clipped to the box and the intersections of the twelve
/// box edges with the triangle, the result is always contained in `bounding_box`.
/// Returns an empty box if the triangle doesn't touch the box.
pub fn clip_triangle(
    triangle: &Triangle<WorldPoint>,
    tri_accel: &TriAccel,
    bounding_box: &WorldBox,
    eps: FloatType,
) -> WorldBox {
    let mut out = WorldBox::empty();

    for (i, edge) in triangle.cyclic_edges().into_iter().enumerate() {
        let ray = Ray::new(triangle[i], edge);
        let mut segment = Segment::new(0.0, 1.0);
        clip_segment(&mut segment, &ray, bounding_box);
        if !segment.is_empty(eps) {
            out.extend_point(&ray.point_at(segment.min));
            out.extend_point(&ray.point_at(segment.max));
        }
    }

    let extent = bounding_box.extent();
    for i in 0..3 {
        let j = (i + 1) % 3;
        let k = (i + 2) % 3;

        let mut direction = WorldVector::zeros();
        direction[i] = extent[i];

        let corners = [
            (bounding_box.min[j], bounding_box.min[k]),
            (bounding_box.max[j], bounding_box.min[k]),
            (bounding_box.max[j], bounding_box.max[k]),
            (bounding_box.min[j], bounding_box.max[k]),
        ];
        for (cj, ck) in corners {
            let mut origin = bounding_box.min;
            origin[j] = cj;
            origin[k] = ck;

            let ray = Ray::new(origin, direction);
            let mut segment = Segment::new(0.0, 1.0);
            if tri_accel.intersect(&ray, &mut segment, eps).is_some() {
                out.extend_point(&ray.point_at(segment.max));
            }
        }
    }

    if !out.is_empty() {
        out.min = bounding_box.clamp_point(&out.min);
        out.max = bounding_box.clamp_point(&out.max);
    }

    debug_assert!(bounding_box.contains_box(&out));
    out
}
