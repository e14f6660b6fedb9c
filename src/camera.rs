use bon::bon;
use nalgebra::Unit;

use crate::geometry::{EPSILON, FloatType, Ray, WorldPoint, WorldVector};

/// Generates primary rays.
pub trait Camera: Send + Sync {
    /// Ray through the point `(u, v)` of the image plane, `(0, 0)` is the lower left corner
    /// and `(1, 1)` the upper right one.
    fn primary_ray(&self, u: FloatType, v: FloatType) -> Ray;
}

#[derive(Copy, Clone, Debug)]
pub struct PinholeCamera {
    center: WorldPoint,
    /// Direction towards the lower left corner of the image plane.
    lower_left: WorldVector,
    /// Half width of the image plane at unit distance, pointing right.
    right: WorldVector,
    /// Half height of the image plane at unit distance, pointing up.
    up: WorldVector,
}

#[bon]
impl PinholeCamera {
    #[builder]
    pub fn new(
        center: WorldPoint,
        forward: WorldVector,
        up: WorldVector,
        // Vertical field of view in degrees
        #[builder(default = 60.0)]
        fov: FloatType,
        // Width divided by height of the image
        #[builder(default = 1.0)]
        aspect: FloatType,
    ) -> Self {
        let forward = Unit::try_new(forward, EPSILON).expect("Forward vector must be non-zero");
        let up = Unit::try_new(up, EPSILON).expect("Up vector must be non-zero");
        let right = Unit::try_new(forward.cross(up.as_ref()), EPSILON)
            .expect("`up` and `forward` must be linearly independent");
        let up = Unit::new_normalize(right.cross(forward.as_ref()));

        assert!(fov > 0.0 && fov < 180.0);
        assert!(aspect > 0.0);

        let half_height = (fov.to_radians() / 2.0).tan();
        let up = up.as_ref() * half_height;
        let right = right.as_ref() * (half_height * aspect);

        PinholeCamera {
            center,
            lower_left: forward.as_ref() - up - right,
            right,
            up,
        }
    }
}

impl Camera for PinholeCamera {
    fn primary_ray(&self, u: FloatType, v: FloatType) -> Ray {
        let direction = self.lower_left + self.right * (2.0 * u) + self.up * (2.0 * v);
        Ray::new(self.center, direction)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert2::assert;
    use test_case::test_case;

    fn camera() -> PinholeCamera {
        // X goes right, Y goes away, Z goes up
        PinholeCamera::builder()
            .center(WorldPoint::new(1.0, 2.0, 3.0))
            .forward(WorldVector::new(0.0, 1.0, 0.0))
            .up(WorldVector::new(0.0, 0.0, 1.0))
            .fov(90.0)
            .aspect(2.0)
            .build()
    }

    #[test]
    fn center_ray_goes_forward() {
        let ray = camera().primary_ray(0.5, 0.5);
        assert!(ray.origin == WorldPoint::new(1.0, 2.0, 3.0));
        assert!((ray.direction - WorldVector::new(0.0, 1.0, 0.0)).norm() < 1e-6);
    }

    #[test_case(0.0, 0.0, -2.0, -1.0 ; "lower_left")]
    #[test_case(1.0, 0.0, 2.0, -1.0 ; "lower_right")]
    #[test_case(0.0, 1.0, -2.0, 1.0 ; "upper_left")]
    #[test_case(1.0, 1.0, 2.0, 1.0 ; "upper_right")]
    fn corners(u: f32, v: f32, x: f32, z: f32) {
        let ray = camera().primary_ray(u, v);
        assert!((ray.direction - WorldVector::new(x, 1.0, z)).norm() < 1e-5);
    }

    #[test]
    fn up_is_orthogonalized() {
        let camera = PinholeCamera::builder()
            .center(WorldPoint::origin())
            .forward(WorldVector::new(0.0, 1.0, 0.0))
            .up(WorldVector::new(0.0, 1.0, 1.0))
            .build();

        let ray = camera.primary_ray(0.5, 1.0);
        assert!(ray.direction.x.abs() < 1e-6);
        assert!(ray.direction.z > 0.0);
        assert!((ray.direction.y - 1.0).abs() < 1e-6);
    }
}
