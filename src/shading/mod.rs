pub mod shaders;

use crate::{
    geometry::{FloatType, Ray, WorldPoint, WorldVector},
    scene::Scene,
    tracer::SceneHit,
};

pub type Radiance = rgb::RGB<f32>;

/// Componentwise product of two radiance values.
pub fn modulate(a: Radiance, b: Radiance) -> Radiance {
    Radiance::new(a.r * b.r, a.g * b.g, a.b * b.b)
}

/// Light arriving at a point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Illumination {
    /// Unit vector pointing from the illuminated point towards the light.
    pub direction: WorldVector,
    pub distance: FloatType,
    pub radiance: Radiance,
}

/// Material of a triangle, evaluated once for every nearest hit.
pub trait Surface: Send + Sync {
    fn shade(&self, context: &ShadingContext) -> Radiance;

    /// Transparent surfaces get the radiance of the ray continuing behind them added.
    fn is_transparent(&self, _context: &ShadingContext) -> bool {
        false
    }
}

pub trait Light: Send + Sync {
    /// Light arriving at `point`, ignoring occlusion.
    fn illuminate(&self, point: &WorldPoint) -> Option<Illumination>;
}

/// Radiance of rays that don't hit anything.
pub trait Environment: Send + Sync {
    fn shade(&self, ray: &Ray) -> Radiance;
}

/// Hit information passed to surfaces.
pub struct ShadingContext<'a> {
    scene: &'a Scene,
    ray: &'a Ray,
    position: WorldPoint,
    normal: WorldVector,
    depth: u32,
    max_depth: u32,
}

impl<'a> ShadingContext<'a> {
    fn new(scene: &'a Scene, ray: &'a Ray, hit: &SceneHit, depth: u32, max_depth: u32) -> Self {
        let object = &scene.objects()[hit.object];
        let local_normal = object.model().normal_at(hit.hit.triangle, &hit.hit.barycentric);
        let mut normal = object.normal_to_world(&local_normal).normalize();
        // Surfaces are two sided
        if normal.dot(&ray.direction) > 0.0 {
            normal = -normal;
        }

        ShadingContext {
            scene,
            ray,
            position: ray.point_at(hit.hit.t),
            normal,
            depth,
            max_depth,
        }
    }

    pub fn position(&self) -> &WorldPoint {
        &self.position
    }

    /// Unit shading normal, facing against the incoming ray.
    pub fn normal(&self) -> &WorldVector {
        &self.normal
    }

    /// Unit direction of the ray that hit the surface.
    pub fn incoming(&self) -> WorldVector {
        self.ray.direction.normalize()
    }

    /// Mirror reflection of the incoming direction.
    pub fn reflected(&self) -> WorldVector {
        let incoming = self.incoming();
        incoming - self.normal * (2.0 * self.normal.dot(&incoming))
    }

    /// Number of bounces before this hit, zero for camera rays.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Light arriving from every scene light, ignoring occlusion.
    pub fn illuminate(&self) -> impl Iterator<Item = Illumination> + '_ {
        self.scene
            .lights()
            .iter()
            .filter_map(|light| light.illuminate(&self.position))
    }

    /// Checks whether the light is blocked on its way to the hit point.
    pub fn shadow(&self, illumination: &Illumination) -> bool {
        self.scene
            .shadow(&self.position, &illumination.direction, illumination.distance)
    }

    /// Radiance arriving along a secondary ray.
    pub fn trace(&self, ray: &Ray) -> Radiance {
        self.scene.radiance_at_depth(ray, self.depth + 1, self.max_depth)
    }
}

impl Scene {
    /// Radiance arriving at the origin of the ray from its direction.
    /// Secondary rays deeper than `max_depth` bounces return black.
    pub fn radiance(&self, ray: &Ray, max_depth: u32) -> Radiance {
        self.radiance_at_depth(ray, 0, max_depth)
    }

    fn radiance_at_depth(&self, ray: &Ray, depth: u32, max_depth: u32) -> Radiance {
        if depth > max_depth {
            return Radiance::default();
        }

        let Some(hit) = self.trace(ray) else {
            return self.environment().shade(ray);
        };

        let triangle = self.objects()[hit.object].model().triangle(hit.hit.triangle);
        let surface = self.surface(triangle.surface);
        let context = ShadingContext::new(self, ray, &hit, depth, max_depth);

        let mut radiance = surface.shade(&context);
        if surface.is_transparent(&context) {
            radiance += context.trace(&Ray::new(context.position, ray.direction));
        }
        radiance
    }
}
