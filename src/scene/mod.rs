mod model;
pub mod primitives;

use std::sync::Arc;

use nalgebra::{Matrix3, Matrix4};

pub use model::{Model, ModelBuilder, ModelTriangle, Vertex};

use crate::{
    camera::{Camera, PinholeCamera},
    error::{Error, Result},
    geometry::{Ray, WorldPoint, WorldVector},
    shading::{Environment, Light, Surface, shaders::ConstantEnvironment},
    tracer::TraceEpsilons,
};

/// Placed instance of a model.
#[derive(Clone, Debug)]
pub struct Object {
    model: Arc<Model>,
    local_to_world: Matrix4<f32>,
    world_to_local: Matrix4<f32>,
    /// Inverse transpose of the linear part of `local_to_world`.
    normal_to_world: Matrix3<f32>,
}

impl Object {
    pub fn new(model: Arc<Model>, local_to_world: Matrix4<f32>) -> Result<Object> {
        let world_to_local = local_to_world
            .try_inverse()
            .ok_or(Error::SingularTransform)?;
        let normal_to_world = world_to_local.fixed_view::<3, 3>(0, 0).transpose();

        Ok(Object {
            model,
            local_to_world,
            world_to_local,
            normal_to_world,
        })
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn local_to_world(&self) -> &Matrix4<f32> {
        &self.local_to_world
    }

    /// Transforms a world space ray into model space.
    /// The direction is not renormalized, so ray parameters stay comparable between objects.
    pub fn ray_to_local(&self, ray: &Ray) -> Ray {
        Ray::new(
            self.world_to_local.transform_point(&ray.origin),
            self.world_to_local.transform_vector(&ray.direction),
        )
    }

    pub fn point_to_world(&self, point: &WorldPoint) -> WorldPoint {
        self.local_to_world.transform_point(point)
    }

    /// Transforms a model space normal to world space, result is not normalized.
    pub fn normal_to_world(&self, normal: &WorldVector) -> WorldVector {
        self.normal_to_world * normal
    }
}

/// Everything needed to render an image. Immutable once built, shared between
/// render threads.
pub struct Scene {
    objects: Vec<Object>,
    surfaces: Vec<Arc<dyn Surface>>,
    lights: Vec<Arc<dyn Light>>,
    environment: Arc<dyn Environment>,
    camera: Arc<dyn Camera>,
    epsilons: TraceEpsilons,
}

impl Scene {
    pub fn builder() -> SceneBuilder {
        SceneBuilder::new()
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    pub fn surface(&self, index: usize) -> &dyn Surface {
        self.surfaces[index].as_ref()
    }

    pub fn lights(&self) -> &[Arc<dyn Light>] {
        &self.lights
    }

    pub fn environment(&self) -> &dyn Environment {
        self.environment.as_ref()
    }

    pub fn camera(&self) -> &dyn Camera {
        self.camera.as_ref()
    }

    pub fn epsilons(&self) -> &TraceEpsilons {
        &self.epsilons
    }
}

/// Collects scene contents. Without an explicit camera the scene looks down the negative
/// z axis from the origin, without an environment missed rays are black.
pub struct SceneBuilder {
    objects: Vec<Object>,
    surfaces: Vec<Arc<dyn Surface>>,
    lights: Vec<Arc<dyn Light>>,
    environment: Arc<dyn Environment>,
    camera: Arc<dyn Camera>,
    epsilons: TraceEpsilons,
}

impl SceneBuilder {
    pub fn new() -> Self {
        SceneBuilder {
            objects: Vec::new(),
            surfaces: Vec::new(),
            lights: Vec::new(),
            environment: Arc::new(ConstantEnvironment::default()),
            camera: Arc::new(
                PinholeCamera::builder()
                    .center(WorldPoint::origin())
                    .forward(-WorldVector::z())
                    .up(WorldVector::y())
                    .build(),
            ),
            epsilons: TraceEpsilons::default(),
        }
    }

    pub fn add_object(&mut self, object: Object) -> usize {
        self.objects.push(object);
        self.objects.len() - 1
    }

    /// Adds a surface, triangles refer to it by the returned index.
    pub fn add_surface(&mut self, surface: Arc<dyn Surface>) -> usize {
        self.surfaces.push(surface);
        self.surfaces.len() - 1
    }

    pub fn add_light(&mut self, light: Arc<dyn Light>) -> &mut Self {
        self.lights.push(light);
        self
    }

    pub fn environment(&mut self, environment: Arc<dyn Environment>) -> &mut Self {
        self.environment = environment;
        self
    }

    pub fn camera(&mut self, camera: Arc<dyn Camera>) -> &mut Self {
        self.camera = camera;
        self
    }

    pub fn epsilons(&mut self, epsilons: TraceEpsilons) -> &mut Self {
        self.epsilons = epsilons;
        self
    }

    /// Checks that every triangle refers to an existing surface and freezes the scene.
    pub fn build(self) -> Result<Arc<Scene>> {
        for object in &self.objects {
            if let Some(max_surface) = object.model().max_surface() {
                if max_surface >= self.surfaces.len() {
                    return Err(Error::SurfaceOutOfRange(max_surface));
                }
            }
        }

        Ok(Arc::new(Scene {
            objects: self.objects,
            surfaces: self.surfaces,
            lights: self.lights,
            environment: self.environment,
            camera: self.camera,
            epsilons: self.epsilons,
        }))
    }
}

impl Default for SceneBuilder {
    fn default() -> Self {
        Self::new()
    }
}
