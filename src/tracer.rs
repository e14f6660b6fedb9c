use bon::Builder;

use crate::{
    geometry::{BarycentricCoordinates, FloatType, Ray, Segment, WorldPoint, WorldVector, clip_segment},
    scene::{Model, Scene},
};

/// Tolerances used when tracing rays and clipping triangles.
#[derive(Copy, Clone, Debug, Builder)]
pub struct TraceEpsilons {
    /// Ray parameter and barycentric tolerance of the ray/triangle test.
    #[builder(default = 1e-6)]
    pub triangle: FloatType,
    /// Tolerance of comparing split plane crossings with the ray segment.
    #[builder(default = 1e-6)]
    pub node: FloatType,
    /// Direction components below this are treated as parallel to the split plane.
    #[builder(default = 1e-6)]
    pub direction: FloatType,
    /// Start of the traced segment, keeps secondary rays from hitting their own origin.
    #[builder(default = 1e-4)]
    pub segment_start: FloatType,
    /// Tolerance of clipping triangles to node boxes during tree construction.
    #[builder(default = 1e-5)]
    pub clip: FloatType,
}

impl Default for TraceEpsilons {
    fn default() -> Self {
        TraceEpsilons::builder().build()
    }
}

/// Nearest intersection of a ray with a model.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ModelHit {
    /// Ray parameter of the hit.
    pub t: FloatType,
    /// Index of the triangle in the model.
    pub triangle: u32,
    pub barycentric: BarycentricCoordinates<FloatType>,
}

/// Nearest intersection of a ray with a scene.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SceneHit {
    /// Index of the object in the scene.
    pub object: usize,
    pub hit: ModelHit,
}

impl Model {
    /// Finds the nearest triangle hit by the ray inside the segment.
    ///
    /// On a hit `segment.max` is narrowed to the hit parameter and `segment.min` is kept,
    /// on a miss the segment is left unchanged.
    pub fn trace(&self, ray: &Ray, segment: &mut Segment, epsilons: &TraceEpsilons) -> Option<ModelHit> {
        let original = *segment;

        clip_segment(segment, ray, self.tree().bounding_box());
        if segment.is_empty_strict() {
            *segment = original;
            return None;
        }

        let accels = self.accels();
        let mut nearest = None;
        let found = self.tree().traverse(ray, segment, epsilons, |triangles, segment| {
            let mut found = false;
            for &triangle in triangles {
                if let Some(barycentric) =
                    accels[triangle as usize].intersect(ray, segment, epsilons.triangle)
                {
                    nearest = Some((triangle, barycentric));
                    found = true;
                }
            }
            found
        });

        match nearest {
            Some((triangle, barycentric)) if found => {
                let t = segment.max;
                *segment = Segment::new(original.min, t);
                Some(ModelHit {
                    t,
                    triangle,
                    barycentric,
                })
            }
            _ => {
                *segment = original;
                None
            }
        }
    }
}

impl Scene {
    /// Finds the nearest object hit by the ray.
    pub fn trace(&self, ray: &Ray) -> Option<SceneHit> {
        let epsilons = self.epsilons();
        let mut segment = Segment::new(epsilons.segment_start, FloatType::MAX);
        let mut nearest = None;

        for (index, object) in self.objects().iter().enumerate() {
            let local_ray = object.ray_to_local(ray);
            if let Some(hit) = object.model().trace(&local_ray, &mut segment, epsilons) {
                nearest = Some(SceneHit { object: index, hit });
            }
        }

        nearest
    }

    /// Checks whether anything blocks the path from `point` along `direction`
    /// closer than `max_distance` (in units of `direction`).
    pub fn shadow(&self, point: &WorldPoint, direction: &WorldVector, max_distance: FloatType) -> bool {
        let epsilons = self.epsilons();
        let ray = Ray::new(*point, *direction);
        let mut segment = Segment::new(epsilons.segment_start, max_distance);

        self.objects().iter().any(|object| {
            let local_ray = object.ray_to_local(&ray);
            object
                .model()
                .trace(&local_ray, &mut segment, epsilons)
                .is_some()
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        scene::{ModelBuilder, Object, primitives},
        shading::shaders::ConstantSurface,
        tree::TreeSettings,
    };
    use assert2::{assert, let_assert};
    use nalgebra::{Matrix4, Vector3};
    use std::sync::Arc;
    use test_case::test_case;

    fn unit_quad() -> Arc<Model> {
        let mut builder = ModelBuilder::new();
        primitives::add_quad(
            &mut builder,
            [
                WorldPoint::new(0.0, 0.0, 0.0),
                WorldPoint::new(1.0, 0.0, 0.0),
                WorldPoint::new(1.0, 1.0, 0.0),
                WorldPoint::new(0.0, 1.0, 0.0),
            ],
            0,
        )
        .unwrap();
        Arc::new(
            builder
                .compile(&TreeSettings::default(), &TraceEpsilons::default())
                .unwrap(),
        )
    }

    fn scene_with_quads(heights: &[f32]) -> Arc<Scene> {
        let model = unit_quad();
        let mut builder = Scene::builder();
        builder.add_surface(Arc::new(ConstantSurface::new([1.0, 1.0, 1.0].into())));
        for &z in heights {
            builder.add_object(
                Object::new(model.clone(), Matrix4::new_translation(&Vector3::new(0.0, 0.0, z)))
                    .unwrap(),
            );
        }
        builder.build().unwrap()
    }

    #[test]
    fn model_hit_keeps_segment_start() {
        let model = unit_quad();
        let ray = Ray::new(
            WorldPoint::new(0.3, 0.6, 5.0),
            WorldVector::new(0.0, 0.0, -1.0),
        );
        let mut segment = Segment::new(0.5, 100.0);

        let_assert!(Some(hit) = model.trace(&ray, &mut segment, &TraceEpsilons::default()));
        assert!((hit.t - 5.0).abs() < 1e-4);
        assert!(segment.min == 0.5);
        assert!(segment.max == hit.t);

        let position = ray.point_at(hit.t);
        assert!((position - WorldPoint::new(0.3, 0.6, 0.0)).norm() < 1e-4);
    }

    #[test_case(1.5, 0.5 ; "beside")]
    #[test_case(0.5, -0.5 ; "below")]
    fn model_miss_keeps_segment(x: f32, y: f32) {
        let model = unit_quad();
        let ray = Ray::new(WorldPoint::new(x, y, 5.0), WorldVector::new(0.0, 0.0, -1.0));
        let original = Segment::new(0.0, 100.0);
        let mut segment = original;

        assert!(model.trace(&ray, &mut segment, &TraceEpsilons::default()).is_none());
        assert!(segment == original);
    }

    #[test]
    fn model_hit_beyond_segment_is_ignored() {
        let model = unit_quad();
        let ray = Ray::new(
            WorldPoint::new(0.5, 0.5, 5.0),
            WorldVector::new(0.0, 0.0, -1.0),
        );
        let original = Segment::new(0.0, 4.0);
        let mut segment = original;

        assert!(model.trace(&ray, &mut segment, &TraceEpsilons::default()).is_none());
        assert!(segment == original);
    }

    #[test]
    fn nearest_object_wins() {
        let scene = scene_with_quads(&[-2.0, 3.0, 1.0]);
        let ray = Ray::new(
            WorldPoint::new(0.5, 0.5, 10.0),
            WorldVector::new(0.0, 0.0, -1.0),
        );

        let_assert!(Some(hit) = scene.trace(&ray));
        assert!(hit.object == 1);
        assert!((hit.hit.t - 7.0).abs() < 1e-4);

        let up = Ray::new(
            WorldPoint::new(0.5, 0.5, -10.0),
            WorldVector::new(0.0, 0.0, 1.0),
        );
        let_assert!(Some(hit) = scene.trace(&up));
        assert!(hit.object == 0);
        assert!((hit.hit.t - 8.0).abs() < 1e-4);
    }

    #[test]
    fn scaled_object_keeps_world_parameter() {
        let model = unit_quad();
        let mut builder = Scene::builder();
        builder.add_surface(Arc::new(ConstantSurface::new([1.0, 1.0, 1.0].into())));
        builder.add_object(
            Object::new(
                model,
                Matrix4::new_translation(&Vector3::new(0.0, 0.0, 2.0)) * Matrix4::new_scaling(4.0),
            )
            .unwrap(),
        );
        let scene = builder.build().unwrap();

        let ray = Ray::new(
            WorldPoint::new(3.0, 1.0, 10.0),
            WorldVector::new(0.0, 0.0, -1.0),
        );
        let_assert!(Some(hit) = scene.trace(&ray));
        assert!((hit.hit.t - 8.0).abs() < 1e-3);
    }

    #[test]
    fn empty_scene_misses() {
        let scene = Scene::builder().build().unwrap();
        let ray = Ray::new(WorldPoint::origin(), WorldVector::new(1.0, 0.0, 0.0));
        assert!(scene.trace(&ray).is_none());
        assert!(!scene.shadow(&WorldPoint::origin(), &WorldVector::new(1.0, 0.0, 0.0), 10.0));
    }

    #[test_case(10.0, true ; "blocked")]
    #[test_case(2.5, false ; "occluder_beyond_distance")]
    fn shadow_ray(max_distance: f32, expected: bool) {
        let scene = scene_with_quads(&[3.0]);
        let point = WorldPoint::new(0.5, 0.5, 0.0);
        let direction = WorldVector::new(0.0, 0.0, 1.0);

        assert!(scene.shadow(&point, &direction, max_distance) == expected);
    }

    #[test]
    fn shadow_ray_starting_on_surface_is_not_blocked_by_it() {
        let scene = scene_with_quads(&[0.0]);
        let point = WorldPoint::new(0.5, 0.5, 0.0);

        assert!(!scene.shadow(&point, &WorldVector::new(0.0, 0.0, 1.0), 10.0));
    }
}
