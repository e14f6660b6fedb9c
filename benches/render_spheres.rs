use std::{sync::Arc, time::Duration};

use bsptrace::{
    ModelBuilder, Object, PinholeCamera, Radiance, RenderManager, RenderSettings, Scene,
    SpiralTiler, TraceEpsilons, TreeSettings,
    geometry::{ScreenSize, WorldPoint, WorldVector},
    scene::primitives,
    shading::shaders::{ConstantEnvironment, DiffuseSurface, PointLight},
};
use criterion::{Criterion, criterion_group, criterion_main};
use nalgebra::Matrix4;
use rand::{Rng as _, SeedableRng as _, rngs::SmallRng};

/// Randomly scattered spheres merged into a single model.
fn sphere_soup(count: usize) -> ModelBuilder {
    let mut rng = SmallRng::seed_from_u64(0x5eed);
    let mut builder = ModelBuilder::new();
    for _ in 0..count {
        let center = WorldPoint::new(
            rng.random_range(-5.0..5.0),
            rng.random_range(-5.0..5.0),
            rng.random_range(-5.0..5.0),
        );
        let radius = rng.random_range(0.1..0.6);
        primitives::add_uv_sphere(&mut builder, center, radius, 16, 8, 0).unwrap();
    }
    builder
}

fn build_scene(model: ModelBuilder) -> Arc<Scene> {
    let model = model
        .compile(&TreeSettings::default(), &TraceEpsilons::default())
        .unwrap();

    let mut builder = Scene::builder();
    builder.add_surface(Arc::new(DiffuseSurface::new(Radiance::new(0.8, 0.8, 0.8))));
    builder.add_object(Object::new(Arc::new(model), Matrix4::identity()).unwrap());
    builder
        .add_light(Arc::new(PointLight::new(
            WorldPoint::new(0.0, 10.0, 10.0),
            Radiance::new(100.0, 100.0, 100.0),
        )))
        .environment(Arc::new(ConstantEnvironment::new(Radiance::new(0.2, 0.2, 0.3))))
        .camera(Arc::new(
            PinholeCamera::builder()
                .center(WorldPoint::new(0.0, 0.0, 15.0))
                .forward(WorldVector::new(0.0, 0.0, -1.0))
                .up(WorldVector::new(0.0, 1.0, 0.0))
                .build(),
        ));
    builder.build().unwrap()
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("build_tree", |b| {
        b.iter_batched(
            || sphere_soup(200),
            |model| model.compile(&TreeSettings::default(), &TraceEpsilons::default()),
            criterion::BatchSize::LargeInput,
        )
    });

    let scene = build_scene(sphere_soup(200));
    let settings = RenderSettings::default();
    let manager = RenderManager::with_local_renderers(settings).unwrap();

    c.bench_function("render_spheres", |b| {
        b.iter(|| {
            let task = manager
                .start_rendering(
                    Arc::clone(&scene),
                    ScreenSize::new(512, 512),
                    Box::new(SpiralTiler::new(settings.tile_size)),
                )
                .unwrap();
            manager.end_rendering(task).unwrap()
        })
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(20).measurement_time(Duration::from_secs(30));
    targets = criterion_benchmark
}
criterion_main!(benches);
