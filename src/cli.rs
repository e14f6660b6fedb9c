use std::{sync::Arc, thread, time::Duration};

use anyhow::Context as _;
use bsptrace::{
    ModelBuilder, Object, PinholeCamera, Radiance, RenderManager, RenderSettings, Scene,
    SpiralTiler, TraceEpsilons, TreeSettings,
    geometry::{ScreenSize, WorldPoint, WorldVector},
    scene::primitives,
    shading::shaders::{ConstantEnvironment, DiffuseSurface, MirrorSurface, PointLight},
};
use image::DynamicImage;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use nalgebra::{Matrix4, Vector3};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;

fn build_scene() -> anyhow::Result<Arc<Scene>> {
    let mut builder = Scene::builder();
    let floor = builder.add_surface(Arc::new(DiffuseSurface::new(Radiance::new(0.7, 0.7, 0.7))));
    let red = builder.add_surface(Arc::new(DiffuseSurface::new(Radiance::new(0.8, 0.2, 0.1))));
    let mirror = builder.add_surface(Arc::new(MirrorSurface::new(Radiance::new(0.9, 0.9, 0.9))));

    let mut floor_model = ModelBuilder::new();
    primitives::add_quad(
        &mut floor_model,
        [
            WorldPoint::new(-20.0, 0.0, 20.0),
            WorldPoint::new(20.0, 0.0, 20.0),
            WorldPoint::new(20.0, 0.0, -20.0),
            WorldPoint::new(-20.0, 0.0, -20.0),
        ],
        floor,
    )?;

    let mut diffuse_sphere = ModelBuilder::new();
    primitives::add_uv_sphere(&mut diffuse_sphere, WorldPoint::origin(), 1.0, 48, 24, red)?;
    let mut mirror_sphere = ModelBuilder::new();
    primitives::add_uv_sphere(&mut mirror_sphere, WorldPoint::origin(), 1.0, 48, 24, mirror)?;

    let tree_settings = TreeSettings::default();
    let epsilons = TraceEpsilons::default();
    let floor_model = Arc::new(floor_model.compile(&tree_settings, &epsilons)?);
    let diffuse_sphere = Arc::new(diffuse_sphere.compile(&tree_settings, &epsilons)?);
    let mirror_sphere = Arc::new(mirror_sphere.compile(&tree_settings, &epsilons)?);
    info!("Sphere tree:\n{}", diffuse_sphere.tree().statistics());

    builder.add_object(Object::new(floor_model, Matrix4::identity())?);
    builder.add_object(Object::new(
        Arc::clone(&diffuse_sphere),
        Matrix4::new_translation(&Vector3::new(-1.5, 1.0, 0.0)),
    )?);
    builder.add_object(Object::new(
        diffuse_sphere,
        Matrix4::new_translation(&Vector3::new(1.2, 0.5, 1.8)) * Matrix4::new_scaling(0.5),
    )?);
    builder.add_object(Object::new(
        mirror_sphere,
        Matrix4::new_translation(&Vector3::new(1.5, 1.2, -1.0)) * Matrix4::new_scaling(1.2),
    )?);

    builder
        .add_light(Arc::new(PointLight::new(
            WorldPoint::new(-4.0, 8.0, 6.0),
            Radiance::new(80.0, 80.0, 80.0),
        )))
        .environment(Arc::new(ConstantEnvironment::new(Radiance::new(0.4, 0.5, 0.7))))
        .camera(Arc::new(
            PinholeCamera::builder()
                .center(WorldPoint::new(0.0, 2.5, 8.0))
                .forward(WorldVector::new(0.0, -0.25, -1.0))
                .up(WorldVector::new(0.0, 1.0, 0.0))
                .fov(45.0)
                .aspect(WIDTH as f32 / HEIGHT as f32)
                .build(),
        ));

    Ok(builder.build()?)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "bsptrace.png".to_owned());

    let scene = build_scene()?;
    let settings = RenderSettings::default();
    let manager = RenderManager::with_local_renderers(settings)?;

    let task = manager.start_rendering(
        scene,
        ScreenSize::new(WIDTH, HEIGHT),
        Box::new(SpiralTiler::new(settings.tile_size)),
    )?;

    let bar = ProgressBar::new(task.progress().total as u64);
    bar.set_style(ProgressStyle::with_template(
        "{elapsed_precise} [{bar:40}] {pos}/{len} tiles",
    )?);
    while !task.is_finished() {
        bar.set_position(task.progress().rendered as u64);
        thread::sleep(Duration::from_millis(50));
    }
    bar.finish();

    let image = manager.end_rendering(task)?;
    DynamicImage::ImageRgb32F(image)
        .to_rgb8()
        .save(&output)
        .with_context(|| format!("Saving {output}"))?;
    info!("Saved {output}");

    Ok(())
}
