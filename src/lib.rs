mod camera;
mod error;
pub mod geometry;
pub mod renderer;
pub mod scene;
mod screen_block;
pub mod shading;
mod tracer;
pub mod tree;
mod util;

pub use camera::{Camera, PinholeCamera};
pub use error::{Error, Result};
pub use renderer::{
    LinearTiler, LocalRenderHandler, RenderHandler, RenderManager, RenderSettings, RenderTask,
    SpiralTiler, TaskProgress, Tiler,
};
pub use scene::{Model, ModelBuilder, Object, Scene, SceneBuilder};
pub use shading::Radiance;
pub use tracer::{ModelHit, SceneHit, TraceEpsilons};
pub use tree::{SahTree, TreeSettings, TreeStatistics};
pub use util::Stats;
