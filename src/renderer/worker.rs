use std::{
    ops::Deref as _,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    sync::mpsc::Receiver,
};

use image::{GenericImage as _, GenericImageView as _, Rgb, Rgb32FImage};
use log::{debug, error};

use crate::{
    geometry::ScreenBlock,
    renderer::{Job, RenderSettings, RenderTask, machinery::Shared},
    screen_block::ScreenBlockExt as _,
};

/// Renders tiles handed out by the render manager. Each handler is driven by its own
/// worker thread.
pub trait RenderHandler: Send {
    /// Called once for every task before any of its tiles.
    fn task_added(&mut self, _task: &RenderTask) {}

    /// Renders the tile and stores it in the task's image.
    fn render_tile(&mut self, task: &RenderTask, tile: ScreenBlock);
}

/// Traces primary rays through pixel centers in the current thread.
pub struct LocalRenderHandler {
    settings: RenderSettings,
    buffer: Rgb32FImage,
}

impl LocalRenderHandler {
    pub fn new(settings: RenderSettings) -> Self {
        LocalRenderHandler {
            settings,
            buffer: Rgb32FImage::new(settings.tile_size.get(), settings.tile_size.get()),
        }
    }
}

impl RenderHandler for LocalRenderHandler {
    fn render_tile(&mut self, task: &RenderTask, tile: ScreenBlock) {
        let scene = task.scene();
        let resolution = task.resolution();
        let width = resolution.x as f32;
        let height = resolution.y as f32;

        if tile.width() > self.buffer.width() || tile.height() > self.buffer.height() {
            self.buffer = Rgb32FImage::new(tile.width(), tile.height());
        }

        for point in tile.internal_points() {
            let u = (point.x as f32 + 0.5) / width;
            let v = 1.0 - (point.y as f32 + 0.5) / height;
            let ray = scene.camera().primary_ray(u, v);
            let radiance = scene.radiance(&ray, self.settings.max_trace_depth);

            let buffer_position = point - tile.min;
            self.buffer.put_pixel(
                buffer_position.x,
                buffer_position.y,
                Rgb([radiance.r, radiance.g, radiance.b]),
            );
        }

        let result = task.image().lock().copy_from(
            self.buffer.view(0, 0, tile.width(), tile.height()).deref(),
            tile.min.x,
            tile.min.y,
        );
        if let Err(e) = result {
            error!("Tile {tile:?} doesn't fit into the image: {e}");
        }
    }
}

/// Body of a worker thread: reports itself free, then executes whatever the manager sends.
pub(super) fn run(
    id: usize,
    shared: Arc<Shared>,
    jobs: Receiver<Job>,
    mut handler: Box<dyn RenderHandler>,
) {
    debug!("Worker {id} started");

    'outer: loop {
        shared.worker_free(id);

        let Ok(first) = jobs.recv() else {
            break;
        };

        for job in std::iter::once(first).chain(jobs.try_iter()) {
            match job {
                Job::NewTask { task } => guarded(id, &task, || handler.task_added(&task)),
                Job::RenderTile { task, tile } => {
                    guarded(id, &task, || handler.render_tile(&task, tile))
                }
                Job::Terminate => break 'outer,
            }
        }
    }

    shared.worker_terminated(id);
    debug!("Worker {id} finished");
}

/// Runs a handler call for the task, aborting the task if the call panics.
/// The worker keeps serving jobs afterwards, tile accounting stays with the manager.
fn guarded(id: usize, task: &RenderTask, call: impl FnOnce()) {
    let Err(payload) = panic::catch_unwind(AssertUnwindSafe(call)) else {
        return;
    };

    let message = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic");
    error!("Worker {id} panicked: {message}");
    task.abort();
}
