use std::sync::Arc;

use image::Rgb32FImage;
use log::warn;
use parking_lot::{Condvar, Mutex};

use crate::{
    error::{Error, Result},
    geometry::{ScreenBlock, ScreenSize},
    scene::Scene,
};

use super::Tiler;

/// Snapshot of the progress of a render task.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TaskProgress {
    pub rendered: usize,
    pub total: usize,
    pub finished: bool,
}

/// One image being rendered.
pub struct RenderTask {
    scene: Arc<Scene>,
    resolution: ScreenSize,
    image: Mutex<Rgb32FImage>,

    state: Mutex<TaskState>,

    gate: Mutex<GateState>,
    gate_changed: Condvar,
}

struct TaskState {
    tiler: Box<dyn Tiler>,
    tile_count: usize,
    queued: usize,
    rendered: usize,
    no_more_tiles: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum GateState {
    Pending,
    Done,
    Aborted,
}

impl RenderTask {
    pub fn new(scene: Arc<Scene>, resolution: ScreenSize, tiler: Box<dyn Tiler>) -> Self {
        RenderTask {
            scene,
            resolution,
            image: Mutex::new(Rgb32FImage::new(resolution.x, resolution.y)),
            state: Mutex::new(TaskState {
                tiler,
                tile_count: 0,
                queued: 0,
                rendered: 0,
                no_more_tiles: false,
            }),
            gate: Mutex::new(GateState::Pending),
            gate_changed: Condvar::new(),
        }
    }

    pub fn scene(&self) -> &Arc<Scene> {
        &self.scene
    }

    pub fn resolution(&self) -> ScreenSize {
        self.resolution
    }

    pub fn image(&self) -> &Mutex<Rgb32FImage> {
        &self.image
    }

    /// Moves the rendered image out of the task, leaving an empty image behind.
    pub fn take_image(&self) -> Rgb32FImage {
        std::mem::take(&mut *self.image.lock())
    }

    pub fn progress(&self) -> TaskProgress {
        let state = self.state.lock();
        TaskProgress {
            rendered: state.rendered,
            total: state.tile_count,
            finished: state.no_more_tiles && state.queued == state.rendered,
        }
    }

    /// Blocks until every tile of the task is rendered.
    /// Fails if the render manager shut down before the task could finish.
    pub fn wait(&self) -> Result<()> {
        let mut gate = self.gate.lock();
        while *gate == GateState::Pending {
            self.gate_changed.wait(&mut gate);
        }
        match *gate {
            GateState::Aborted => Err(Error::Aborted),
            _ => Ok(()),
        }
    }

    pub fn is_finished(&self) -> bool {
        *self.gate.lock() != GateState::Pending
    }

    /// Prepares the tiler. Called by the manager when the task is queued.
    pub(super) fn start(&self, worker_count: usize) {
        let mut state = self.state.lock();
        state.tiler.next_task(self.resolution, worker_count);
        state.tile_count = state.tiler.tile_count();
    }

    /// Hands out the next tile, marks the task as exhausted if there is none.
    /// Called with the manager lock held.
    pub(super) fn next_tile(&self, worker_id: usize) -> Option<ScreenBlock> {
        let mut state = self.state.lock();
        if state.no_more_tiles {
            return None;
        }

        match state.tiler.next_tile(worker_id) {
            Some(tile) => {
                state.queued += 1;
                Some(tile)
            }
            None => {
                state.no_more_tiles = true;
                self.check_completion(&state);
                None
            }
        }
    }

    /// Records a tile handed out by `next_tile` as finished.
    pub(super) fn tile_rendered(&self) {
        let mut state = self.state.lock();
        state.rendered += 1;
        assert2::debug_assert!(state.rendered <= state.queued);
        self.check_completion(&state);
    }

    /// Releases waiters of an unfinished task with an error.
    pub(super) fn abort(&self) {
        let mut gate = self.gate.lock();
        if *gate == GateState::Pending {
            warn!("Aborting unfinished render task");
            *gate = GateState::Aborted;
            self.gate_changed.notify_all();
        }
    }

    fn check_completion(&self, state: &TaskState) {
        if state.no_more_tiles && state.queued == state.rendered {
            let mut gate = self.gate.lock();
            if *gate == GateState::Pending {
                *gate = GateState::Done;
                self.gate_changed.notify_all();
            }
        }
    }
}
