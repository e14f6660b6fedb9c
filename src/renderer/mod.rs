mod machinery;
mod task;
mod tiler;
mod worker;

use std::{num::NonZeroU32, sync::Arc};

use bon::Builder;

use crate::geometry::ScreenBlock;

pub use machinery::RenderManager;
pub use task::{RenderTask, TaskProgress};
pub use tiler::{LinearTiler, SpiralTiler, Tiler};
pub use worker::{LocalRenderHandler, RenderHandler};

const DEFAULT_TILE_SIZE: NonZeroU32 = NonZeroU32::new(32).unwrap();

#[derive(Copy, Clone, Debug, Builder)]
pub struct RenderSettings {
    #[builder(default = DEFAULT_TILE_SIZE)]
    pub tile_size: NonZeroU32,
    /// Secondary rays deeper than this return black.
    #[builder(default = 16)]
    pub max_trace_depth: u32,
    /// Pin each worker thread to its own core.
    #[builder(default = false)]
    pub pin_threads: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings::builder().build()
    }
}

/// Message from the manager to a worker.
pub(crate) enum Job {
    RenderTile {
        task: Arc<RenderTask>,
        tile: ScreenBlock,
    },
    NewTask {
        task: Arc<RenderTask>,
    },
    Terminate,
}
