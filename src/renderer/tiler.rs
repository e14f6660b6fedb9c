use std::num::NonZeroU32;

use crate::{
    geometry::{ScreenBlock, ScreenSize},
    screen_block::{RasterChunks, ScreenBlockExt as _, SpiralChunks},
};

/// Splits images into tiles.
///
/// A tiler is owned by a single render task. It is only called with the render
/// manager's lock held, so implementations don't need any synchronization.
pub trait Tiler: Send {
    /// Starts tiling an image with the given resolution.
    fn next_task(&mut self, resolution: ScreenSize, worker_count: usize);

    /// Next tile to be rendered by the given worker, `None` once the image is exhausted.
    fn next_tile(&mut self, worker_id: usize) -> Option<ScreenBlock>;

    /// Number of tiles of the current image.
    fn tile_count(&self) -> usize;
}

/// Fixed size tiles in raster order: rows from top to bottom, each row left to right.
#[derive(Clone, Debug)]
pub struct LinearTiler {
    tile_size: NonZeroU32,
    tile_count: usize,
    chunks: Option<RasterChunks>,
}

impl LinearTiler {
    pub fn new(tile_size: NonZeroU32) -> Self {
        LinearTiler {
            tile_size,
            tile_count: 0,
            chunks: None,
        }
    }
}

impl Tiler for LinearTiler {
    fn next_task(&mut self, resolution: ScreenSize, _worker_count: usize) {
        let chunks = ScreenBlock::from_size(resolution).raster_chunks(self.tile_size.get());
        self.tile_count = chunks.len();
        self.chunks = Some(chunks);
    }

    fn next_tile(&mut self, _worker_id: usize) -> Option<ScreenBlock> {
        self.chunks.as_mut()?.next()
    }

    fn tile_count(&self) -> usize {
        self.tile_count
    }
}

/// Fixed size tiles in a spiral starting from the middle of the image.
#[derive(Clone, Debug)]
pub struct SpiralTiler {
    tile_size: NonZeroU32,
    tile_count: usize,
    chunks: Option<SpiralChunks>,
}

impl SpiralTiler {
    pub fn new(tile_size: NonZeroU32) -> Self {
        SpiralTiler {
            tile_size,
            tile_count: 0,
            chunks: None,
        }
    }
}

impl Tiler for SpiralTiler {
    fn next_task(&mut self, resolution: ScreenSize, _worker_count: usize) {
        let chunks = ScreenBlock::from_size(resolution).spiral_chunks(self.tile_size.get());
        self.tile_count = chunks.len();
        self.chunks = Some(chunks);
    }

    fn next_tile(&mut self, _worker_id: usize) -> Option<ScreenBlock> {
        self.chunks.as_mut()?.next()
    }

    fn tile_count(&self) -> usize {
        self.tile_count
    }
}
