use std::iter::FusedIterator;

use assert2::{assert, debug_assert};
use nalgebra::{Point2, Vector2};

use crate::geometry::{ScreenBlock, ScreenPoint, ScreenSize};

pub trait ScreenBlockExt {
    fn from_size(size: ScreenSize) -> Self;
    fn internal_points(&self) -> InternalPoints;
    fn raster_chunks(&self, chunk_size: u32) -> RasterChunks;
    fn spiral_chunks(&self, chunk_size: u32) -> SpiralChunks;
}

impl ScreenBlockExt for ScreenBlock {
    /// Block covering a whole image of the given size.
    fn from_size(size: ScreenSize) -> Self {
        ScreenBlock::new(ScreenPoint::origin(), ScreenPoint::from(size))
    }

    /// Create an iterator over coordinates (x, y) pairs inside the block,
    /// in C order (x changes first, then y)
    fn internal_points(&self) -> InternalPoints {
        if self.is_empty_or_negative() {
            InternalPoints::empty()
        } else {
            InternalPoints {
                min_x: self.min.x,
                max: self.max,

                cursor: self.min,
            }
        }
    }

    /// Create an iterator over sub blocks in raster order: rows of chunks from top to bottom,
    /// each row left to right.
    /// Chunks on the bottom and right side are clipped to the block.
    /// Chunk size must be non zero.
    fn raster_chunks(&self, chunk_size: u32) -> RasterChunks {
        assert!(chunk_size > 0);

        if self.is_empty_or_negative() {
            return RasterChunks::empty();
        }

        RasterChunks {
            block: *self,
            chunk_size,
            cursor: self.min,
            remaining: divide_round_up(self.width(), chunk_size)
                * divide_round_up(self.height(), chunk_size),
        }
    }

    /// Create an iterator over sub blocks in (roughly) spiral order, starting in the middle of the block.
    /// Chunks are chunk_size * chunk_size large, except on the bottom and right side of the
    /// block, where they may be clipped if chunk size doesn't evenly divide block size.
    /// Chunk size must be non zero.
    fn spiral_chunks(&self, chunk_size: u32) -> SpiralChunks {
        assert!(chunk_size > 0);

        if self.is_empty_or_negative() {
            return SpiralChunks::empty();
        }

        let size = Vector2::new(
            divide_round_up(self.width(), chunk_size) as i32,
            divide_round_up(self.height(), chunk_size) as i32,
        );
        let cursor = Point2::new(size.x / 2, size.y / 2);

        let dx = 2 * cursor.y - size.y;
        debug_assert!(dx == 0 || dx == -1);
        let direction = Vector2::new(dx, -1 - dx);

        SpiralChunks {
            block: *self,

            chunk_size,
            size,
            cursor,
            direction,

            segment: 2,
            segment_remaining: 1,
            remaining: (size.x * size.y) as u32,
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct InternalPoints {
    min_x: u32,
    max: ScreenPoint,

    cursor: ScreenPoint,
}

impl InternalPoints {
    // Construct an iterator over internal points that returns no points
    fn empty() -> Self {
        InternalPoints {
            min_x: 1,
            max: ScreenPoint::origin(),

            cursor: ScreenPoint::origin(),
        }
    }
}

impl Iterator for InternalPoints {
    type Item = ScreenPoint;

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.len();
        (len, Some(len))
    }

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.y >= self.max.y {
            return None;
        }

        let ret = self.cursor;

        debug_assert!(self.cursor.x < self.max.x);
        self.cursor.x += 1;
        if self.cursor.x >= self.max.x {
            self.cursor.x = self.min_x;
            self.cursor.y += 1;
        }

        Some(ret)
    }
}

impl ExactSizeIterator for InternalPoints {
    fn len(&self) -> usize {
        if self.cursor.y >= self.max.y {
            0
        } else {
            let whole_rows = (self.max.x - self.min_x) * (self.max.y - self.cursor.y - 1);
            let current_row = self.max.x - self.cursor.x;
            (whole_rows + current_row) as usize
        }
    }
}

impl FusedIterator for InternalPoints {}

/// Iterator over (mostly) square blocks within a rectangular box in raster order.
#[derive(Copy, Clone, Debug)]
pub struct RasterChunks {
    block: ScreenBlock,
    chunk_size: u32,
    /// Top left corner of the next chunk.
    cursor: ScreenPoint,
    remaining: u32,
}

impl RasterChunks {
    fn empty() -> Self {
        RasterChunks {
            block: ScreenBlock::new(ScreenPoint::origin(), ScreenPoint::origin()),
            chunk_size: 1,
            cursor: ScreenPoint::origin(),
            remaining: 0,
        }
    }
}

impl Iterator for RasterChunks {
    type Item = ScreenBlock;

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let min = self.cursor;
        let max = ScreenPoint::new(
            (min.x + self.chunk_size).min(self.block.max.x),
            (min.y + self.chunk_size).min(self.block.max.y),
        );

        self.cursor.x = max.x;
        if self.cursor.x >= self.block.max.x {
            self.cursor.x = self.block.min.x;
            self.cursor.y = max.y;
        }
        self.remaining -= 1;

        let ret = ScreenBlock::new(min, max);
        debug_assert!(self.block.contains_block(&ret));
        Some(ret)
    }
}

impl ExactSizeIterator for RasterChunks {
    fn len(&self) -> usize {
        self.remaining as usize
    }
}

impl FusedIterator for RasterChunks {}

/// Iterator over (mostly) square blocks within a rectangular box in spiral order.
#[derive(Copy, Clone, Debug)]
pub struct SpiralChunks {
    block: ScreenBlock,

    chunk_size: u32,
    /// Size of the block in chunks.
    size: Vector2<i32>,
    /// Current position in chunks.
    cursor: Point2<i32>,
    direction: Vector2<i32>,

    segment: u32,
    segment_remaining: i32,
    remaining: u32,
}

impl SpiralChunks {
    /// Constructs an iterator that returns no blocks.
    fn empty() -> SpiralChunks {
        SpiralChunks {
            block: ScreenBlock::new(ScreenPoint::origin(), ScreenPoint::origin()),

            chunk_size: 1,
            size: Vector2::zeros(),
            cursor: Point2::origin(),
            direction: Vector2::new(1, 0),

            segment: 0,
            segment_remaining: 0,
            remaining: 0,
        }
    }

    /// Moves to next segment of the spiral (turns 90 degrees and calculates new segment length).
    fn next_segment(&mut self) {
        self.direction = Vector2::new(self.direction.y, -self.direction.x);
        self.segment += 1;
        self.segment_remaining = (self.segment / 2) as i32;
    }

    fn cursor_is_inside(&self, cursor: &Point2<i32>) -> bool {
        0 <= cursor.x && cursor.x < self.size.x && 0 <= cursor.y && cursor.y < self.size.y
    }

    /// Returns a new screen block that corresponds to the current iterator position.
    fn current_block(&self) -> ScreenBlock {
        let min = self.block.min + self.cursor.coords.map(|c| c as u32) * self.chunk_size;
        let max = ScreenPoint::new(
            (min.x + self.chunk_size).min(self.block.max.x),
            (min.y + self.chunk_size).min(self.block.max.y),
        );
        let ret = ScreenBlock::new(min, max);
        debug_assert!(self.block.contains_block(&ret));
        debug_assert!(!ret.is_empty_or_negative());
        ret
    }
}

impl Iterator for SpiralChunks {
    type Item = ScreenBlock;

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let ret = self.current_block();
        self.remaining -= 1;
        if self.remaining == 0 {
            return Some(ret);
        }

        // Walk the spiral until it gets back inside the block
        loop {
            if self.segment_remaining == 0 {
                self.next_segment();
            }
            self.cursor += self.direction;
            self.segment_remaining -= 1;
            if self.cursor_is_inside(&self.cursor) {
                break;
            }
        }

        Some(ret)
    }
}

impl ExactSizeIterator for SpiralChunks {
    fn len(&self) -> usize {
        self.remaining as usize
    }
}

impl FusedIterator for SpiralChunks {}

fn divide_round_up(a: u32, b: u32) -> u32 {
    a.div_ceil(b)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::test::{ScreenBlockWrapper, ScreenSizeWrapper};
    use assert2::assert;
    use std::cmp;
    use test_case::test_case;
    use test_strategy::proptest;

    /// Number of pixels in the block, zero for empty or negative blocks.
    fn area(block: &ScreenBlock) -> u32 {
        if block.is_empty_or_negative() {
            0
        } else {
            block.width() * block.height()
        }
    }

    fn abs_difference(x: u32, y: u32) -> u32 {
        if x < y { y - x } else { x - y }
    }

    fn check_exact_length_internal<T: Iterator + ExactSizeIterator>(
        iterator: &T,
        expected_length: usize,
    ) {
        assert!(iterator.len() == expected_length);
        let (min, max) = iterator.size_hint();
        assert!(min == expected_length);
        assert!(max == Some(expected_length));
    }

    /// Goes through the whole iterator and checks that at every step iterator's size hint is equal
    /// to its reported length and equal to the expected number of elements.
    fn check_exact_length<T: Iterator + ExactSizeIterator>(
        mut iterator: T,
        expected_length: usize,
    ) {
        check_exact_length_internal(&iterator, expected_length);

        let mut count = 0usize;
        while iterator.next().is_some() {
            count += 1;
            check_exact_length_internal(&iterator, expected_length - count);
        }
    }

    /// Check that all pixels in the block are covered by a pixel iterator exactly once
    fn check_pixel_iterator_covers_block<T: Iterator<Item = ScreenPoint>>(
        pixel_iterator: T,
        block: ScreenBlock,
    ) {
        let mut vec = vec![false; area(&block) as usize];
        for p in pixel_iterator {
            assert!(block.contains_point(&p));
            let index = (p.x - block.min.x) + (p.y - block.min.y) * block.width();
            assert!(!vec[index as usize]);
            vec[index as usize] = true;
        }
        assert!(vec.into_iter().all(|v| v));
    }

    #[test]
    fn raster_order() {
        let block = ScreenBlock::from_size(ScreenSize::new(70, 40));
        let chunks: Vec<_> = block.raster_chunks(32).collect();

        let expected = [
            ((0, 0), (32, 32)),
            ((32, 0), (64, 32)),
            ((64, 0), (70, 32)),
            ((0, 32), (32, 40)),
            ((32, 32), (64, 40)),
            ((64, 32), (70, 40)),
        ]
        .map(|((x0, y0), (x1, y1))| ScreenBlock::new(ScreenPoint::new(x0, y0), ScreenPoint::new(x1, y1)));
        assert!(chunks == expected);
    }

    #[test_case(1, 1, 1 ; "single_pixel")]
    #[test_case(5, 3, 1 ; "single_chunk")]
    #[test_case(64, 64, 4 ; "exact_fit")]
    #[test_case(65, 33, 6 ; "clipped")]
    fn raster_chunk_count(width: u32, height: u32, expected: usize) {
        let block = ScreenBlock::from_size(ScreenSize::new(width, height));
        assert!(block.raster_chunks(32).count() == expected);
    }

    #[proptest]
    fn pixel_iterator_covers_all(block: ScreenBlockWrapper) {
        check_pixel_iterator_covers_block(block.internal_points(), *block);
    }

    #[proptest]
    fn pixel_iterator_exact_length(block: ScreenBlockWrapper) {
        check_exact_length(block.internal_points(), area(&block) as usize);
    }

    #[proptest]
    fn raster_iterator_covers_all(block: ScreenBlockWrapper, #[strategy(1u32..40)] chunk_size: u32) {
        check_pixel_iterator_covers_block(
            block
                .raster_chunks(chunk_size)
                .flat_map(|chunk| chunk.internal_points()),
            *block,
        );
    }

    #[proptest]
    fn raster_iterator_exact_length(size: ScreenSizeWrapper, #[strategy(1u32..40)] chunk_size: u32) {
        let it = ScreenBlock::from_size(*size).raster_chunks(chunk_size);
        check_exact_length(it, it.len());
    }

    /// Tests that sub blocks of a spiral chunk iterator when iterated over cover all pixels in
    /// a block
    #[proptest]
    fn spiral_iterator_covers_all(block: ScreenBlockWrapper, #[strategy(1u32..40)] chunk_size: u32) {
        check_pixel_iterator_covers_block(
            block
                .spiral_chunks(chunk_size)
                .flat_map(|chunk| chunk.internal_points()),
            *block,
        );
    }

    /// Checks that we are going through the picture in squares of non-decreasing size around
    /// the first chunk.
    #[proptest]
    fn spiral_iterator_is_spiral(block: ScreenBlockWrapper, #[strategy(1u32..40)] chunk_size: u32) {
        let mut it = block.spiral_chunks(chunk_size);

        if let Some(first) = it.next() {
            let mut prev_distance = 0;
            for subblock in it {
                let distance = cmp::max(
                    abs_difference(first.min.x, subblock.min.x),
                    abs_difference(first.min.y, subblock.min.y),
                );
                assert!(distance >= prev_distance);
                prev_distance = distance;
            }
        }
    }

    #[proptest]
    fn spiral_iterator_exact_length(block: ScreenBlockWrapper, #[strategy(1u32..40)] chunk_size: u32) {
        let it = block.spiral_chunks(chunk_size);
        check_exact_length(it, it.len());
    }

    #[test]
    #[should_panic]
    fn zero_sized_chunks() {
        ScreenBlock::from_size(ScreenSize::new(10, 10)).spiral_chunks(0);
    }
}
