use crate::decoders::jpeg::color::{ColorConvert, ColorConverter};
use crate::decoders::jpeg::scan::{BlockPosition, BlockSink};
use crate::utils::error::{JpegError, JpegResult};
use log::warn;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockWrite {
    Written,
    /// The block had already been written; the new samples replaced it.
    Overlapped,
    OutOfBounds,
}

/// Samples of one component, sized to whole MCUs.
#[derive(Debug, Clone)]
pub struct ComponentPlane {
    pub id: u8,
    pub h_samp: u8,
    pub v_samp: u8,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    written: Vec<bool>,
    blocks_per_line: u32,
}

impl ComponentPlane {
    pub fn new(id: u8, h_samp: u8, v_samp: u8, blocks_wide: u32, blocks_high: u32) -> Self {
        let width = blocks_wide * 8;
        let height = blocks_high * 8;

        Self {
            id,
            h_samp,
            v_samp,
            width,
            height,
            data: vec![0; width as usize * height as usize],
            written: vec![false; blocks_wide as usize * blocks_high as usize],
            blocks_per_line: blocks_wide,
        }
    }

    /// Copies one 8x8 block of samples into place.
    pub fn put_block(&mut self, block_x: u32, block_y: u32, samples: &[u8; 64]) -> BlockWrite {
        if block_x >= self.blocks_per_line || block_y >= self.height / 8 {
            return BlockWrite::OutOfBounds;
        }

        let block_index = block_y as usize * self.blocks_per_line as usize + block_x as usize;
        let overlapped = std::mem::replace(&mut self.written[block_index], true);

        let stride = self.width as usize;
        let origin = block_y as usize * 8 * stride + block_x as usize * 8;

        for (row, line) in samples.chunks_exact(8).enumerate() {
            let start = origin + row * stride;
            self.data[start..start + 8].copy_from_slice(line);
        }

        if overlapped {
            BlockWrite::Overlapped
        } else {
            BlockWrite::Written
        }
    }

    #[inline]
    pub fn sample(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Nearest-neighbour replication up to the raster grid.
    pub fn upsample(&self, h_max: u8, v_max: u8) -> Vec<u8> {
        let target_width = self.width * u32::from(h_max) / u32::from(self.h_samp);
        let target_height = self.height * u32::from(v_max) / u32::from(self.v_samp);

        let mut upsampled = Vec::with_capacity(target_width as usize * target_height as usize);
        for y in 0..target_height {
            let source_y = y * u32::from(self.v_samp) / u32::from(v_max);
            for x in 0..target_width {
                let source_x = x * u32::from(self.h_samp) / u32::from(h_max);
                upsampled.push(self.sample(source_x, source_y));
            }
        }

        upsampled
    }

    pub fn blocks_written(&self) -> usize {
        self.written.iter().filter(|&&w| w).count()
    }
}

/// All component planes of a frame; the block sink used by every scan.
#[derive(Debug, Clone)]
pub struct PlaneSet {
    pub planes: Vec<ComponentPlane>,
    pub h_max: u8,
    pub v_max: u8,
    pub overlapping_blocks: u64,
}

impl PlaneSet {
    pub fn new(planes: Vec<ComponentPlane>) -> Self {
        let h_max = planes.iter().map(|p| p.h_samp).max().unwrap_or(1);
        let v_max = planes.iter().map(|p| p.v_samp).max().unwrap_or(1);

        Self {
            planes,
            h_max,
            v_max,
            overlapping_blocks: 0,
        }
    }

    /// Size of the assembled raster: the component planes scaled to the largest sampling factors.
    pub fn raster_size(&self) -> (u32, u32) {
        self.planes
            .first()
            .map(|p| {
                (
                    p.width * u32::from(self.h_max) / u32::from(p.h_samp),
                    p.height * u32::from(self.v_max) / u32::from(p.v_samp),
                )
            })
            .unwrap_or((0, 0))
    }

    /// Builds the RGBA raster from the planes.
    ///
    /// One plane is treated as greyscale, three as YCbCr in frame order.
    pub fn to_rgba(&self, converter: &ColorConverter) -> JpegResult<Vec<u8>> {
        let (width, height) = self.raster_size();
        let mut pixels = vec![0u8; width as usize * height as usize * 4];

        if width == 0 || height == 0 {
            return Ok(pixels);
        }

        match self.planes.as_slice() {
            [grey] => {
                let grey = grey.upsample(self.h_max, self.v_max);

                for_each_row(&mut pixels, width, |y, row| {
                    let start = y as usize * width as usize;
                    let line = &grey[start..start + width as usize];
                    for (pixel, &value) in row.chunks_exact_mut(4).zip(line) {
                        pixel.copy_from_slice(&[value, value, value, 255]);
                    }
                });
            }
            [luma, cb, cr] => {
                let luma = luma.upsample(self.h_max, self.v_max);
                let cb = cb.upsample(self.h_max, self.v_max);
                let cr = cr.upsample(self.h_max, self.v_max);

                for_each_row(&mut pixels, width, |y, row| {
                    let start = y as usize * width as usize;
                    for (x, pixel) in row.chunks_exact_mut(4).enumerate() {
                        let i = start + x;
                        pixel.copy_from_slice(&converter.convert_color(luma[i], cb[i], cr[i]));
                    }
                });
            }
            planes => {
                return Err(JpegError::Unsupported(format!(
                    "{} color components (only greyscale and YCbCr are decoded)",
                    planes.len()
                )))
            }
        }

        Ok(pixels)
    }
}

impl BlockSink for PlaneSet {
    fn put_block(&mut self, position: BlockPosition, samples: &[u8; 64]) {
        let plane = match self.planes.iter_mut().find(|p| p.id == position.component_id) {
            Some(plane) => plane,
            None => {
                warn!("Block for unknown component {} dropped", position.component_id);
                return;
            }
        };

        match plane.put_block(position.block_x, position.block_y, samples) {
            BlockWrite::Written => {}
            BlockWrite::Overlapped => {
                self.overlapping_blocks += 1;
                warn!(
                    "Block ({}, {}) of component {} was written twice",
                    position.block_x, position.block_y, position.component_id
                );
            }
            BlockWrite::OutOfBounds => {
                warn!(
                    "Block ({}, {}) of component {} lies outside its plane",
                    position.block_x, position.block_y, position.component_id
                );
            }
        }
    }
}

#[cfg(feature = "rayon")]
fn for_each_row<F>(pixels: &mut [u8], width: u32, f: F)
where
    F: Fn(u32, &mut [u8]) + Sync + Send,
{
    pixels
        .par_chunks_mut(width as usize * 4)
        .enumerate()
        .for_each(|(y, row)| f(y as u32, row));
}

#[cfg(not(feature = "rayon"))]
fn for_each_row<F>(pixels: &mut [u8], width: u32, f: F)
where
    F: Fn(u32, &mut [u8]),
{
    pixels
        .chunks_mut(width as usize * 4)
        .enumerate()
        .for_each(|(y, row)| f(y as u32, row));
}
