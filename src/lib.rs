mod decoders;
mod utils;

pub use decoders::jpeg::color::{ColorConverter, ColorKind};
pub use decoders::jpeg::huffman::{HuffmanDecoder, HuffmanKind, HuffmanSpec};
pub use decoders::jpeg::idct::{Idct, IdctKind};
pub use decoders::jpeg::info::{JpegInfo, ScanInfo};
pub use decoders::jpeg::marker::JpegMarker;
pub use decoders::jpeg::planes::ComponentPlane;
pub use decoders::jpeg::scan::ScanSummary;
pub use decoders::jpeg::{DecoderOptions, FrameComponent, FrameHeader, JfifHeader, JpegDecoder, ScanHeader};
pub use decoders::jpeg::{coefficients, color, huffman, idct, quant, scan};
pub use utils::error::{JpegError, JpegResult};
pub use utils::logger::Logger;
pub use utils::marker::Marker;
pub use utils::{bitreader, writer};

use std::path::Path;

/// A decoded image. The raster covers whole MCUs, so it can be larger than the frame.
#[derive(Debug, Clone)]
pub struct Image {
    width: u32,
    height: u32,
    padded_width: u32,
    padded_height: u32,
    pixels: Vec<u8>,
    planes: Vec<ComponentPlane>,
}

impl Image {
    pub fn new(
        width: u32,
        height: u32,
        padded_width: u32,
        padded_height: u32,
        pixels: Vec<u8>,
        planes: Vec<ComponentPlane>,
    ) -> Image {
        Image {
            width,
            height,
            padded_width,
            padded_height,
            pixels,
            planes,
        }
    }

    /// Width declared by the frame header.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height declared by the frame header.
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn padded_width(&self) -> u32 {
        self.padded_width
    }

    pub fn padded_height(&self) -> u32 {
        self.padded_height
    }

    /// RGBA8 samples of the padded raster, row by row.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn planes(&self) -> &[ComponentPlane] {
        &self.planes
    }

    pub fn as_rgb8(&self) -> Vec<u8> {
        self.pixels
            .chunks_exact(4)
            .flat_map(|pixel| pixel[..3].iter().copied())
            .collect()
    }

    /// RGBA value at `(x, y)` of the padded raster.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.padded_width || y >= self.padded_height {
            return None;
        }

        let i = (y as usize * self.padded_width as usize + x as usize) * 4;
        self.pixels.get(i..i + 4).map(|p| [p[0], p[1], p[2], p[3]])
    }
}

/// Opens and decodes a baseline JPEG file.
pub fn decode_file<P: AsRef<Path>>(path: P, options: DecoderOptions) -> JpegResult<Image> {
    JpegDecoder::open(path, options)?.decode()
}
