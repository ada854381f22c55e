//! Minimal baseline encoder used to build test streams.

#![allow(dead_code)]

use jpeg_baseline::quant::ZIGZAG_MAP;
use jpeg_baseline::HuffmanSpec;
use std::collections::HashMap;
use std::f64::consts::{FRAC_1_SQRT_2, PI};

// Table K.1 in natural order
#[rustfmt::skip]
pub const LUMINANCE_QUANT: [u16; 64] = [
    16, 11, 10, 16, 24, 40, 51, 61,
    12, 12, 14, 19, 26, 58, 60, 55,
    14, 13, 16, 24, 40, 57, 69, 56,
    14, 17, 22, 29, 51, 87, 80, 62,
    18, 22, 37, 56, 68, 109, 103, 77,
    24, 35, 55, 64, 81, 104, 113, 92,
    49, 64, 78, 87, 103, 121, 120, 101,
    72, 92, 95, 98, 112, 100, 103, 99,
];

/// Quantized coefficients of the classic worked example, zig-zag order.
#[rustfmt::skip]
pub const WORKED_ZIGZAG: [i32; 64] = [
    -26, -3, 0, -3, -2, -6, 2, -4, 1, -3, 1, 1, 5, 1, 2, -1,
    1, -1, 2, 0, 0, 0, 0, 0, -1, -1, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
];

/// Decoded samples of the worked example after the level shift.
#[rustfmt::skip]
pub const WORKED_PIXELS: [u8; 64] = [
    62, 65, 57, 60, 72, 63, 60, 82,
    57, 55, 56, 82, 108, 87, 62, 71,
    58, 50, 60, 111, 148, 114, 67, 65,
    65, 55, 66, 120, 155, 114, 68, 70,
    70, 63, 67, 101, 122, 88, 60, 78,
    71, 71, 64, 70, 80, 62, 56, 81,
    75, 82, 67, 54, 63, 65, 66, 83,
    81, 94, 75, 54, 68, 81, 81, 87,
];

const AC_LUMINANCE_BITS: [u8; 16] = [0, 2, 1, 3, 3, 2, 4, 3, 5, 5, 4, 4, 0, 0, 1, 0x7D];

#[rustfmt::skip]
const AC_LUMINANCE_VALUES: [u8; 162] = [
    0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12, 0x21, 0x31, 0x41, 0x06, 0x13, 0x51, 0x61, 0x07,
    0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xA1, 0x08, 0x23, 0x42, 0xB1, 0xC1, 0x15, 0x52, 0xD1, 0xF0,
    0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0A, 0x16, 0x17, 0x18, 0x19, 0x1A, 0x25, 0x26, 0x27, 0x28,
    0x29, 0x2A, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3A, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49,
    0x4A, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5A, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69,
    0x6A, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7A, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89,
    0x8A, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9A, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7,
    0xA8, 0xA9, 0xAA, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3, 0xC4, 0xC5,
    0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA, 0xE1, 0xE2,
    0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9, 0xEA, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8,
    0xF9, 0xFA,
];

const AC_CHROMINANCE_BITS: [u8; 16] = [0, 2, 1, 2, 4, 4, 3, 4, 7, 5, 4, 4, 0, 1, 2, 0x77];

#[rustfmt::skip]
const AC_CHROMINANCE_VALUES: [u8; 162] = [
    0x00, 0x01, 0x02, 0x03, 0x11, 0x04, 0x05, 0x21, 0x31, 0x06, 0x12, 0x41, 0x51, 0x07, 0x61, 0x71,
    0x13, 0x22, 0x32, 0x81, 0x08, 0x14, 0x42, 0x91, 0xA1, 0xB1, 0xC1, 0x09, 0x23, 0x33, 0x52, 0xF0,
    0x15, 0x62, 0x72, 0xD1, 0x0A, 0x16, 0x24, 0x34, 0xE1, 0x25, 0xF1, 0x17, 0x18, 0x19, 0x1A, 0x26,
    0x27, 0x28, 0x29, 0x2A, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3A, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48,
    0x49, 0x4A, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5A, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68,
    0x69, 0x6A, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7A, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87,
    0x88, 0x89, 0x8A, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9A, 0xA2, 0xA3, 0xA4, 0xA5,
    0xA6, 0xA7, 0xA8, 0xA9, 0xAA, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3,
    0xC4, 0xC5, 0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA,
    0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9, 0xEA, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8,
    0xF9, 0xFA,
];

/// The four typical tables of Annex K: DC/AC luminance as id 0, DC/AC chrominance as id 1.
pub fn standard_tables() -> [HuffmanSpec; 4] {
    [
        HuffmanSpec::new(0, 0, [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0], (0..12).collect()),
        HuffmanSpec::new(1, 0, AC_LUMINANCE_BITS, AC_LUMINANCE_VALUES.to_vec()),
        HuffmanSpec::new(0, 1, [0, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0], (0..12).collect()),
        HuffmanSpec::new(1, 1, AC_CHROMINANCE_BITS, AC_CHROMINANCE_VALUES.to_vec()),
    ]
}

/// Natural-order table values rearranged to stream (zig-zag) order.
pub fn to_zigzag(natural: &[u16; 64]) -> [u16; 64] {
    let mut zigzag = [0u16; 64];
    for (i, &index) in ZIGZAG_MAP.iter().enumerate() {
        zigzag[i] = natural[index as usize];
    }
    zigzag
}

/// Coefficients of a block whose samples all equal `value`, for a quantizer of 1.
pub fn flat_block(value: u8) -> [i32; 64] {
    let mut block = [0i32; 64];
    block[0] = 8 * (i32::from(value) - 128);
    block
}

/// Forward DCT of one 8x8 block of samples, quantized with a zig-zag ordered table.
pub fn forward_dct(samples: &[u8; 64], quant: &[u16; 64]) -> [i32; 64] {
    let scale = |f: usize| if f == 0 { FRAC_1_SQRT_2 } else { 1.0 };
    let cosine = |p: usize, f: usize| (((2 * p + 1) * f) as f64 * PI / 16.0).cos();

    let mut zigzag = [0i32; 64];
    for (i, &index) in ZIGZAG_MAP.iter().enumerate() {
        let (v, u) = (index as usize / 8, index as usize % 8);
        let mut sum = 0.0;

        for y in 0..8 {
            for x in 0..8 {
                let sample = f64::from(samples[y * 8 + x]) - 128.0;
                sum += sample * cosine(x, u) * cosine(y, v);
            }
        }

        let coefficient = sum * scale(u) * scale(v) / 4.0;
        zigzag[i] = (coefficient / f64::from(quant[i])).round() as i32;
    }

    zigzag
}

/// Cuts a sample function into quantized blocks, `blocks_wide` x `blocks_high`, raster order.
pub fn blocks_from<F: Fn(u32, u32) -> u8>(blocks_wide: u32, blocks_high: u32, quant: &[u16; 64], sample: F) -> Vec<[i32; 64]> {
    let mut blocks = Vec::with_capacity((blocks_wide * blocks_high) as usize);

    for by in 0..blocks_high {
        for bx in 0..blocks_wide {
            let mut samples = [0u8; 64];
            for (i, s) in samples.iter_mut().enumerate() {
                *s = sample(bx * 8 + (i % 8) as u32, by * 8 + (i / 8) as u32);
            }
            blocks.push(forward_dct(&samples, quant));
        }
    }

    blocks
}

/// MSB-first bit sink with byte stuffing and 1-bit padding.
#[derive(Debug, Default)]
pub struct BitWriter {
    data: Vec<u8>,
    accumulator: u32,
    count: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_bits(&mut self, value: u32, length: u8) {
        for i in (0..length).rev() {
            self.accumulator = (self.accumulator << 1) | ((value >> i) & 1);
            self.count += 1;

            if self.count == 8 {
                self.push(self.accumulator as u8);
                self.accumulator = 0;
                self.count = 0;
            }
        }
    }

    pub fn flush(&mut self) {
        while self.count != 0 {
            self.write_bits(1, 1);
        }
    }

    pub fn marker(&mut self, code: u8) {
        self.flush();
        self.data.extend([0xFF, code]);
    }

    pub fn into_bytes(mut self) -> Vec<u8> {
        self.flush();
        self.data
    }

    fn push(&mut self, byte: u8) {
        self.data.push(byte);
        if byte == 0xFF {
            self.data.push(0x00);
        }
    }
}

pub struct HuffmanEncoder {
    codes: HashMap<u8, (u16, u8)>,
}

impl HuffmanEncoder {
    pub fn new(spec: &HuffmanSpec) -> Self {
        let codes = spec
            .canonical_codes()
            .expect("valid table")
            .into_iter()
            .map(|(value, length, code)| (value, (code, length)))
            .collect();

        Self { codes }
    }

    pub fn write(&self, writer: &mut BitWriter, symbol: u8) {
        let (code, length) = self.codes[&symbol];
        writer.write_bits(u32::from(code), length);
    }
}

fn category(value: i32) -> u8 {
    (32 - value.unsigned_abs().leading_zeros()) as u8
}

fn magnitude(value: i32, size: u8) -> u32 {
    if value < 0 {
        (value - 1) as u32 & ((1 << size) - 1)
    } else {
        value as u32
    }
}

/// Huffman-codes one block of zig-zag ordered, quantized coefficients.
pub fn encode_block(writer: &mut BitWriter, block: &[i32; 64], predictor: &mut i32, dc: &HuffmanEncoder, ac: &HuffmanEncoder) {
    let diff = block[0] - *predictor;
    *predictor = block[0];

    let size = category(diff);
    dc.write(writer, size);
    writer.write_bits(magnitude(diff, size), size);

    let mut run = 0u8;
    for &coefficient in &block[1..] {
        if coefficient == 0 {
            run += 1;
            continue;
        }

        while run > 15 {
            ac.write(writer, 0xF0);
            run -= 16;
        }

        let size = category(coefficient);
        ac.write(writer, (run << 4) | size);
        writer.write_bits(magnitude(coefficient, size), size);
        run = 0;
    }

    if run > 0 {
        ac.write(writer, 0x00);
    }
}

#[derive(Debug, Clone)]
pub struct TestComponent {
    pub id: u8,
    pub h_samp: u8,
    pub v_samp: u8,
    pub quant_table: u8,
    /// Huffman table id used for both DC and AC
    pub table: u8,
    /// Blocks of the MCU-aligned plane in raster order, zig-zag coefficients.
    pub blocks: Vec<[i32; 64]>,
}

/// Description of a baseline image that [`TestJpeg::encode`] turns into a JFIF stream.
#[derive(Debug, Clone)]
pub struct TestJpeg {
    pub width: u16,
    pub height: u16,
    pub quant_tables: Vec<[u16; 64]>,
    pub components: Vec<TestComponent>,
    pub restart_interval: u16,
    pub interleaved: bool,
    pub comment: Option<String>,
    pub huffman_tables: bool,
}

impl TestJpeg {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            quant_tables: vec![[1; 64]],
            components: Vec::new(),
            restart_interval: 0,
            interleaved: true,
            comment: None,
            huffman_tables: true,
        }
    }

    /// Single-component image with a unit quantizer.
    pub fn greyscale(width: u16, height: u16, blocks: Vec<[i32; 64]>) -> Self {
        let mut image = Self::new(width, height);
        image.components.push(TestComponent {
            id: 1,
            h_samp: 1,
            v_samp: 1,
            quant_table: 0,
            table: 0,
            blocks,
        });
        image
    }

    fn max_sampling(&self) -> (u32, u32) {
        let h = self.components.iter().map(|c| u32::from(c.h_samp)).max().unwrap_or(1);
        let v = self.components.iter().map(|c| u32::from(c.v_samp)).max().unwrap_or(1);
        (h, v)
    }

    pub fn mcus(&self) -> (u32, u32) {
        let (h_max, v_max) = self.max_sampling();
        (
            u32::from(self.width).div_ceil(8 * h_max),
            u32::from(self.height).div_ceil(8 * v_max),
        )
    }

    /// Block grid of the MCU-aligned plane of `component`.
    pub fn plane_blocks(&self, component: &TestComponent) -> (u32, u32) {
        let (mcus_x, mcus_y) = self.mcus();
        (mcus_x * u32::from(component.h_samp), mcus_y * u32::from(component.v_samp))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![0xFF, 0xD8];

        let mut jfif = b"JFIF\0".to_vec();
        jfif.extend([1, 1, 0, 0, 1, 0, 1, 0, 0]);
        segment(&mut out, 0xE0, &jfif);

        if let Some(comment) = &self.comment {
            segment(&mut out, 0xFE, comment.as_bytes());
        }

        for (id, table) in self.quant_tables.iter().enumerate() {
            let precision = u8::from(table.iter().any(|&q| q > 255));
            let mut payload = vec![(precision << 4) | id as u8];
            for &q in table {
                if precision == 1 {
                    payload.extend(q.to_be_bytes());
                } else {
                    payload.push(q as u8);
                }
            }
            segment(&mut out, 0xDB, &payload);
        }

        let tables = standard_tables();
        if self.huffman_tables {
            for spec in &tables {
                let mut payload = vec![(spec.class << 4) | spec.id];
                payload.extend(spec.bits);
                payload.extend(&spec.values);
                segment(&mut out, 0xC4, &payload);
            }
        }

        let mut sof = vec![8];
        sof.extend(self.height.to_be_bytes());
        sof.extend(self.width.to_be_bytes());
        sof.push(self.components.len() as u8);
        for c in &self.components {
            sof.extend([c.id, (c.h_samp << 4) | c.v_samp, c.quant_table]);
        }
        segment(&mut out, 0xC0, &sof);

        if self.restart_interval > 0 {
            segment(&mut out, 0xDD, &self.restart_interval.to_be_bytes());
        }

        let encoders: Vec<(HuffmanEncoder, HuffmanEncoder)> = self
            .components
            .iter()
            .map(|c| {
                let index = usize::from(c.table.min(1)) * 2;
                (HuffmanEncoder::new(&tables[index]), HuffmanEncoder::new(&tables[index + 1]))
            })
            .collect();

        if self.interleaved {
            let indices: Vec<usize> = (0..self.components.len()).collect();
            self.encode_scan(&mut out, &indices, &encoders);
        } else {
            for index in 0..self.components.len() {
                self.encode_scan(&mut out, &[index], &encoders);
            }
        }

        out.extend([0xFF, 0xD9]);
        out
    }

    fn encode_scan(&self, out: &mut Vec<u8>, indices: &[usize], encoders: &[(HuffmanEncoder, HuffmanEncoder)]) {
        let mut header = vec![indices.len() as u8];
        for &i in indices {
            let c = &self.components[i];
            header.extend([c.id, (c.table << 4) | c.table]);
        }
        header.extend([0, 63, 0]);
        segment(out, 0xDA, &header);

        // (component index, block index) per MCU
        let mut mcus: Vec<Vec<(usize, usize)>> = Vec::new();

        if let [single] = indices {
            let c = &self.components[*single];
            let (h_max, v_max) = self.max_sampling();
            let wide = (u32::from(self.width) * u32::from(c.h_samp)).div_ceil(h_max).div_ceil(8);
            let high = (u32::from(self.height) * u32::from(c.v_samp)).div_ceil(v_max).div_ceil(8);
            let (line, _) = self.plane_blocks(c);

            for by in 0..high {
                for bx in 0..wide {
                    mcus.push(vec![(*single, (by * line + bx) as usize)]);
                }
            }
        } else {
            let (mcus_x, mcus_y) = self.mcus();
            for my in 0..mcus_y {
                for mx in 0..mcus_x {
                    let mut units = Vec::new();
                    for &i in indices {
                        let c = &self.components[i];
                        let (line, _) = self.plane_blocks(c);
                        for v in 0..u32::from(c.v_samp) {
                            for h in 0..u32::from(c.h_samp) {
                                let bx = mx * u32::from(c.h_samp) + h;
                                let by = my * u32::from(c.v_samp) + v;
                                units.push((i, (by * line + bx) as usize));
                            }
                        }
                    }
                    mcus.push(units);
                }
            }
        }

        let mut writer = BitWriter::new();
        let mut predictors = vec![0i32; self.components.len()];
        let interval = usize::from(self.restart_interval);

        for (n, units) in mcus.iter().enumerate() {
            if interval > 0 && n > 0 && n % interval == 0 {
                writer.marker(0xD0 + ((n / interval - 1) % 8) as u8);
                predictors.iter_mut().for_each(|p| *p = 0);
            }

            for &(component, block) in units {
                let (dc, ac) = &encoders[component];
                encode_block(
                    &mut writer,
                    &self.components[component].blocks[block],
                    &mut predictors[component],
                    dc,
                    ac,
                );
            }
        }

        out.extend(writer.into_bytes());
    }
}

pub fn segment(out: &mut Vec<u8>, marker: u8, payload: &[u8]) {
    out.extend([0xFF, marker]);
    out.extend(((payload.len() + 2) as u16).to_be_bytes());
    out.extend(payload);
}

/// Byte offsets of every RSTn marker in an encoded stream.
pub fn restart_offsets(data: &[u8]) -> Vec<usize> {
    data.windows(2)
        .enumerate()
        .filter(|(_, pair)| pair[0] == 0xFF && (0xD0..=0xD7).contains(&pair[1]))
        .map(|(i, _)| i)
        .collect()
}
