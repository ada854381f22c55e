use std::f64::consts::{FRAC_1_SQRT_2, PI};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::OnceLock;

/// Turns one block of natural-order, dequantized coefficients into centered samples, in place.
pub trait InverseDct {
    fn transform_block(&self, block: &mut [i32; 64]);
}

#[inline]
fn cosine(position: usize, frequency: usize) -> f64 {
    (((2 * position + 1) * frequency) as f64 * PI / 16.0).cos()
}

#[inline]
fn scale(frequency: usize) -> f64 {
    if frequency == 0 {
        FRAC_1_SQRT_2
    } else {
        1.0
    }
}

/// Direct evaluation of the 2-D sum, recomputing every cosine.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveIdct;

impl InverseDct for NaiveIdct {
    fn transform_block(&self, block: &mut [i32; 64]) {
        let input = *block;

        for y in 0..8 {
            for x in 0..8 {
                let mut sum = 0.0;

                for u in 0..8 {
                    for v in 0..8 {
                        sum += scale(u) * scale(v) * f64::from(input[v * 8 + u]) * cosine(x, u) * cosine(y, v);
                    }
                }

                block[y * 8 + x] = (sum / 4.0).round() as i32;
            }
        }
    }
}

/// Same sum as [`NaiveIdct`], with the cosine table built on first use and kept by the instance.
#[derive(Debug, Default)]
pub struct CachedIdct {
    table: OnceLock<[[f64; 8]; 8]>,
}

impl CachedIdct {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> &[[f64; 8]; 8] {
        self.table.get_or_init(|| {
            let mut table = [[0.0; 8]; 8];
            for (position, row) in table.iter_mut().enumerate() {
                for (frequency, entry) in row.iter_mut().enumerate() {
                    *entry = cosine(position, frequency);
                }
            }
            table
        })
    }
}

impl Clone for CachedIdct {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl InverseDct for CachedIdct {
    fn transform_block(&self, block: &mut [i32; 64]) {
        let table = self.table();
        let input = *block;

        for y in 0..8 {
            for x in 0..8 {
                let mut sum = 0.0;

                for u in 0..8 {
                    for v in 0..8 {
                        sum += scale(u) * scale(v) * f64::from(input[v * 8 + u]) * table[x][u] * table[y][v];
                    }
                }

                block[y * 8 + x] = (sum / 4.0).round() as i32;
            }
        }
    }
}

// 2048 * sqrt(2) * cos(k * pi / 16)
const W1: i64 = 2841;
const W2: i64 = 2676;
const W3: i64 = 2408;
const W5: i64 = 1609;
const W6: i64 = 1108;
const W7: i64 = 565;

/// Separable fixed-point butterfly after Chen and Wang. Output is clamped to [-128, 127].
#[derive(Debug, Clone, Copy, Default)]
pub struct ChenWangIdct;

impl ChenWangIdct {
    fn row(blk: &mut [i64; 64], o: usize) {
        let mut x1 = blk[o + 4] << 11;
        let mut x2 = blk[o + 6];
        let mut x3 = blk[o + 2];
        let mut x4 = blk[o + 1];
        let mut x5 = blk[o + 7];
        let mut x6 = blk[o + 5];
        let mut x7 = blk[o + 3];

        if (x1 | x2 | x3 | x4 | x5 | x6 | x7) == 0 {
            let dc = blk[o] << 3;
            blk[o..o + 8].fill(dc);
            return;
        }

        let mut x0 = (blk[o] << 11) + 128;

        // First stage
        let mut x8 = W7 * (x4 + x5);
        x4 = x8 + (W1 - W7) * x4;
        x5 = x8 - (W1 + W7) * x5;
        x8 = W3 * (x6 + x7);
        x6 = x8 - (W3 - W5) * x6;
        x7 = x8 - (W3 + W5) * x7;

        // Second stage
        x8 = x0 + x1;
        x0 -= x1;
        x1 = W6 * (x3 + x2);
        x2 = x1 - (W2 + W6) * x2;
        x3 = x1 + (W2 - W6) * x3;
        x1 = x4 + x6;
        x4 -= x6;
        x6 = x5 + x7;
        x5 -= x7;

        // Third stage
        x7 = x8 + x3;
        x8 -= x3;
        x3 = x0 + x2;
        x0 -= x2;
        x2 = (181 * (x4 + x5) + 128) >> 8;
        x4 = (181 * (x4 - x5) + 128) >> 8;

        blk[o] = (x7 + x1) >> 8;
        blk[o + 1] = (x3 + x2) >> 8;
        blk[o + 2] = (x0 + x4) >> 8;
        blk[o + 3] = (x8 + x6) >> 8;
        blk[o + 4] = (x8 - x6) >> 8;
        blk[o + 5] = (x0 - x4) >> 8;
        blk[o + 6] = (x3 - x2) >> 8;
        blk[o + 7] = (x7 - x1) >> 8;
    }

    fn column(blk: &mut [i64; 64], o: usize) {
        let mut x1 = blk[o + 32] << 8;
        let mut x2 = blk[o + 48];
        let mut x3 = blk[o + 16];
        let mut x4 = blk[o + 8];
        let mut x5 = blk[o + 56];
        let mut x6 = blk[o + 40];
        let mut x7 = blk[o + 24];

        if (x1 | x2 | x3 | x4 | x5 | x6 | x7) == 0 {
            let dc = clip((blk[o] + 32) >> 6);
            for i in 0..8 {
                blk[o + 8 * i] = dc;
            }
            return;
        }

        let mut x0 = (blk[o] << 8) + 8192;

        // First stage
        let mut x8 = W7 * (x4 + x5) + 4;
        x4 = (x8 + (W1 - W7) * x4) >> 3;
        x5 = (x8 - (W1 + W7) * x5) >> 3;
        x8 = W3 * (x6 + x7) + 4;
        x6 = (x8 - (W3 - W5) * x6) >> 3;
        x7 = (x8 - (W3 + W5) * x7) >> 3;

        // Second stage
        x8 = x0 + x1;
        x0 -= x1;
        x1 = W6 * (x3 + x2) + 4;
        x2 = (x1 - (W2 + W6) * x2) >> 3;
        x3 = (x1 + (W2 - W6) * x3) >> 3;
        x1 = x4 + x6;
        x4 -= x6;
        x6 = x5 + x7;
        x5 -= x7;

        // Third stage
        x7 = x8 + x3;
        x8 -= x3;
        x3 = x0 + x2;
        x0 -= x2;
        x2 = (181 * (x4 + x5) + 128) >> 8;
        x4 = (181 * (x4 - x5) + 128) >> 8;

        let outputs = [
            x7 + x1,
            x3 + x2,
            x0 + x4,
            x8 + x6,
            x8 - x6,
            x0 - x4,
            x3 - x2,
            x7 - x1,
        ];

        for (i, value) in outputs.into_iter().enumerate() {
            blk[o + 8 * i] = clip(value >> 14);
        }
    }
}

#[inline]
fn clip(value: i64) -> i64 {
    value.clamp(-128, 127)
}

impl InverseDct for ChenWangIdct {
    fn transform_block(&self, block: &mut [i32; 64]) {
        let mut work = [0i64; 64];
        for (w, &b) in work.iter_mut().zip(block.iter()) {
            *w = i64::from(b);
        }

        for row in 0..8 {
            Self::row(&mut work, 8 * row);
        }

        for column in 0..8 {
            Self::column(&mut work, column);
        }

        for (b, &w) in block.iter_mut().zip(work.iter()) {
            *b = w as i32;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdctKind {
    Naive,
    Cached,
    #[default]
    ChenWang,
}

impl Display for IdctKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            IdctKind::Naive => write!(f, "naive"),
            IdctKind::Cached => write!(f, "cached"),
            IdctKind::ChenWang => write!(f, "chen-wang"),
        }
    }
}

impl FromStr for IdctKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "naive" => Ok(IdctKind::Naive),
            "cached" => Ok(IdctKind::Cached),
            "chen-wang" => Ok(IdctKind::ChenWang),
            _ => Err(format!("unknown IDCT '{}', expected naive, cached or chen-wang", s)),
        }
    }
}

/// IDCT strategy, chosen once per decoder.
#[derive(Debug, Clone)]
pub enum Idct {
    Naive(NaiveIdct),
    Cached(CachedIdct),
    ChenWang(ChenWangIdct),
}

impl Idct {
    pub fn new(kind: IdctKind) -> Self {
        match kind {
            IdctKind::Naive => Idct::Naive(NaiveIdct),
            IdctKind::Cached => Idct::Cached(CachedIdct::new()),
            IdctKind::ChenWang => Idct::ChenWang(ChenWangIdct),
        }
    }

    pub fn kind(&self) -> IdctKind {
        match self {
            Idct::Naive(_) => IdctKind::Naive,
            Idct::Cached(_) => IdctKind::Cached,
            Idct::ChenWang(_) => IdctKind::ChenWang,
        }
    }
}

impl InverseDct for Idct {
    #[inline]
    fn transform_block(&self, block: &mut [i32; 64]) {
        match self {
            Idct::Naive(idct) => idct.transform_block(block),
            Idct::Cached(idct) => idct.transform_block(block),
            Idct::ChenWang(idct) => idct.transform_block(block),
        }
    }
}

/// Recenters samples from [-128, 127] to [0, 255]. One call per block.
#[inline]
pub fn level_shift(block: &mut [i32; 64]) {
    for sample in block.iter_mut() {
        *sample = sample.saturating_add(128);
    }
}

/// Clamps level-shifted samples into bytes.
#[inline]
pub fn to_samples(block: &[i32; 64]) -> [u8; 64] {
    let mut samples = [0u8; 64];

    for (sample, &value) in samples.iter_mut().zip(block.iter()) {
        *sample = value.clamp(0, 255) as u8;
    }

    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rustfmt::skip]
    const WORKED_COEFFICIENTS: [i32; 64] = [
        -416, -33, -60,  32,  48, -40, 0, 0,
           0, -24, -56,  19,  26,   0, 0, 0,
         -42,  13,  80, -24, -40,   0, 0, 0,
         -42,  17,  44, -29,   0,   0, 0, 0,
          18,   0,   0,   0,   0,   0, 0, 0,
           0,   0,   0,   0,   0,   0, 0, 0,
           0,   0,   0,   0,   0,   0, 0, 0,
           0,   0,   0,   0,   0,   0, 0, 0,
    ];

    #[rustfmt::skip]
    const WORKED_SAMPLES: [i32; 64] = [
        -66, -63, -71, -68, -56, -65, -68, -46,
        -71, -73, -72, -46, -20, -41, -66, -57,
        -70, -78, -68, -17,  20, -14, -61, -63,
        -63, -73, -62,  -8,  27, -14, -60, -58,
        -58, -65, -61, -27,  -6, -40, -68, -50,
        -57, -57, -64, -58, -48, -66, -72, -47,
        -53, -46, -61, -74, -65, -63, -62, -45,
        -47, -34, -53, -74, -60, -47, -47, -41,
    ];

    fn all_variants() -> Vec<Idct> {
        vec![
            Idct::new(IdctKind::Naive),
            Idct::new(IdctKind::Cached),
            Idct::new(IdctKind::ChenWang),
        ]
    }

    #[test]
    fn every_variant_reproduces_the_worked_example() {
        for idct in all_variants() {
            let mut block = WORKED_COEFFICIENTS;
            idct.transform_block(&mut block);
            assert_eq!(block, WORKED_SAMPLES, "{}", idct.kind());
        }
    }

    #[test]
    fn dc_only_blocks_are_uniform() {
        for (dc, expected) in [(6, 1), (-6, -1), (0, 0), (7, 1), (-7, -1)] {
            for idct in all_variants() {
                let mut block = [0i32; 64];
                block[0] = dc;
                idct.transform_block(&mut block);
                assert!(block.iter().all(|&s| s == expected), "{} dc {}: {:?}", idct.kind(), dc, block);
            }
        }
    }

    #[test]
    fn chen_wang_clamps_its_output() {
        let mut block = [0i32; 64];
        block[0] = -2000;
        ChenWangIdct.transform_block(&mut block);
        assert!(block.iter().all(|&s| s == -128));

        let mut block = [0i32; 64];
        block[0] = 2000;
        ChenWangIdct.transform_block(&mut block);
        assert!(block.iter().all(|&s| s == 127));

        // Not DC-only, so the full column pass runs
        let mut block = [0i32; 64];
        block[0] = -2000;
        block[8] = 40;
        ChenWangIdct.transform_block(&mut block);
        assert!(block.iter().all(|&s| s == -128));
    }

    #[test]
    fn cached_table_matches_the_naive_sum() {
        let cached = CachedIdct::new();

        for seed in 0..8 {
            let mut input = [0i32; 64];
            for (i, c) in input.iter_mut().enumerate().take(20) {
                *c = ((i as i32 * 37 + seed * 11) % 61) - 30;
            }

            let mut naive = input;
            let mut with_cache = input;
            NaiveIdct.transform_block(&mut naive);
            cached.transform_block(&mut with_cache);

            assert_eq!(naive, with_cache);
        }
    }

    #[test]
    fn level_shift_adds_128() {
        let mut block = WORKED_SAMPLES;
        level_shift(&mut block);

        for (shifted, original) in block.iter().zip(WORKED_SAMPLES.iter()) {
            assert_eq!(*shifted, original + 128);
        }
        assert_eq!(&to_samples(&block)[..4], &[62, 65, 57, 60]);
    }

    #[test]
    fn level_shift_saturates() {
        let mut block = [0i32; 64];
        block[0] = i32::MAX;
        level_shift(&mut block);

        assert_eq!(block[0], i32::MAX);
        assert_eq!(to_samples(&block)[0], 255);
    }

    #[test]
    fn to_samples_clamps() {
        let mut block = [0i32; 64];
        block[0] = -5;
        block[1] = 300;
        block[2] = 255;

        let samples = to_samples(&block);
        assert_eq!(&samples[..3], &[0, 255, 255]);
    }

    #[test]
    fn kinds_parse_from_kebab_case() {
        assert_eq!("chen-wang".parse::<IdctKind>(), Ok(IdctKind::ChenWang));
        assert_eq!(IdctKind::Cached.to_string(), "cached");
        assert!("fast".parse::<IdctKind>().is_err());
    }
}
