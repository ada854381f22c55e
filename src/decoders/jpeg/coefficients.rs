use crate::decoders::jpeg::huffman::SymbolDecoder;
use crate::utils::bitreader::BitReader;
use crate::utils::error::{JpegError, JpegResult};
use std::collections::HashMap;

const MAX_DC_CATEGORY: u8 = 11;
const MAX_AC_CATEGORY: u8 = 10;

// Largest DC magnitude a category-11 difference can encode
const MAX_DC_VALUE: i32 = 2047;

const END_OF_BLOCK: u8 = 0x00;
const ZERO_RUN: u8 = 0xF0;

/// Maps `t` raw bits `v` to the signed value they encode (EXTEND in F.2.2.1).
#[inline]
pub fn extend(v: i32, t: u8) -> i32 {
    if t == 0 {
        return 0;
    }

    if v < (1 << (t - 1)) {
        v + (-1 << t) + 1
    } else {
        v
    }
}

/// Running DC value per component id. Reset at the start of each scan and after each restart.
#[derive(Debug, Default, Clone)]
pub struct DcPredictors(HashMap<u8, i32>);

impl DcPredictors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.0.clear();
    }

    pub fn get(&self, component_id: u8) -> i32 {
        self.0.get(&component_id).copied().unwrap_or(0)
    }

    fn update(&mut self, component_id: u8, diff: i32) -> JpegResult<i32> {
        let predictor = self.0.entry(component_id).or_insert(0);

        match predictor.checked_add(diff) {
            Some(value) if value.abs() <= MAX_DC_VALUE => {
                *predictor = value;
                Ok(value)
            }
            _ => Err(JpegError::CoefficientRange {
                index: 0,
                value: i64::from(*predictor) + i64::from(diff),
            }),
        }
    }
}

/// Reconstructs quantized coefficient blocks from a DC/AC table pair.
pub struct CoefficientDecoder<'t, D: SymbolDecoder> {
    dc: &'t D,
    ac: &'t D,
}

impl<'t, D: SymbolDecoder> CoefficientDecoder<'t, D> {
    pub fn new(dc: &'t D, ac: &'t D) -> Self {
        Self { dc, ac }
    }

    /// Decodes one data unit into `block` in zig-zag order.
    ///
    /// The block is cleared first; the component's DC predictor is advanced.
    pub fn decode_block(
        &self,
        reader: &mut BitReader<'_>,
        predictors: &mut DcPredictors,
        component_id: u8,
        block: &mut [i32; 64],
    ) -> JpegResult<()> {
        block.fill(0);

        let category = self.dc.decode_symbol(reader)?;
        if category > MAX_DC_CATEGORY {
            return Err(JpegError::MagnitudeRange {
                category,
                max: MAX_DC_CATEGORY,
            });
        }

        let diff = extend(reader.read_bits(category)? as i32, category);
        block[0] = predictors.update(component_id, diff)?;

        let mut k = 1;
        while k < 64 {
            let rs = self.ac.decode_symbol(reader)?;
            let run = rs >> 4;
            let size = rs & 0x0F;

            if size == 0 {
                match rs {
                    END_OF_BLOCK => break,
                    ZERO_RUN => {
                        k += 16;
                        continue;
                    }
                    _ => return Err(JpegError::UnsupportedRunLength(run)),
                }
            }

            if size > MAX_AC_CATEGORY {
                return Err(JpegError::MagnitudeRange {
                    category: size,
                    max: MAX_AC_CATEGORY,
                });
            }

            k += run as usize;
            if k > 63 {
                return Err(JpegError::CoefficientOverflow(k));
            }

            block[k] = extend(reader.read_bits(size)? as i32, size);
            k += 1;
        }

        if k > 64 {
            return Err(JpegError::CoefficientOverflow(k));
        }

        Ok(())
    }
}
