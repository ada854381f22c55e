use crate::decoders::jpeg::coefficients::{CoefficientDecoder, DcPredictors};
use crate::decoders::jpeg::huffman::HuffmanDecoder;
use crate::decoders::jpeg::idct::{level_shift, to_samples, Idct, InverseDct};
use crate::decoders::jpeg::quant::{dequantize, reorder, QuantizationTable};
use crate::utils::bitreader::BitReader;
use crate::utils::error::JpegResult;
use log::{debug, trace, warn};

/// Where a reconstructed block belongs: the component and its block coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPosition {
    pub component_id: u8,
    pub block_x: u32,
    pub block_y: u32,
}

/// Receives every finished, level-shifted 8x8 block of a scan.
pub trait BlockSink {
    fn put_block(&mut self, position: BlockPosition, samples: &[u8; 64]);
}

impl<F: FnMut(BlockPosition, &[u8; 64])> BlockSink for F {
    fn put_block(&mut self, position: BlockPosition, samples: &[u8; 64]) {
        self(position, samples)
    }
}

/// One component as seen by a scan, with the tables it selected.
#[derive(Debug, Clone)]
pub struct ScanComponent<'a> {
    pub id: u8,
    pub h_samp: u8,
    pub v_samp: u8,
    pub dc: &'a HuffmanDecoder,
    pub ac: &'a HuffmanDecoder,
    pub quant: &'a QuantizationTable,
    /// Block grid of the component, used when it is coded alone.
    pub blocks_wide: u32,
    pub blocks_high: u32,
}

/// Everything a scan needs besides its entropy-coded bytes.
#[derive(Debug, Clone)]
pub struct ScanContext<'a> {
    pub components: Vec<ScanComponent<'a>>,
    pub mcus_x: u32,
    pub mcus_y: u32,
    pub restart_interval: u16,
    pub idct: &'a Idct,
    pub recover_at_restart: bool,
}

impl ScanContext<'_> {
    pub fn is_interleaved(&self) -> bool {
        self.components.len() > 1
    }

    pub fn total_mcus(&self) -> u64 {
        match self.components.as_slice() {
            [single] => u64::from(single.blocks_wide) * u64::from(single.blocks_high),
            _ => u64::from(self.mcus_x) * u64::from(self.mcus_y),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub mcus: u64,
    pub blocks: u64,
    pub restarts: u64,
    pub damaged_intervals: u64,
    pub padded_bits: u64,
}

pub struct ScanDecoder<'a> {
    context: ScanContext<'a>,
    predictors: DcPredictors,
    next_restart: u8,
}

impl<'a> ScanDecoder<'a> {
    pub fn new(context: ScanContext<'a>) -> Self {
        Self {
            context,
            predictors: DcPredictors::new(),
            next_restart: 0,
        }
    }

    /// Decodes a whole entropy-coded segment, handing every block to `sink`.
    pub fn decode<S: BlockSink>(&mut self, data: &[u8], sink: &mut S) -> JpegResult<ScanSummary> {
        let mut reader = BitReader::new(data);
        let mut summary = ScanSummary::default();

        self.predictors.reset();
        self.next_restart = 0;

        let total = self.context.total_mcus();
        let interval = u64::from(self.context.restart_interval);
        let recover = self.context.recover_at_restart && interval > 0;

        debug!(
            "Decoding {} scan: {} components, {} MCUs, restart interval {}",
            if self.context.is_interleaved() { "interleaved" } else { "single-component" },
            self.context.components.len(),
            total,
            interval
        );

        let mut mcu = 0u64;
        while mcu < total {
            match self.decode_mcu(&mut reader, mcu, sink) {
                Ok(blocks) => {
                    summary.mcus += 1;
                    summary.blocks += blocks;
                }
                Err(e) if recover => {
                    let boundary = (mcu / interval + 1) * interval;
                    warn!("MCU {} is damaged ({}), resuming at MCU {}", mcu, e, boundary);

                    summary.damaged_intervals += 1;
                    if boundary >= total {
                        break;
                    }
                    mcu = boundary - 1;
                }
                Err(e) => return Err(e),
            }

            mcu += 1;

            if interval > 0 && mcu % interval == 0 && mcu < total {
                let skipped = self.restart(&mut reader, mcu, recover);
                summary.restarts += 1;

                if skipped > 0 {
                    warn!("Restart markers show {} lost intervals, skipping them", skipped);
                    summary.damaged_intervals += skipped;
                    mcu += skipped * interval;
                }
            }
        }

        summary.padded_bits = reader.padding_bits();
        if summary.padded_bits > 0 {
            warn!(
                "Entropy-coded data ended early, {} padding bits were used",
                summary.padded_bits
            );
        }

        Ok(summary)
    }

    // Returns the number of whole intervals the marker sequence says were lost
    fn restart(&mut self, reader: &mut BitReader<'_>, mcu: u64, recover: bool) -> u64 {
        let expected = self.next_restart;
        let mut skipped = 0;

        match reader.take_marker() {
            Some(code @ 0xD0..=0xD7) => {
                let found = code - 0xD0;

                if found != expected {
                    warn!("Expected RST{} before MCU {}, found RST{}", expected, mcu, found);

                    if recover {
                        skipped = u64::from(found.wrapping_sub(expected) & 7);
                    }
                }

                self.next_restart = (found + 1) & 7;
            }
            Some(code) => {
                warn!("Expected RST{} before MCU {}, found marker 0xFF{:02X}", expected, mcu, code);
                self.next_restart = (expected + 1) & 7;
            }
            None => {
                warn!("Missing RST{} before MCU {}", expected, mcu);
                self.next_restart = (expected + 1) & 7;
            }
        }

        trace!("Restart before MCU {}", mcu);
        self.predictors.reset();

        skipped
    }

    fn decode_mcu<S: BlockSink>(&mut self, reader: &mut BitReader<'_>, mcu: u64, sink: &mut S) -> JpegResult<u64> {
        let ScanDecoder { context, predictors, .. } = self;
        let mut blocks = 0;

        if let [single] = context.components.as_slice() {
            let block_x = (mcu % u64::from(single.blocks_wide)) as u32;
            let block_y = (mcu / u64::from(single.blocks_wide)) as u32;

            decode_block(reader, predictors, context.idct, single, block_x, block_y, sink)?;
            return Ok(1);
        }

        let mcu_x = (mcu % u64::from(context.mcus_x)) as u32;
        let mcu_y = (mcu / u64::from(context.mcus_x)) as u32;

        for component in &context.components {
            let h_samp = u32::from(component.h_samp);
            let v_samp = u32::from(component.v_samp);

            for v in 0..v_samp {
                for h in 0..h_samp {
                    let block_x = mcu_x * h_samp + h;
                    let block_y = mcu_y * v_samp + v;

                    decode_block(reader, predictors, context.idct, component, block_x, block_y, sink)?;
                    blocks += 1;
                }
            }
        }

        Ok(blocks)
    }
}

// BitReader -> coefficients -> dequantize -> reorder -> IDCT -> level shift -> sink
fn decode_block<S: BlockSink>(
    reader: &mut BitReader<'_>,
    predictors: &mut DcPredictors,
    idct: &Idct,
    component: &ScanComponent<'_>,
    block_x: u32,
    block_y: u32,
    sink: &mut S,
) -> JpegResult<()> {
    let mut coefficients = [0i32; 64];

    CoefficientDecoder::new(component.dc, component.ac).decode_block(
        reader,
        predictors,
        component.id,
        &mut coefficients,
    )?;

    dequantize(&mut coefficients, component.quant)?;
    let mut block = reorder(&coefficients);
    idct.transform_block(&mut block);
    level_shift(&mut block);

    sink.put_block(
        BlockPosition {
            component_id: component.id,
            block_x,
            block_y,
        },
        &to_samples(&block),
    );

    Ok(())
}
