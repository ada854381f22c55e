use crate::decoders::jpeg::huffman::HuffmanSpec;
use crate::decoders::jpeg::quant::QuantizationTable;
use crate::decoders::jpeg::scan::ScanSummary;
use crate::decoders::jpeg::{DecoderOptions, FrameHeader, JfifHeader, ScanHeader};
use std::fmt::{Display, Formatter};

fn print_matrix<T: Display>(f: &mut Formatter<'_>, values: &[T], width: usize, indent: &str) -> std::fmt::Result {
    if values.is_empty() {
        return writeln!(f, "{}[]", indent);
    }

    let str_values: Vec<String> = values.iter().map(|x| x.to_string()).collect();
    let max_width = str_values.iter().map(|s| s.len()).max().unwrap_or(0);

    for chunk in str_values.chunks(width) {
        write!(f, "{}", indent)?;

        for (i, value) in chunk.iter().enumerate() {
            if i == 0 {
                write!(f, "{:>width$}", value, width = max_width)?;
            } else {
                write!(f, " {:>width$}", value, width = max_width)?;
            }
        }

        writeln!(f)?;
    }

    Ok(())
}

/// One decoded scan.
#[derive(Debug, Clone)]
pub struct ScanInfo {
    pub header: ScanHeader,
    pub data_length: usize,
    pub summary: ScanSummary,
}

/// Everything the decoder learned about an image, for `--info` style reporting.
#[derive(Debug, Clone)]
pub struct JpegInfo {
    pub frame: Option<FrameHeader>,
    pub jfif_header: Option<JfifHeader>,
    pub comments: Vec<String>,
    pub quantization_tables: Vec<QuantizationTable>,
    pub dc_tables: Vec<HuffmanSpec>,
    pub ac_tables: Vec<HuffmanSpec>,
    pub restart_interval: u16,
    pub scans: Vec<ScanInfo>,
    pub overlapping_blocks: u64,
    pub options: DecoderOptions,
}

impl JpegInfo {
    pub fn damaged_intervals(&self) -> u64 {
        self.scans.iter().map(|s| s.summary.damaged_intervals).sum()
    }
}

impl Display for JpegInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.frame {
            Some(frame) => {
                writeln!(f, "Frame: {} ({}-bit)", frame.marker.name(), frame.precision)?;
                writeln!(f, "Dimensions: {}x{}", frame.width, frame.height)?;
                writeln!(
                    f,
                    "MCUs: {}x{} ({}x{} pixels each)",
                    frame.mcus_x(),
                    frame.mcus_y(),
                    8 * frame.h_max(),
                    8 * frame.v_max()
                )?;

                for component in &frame.components {
                    writeln!(
                        f,
                        "Component {}: sampling {}x{}, quantization table {}",
                        component.id, component.h_samp, component.v_samp, component.quant_table_id
                    )?;
                }
            }
            None => writeln!(f, "Frame: None")?,
        }

        writeln!(f, "Restart interval: {}", self.restart_interval)?;
        writeln!(
            f,
            "Decoder: huffman={}, idct={}, color={}, recover={}",
            self.options.huffman, self.options.idct, self.options.color, self.options.recover_at_restart
        )?;

        writeln!(f, "====================")?;

        for comment in &self.comments {
            writeln!(f, "Comment: {}", comment)?;
        }

        match &self.jfif_header {
            Some(jfif) => {
                writeln!(f, "JFIF header:")?;
                writeln!(f, "  Version: {}.{:02}", jfif.version_major, jfif.version_minor)?;
                writeln!(f, "  Density units: {}", jfif.density_units)?;
                writeln!(f, "  Density: {}x{}", jfif.x_density, jfif.y_density)?;
                writeln!(f, "  Thumbnail dimensions: {}x{}", jfif.thumbnail_width, jfif.thumbnail_height)?;
            }
            None => writeln!(f, "JFIF header: None")?,
        }

        writeln!(f, "====================")?;
        writeln!(f, "Quantization tables:")?;

        for table in &self.quantization_tables {
            writeln!(f, "  ID: {} ({}-bit)", table.id, if table.precision == 0 { 8 } else { 16 })?;
            print_matrix(f, &table.natural_order()[..], 8, "    ")?;
        }

        writeln!(f, "====================")?;

        for (name, tables) in [("DC", &self.dc_tables), ("AC", &self.ac_tables)] {
            writeln!(f, "{} Huffman tables:", name)?;

            for table in tables {
                writeln!(f, "  ID: {} ({} codes)", table.id, table.total_codes())?;
                writeln!(f, "  Code lengths:")?;
                print_matrix(f, &table.bits[..], 16, "    ")?;
                writeln!(f, "  Symbols:")?;
                print_matrix(f, table.values.as_slice(), 16, "    ")?;
            }
        }

        writeln!(f, "====================")?;
        writeln!(f, "Scans: {}", self.scans.len())?;

        for (i, scan) in self.scans.iter().enumerate() {
            let components: Vec<String> = scan
                .header
                .components
                .iter()
                .map(|c| format!("{} (DC {}, AC {})", c.component_id, c.dc_table, c.ac_table))
                .collect();

            writeln!(f, "  Scan {}: components {}", i, components.join(", "))?;
            writeln!(
                f,
                "    {} bytes, {} MCUs, {} blocks, {} restarts",
                scan.data_length, scan.summary.mcus, scan.summary.blocks, scan.summary.restarts
            )?;

            if scan.summary.damaged_intervals > 0 || scan.summary.padded_bits > 0 {
                writeln!(
                    f,
                    "    {} damaged intervals, {} padding bits",
                    scan.summary.damaged_intervals, scan.summary.padded_bits
                )?;
            }
        }

        writeln!(f, "Overlapping blocks: {}", self.overlapping_blocks)
    }
}
