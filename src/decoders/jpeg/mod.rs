pub mod coefficients;
pub mod color;
pub mod huffman;
pub mod idct;
pub mod info;
pub mod marker;
pub mod planes;
pub mod quant;
pub mod scan;

use crate::decoders::jpeg::color::{ColorConverter, ColorKind};
use crate::decoders::jpeg::huffman::{generate_codes, HuffmanDecoder, HuffmanKind, HuffmanSpec};
use crate::decoders::jpeg::idct::{Idct, IdctKind};
use crate::decoders::jpeg::info::{JpegInfo, ScanInfo};
use crate::decoders::jpeg::marker::JpegMarker;
use crate::decoders::jpeg::planes::{ComponentPlane, PlaneSet};
use crate::decoders::jpeg::quant::QuantizationTable;
use crate::decoders::jpeg::scan::{ScanComponent, ScanContext, ScanDecoder};
use crate::utils::bytereader::ByteReader;
use crate::utils::error::{JpegError, JpegResult};
use crate::utils::marker::Marker;
use crate::utils::traits::SafeAccess;
use crate::Image;
use log::{debug, warn};
use std::fmt::{Debug, Formatter};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

/// Largest RGBA raster a frame may need. Every plane is at most this many samples.
const MAX_RASTER_BYTES: u64 = 1 << 32;

/// Strategy selection and error policy, fixed for the lifetime of a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecoderOptions {
    pub huffman: HuffmanKind,
    pub idct: IdctKind,
    pub color: ColorKind,
    /// Skip to the next restart marker after a damaged interval instead of failing.
    pub recover_at_restart: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JfifHeader {
    pub version_major: u8,
    pub version_minor: u8,
    pub density_units: u8,
    pub x_density: u16,
    pub y_density: u16,
    pub thumbnail_width: u8,
    pub thumbnail_height: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameComponent {
    pub id: u8,
    pub h_samp: u8,
    pub v_samp: u8,
    pub quant_table_id: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub marker: JpegMarker,
    pub precision: u8,
    pub width: u16,
    pub height: u16,
    pub components: Vec<FrameComponent>,
}

impl FrameHeader {
    pub fn h_max(&self) -> u32 {
        self.components.iter().map(|c| u32::from(c.h_samp)).max().unwrap_or(1)
    }

    pub fn v_max(&self) -> u32 {
        self.components.iter().map(|c| u32::from(c.v_samp)).max().unwrap_or(1)
    }

    pub fn mcus_x(&self) -> u32 {
        u32::from(self.width).div_ceil(8 * self.h_max())
    }

    pub fn mcus_y(&self) -> u32 {
        u32::from(self.height).div_ceil(8 * self.v_max())
    }

    /// Sample size of the MCU-aligned raster.
    pub fn raster_size(&self) -> (u32, u32) {
        (self.mcus_x() * self.h_max() * 8, self.mcus_y() * self.v_max() * 8)
    }

    /// RGBA byte count of the MCU-aligned raster, `None` if it overflows.
    pub fn raster_bytes(&self) -> Option<u64> {
        let (width, height) = self.raster_size();

        u64::from(width)
            .checked_mul(u64::from(height))
            .and_then(|samples| samples.checked_mul(4))
    }

    /// Block grid of a component coded on its own in a non-interleaved scan.
    pub fn component_blocks(&self, component: &FrameComponent) -> (u32, u32) {
        let width = (u32::from(self.width) * u32::from(component.h_samp)).div_ceil(self.h_max());
        let height = (u32::from(self.height) * u32::from(component.v_samp)).div_ceil(self.v_max());

        (width.div_ceil(8), height.div_ceil(8))
    }

    pub fn component(&self, id: u8) -> Option<&FrameComponent> {
        self.components.iter().find(|c| c.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanComponentSelector {
    pub component_id: u8,
    pub dc_table: u8,
    pub ac_table: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanHeader {
    pub components: Vec<ScanComponentSelector>,
    pub spectral_start: u8,
    pub spectral_end: u8,
    pub approximation_high: u8,
    pub approximation_low: u8,
}

pub struct JpegDecoder<R: Read + Seek> {
    reader: ByteReader<R>,
    options: DecoderOptions,
    idct: Idct,
    jfif_header: Option<JfifHeader>,
    comments: Vec<String>,
    frame: Option<FrameHeader>,
    quantization_tables: [Option<QuantizationTable>; 4],
    dc_tables: [Option<HuffmanSpec>; 4],
    ac_tables: [Option<HuffmanSpec>; 4],
    restart_interval: u16,
    planes: Option<PlaneSet>,
    scans: Vec<ScanInfo>,
}

impl<R: Read + Seek> Debug for JpegDecoder<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JpegDecoder")
            .field("options", &self.options)
            .field("frame", &self.frame)
            .field("jfif_header", &self.jfif_header)
            .field("restart_interval", &self.restart_interval)
            .field("scans", &self.scans.len())
            .finish()
    }
}

impl JpegDecoder<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P, options: DecoderOptions) -> JpegResult<Self> {
        let file = File::open(path)?;
        Ok(Self::with_options(BufReader::new(file), options))
    }
}

impl<R: Read + Seek> JpegDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, DecoderOptions::default())
    }

    pub fn with_options(reader: R, options: DecoderOptions) -> Self {
        Self {
            reader: ByteReader::new(reader),
            options,
            idct: Idct::new(options.idct),
            jfif_header: None,
            comments: Vec::new(),
            frame: None,
            quantization_tables: Default::default(),
            dc_tables: Default::default(),
            ac_tables: Default::default(),
            restart_interval: 0,
            planes: None,
            scans: Vec::new(),
        }
    }

    pub fn options(&self) -> DecoderOptions {
        self.options
    }

    pub fn frame(&self) -> Option<&FrameHeader> {
        self.frame.as_ref()
    }

    pub fn info(&self) -> JpegInfo {
        JpegInfo {
            frame: self.frame.clone(),
            jfif_header: self.jfif_header.clone(),
            comments: self.comments.clone(),
            quantization_tables: self.quantization_tables.iter().flatten().cloned().collect(),
            dc_tables: self.dc_tables.iter().flatten().cloned().collect(),
            ac_tables: self.ac_tables.iter().flatten().cloned().collect(),
            restart_interval: self.restart_interval,
            scans: self.scans.clone(),
            overlapping_blocks: self.planes.as_ref().map_or(0, |p| p.overlapping_blocks),
            options: self.options,
        }
    }

    pub fn decode(&mut self) -> JpegResult<Image> {
        let first = self.reader.read_u16()?;
        if first != JpegMarker::SOI.to_u16() {
            return Err(JpegError::segment(
                "SOI",
                format!("stream starts with 0x{:04X} instead of a start-of-image marker", first),
            ));
        }

        loop {
            let code = match self.reader.next_marker()? {
                Some(code) => code,
                None => {
                    warn!("Input ended without an end-of-image marker");
                    break;
                }
            };

            let marker = match JpegMarker::from_u16(code) {
                Some(marker) => marker,
                None => {
                    warn!("Ignoring invalid marker 0x{:04X}", code);
                    continue;
                }
            };

            debug!("Marker {} (0x{:04X})", marker.name(), code);

            match marker {
                JpegMarker::SOI => warn!("Ignoring repeated start-of-image marker"),
                JpegMarker::APP(0) => {
                    let data = self.reader.read_segment()?;
                    self.read_app0(&data)?;
                }
                JpegMarker::COM => {
                    let data = self.reader.read_segment()?;
                    let comment = String::from_utf8_lossy(&data).into_owned();
                    debug!("Comment: {}", comment);
                    self.comments.push(comment);
                }
                JpegMarker::DQT => {
                    let data = self.reader.read_segment()?;
                    self.read_quantization_tables(&data)?;
                }
                JpegMarker::DHT => {
                    let data = self.reader.read_segment()?;
                    self.read_huffman_tables(&data)?;
                }
                JpegMarker::SOF(0) | JpegMarker::SOF(1) => {
                    let data = self.reader.read_segment()?;
                    self.read_frame_header(marker, &data)?;
                }
                JpegMarker::SOF(n) => {
                    return Err(JpegError::Unsupported(format!("{} frames", describe_frame(n))));
                }
                JpegMarker::DRI => {
                    let data = self.reader.read_segment()?;
                    self.read_restart_interval(&data)?;
                }
                JpegMarker::SOS => {
                    let data = self.reader.read_segment()?;
                    let header = self.read_scan_header(&data)?;
                    self.decode_scan(header)?;
                }
                JpegMarker::DNL => {
                    let data = self.reader.read_segment()?;
                    self.read_number_of_lines(&data)?;
                }
                JpegMarker::EOI => {
                    debug!("End of image");
                    break;
                }
                JpegMarker::RST(n) => warn!("Ignoring RST{} outside of a scan", n),
                JpegMarker::TEM => debug!("Ignoring TEM marker"),
                JpegMarker::APP(_) => {
                    let data = self.reader.read_segment()?;
                    debug!("Skipped {} segment ({} bytes)", marker.name(), data.len());
                }
                _ => {
                    let data = self.reader.read_segment()?;
                    warn!("Skipped unhandled {} segment ({} bytes)", marker.name(), data.len());
                }
            }
        }

        self.assemble()
    }

    fn assemble(&self) -> JpegResult<Image> {
        let frame = self
            .frame
            .as_ref()
            .ok_or_else(|| JpegError::segment("SOF", "image has no frame header"))?;

        let planes = match &self.planes {
            Some(planes) if !self.scans.is_empty() => planes,
            _ => return Err(JpegError::segment("SOS", "image has no scans")),
        };

        let pixels = planes.to_rgba(&ColorConverter::new(self.options.color))?;
        let (padded_width, padded_height) = planes.raster_size();

        Ok(Image::new(
            u32::from(frame.width),
            u32::from(frame.height),
            padded_width,
            padded_height,
            pixels,
            planes.planes.clone(),
        ))
    }

    fn read_app0(&mut self, data: &[u8]) -> JpegResult<()> {
        if !data.starts_with(b"JFIF\0") {
            debug!("Skipped APP0 segment without JFIF identifier ({} bytes)", data.len());
            return Ok(());
        }

        let fields = data.get_range_safe(5..14, "APP0")?;
        let header = JfifHeader {
            version_major: fields[0],
            version_minor: fields[1],
            density_units: fields[2],
            x_density: u16::from_be_bytes([fields[3], fields[4]]),
            y_density: u16::from_be_bytes([fields[5], fields[6]]),
            thumbnail_width: fields[7],
            thumbnail_height: fields[8],
        };

        let thumbnail_size = 3 * usize::from(header.thumbnail_width) * usize::from(header.thumbnail_height);
        if data.len() < 14 + thumbnail_size {
            warn!(
                "JFIF thumbnail is truncated: {} bytes announced, {} present",
                thumbnail_size,
                data.len() - 14
            );
        }

        debug!("JFIF {}.{:02}", header.version_major, header.version_minor);
        self.jfif_header = Some(header);

        Ok(())
    }

    fn read_quantization_tables(&mut self, data: &[u8]) -> JpegResult<()> {
        let mut offset = 0;

        while offset < data.len() {
            let table_info = *data.get_safe(offset, "DQT")?;
            let precision = table_info >> 4;
            let id = table_info & 0x0F;
            offset += 1;

            let mut values = [0u16; 64];
            match precision {
                0 => {
                    let bytes = data.get_range_safe(offset..offset + 64, "DQT")?;
                    for (value, &byte) in values.iter_mut().zip(bytes) {
                        *value = u16::from(byte);
                    }
                    offset += 64;
                }
                1 => {
                    let bytes = data.get_range_safe(offset..offset + 128, "DQT")?;
                    for (value, pair) in values.iter_mut().zip(bytes.chunks_exact(2)) {
                        *value = u16::from_be_bytes([pair[0], pair[1]]);
                    }
                    offset += 128;
                }
                _ => {
                    return Err(JpegError::PrecisionRange {
                        field: "quantization table precision",
                        value: precision,
                    })
                }
            }

            let table = QuantizationTable::new(id, precision, values)?;
            debug!("Quantization table {} ({}-bit)", id, if precision == 0 { 8 } else { 16 });

            if values.contains(&0) {
                warn!("Quantization table {} contains zero entries", id);
            }

            self.quantization_tables[usize::from(id)] = Some(table);
        }

        Ok(())
    }

    fn read_huffman_tables(&mut self, data: &[u8]) -> JpegResult<()> {
        let mut offset = 0;

        while offset < data.len() {
            let table_info = *data.get_safe(offset, "DHT")?;
            let class = table_info >> 4;
            let id = table_info & 0x0F;

            if class > 1 {
                return Err(JpegError::PrecisionRange {
                    field: "Huffman table class",
                    value: class,
                });
            }

            if id > 3 {
                return Err(JpegError::PrecisionRange {
                    field: "Huffman table id",
                    value: id,
                });
            }

            let mut bits = [0u8; 16];
            bits.copy_from_slice(data.get_range_safe(offset + 1..offset + 17, "DHT")?);
            offset += 17;

            let total: usize = bits.iter().map(|&b| usize::from(b)).sum();
            if total > 256 {
                return Err(JpegError::segment(
                    "DHT",
                    format!("table {} declares {} codes, at most 256 are possible", id, total),
                ));
            }

            let values = data.get_range_safe(offset..offset + total, "DHT")?.to_vec();
            offset += total;

            // Rejects length counts that overflow the code space
            generate_codes(&bits)?;

            let table = HuffmanSpec::new(class, id, bits, values);
            debug!(
                "{} Huffman table {} ({} codes)",
                if class == 0 { "DC" } else { "AC" },
                id,
                total
            );

            if class == 0 {
                self.dc_tables[usize::from(id)] = Some(table);
            } else {
                self.ac_tables[usize::from(id)] = Some(table);
            }
        }

        Ok(())
    }

    fn read_frame_header(&mut self, marker: JpegMarker, data: &[u8]) -> JpegResult<()> {
        if self.frame.is_some() {
            return Err(JpegError::segment("SOF", "more than one frame header"));
        }

        let header = data.get_range_safe(0..6, "SOF")?;
        let precision = header[0];
        let height = u16::from_be_bytes([header[1], header[2]]);
        let width = u16::from_be_bytes([header[3], header[4]]);
        let count = header[5];

        if precision != 8 {
            return Err(JpegError::Unsupported(format!("{}-bit sample precision", precision)));
        }

        if width == 0 {
            return Err(JpegError::InvalidDimensions {
                width: u32::from(width),
                height: u32::from(height),
            });
        }

        if height == 0 {
            return Err(JpegError::Unsupported(
                "frame height deferred to a DNL marker".to_string(),
            ));
        }

        if !(1..=4).contains(&count) {
            return Err(JpegError::segment("SOF", format!("{} components", count)));
        }

        let mut components: Vec<FrameComponent> = Vec::with_capacity(usize::from(count));
        for i in 0..usize::from(count) {
            let fields = data.get_range_safe(6 + i * 3..9 + i * 3, "SOF")?;
            let component = FrameComponent {
                id: fields[0],
                h_samp: fields[1] >> 4,
                v_samp: fields[1] & 0x0F,
                quant_table_id: fields[2],
            };

            if !(1..=4).contains(&component.h_samp) || !(1..=4).contains(&component.v_samp) {
                return Err(JpegError::segment(
                    "SOF",
                    format!(
                        "component {} has sampling factors {}x{}",
                        component.id, component.h_samp, component.v_samp
                    ),
                ));
            }

            if component.quant_table_id > 3 {
                return Err(JpegError::PrecisionRange {
                    field: "quantization table selector",
                    value: component.quant_table_id,
                });
            }

            if components.iter().any(|c| c.id == component.id) {
                return Err(JpegError::segment("SOF", format!("component {} is defined twice", component.id)));
            }

            components.push(component);
        }

        if data.len() > 6 + usize::from(count) * 3 {
            warn!("Ignoring {} trailing bytes in frame header", data.len() - 6 - usize::from(count) * 3);
        }

        let frame = FrameHeader {
            marker,
            precision,
            width,
            height,
            components,
        };

        match frame.raster_bytes() {
            Some(bytes) if bytes <= MAX_RASTER_BYTES && usize::try_from(bytes).is_ok() => {}
            _ => {
                return Err(JpegError::InvalidDimensions {
                    width: u32::from(width),
                    height: u32::from(height),
                })
            }
        }

        let (mcus_x, mcus_y) = (frame.mcus_x(), frame.mcus_y());
        debug!(
            "Frame {}: {}x{}, {} components, {}x{} MCUs",
            marker.name(),
            width,
            height,
            count,
            mcus_x,
            mcus_y
        );

        let planes = frame
            .components
            .iter()
            .map(|c| {
                ComponentPlane::new(
                    c.id,
                    c.h_samp,
                    c.v_samp,
                    mcus_x * u32::from(c.h_samp),
                    mcus_y * u32::from(c.v_samp),
                )
            })
            .collect();

        self.planes = Some(PlaneSet::new(planes));
        self.frame = Some(frame);

        Ok(())
    }

    fn read_restart_interval(&mut self, data: &[u8]) -> JpegResult<()> {
        let fields = data.get_range_safe(0..2, "DRI")?;
        self.restart_interval = u16::from_be_bytes([fields[0], fields[1]]);
        debug!("Restart interval: {} MCUs", self.restart_interval);

        Ok(())
    }

    fn read_number_of_lines(&mut self, data: &[u8]) -> JpegResult<()> {
        let fields = data.get_range_safe(0..2, "DNL")?;
        let lines = u16::from_be_bytes([fields[0], fields[1]]);

        match &self.frame {
            Some(frame) if frame.height != lines => {
                warn!("DNL declares {} lines but the frame has {}, keeping the frame height", lines, frame.height);
            }
            _ => debug!("DNL: {} lines", lines),
        }

        Ok(())
    }

    fn read_scan_header(&self, data: &[u8]) -> JpegResult<ScanHeader> {
        let frame = self
            .frame
            .as_ref()
            .ok_or_else(|| JpegError::segment("SOS", "scan before frame header"))?;

        let count = usize::from(*data.get_safe(0, "SOS")?);
        if !(1..=4).contains(&count) {
            return Err(JpegError::segment("SOS", format!("{} scan components", count)));
        }

        let mut components: Vec<ScanComponentSelector> = Vec::with_capacity(count);
        for i in 0..count {
            let fields = data.get_range_safe(1 + i * 2..3 + i * 2, "SOS")?;
            let selector = ScanComponentSelector {
                component_id: fields[0],
                dc_table: fields[1] >> 4,
                ac_table: fields[1] & 0x0F,
            };

            if frame.component(selector.component_id).is_none() {
                return Err(JpegError::segment(
                    "SOS",
                    format!("component {} is not part of the frame", selector.component_id),
                ));
            }

            if components.iter().any(|c| c.component_id == selector.component_id) {
                return Err(JpegError::segment(
                    "SOS",
                    format!("component {} is selected twice", selector.component_id),
                ));
            }

            if selector.dc_table > 3 {
                return Err(JpegError::PrecisionRange {
                    field: "DC table selector",
                    value: selector.dc_table,
                });
            }

            if selector.ac_table > 3 {
                return Err(JpegError::PrecisionRange {
                    field: "AC table selector",
                    value: selector.ac_table,
                });
            }

            components.push(selector);
        }

        let fields = data.get_range_safe(1 + count * 2..4 + count * 2, "SOS")?;
        let header = ScanHeader {
            components,
            spectral_start: fields[0],
            spectral_end: fields[1],
            approximation_high: fields[2] >> 4,
            approximation_low: fields[2] & 0x0F,
        };

        if header.spectral_start != 0
            || header.spectral_end != 63
            || header.approximation_high != 0
            || header.approximation_low != 0
        {
            return Err(JpegError::Unsupported(format!(
                "scan with spectral selection {}..={} and approximation {}/{}",
                header.spectral_start, header.spectral_end, header.approximation_high, header.approximation_low
            )));
        }

        if count > 1 {
            let blocks_per_mcu: u32 = header
                .components
                .iter()
                .filter_map(|s| frame.component(s.component_id))
                .map(|c| u32::from(c.h_samp) * u32::from(c.v_samp))
                .sum();

            if blocks_per_mcu > 10 {
                return Err(JpegError::segment(
                    "SOS",
                    format!("{} blocks per MCU, at most 10 are allowed", blocks_per_mcu),
                ));
            }
        }

        Ok(header)
    }

    fn decode_scan(&mut self, header: ScanHeader) -> JpegResult<()> {
        let data = self.reader.read_entropy_segment()?;
        debug!("Entropy-coded segment: {} bytes", data.len());

        let JpegDecoder {
            options,
            idct,
            frame,
            quantization_tables,
            dc_tables,
            ac_tables,
            restart_interval,
            planes,
            scans,
            ..
        } = self;

        let (frame, planes) = match (frame.as_ref(), planes.as_mut()) {
            (Some(frame), Some(planes)) => (frame, planes),
            _ => return Err(JpegError::segment("SOS", "scan before frame header")),
        };

        let mut decoders = Vec::with_capacity(header.components.len());
        for selector in &header.components {
            let dc = dc_tables[usize::from(selector.dc_table)]
                .as_ref()
                .ok_or(JpegError::MissingTable {
                    class: "DC",
                    id: selector.dc_table,
                })?;
            let ac = ac_tables[usize::from(selector.ac_table)]
                .as_ref()
                .ok_or(JpegError::MissingTable {
                    class: "AC",
                    id: selector.ac_table,
                })?;

            decoders.push((
                HuffmanDecoder::build(options.huffman, dc)?,
                HuffmanDecoder::build(options.huffman, ac)?,
            ));
        }

        let mut components = Vec::with_capacity(header.components.len());
        for (selector, (dc, ac)) in header.components.iter().zip(&decoders) {
            let component = frame.component(selector.component_id).ok_or_else(|| {
                JpegError::segment(
                    "SOS",
                    format!("component {} is not part of the frame", selector.component_id),
                )
            })?;

            let quant = quantization_tables[usize::from(component.quant_table_id)]
                .as_ref()
                .ok_or(JpegError::MissingTable {
                    class: "quantization",
                    id: component.quant_table_id,
                })?;

            let (blocks_wide, blocks_high) = frame.component_blocks(component);

            components.push(ScanComponent {
                id: component.id,
                h_samp: component.h_samp,
                v_samp: component.v_samp,
                dc,
                ac,
                quant,
                blocks_wide,
                blocks_high,
            });
        }

        let context = ScanContext {
            components,
            mcus_x: frame.mcus_x(),
            mcus_y: frame.mcus_y(),
            restart_interval: *restart_interval,
            idct,
            recover_at_restart: options.recover_at_restart,
        };

        let summary = ScanDecoder::new(context).decode(&data, planes)?;
        debug!(
            "Scan {} done: {} MCUs, {} blocks, {} restarts",
            scans.len(),
            summary.mcus,
            summary.blocks,
            summary.restarts
        );

        scans.push(ScanInfo {
            header,
            data_length: data.len(),
            summary,
        });

        Ok(())
    }
}

fn describe_frame(n: u8) -> &'static str {
    match n {
        2 => "progressive DCT",
        3 => "lossless",
        5 => "differential sequential DCT",
        6 => "differential progressive DCT",
        7 => "differential lossless",
        9 => "arithmetic-coded sequential DCT",
        10 => "arithmetic-coded progressive DCT",
        11 => "arithmetic-coded lossless",
        13 => "differential arithmetic-coded sequential DCT",
        14 => "differential arithmetic-coded progressive DCT",
        15 => "differential arithmetic-coded lossless",
        _ => "unknown",
    }
}
