use crate::utils::marker::Marker;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JpegMarker {
    /// Start of frame, `n` is the low nibble of the code (0 = baseline, 1 = extended sequential,
    /// 2 = progressive, 3 = lossless, 5-7 differential, 9-15 arithmetic coded).
    SOF(u8),
    DHT, // Define Huffman table(s)
    DAC, // Define arithmetic coding conditioning(s)
    RST(u8),
    SOI, // Start of image
    EOI, // End of image
    SOS, // Start of scan
    DQT, // Define quantization table(s)
    DNL, // Define number of lines
    DRI, // Define restart interval
    DHP, // Define hierarchical progression
    EXP, // Expand reference component(s)
    APP(u8),
    /// JPG (0xFFC8) and the JPG0-JPG13 extension range.
    JPG(u8),
    COM,
    TEM,
    RES(u8),
}

impl JpegMarker {
    pub fn is_restart(&self) -> bool {
        matches!(self, JpegMarker::RST(_))
    }

    /// Short name used in log lines and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            JpegMarker::SOF(0) => "SOF0",
            JpegMarker::SOF(1) => "SOF1",
            JpegMarker::SOF(_) => "SOF",
            JpegMarker::DHT => "DHT",
            JpegMarker::DAC => "DAC",
            JpegMarker::RST(_) => "RST",
            JpegMarker::SOI => "SOI",
            JpegMarker::EOI => "EOI",
            JpegMarker::SOS => "SOS",
            JpegMarker::DQT => "DQT",
            JpegMarker::DNL => "DNL",
            JpegMarker::DRI => "DRI",
            JpegMarker::DHP => "DHP",
            JpegMarker::EXP => "EXP",
            JpegMarker::APP(0) => "APP0",
            JpegMarker::APP(_) => "APPn",
            JpegMarker::JPG(_) => "JPG",
            JpegMarker::COM => "COM",
            JpegMarker::TEM => "TEM",
            JpegMarker::RES(_) => "RES",
        }
    }
}

impl Marker for JpegMarker {
    fn from_u16(value: u16) -> Option<JpegMarker> {
        if value & 0xFF00 != 0xFF00 {
            return None;
        }

        let code = (value & 0xFF) as u8;

        let marker = match code {
            0xC4 => JpegMarker::DHT,
            0xC8 => JpegMarker::JPG(0xFF),
            0xCC => JpegMarker::DAC,
            0xC0..=0xCF => JpegMarker::SOF(code - 0xC0),
            0xD0..=0xD7 => JpegMarker::RST(code - 0xD0),
            0xD8 => JpegMarker::SOI,
            0xD9 => JpegMarker::EOI,
            0xDA => JpegMarker::SOS,
            0xDB => JpegMarker::DQT,
            0xDC => JpegMarker::DNL,
            0xDD => JpegMarker::DRI,
            0xDE => JpegMarker::DHP,
            0xDF => JpegMarker::EXP,
            0xE0..=0xEF => JpegMarker::APP(code - 0xE0),
            0xF0..=0xFD => JpegMarker::JPG(code - 0xF0),
            0xFE => JpegMarker::COM,
            0x01 => JpegMarker::TEM,
            0x02..=0xBF => JpegMarker::RES(code),
            _ => return None,
        };

        Some(marker)
    }

    fn to_u16(&self) -> u16 {
        let code = match *self {
            JpegMarker::SOF(n) => 0xC0 + n,
            JpegMarker::DHT => 0xC4,
            JpegMarker::DAC => 0xCC,
            JpegMarker::RST(n) => 0xD0 + n,
            JpegMarker::SOI => 0xD8,
            JpegMarker::EOI => 0xD9,
            JpegMarker::SOS => 0xDA,
            JpegMarker::DQT => 0xDB,
            JpegMarker::DNL => 0xDC,
            JpegMarker::DRI => 0xDD,
            JpegMarker::DHP => 0xDE,
            JpegMarker::EXP => 0xDF,
            JpegMarker::APP(n) => 0xE0 + n,
            JpegMarker::JPG(0xFF) => 0xC8,
            JpegMarker::JPG(n) => 0xF0 + n,
            JpegMarker::COM => 0xFE,
            JpegMarker::TEM => 0x01,
            JpegMarker::RES(code) => code,
        };

        0xFF00 | u16::from(code)
    }
}
