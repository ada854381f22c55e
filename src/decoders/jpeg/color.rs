use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Maps one YCbCr sample triple to RGBA.
pub trait ColorConvert {
    fn convert_color(&self, y: u8, cb: u8, cr: u8) -> [u8; 4];
}

/// Floating-point conversion with the JFIF coefficients.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatConverter;

impl ColorConvert for FloatConverter {
    #[inline]
    fn convert_color(&self, y: u8, cb: u8, cr: u8) -> [u8; 4] {
        let y = f32::from(y);
        let cb = f32::from(cb) - 128.0;
        let cr = f32::from(cr) - 128.0;

        let r = y + 1.402 * cr;
        let g = y - 0.34414 * cb - 0.71414 * cr;
        let b = y + 1.772 * cb;

        [clamp_f32(r), clamp_f32(g), clamp_f32(b), 255]
    }
}

#[inline]
fn clamp_f32(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

// JFIF coefficients scaled by 2^16
const CR_TO_R: i32 = 91881;
const CB_TO_G: i32 = -22554;
const CR_TO_G: i32 = -46802;
const CB_TO_B: i32 = 116130;
const HALF: i32 = 1 << 15;

/// 16-bit fixed-point conversion.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerConverter;

impl ColorConvert for IntegerConverter {
    #[inline]
    fn convert_color(&self, y: u8, cb: u8, cr: u8) -> [u8; 4] {
        let y = i32::from(y);
        let cb = i32::from(cb) - 128;
        let cr = i32::from(cr) - 128;

        let r = y + ((CR_TO_R * cr + HALF) >> 16);
        let g = y + ((CB_TO_G * cb + CR_TO_G * cr + HALF) >> 16);
        let b = y + ((CB_TO_B * cb + HALF) >> 16);

        [
            r.clamp(0, 255) as u8,
            g.clamp(0, 255) as u8,
            b.clamp(0, 255) as u8,
            255,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorKind {
    #[default]
    Float,
    Integer,
}

impl Display for ColorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorKind::Float => write!(f, "float"),
            ColorKind::Integer => write!(f, "integer"),
        }
    }
}

impl FromStr for ColorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "float" => Ok(ColorKind::Float),
            "integer" => Ok(ColorKind::Integer),
            _ => Err(format!("unknown color conversion '{}', expected float or integer", s)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ColorConverter {
    Float(FloatConverter),
    Integer(IntegerConverter),
}

impl ColorConverter {
    pub fn new(kind: ColorKind) -> Self {
        match kind {
            ColorKind::Float => ColorConverter::Float(FloatConverter),
            ColorKind::Integer => ColorConverter::Integer(IntegerConverter),
        }
    }

    pub fn kind(&self) -> ColorKind {
        match self {
            ColorConverter::Float(_) => ColorKind::Float,
            ColorConverter::Integer(_) => ColorKind::Integer,
        }
    }
}

impl ColorConvert for ColorConverter {
    #[inline]
    fn convert_color(&self, y: u8, cb: u8, cr: u8) -> [u8; 4] {
        match self {
            ColorConverter::Float(converter) => converter.convert_color(y, cb, cr),
            ColorConverter::Integer(converter) => converter.convert_color(y, cb, cr),
        }
    }
}
