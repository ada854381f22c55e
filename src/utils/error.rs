use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JpegError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A marker other than RSTn or DNL showed up inside entropy-coded data.
    #[error("unexpected marker 0xFF{0:02X} inside entropy-coded data")]
    BitstreamMarker(u8),

    #[error("bit sequence matches no code in the active Huffman table")]
    HuffmanDecode,

    #[error("cannot insert Huffman code of length {length}: {reason}")]
    HuffmanInsert { length: u8, reason: &'static str },

    /// AC symbol with SSSS == 0 and a run length other than 0 (EOB) or 15 (ZRL).
    #[error("unsupported AC run length {0} with zero magnitude")]
    UnsupportedRunLength(u8),

    #[error("{field} {value} is outside the supported range")]
    PrecisionRange { field: &'static str, value: u8 },

    #[error("coefficient index {0} runs past the end of the block")]
    CoefficientOverflow(usize),

    /// A reconstructed or dequantized coefficient left the range an 8-bit baseline stream can produce.
    #[error("coefficient {index} reconstructs to {value}, outside the baseline range")]
    CoefficientRange { index: usize, value: i64 },

    #[error("magnitude category {category} exceeds the baseline maximum of {max}")]
    MagnitudeRange { category: u8, max: u8 },

    #[error("malformed {marker} segment: {reason}")]
    Segment { marker: &'static str, reason: String },

    #[error("{class} table {id} is not defined")]
    MissingTable { class: &'static str, id: u8 },

    #[error("invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("unsupported JPEG feature: {0}")]
    Unsupported(String),
}

impl JpegError {
    pub(crate) fn segment(marker: &'static str, reason: impl Into<String>) -> Self {
        JpegError::Segment {
            marker,
            reason: reason.into(),
        }
    }
}

// Result type alias for decoder operations
pub type JpegResult<T> = Result<T, JpegError>;
