use crate::utils::error::{JpegError, JpegResult};

/// Natural (row-major) index of each zig-zag position.
#[rustfmt::skip]
pub const ZIGZAG_MAP: [u8; 64] = [
     0,  1,  8, 16,  9,  2,  3, 10,
    17, 24, 32, 25, 18, 11,  4,  5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13,  6,  7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
];

/// One DQT table. Values stay in zig-zag order, as they are stored in the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizationTable {
    pub id: u8,
    /// 0 = 8-bit entries, 1 = 16-bit entries
    pub precision: u8,
    pub values: [u16; 64],
}

impl QuantizationTable {
    pub fn new(id: u8, precision: u8, values: [u16; 64]) -> JpegResult<Self> {
        if precision > 1 {
            return Err(JpegError::PrecisionRange {
                field: "quantization table precision",
                value: precision,
            });
        }

        if id > 3 {
            return Err(JpegError::PrecisionRange {
                field: "quantization table id",
                value: id,
            });
        }

        Ok(Self { id, precision, values })
    }

    /// Table values laid out as an 8x8 matrix in natural order.
    pub fn natural_order(&self) -> [u16; 64] {
        let mut natural = [0u16; 64];

        for (i, &value) in self.values.iter().enumerate() {
            natural[ZIGZAG_MAP[i] as usize] = value;
        }

        natural
    }
}

/// Multiplies zig-zag ordered coefficients by the matching table entries.
#[inline]
pub fn dequantize(block: &mut [i32; 64], table: &QuantizationTable) -> JpegResult<()> {
    for (index, (coefficient, &q)) in block.iter_mut().zip(table.values.iter()).enumerate() {
        let value = *coefficient;
        *coefficient = value
            .checked_mul(i32::from(q))
            .ok_or_else(|| JpegError::CoefficientRange {
                index,
                value: i64::from(value) * i64::from(q),
            })?;
    }

    Ok(())
}

/// Moves zig-zag ordered coefficients to their natural 8x8 positions.
#[inline]
pub fn reorder(zigzag: &[i32; 64]) -> [i32; 64] {
    let mut natural = [0i32; 64];

    for (i, &coefficient) in zigzag.iter().enumerate() {
        natural[ZIGZAG_MAP[i] as usize] = coefficient;
    }

    natural
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rustfmt::skip]
    const WORKED_ZIGZAG: [i32; 64] = [
        -26, -3, 0, -3, -2, -6, 2, -4, 1, -3, 1, 1, 5, 1, 2, -1,
        1, -1, 2, 0, 0, 0, 0, 0, -1, -1, 0, 0, 0, 0, 0, 0,
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    ];

    // Table K.1 in natural order
    #[rustfmt::skip]
    const LUMINANCE: [u16; 64] = [
        16, 11, 10, 16, 24, 40, 51, 61,
        12, 12, 14, 19, 26, 58, 60, 55,
        14, 13, 16, 24, 40, 57, 69, 56,
        14, 17, 22, 29, 51, 87, 80, 62,
        18, 22, 37, 56, 68, 109, 103, 77,
        24, 35, 55, 64, 81, 104, 113, 92,
        49, 64, 78, 87, 103, 121, 120, 101,
        72, 92, 95, 98, 112, 100, 103, 99,
    ];

    fn luminance_table() -> QuantizationTable {
        let mut zigzag = [0u16; 64];
        for (i, &natural) in ZIGZAG_MAP.iter().enumerate() {
            zigzag[i] = LUMINANCE[natural as usize];
        }

        QuantizationTable::new(0, 0, zigzag).unwrap()
    }

    #[test]
    fn zigzag_map_is_a_permutation() {
        let mut seen = [false; 64];
        for &index in ZIGZAG_MAP.iter() {
            assert!(!seen[index as usize]);
            seen[index as usize] = true;
        }
    }

    #[test]
    fn reorders_the_worked_example() {
        let natural = reorder(&WORKED_ZIGZAG);

        assert_eq!(&natural[..8], &[-26, -3, -6, 2, 2, -1, 0, 0]);
        assert_eq!(&natural[8..16], &[0, -2, -4, 1, 1, 0, 0, 0]);
        assert_eq!(&natural[16..24], &[-3, 1, 5, -1, -1, 0, 0, 0]);
        assert_eq!(&natural[24..32], &[-3, 1, 2, -1, 0, 0, 0, 0]);
        assert_eq!(&natural[32..40], &[1, 0, 0, 0, 0, 0, 0, 0]);
        assert!(natural[40..].iter().all(|&c| c == 0));
    }

    #[test]
    fn dequantizes_pointwise() -> JpegResult<()> {
        let table = luminance_table();
        let mut block = WORKED_ZIGZAG;

        dequantize(&mut block, &table)?;
        let natural = reorder(&block);

        assert_eq!(&natural[..8], &[-416, -33, -60, 32, 48, -40, 0, 0]);
        assert_eq!(&natural[8..16], &[0, -24, -56, 19, 26, 0, 0, 0]);
        assert_eq!(&natural[16..24], &[-42, 13, 80, -24, -40, 0, 0, 0]);
        assert_eq!(&natural[24..32], &[-42, 17, 44, -29, 0, 0, 0, 0]);
        assert_eq!(&natural[32..40], &[18, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(table.natural_order(), LUMINANCE);

        Ok(())
    }

    #[test]
    fn dequantize_reports_overflowing_products() -> JpegResult<()> {
        let table = QuantizationTable::new(0, 1, [u16::MAX; 64])?;
        let mut block = [0i32; 64];
        block[5] = 40_000;

        let result = dequantize(&mut block, &table);
        assert!(matches!(
            result,
            Err(JpegError::CoefficientRange { index: 5, value: 2_621_400_000 })
        ));

        Ok(())
    }

    #[test]
    fn rejects_out_of_range_tables() {
        assert!(matches!(
            QuantizationTable::new(0, 2, [1; 64]),
            Err(JpegError::PrecisionRange { value: 2, .. })
        ));
        assert!(matches!(
            QuantizationTable::new(4, 0, [1; 64]),
            Err(JpegError::PrecisionRange { value: 4, .. })
        ));
    }
}
