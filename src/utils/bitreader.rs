use crate::utils::error::{JpegError, JpegResult};
use log::debug;

const DNL: u8 = 0xDC;

#[inline]
fn is_restart(code: u8) -> bool {
    (0xD0..=0xD7).contains(&code)
}

/// MSB-first reader over one entropy-coded segment.
///
/// Handles byte stuffing (`0xFF 0x00` reads as a literal `0xFF`) and stops at restart and
/// DNL markers: once one is seen, the reader refuses to read past it and synthesizes
/// 1-bits instead, leaving the cursor on the marker until [`BitReader::take_marker`]
/// is called by the scan driver. The same 1-bit padding is used past the end of the buffer.
#[derive(Debug)]
pub struct BitReader<'a> {
    data: &'a [u8],
    position: usize,
    register: u32,
    bits_available: u8,
    // Synthesized bits always sit at the bottom of the register.
    synthesized: u8,
    padding_consumed: u64,
    marker: Option<u8>,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        BitReader {
            data,
            position: 0,
            register: 0,
            bits_available: 0,
            synthesized: 0,
            padding_consumed: 0,
            marker: None,
        }
    }

    /// Reads a single bit from the bitstream.
    ///
    /// # Returns
    /// - `0` or `1`
    /// - `JpegError::BitstreamMarker` if an unexpected marker is met while refilling
    pub fn next_bit(&mut self) -> JpegResult<u8> {
        let bit = self.peek_bits(1)?;
        self.consume_bits(1)?;
        Ok(bit as u8)
    }

    /// Returns the next `n` bits (at most 16) without advancing.
    ///
    /// # Parameters
    /// - `n`: The number of bits to look at
    ///
    /// # Returns
    /// - The bits as an unsigned value, first bit in the most significant position
    /// - `JpegError::BitstreamMarker` if an unexpected marker is met while refilling
    pub fn peek_bits(&mut self, n: u8) -> JpegResult<u32> {
        debug_assert!(n <= 16);

        if n == 0 {
            return Ok(0);
        }

        self.fill(n)?;

        let shift = self.bits_available - n;
        Ok((self.register >> shift) & ((1u32 << n) - 1))
    }

    /// Drops the next `n` bits (at most 16).
    pub fn consume_bits(&mut self, n: u8) -> JpegResult<()> {
        debug_assert!(n <= 16);

        self.fill(n)?;

        let real = self.bits_available - self.synthesized;
        if n > real {
            let padding = n - real;
            self.synthesized -= padding;
            self.padding_consumed += u64::from(padding);
        }

        self.bits_available -= n;
        self.register &= Self::mask(self.bits_available);

        Ok(())
    }

    /// Reads `n` raw bits (the RECEIVE procedure).
    pub fn read_bits(&mut self, n: u8) -> JpegResult<u32> {
        let value = self.peek_bits(n)?;
        self.consume_bits(n)?;
        Ok(value)
    }

    /// Discards any partially consumed byte so the next read starts on a byte boundary.
    pub fn align(&mut self) {
        let partial = self.bits_available % 8;
        self.bits_available -= partial;
        self.synthesized = self.synthesized.min(self.bits_available);
        self.register &= Self::mask(self.bits_available);
    }

    /// Drops every buffered bit, then consumes the next marker in the segment.
    ///
    /// If the cursor is not sitting on a marker, bytes are skipped until one is found,
    /// which is how the scan driver resynchronizes after a damaged restart interval.
    ///
    /// # Returns
    /// - `Some(code)` with the second byte of the consumed marker
    /// - `None` if the segment holds no further marker
    pub fn take_marker(&mut self) -> Option<u8> {
        self.align();
        self.register = 0;
        self.bits_available = 0;
        self.synthesized = 0;
        self.marker = None;

        let start = self.position;

        while self.position + 1 < self.data.len() {
            if self.data[self.position] == 0xFF {
                let code = self.data[self.position + 1];

                if code != 0x00 && code != 0xFF {
                    if self.position > start {
                        debug!("Skipped {} bytes before marker 0xFF{:02X}", self.position - start, code);
                    }

                    self.position += 2;
                    return Some(code);
                }
            }

            self.position += 1;
        }

        self.position = self.data.len();
        None
    }

    /// Marker that stopped the reader, if any (RST0-7 or DNL).
    pub fn pending_marker(&self) -> Option<u8> {
        self.marker
    }

    /// Byte offset of the next unread byte in the segment.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of synthesized 1-bits handed out so far.
    pub fn padding_bits(&self) -> u64 {
        self.padding_consumed
    }

    /// Whether all real data has been read and only padding remains.
    pub fn is_exhausted(&self) -> bool {
        (self.marker.is_some() || self.position >= self.data.len()) && self.bits_available == self.synthesized
    }

    #[inline]
    fn mask(bits: u8) -> u32 {
        if bits >= 32 {
            u32::MAX
        } else {
            (1u32 << bits) - 1
        }
    }

    fn fill(&mut self, n: u8) -> JpegResult<()> {
        while self.bits_available < n {
            let (byte, synthesized) = self.next_byte()?;

            self.register = (self.register << 8) | u32::from(byte);
            self.bits_available += 8;

            if synthesized {
                self.synthesized += 8;
            }
        }

        Ok(())
    }

    fn next_byte(&mut self) -> JpegResult<(u8, bool)> {
        if self.marker.is_some() || self.position >= self.data.len() {
            return Ok((0xFF, true));
        }

        let byte = self.data[self.position];
        if byte != 0xFF {
            self.position += 1;
            return Ok((byte, false));
        }

        match self.data.get(self.position + 1) {
            Some(0x00) => {
                self.position += 2;
                Ok((0xFF, false))
            }
            Some(&code) if is_restart(code) || code == DNL => {
                // Leave the cursor on the marker for the scan driver
                self.marker = Some(code);
                Ok((0xFF, true))
            }
            Some(&code) => Err(JpegError::BitstreamMarker(code)),
            None => {
                self.position += 1;
                Ok((0xFF, false))
            }
        }
    }
}
