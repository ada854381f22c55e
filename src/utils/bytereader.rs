use log::debug;
use std::io::{ErrorKind, Read, Seek, SeekFrom};

/// Byte-level reader used for marker segments, big-endian like every JPEG header field.
#[derive(Debug)]
pub struct ByteReader<R: Read + Seek> {
    reader: R,
}

impl<R: Read + Seek> ByteReader<R> {
    pub fn new(reader: R) -> Self {
        ByteReader { reader }
    }

    /// Reads a single byte.
    ///
    /// # Returns
    /// - The byte read
    /// - `std::io::Error` if an I/O error occurs
    pub fn read_u8(&mut self) -> Result<u8, std::io::Error> {
        let mut byte = [0u8; 1];
        self.reader.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    /// Reads a big-endian 16-bit value.
    ///
    /// # Returns
    /// - The 16-bit value read
    /// - `std::io::Error` if an I/O error occurs
    pub fn read_u16(&mut self) -> Result<u16, std::io::Error> {
        let mut bytes = [0u8; 2];
        self.reader.read_exact(&mut bytes)?;
        Ok(u16::from_be_bytes(bytes))
    }

    /// Reads specified number of bytes.
    ///
    /// # Parameters
    /// - `n`: The number of bytes to read
    ///
    /// # Returns
    /// - A vector holding exactly `n` bytes
    /// - `std::io::Error` if the input ends early
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, std::io::Error> {
        let mut bytes = vec![0; n];
        self.reader.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    /// Reads the payload of a length-prefixed marker segment.
    /// The cursor must sit right after the marker; the length field counts itself.
    pub fn read_segment(&mut self) -> Result<Vec<u8>, std::io::Error> {
        let length = self.read_u16()? as usize;

        if length < 2 {
            return Err(std::io::Error::new(
                ErrorKind::InvalidData,
                format!("segment length {} is shorter than its own field", length),
            ));
        }

        self.read_bytes(length - 2)
    }

    /// Searches for the next marker.
    /// If a marker is found, cursor is positioned right after it.
    /// Fill bytes (`0xFF 0xFF`) and stuffed zeros are stepped over.
    ///
    /// # Returns
    /// - `Some(code)` with the full 16-bit marker code, `None` at end of input
    /// - `std::io::Error` if an I/O error occurs
    pub fn next_marker(&mut self) -> Result<Option<u16>, std::io::Error> {
        let mut skipped = 0usize;
        let mut previous = match self.next_byte()? {
            Some(byte) => byte,
            None => return Ok(None),
        };

        loop {
            let current = match self.next_byte()? {
                Some(byte) => byte,
                None => {
                    if skipped > 0 {
                        debug!("Reached end of input after {} bytes of garbage", skipped);
                    }
                    return Ok(None);
                }
            };

            if previous == 0xFF && current != 0x00 && current != 0xFF {
                if skipped > 0 {
                    debug!("Skipped {} bytes before marker 0xFF{:02X}", skipped, current);
                }
                return Ok(Some(0xFF00 | u16::from(current)));
            }

            if previous != 0xFF || current == 0x00 {
                skipped += 1;
            }

            previous = current;
        }
    }

    /// Reads the entropy-coded segment that follows a SOS header.
    ///
    /// Stuffed `0xFF 0x00` pairs and RST0-RST7 markers are kept in the returned data,
    /// fill bytes in front of a marker are dropped. Stops before the first other marker,
    /// leaving the cursor on its `0xFF`.
    pub fn read_entropy_segment(&mut self) -> Result<Vec<u8>, std::io::Error> {
        let mut data = Vec::new();

        loop {
            let byte = match self.next_byte()? {
                Some(byte) => byte,
                None => {
                    debug!("Input ended inside entropy-coded data");
                    return Ok(data);
                }
            };

            if byte != 0xFF {
                data.push(byte);
                continue;
            }

            let mut code = match self.next_byte()? {
                Some(code) => code,
                None => {
                    data.push(byte);
                    return Ok(data);
                }
            };

            while code == 0xFF {
                code = match self.next_byte()? {
                    Some(code) => code,
                    None => return Ok(data),
                };
            }

            match code {
                0x00 | 0xD0..=0xD7 => {
                    data.push(0xFF);
                    data.push(code);
                }
                _ => {
                    self.reader.seek(SeekFrom::Current(-2))?;
                    return Ok(data);
                }
            }
        }
    }

    /// Returns the current byte offset in the input.
    pub fn position(&mut self) -> Result<u64, std::io::Error> {
        self.reader.stream_position()
    }

    fn next_byte(&mut self) -> Result<Option<u8>, std::io::Error> {
        let mut byte = [0u8; 1];

        match self.reader.read_exact(&mut byte) {
            Ok(_) => Ok(Some(byte[0])),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e),
        }
    }
}
