use crate::utils::bitreader::BitReader;
use crate::utils::error::{JpegError, JpegResult};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const MAX_CODE_LENGTH: u8 = 16;

/// Huffman table as carried by a DHT segment: code counts per length plus symbols in code order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanSpec {
    /// 0 = DC, 1 = AC
    pub class: u8,
    pub id: u8,
    pub bits: [u8; 16],
    pub values: Vec<u8>,
}

impl HuffmanSpec {
    pub fn new(class: u8, id: u8, bits: [u8; 16], values: Vec<u8>) -> Self {
        Self { class, id, bits, values }
    }

    pub fn total_codes(&self) -> usize {
        self.bits.iter().map(|&count| count as usize).sum()
    }

    /// Pairs every symbol with its code length, in canonical order.
    pub fn code_lengths(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        self.bits
            .iter()
            .enumerate()
            .flat_map(|(i, &count)| std::iter::repeat(i as u8 + 1).take(count as usize))
            .zip(self.values.iter().copied())
    }

    /// Canonical `(symbol, length, code)` assignments for this table.
    pub fn canonical_codes(&self) -> JpegResult<Vec<(u8, u8, u16)>> {
        let (huffsize, huffcode) = generate_codes(&self.bits)?;

        Ok(self
            .values
            .iter()
            .zip(huffsize.iter().zip(huffcode.iter()))
            .map(|(&value, (&length, &code))| (value, length, code))
            .collect())
    }
}

/// Builds the `huffsize` (terminated by a 0 sentinel) and `huffcode` sequences of Annex C.
///
/// Fails if the counts in `bits` need more codes of some length than that length can hold.
pub(crate) fn generate_codes(bits: &[u8; 16]) -> JpegResult<(Vec<u8>, Vec<u16>)> {
    let mut huffsize = Vec::with_capacity(257);
    for (i, &count) in bits.iter().enumerate() {
        huffsize.extend(std::iter::repeat(i as u8 + 1).take(count as usize));
    }
    huffsize.push(0);

    let mut huffcode = Vec::with_capacity(huffsize.len() - 1);
    let mut code: u32 = 0;
    let mut k = 0;

    for length in 1..=MAX_CODE_LENGTH {
        while huffsize[k] == length {
            huffcode.push(code as u16);
            code += 1;
            k += 1;
        }

        if code > (1 << length) {
            return Err(JpegError::HuffmanInsert {
                length,
                reason: "more codes than the length can hold",
            });
        }

        code <<= 1;
    }

    Ok((huffsize, huffcode))
}

/// Capability shared by both Huffman decoding strategies.
pub trait SymbolDecoder {
    /// Adds the next symbol of the given code length, in canonical order.
    /// Returns `false` if the table cannot take a code of that length.
    fn insert_code(&mut self, length: u8, value: u8) -> bool;

    /// Decodes one symbol, reading as many bits as its code is long.
    fn decode_symbol(&self, reader: &mut BitReader<'_>) -> JpegResult<u8>;
}

#[derive(Debug, Clone, Copy, Default)]
struct Node {
    // Index of the left child, the right child follows it
    children: Option<usize>,
    value: Option<u8>,
}

/// Binary-tree decoder: one node per code prefix, walked one bit at a time.
#[derive(Debug, Clone)]
pub struct TreeDecoder {
    nodes: Vec<Node>,
    remaining: [u8; 16],
}

impl TreeDecoder {
    /// An empty tree expecting `bits[i]` codes of length `i + 1`. Overfull lengths show up as failed inserts.
    pub fn new(bits: &[u8; 16]) -> Self {
        Self {
            nodes: vec![Node::default()],
            remaining: *bits,
        }
    }

    fn insert_at(&mut self, node: usize, depth: u8, value: u8) -> bool {
        if depth == 0 {
            let slot = &mut self.nodes[node];
            if slot.value.is_some() || slot.children.is_some() {
                return false;
            }

            slot.value = Some(value);
            return true;
        }

        if self.nodes[node].value.is_some() {
            return false;
        }

        let left = match self.nodes[node].children {
            Some(left) => left,
            None => {
                let left = self.nodes.len();
                self.nodes.push(Node::default());
                self.nodes.push(Node::default());
                self.nodes[node].children = Some(left);
                left
            }
        };

        self.insert_at(left, depth - 1, value) || self.insert_at(left + 1, depth - 1, value)
    }
}

impl SymbolDecoder for TreeDecoder {
    fn insert_code(&mut self, length: u8, value: u8) -> bool {
        if length == 0 || length > MAX_CODE_LENGTH {
            return false;
        }

        let remaining = &mut self.remaining[length as usize - 1];
        if *remaining == 0 {
            return false;
        }

        if !self.insert_at(0, length, value) {
            return false;
        }

        self.remaining[length as usize - 1] -= 1;
        true
    }

    fn decode_symbol(&self, reader: &mut BitReader<'_>) -> JpegResult<u8> {
        let mut node = 0;

        for _ in 0..MAX_CODE_LENGTH {
            let left = self.nodes[node].children.ok_or(JpegError::HuffmanDecode)?;
            node = left + reader.next_bit()? as usize;

            if let Some(value) = self.nodes[node].value {
                return Ok(value);
            }
        }

        Err(JpegError::HuffmanDecode)
    }
}

/// Table-driven decoder following the `mincode`/`maxcode`/`valptr` procedure of Annex F.
#[derive(Debug, Clone)]
pub struct ArrayDecoder {
    huffsize: Vec<u8>,
    huffcode: Vec<u16>,
    // Indexed by code length, entry 0 unused
    mincode: [i32; 17],
    maxcode: [i32; 17],
    valptr: [usize; 17],
    values: Vec<u8>,
}

impl ArrayDecoder {
    pub fn new(bits: &[u8; 16]) -> JpegResult<Self> {
        let (huffsize, huffcode) = generate_codes(bits)?;

        let mut mincode = [0i32; 17];
        let mut maxcode = [-1i32; 17];
        let mut valptr = [0usize; 17];

        let mut j = 0;
        for length in 1..=16 {
            let count = bits[length - 1] as usize;
            if count == 0 {
                continue;
            }

            valptr[length] = j;
            mincode[length] = i32::from(huffcode[j]);
            j += count - 1;
            maxcode[length] = i32::from(huffcode[j]);
            j += 1;
        }

        Ok(Self {
            values: Vec::with_capacity(huffcode.len()),
            huffsize,
            huffcode,
            mincode,
            maxcode,
            valptr,
        })
    }

    /// Canonical codes generated for the table, in symbol order.
    pub fn codes(&self) -> &[u16] {
        &self.huffcode
    }
}

impl SymbolDecoder for ArrayDecoder {
    fn insert_code(&mut self, length: u8, value: u8) -> bool {
        let k = self.values.len();

        // The sentinel guarantees a mismatch once every slot is filled
        if self.huffsize[k] == 0 || self.huffsize[k] != length {
            return false;
        }

        self.values.push(value);
        true
    }

    fn decode_symbol(&self, reader: &mut BitReader<'_>) -> JpegResult<u8> {
        let mut code = i32::from(reader.next_bit()?);

        for length in 1..=MAX_CODE_LENGTH as usize {
            if code <= self.maxcode[length] {
                let index = self.valptr[length] + (code - self.mincode[length]) as usize;
                return self.values.get(index).copied().ok_or(JpegError::HuffmanDecode);
            }

            if length < MAX_CODE_LENGTH as usize {
                code = (code << 1) | i32::from(reader.next_bit()?);
            }
        }

        Err(JpegError::HuffmanDecode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HuffmanKind {
    Tree,
    #[default]
    Array,
}

impl Display for HuffmanKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            HuffmanKind::Tree => write!(f, "tree"),
            HuffmanKind::Array => write!(f, "array"),
        }
    }
}

impl FromStr for HuffmanKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tree" => Ok(HuffmanKind::Tree),
            "array" => Ok(HuffmanKind::Array),
            _ => Err(format!("unknown Huffman decoder '{}', expected tree or array", s)),
        }
    }
}

/// Huffman decoding strategy, chosen once per decoder.
#[derive(Debug, Clone)]
pub enum HuffmanDecoder {
    Tree(TreeDecoder),
    Array(ArrayDecoder),
}

impl HuffmanDecoder {
    /// Creates an empty decoder for the given code-length counts.
    pub fn init(kind: HuffmanKind, bits: &[u8; 16]) -> JpegResult<Self> {
        match kind {
            HuffmanKind::Tree => Ok(HuffmanDecoder::Tree(TreeDecoder::new(bits))),
            HuffmanKind::Array => Ok(HuffmanDecoder::Array(ArrayDecoder::new(bits)?)),
        }
    }

    /// Creates a decoder and inserts every symbol of `spec`.
    pub fn build(kind: HuffmanKind, spec: &HuffmanSpec) -> JpegResult<Self> {
        let mut decoder = Self::init(kind, &spec.bits)?;

        for (length, value) in spec.code_lengths() {
            if !decoder.insert_code(length, value) {
                return Err(JpegError::HuffmanInsert {
                    length,
                    reason: "no free code of that length",
                });
            }
        }

        Ok(decoder)
    }

    pub fn kind(&self) -> HuffmanKind {
        match self {
            HuffmanDecoder::Tree(_) => HuffmanKind::Tree,
            HuffmanDecoder::Array(_) => HuffmanKind::Array,
        }
    }
}

impl SymbolDecoder for HuffmanDecoder {
    fn insert_code(&mut self, length: u8, value: u8) -> bool {
        match self {
            HuffmanDecoder::Tree(decoder) => decoder.insert_code(length, value),
            HuffmanDecoder::Array(decoder) => decoder.insert_code(length, value),
        }
    }

    #[inline]
    fn decode_symbol(&self, reader: &mut BitReader<'_>) -> JpegResult<u8> {
        match self {
            HuffmanDecoder::Tree(decoder) => decoder.decode_symbol(reader),
            HuffmanDecoder::Array(decoder) => decoder.decode_symbol(reader),
        }
    }
}
