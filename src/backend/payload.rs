//! Defines the self-describing byte format of a compressed payload.
//! This module is the single source of truth for serialization, parsing, and
//! validation of payloads; the pipeline itself only ever sees the opaque
//! `CompressedPayload`.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! magic "MGVP" | version u16 | precision u8 | encoding u8 | mode u8 | ndims u8
//! dims u64 * ndims | s f64 | tolerance f64 | quantum f64
//! dictionary_size u32 | secondary_frame_size u64 (0 = disabled) | num_blocks u32
//! (elements u64, outliers u64, stored_bytes u64) * num_blocks
//! block streams, in table order
//! ```

use std::io::{Cursor, Read};

use crate::backend::codec::{BlockCodec, EncodedBlock, Encoding};
use crate::error::VerifyError;
use crate::types::{ErrorBoundMode, Precision, Shape, MAX_DIMS};

//==================================================================================
// Format Constants
//==================================================================================

/// The magic number identifying a payload.
pub const PAYLOAD_MAGIC: &[u8; 4] = b"MGVP";
/// The current version of the payload format.
pub const PAYLOAD_FORMAT_VERSION: u16 = 1;

const ENCODING_VERBATIM: u8 = 0;
const ENCODING_QUANTIZED: u8 = 1;
/// Size of one block table entry in bytes.
const BLOCK_ENTRY_SIZE: usize = 24;

//==================================================================================
// Public Structs
//==================================================================================

/// An opaque compressed byte sequence produced by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedPayload {
    bytes: Vec<u8>,
}

impl CompressedPayload {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One row of the block table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockEntry {
    pub elements: u64,
    pub outliers: u64,
    pub stored_bytes: u64,
}

/// Everything in a payload except the block streams.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PayloadHeader {
    pub precision: Precision,
    pub mode: ErrorBoundMode,
    pub dims: Vec<usize>,
    pub smoothness: f64,
    pub tolerance: f64,
    pub codec: BlockCodec,
    pub blocks: Vec<BlockEntry>,
}

impl PayloadHeader {
    /// Checks the payload describes the array the caller expects.
    pub fn validate(&self, shape: &Shape, precision: Precision) -> Result<(), VerifyError> {
        if self.precision != precision {
            return Err(VerifyError::MalformedPayload(format!(
                "payload holds {} data, {} was requested",
                self.precision, precision
            )));
        }
        if self.dims != shape.dims() {
            return Err(VerifyError::MalformedPayload(format!(
                "payload shape {:?} does not match requested shape {:?}",
                self.dims,
                shape.dims()
            )));
        }
        let total = self
            .blocks
            .iter()
            .try_fold(0u64, |acc, b| acc.checked_add(b.elements))
            .ok_or_else(|| {
                VerifyError::MalformedPayload("block element counts overflow".to_string())
            })?;
        if total != shape.num_elements() as u64 {
            return Err(VerifyError::MalformedPayload(format!(
                "block table covers {} elements, shape has {}",
                total,
                shape.num_elements()
            )));
        }
        Ok(())
    }
}

//==================================================================================
// Writing
//==================================================================================

/// Accumulates encoded blocks and assembles the final payload.
pub(crate) struct PayloadBuilder {
    header: PayloadHeader,
    data: Vec<u8>,
}

impl PayloadBuilder {
    /// `header.blocks` is ignored; the table is built from pushed blocks.
    pub fn new(mut header: PayloadHeader) -> Self {
        header.blocks.clear();
        Self {
            header,
            data: Vec::new(),
        }
    }

    pub fn push(&mut self, block: EncodedBlock) {
        self.header.blocks.push(BlockEntry {
            elements: block.elements,
            outliers: block.outliers,
            stored_bytes: block.bytes.len() as u64,
        });
        self.data.extend_from_slice(&block.bytes);
    }

    pub fn finish(self) -> Result<CompressedPayload, VerifyError> {
        let h = &self.header;
        let num_blocks = u32::try_from(h.blocks.len()).map_err(|_| {
            VerifyError::Backend(format!("{} blocks exceed the format limit", h.blocks.len()))
        })?;

        let header_size =
            4 + 2 + 4 + h.dims.len() * 8 + 3 * 8 + 4 + 8 + 4 + h.blocks.len() * BLOCK_ENTRY_SIZE;
        let mut out = Vec::with_capacity(header_size + self.data.len());

        out.extend_from_slice(PAYLOAD_MAGIC);
        out.extend_from_slice(&PAYLOAD_FORMAT_VERSION.to_le_bytes());
        out.push(h.precision.tag());
        let (encoding_tag, quantum) = match h.codec.encoding {
            Encoding::Verbatim => (ENCODING_VERBATIM, 0.0),
            Encoding::Quantized { quantum } => (ENCODING_QUANTIZED, quantum),
        };
        out.push(encoding_tag);
        out.push(h.mode.tag());
        out.push(h.dims.len() as u8);
        for &d in &h.dims {
            out.extend_from_slice(&(d as u64).to_le_bytes());
        }
        out.extend_from_slice(&h.smoothness.to_le_bytes());
        out.extend_from_slice(&h.tolerance.to_le_bytes());
        out.extend_from_slice(&quantum.to_le_bytes());
        out.extend_from_slice(&h.codec.dictionary_size.to_le_bytes());
        out.extend_from_slice(&(h.codec.secondary_frame_size.unwrap_or(0) as u64).to_le_bytes());
        out.extend_from_slice(&num_blocks.to_le_bytes());
        for b in &h.blocks {
            out.extend_from_slice(&b.elements.to_le_bytes());
            out.extend_from_slice(&b.outliers.to_le_bytes());
            out.extend_from_slice(&b.stored_bytes.to_le_bytes());
        }
        out.extend_from_slice(&self.data);

        Ok(CompressedPayload::from_bytes(out))
    }
}

//==================================================================================
// Parsing
//==================================================================================

/// A parsed payload borrowing its block streams from the original bytes.
#[derive(Debug)]
pub(crate) struct ParsedPayload<'a> {
    pub header: PayloadHeader,
    data: &'a [u8],
}

impl<'a> ParsedPayload<'a> {
    pub fn parse(payload: &'a CompressedPayload) -> Result<Self, VerifyError> {
        let bytes = payload.as_bytes();
        let mut cursor = Cursor::new(bytes);

        let mut magic = [0u8; 4];
        read_exact(&mut cursor, &mut magic)?;
        if magic != *PAYLOAD_MAGIC {
            return Err(VerifyError::MalformedPayload("invalid payload magic number".into()));
        }
        let version = u16::from_le_bytes(read_array(&mut cursor)?);
        if version != PAYLOAD_FORMAT_VERSION {
            return Err(VerifyError::MalformedPayload(format!(
                "unsupported payload version: expected {}, got {}",
                PAYLOAD_FORMAT_VERSION, version
            )));
        }

        let [precision_tag, encoding_tag, mode_tag, ndims] = read_array::<4>(&mut cursor)?;
        let precision = Precision::from_tag(precision_tag).ok_or_else(|| {
            VerifyError::MalformedPayload(format!("unknown precision tag {}", precision_tag))
        })?;
        let mode = ErrorBoundMode::from_tag(mode_tag).ok_or_else(|| {
            VerifyError::MalformedPayload(format!("unknown mode tag {}", mode_tag))
        })?;
        let ndims = ndims as usize;
        if ndims == 0 || ndims > MAX_DIMS {
            return Err(VerifyError::MalformedPayload(format!(
                "invalid dimension count {}",
                ndims
            )));
        }

        let dims = (0..ndims)
            .map(|_| read_u64(&mut cursor).and_then(to_usize))
            .collect::<Result<Vec<_>, _>>()?;
        let smoothness = f64::from_le_bytes(read_array(&mut cursor)?);
        let tolerance = f64::from_le_bytes(read_array(&mut cursor)?);
        let quantum = f64::from_le_bytes(read_array(&mut cursor)?);
        let encoding = match encoding_tag {
            ENCODING_VERBATIM => Encoding::Verbatim,
            ENCODING_QUANTIZED if quantum.is_finite() && quantum > 0.0 => {
                Encoding::Quantized { quantum }
            }
            ENCODING_QUANTIZED => {
                return Err(VerifyError::MalformedPayload(format!("invalid quantum {}", quantum)))
            }
            other => {
                return Err(VerifyError::MalformedPayload(format!(
                    "unknown encoding tag {}",
                    other
                )))
            }
        };
        let dictionary_size = u32::from_le_bytes(read_array(&mut cursor)?);
        let secondary = to_usize(read_u64(&mut cursor)?)?;
        let num_blocks = u32::from_le_bytes(read_array(&mut cursor)?) as usize;

        let remaining = bytes.len() - cursor.position() as usize;
        if num_blocks.saturating_mul(BLOCK_ENTRY_SIZE) > remaining {
            return Err(VerifyError::MalformedPayload(format!(
                "block table of {} entries exceeds the {} remaining bytes",
                num_blocks, remaining
            )));
        }
        let mut blocks = Vec::with_capacity(num_blocks);
        for _ in 0..num_blocks {
            blocks.push(BlockEntry {
                elements: read_u64(&mut cursor)?,
                outliers: read_u64(&mut cursor)?,
                stored_bytes: read_u64(&mut cursor)?,
            });
        }

        let data = &bytes[cursor.position() as usize..];
        let declared = blocks
            .iter()
            .try_fold(0u64, |acc, b| acc.checked_add(b.stored_bytes))
            .ok_or_else(|| {
                VerifyError::MalformedPayload("block stream lengths overflow".to_string())
            })?;
        if declared != data.len() as u64 {
            return Err(VerifyError::MalformedPayload(format!(
                "block table declares {} bytes of streams, payload holds {}",
                declared,
                data.len()
            )));
        }

        Ok(Self {
            header: PayloadHeader {
                precision,
                mode,
                dims,
                smoothness,
                tolerance,
                codec: BlockCodec {
                    encoding,
                    dictionary_size,
                    secondary_frame_size: (secondary > 0).then_some(secondary),
                },
                blocks,
            },
            data,
        })
    }

    /// Pairs every block table entry with its stream.
    pub fn blocks(&self) -> Vec<(BlockEntry, &'a [u8])> {
        let mut offset = 0usize;
        self.header
            .blocks
            .iter()
            .map(|entry| {
                // Lengths were checked against the data size in `parse`.
                let len = entry.stored_bytes as usize;
                let stream = &self.data[offset..offset + len];
                offset += len;
                (*entry, stream)
            })
            .collect()
    }
}

fn read_exact(cursor: &mut Cursor<&[u8]>, buf: &mut [u8]) -> Result<(), VerifyError> {
    cursor
        .read_exact(buf)
        .map_err(|_| VerifyError::MalformedPayload("payload truncated".into()))
}

fn read_array<const N: usize>(cursor: &mut Cursor<&[u8]>) -> Result<[u8; N], VerifyError> {
    let mut buf = [0u8; N];
    read_exact(cursor, &mut buf)?;
    Ok(buf)
}

fn read_u64(cursor: &mut Cursor<&[u8]>) -> Result<u64, VerifyError> {
    Ok(u64::from_le_bytes(read_array(cursor)?))
}

fn to_usize(v: u64) -> Result<usize, VerifyError> {
    usize::try_from(v)
        .map_err(|_| VerifyError::MalformedPayload(format!("{} does not fit in usize", v)))
}
