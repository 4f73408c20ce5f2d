//! Binary image format.
//!
//! ```text
//! +----------------------+----------------------------------------+
//! | bit_len: u32 (BE)    | body: ceil(bit_len / 8) bytes          |
//! +----------------------+----------------------------------------+
//! ```
//!
//! The body is the MSB-first concatenation of every encoded instruction,
//! zero-padded to a byte boundary. `bit_len` is the end-of-program marker.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::bits::BitReader;
use crate::memory::{LoadError, ProgramMemory};

pub const HEADER_LEN: usize = 4;

#[derive(thiserror::Error, Debug)]
pub enum ImageError {
    #[error("image is {len} byte(s) long, shorter than its 4-byte header")]
    MissingHeader { len: usize },
    #[error("header announces {bits} bits ({expected} body bytes) but the body has {found}")]
    LengthMismatch {
        bits: u32,
        expected: usize,
        found: usize,
    },
    #[error("padding bits after bit {bits} are not zero")]
    NonZeroPadding { bits: u32 },
    #[error("cannot load image: {0}")]
    Load(#[from] LoadError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawImage")]
pub struct Image {
    bit_len: u32,
    body: Vec<u8>,
}

/// Unchecked wire form; deserializing goes through [`Image::new`].
#[derive(Deserialize)]
struct RawImage {
    bit_len: u32,
    body: Vec<u8>,
}

impl TryFrom<RawImage> for Image {
    type Error = ImageError;

    fn try_from(raw: RawImage) -> Result<Self, Self::Error> {
        Image::new(raw.bit_len, raw.body)
    }
}

fn body_len(bits: u32) -> usize {
    (bits as usize).div_ceil(8)
}

impl Image {
    pub fn new(bit_len: u32, body: Vec<u8>) -> Result<Self, ImageError> {
        let expected = body_len(bit_len);
        if body.len() != expected {
            return Err(ImageError::LengthMismatch {
                bits: bit_len,
                expected,
                found: body.len(),
            });
        }
        let tail = bit_len % 8;
        if tail != 0 {
            let pad_mask = 0xFFu8 >> tail;
            if body.last().is_some_and(|b| b & pad_mask != 0) {
                return Err(ImageError::NonZeroPadding { bits: bit_len });
            }
        }
        Ok(Self { bit_len, body })
    }

    pub fn bit_len(&self) -> u32 {
        self.bit_len
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        if bytes.len() < HEADER_LEN {
            return Err(ImageError::MissingHeader { len: bytes.len() });
        }
        let (header, body) = bytes.split_at(HEADER_LEN);
        let bit_len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        Self::new(bit_len, body.to_vec())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.body.len());
        out.extend_from_slice(&self.bit_len.to_be_bytes());
        out.extend_from_slice(&self.body);
        out
    }

    pub fn write_to<W: Write>(&self, mut w: W) -> io::Result<()> {
        w.write_all(&self.bit_len.to_be_bytes())?;
        w.write_all(&self.body)?;
        w.flush()
    }

    /// Unpack the body into `mem`, one bit per cell, and set its end marker.
    pub fn unpack_into(&self, mem: &mut ProgramMemory) -> Result<(), ImageError> {
        let mut reader = BitReader::new(self.body.as_slice());
        mem.fill(&mut reader, self.bit_len)?;
        Ok(())
    }
}
