use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bits::{BitError, BitRead};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("address {addr} out of bounds for a {size}-cell address space")]
    OutOfBounds { addr: u32, size: u32 },
    #[error("program of {bits} bits does not fit in {size}-bit program memory")]
    ProgramTooLarge { bits: u32, size: u32 },
}

/// Fixed-size linear memory. The size is set at construction and never changes.
pub trait AddressSpace {
    type Cell: Copy;

    fn size(&self) -> u32;
    fn get(&self, addr: u32) -> Result<Self::Cell, MemoryError>;
    fn set(&mut self, addr: u32, val: Self::Cell) -> Result<(), MemoryError>;

    fn check(&self, addr: u32) -> Result<usize, MemoryError> {
        if addr >= self.size() {
            return Err(MemoryError::OutOfBounds {
                addr,
                size: self.size(),
            });
        }
        Ok(addr as usize)
    }
}

/// Data memory: one signed byte per cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataMemory {
    cells: Vec<i8>,
}

impl DataMemory {
    pub fn new(size: u32) -> Self {
        Self {
            cells: vec![0; size as usize],
        }
    }

    pub fn cells(&self) -> &[i8] {
        &self.cells
    }
}

impl AddressSpace for DataMemory {
    type Cell = i8;

    fn size(&self) -> u32 {
        self.cells.len() as u32
    }

    fn get(&self, addr: u32) -> Result<i8, MemoryError> {
        let i = self.check(addr)?;
        Ok(self.cells[i])
    }

    fn set(&mut self, addr: u32, val: i8) -> Result<(), MemoryError> {
        let i = self.check(addr)?;
        self.cells[i] = val;
        Ok(())
    }
}

/// Program memory: one bit per cell, addressed by bit offset.
///
/// `eof` is the offset one past the last loaded instruction bit; fetches never
/// read beyond it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramMemory {
    bits: BitVec<u8, Msb0>,
    eof: u32,
}

impl ProgramMemory {
    pub fn new(size: u32) -> Self {
        Self {
            bits: bitvec![u8, Msb0; 0; size as usize],
            eof: 0,
        }
    }

    pub fn eof(&self) -> u32 {
        self.eof
    }

    /// Replace the contents with `eof` bits read from `src`; the rest is
    /// zeroed. On error the memory is left as it was.
    pub(crate) fn fill<B: BitRead>(&mut self, src: &mut B, eof: u32) -> Result<(), LoadError> {
        if eof > self.size() {
            return Err(MemoryError::ProgramTooLarge {
                bits: eof,
                size: self.size(),
            }
            .into());
        }
        let mut bits = bitvec![u8, Msb0; 0; self.bits.len()];
        for i in 0..eof as usize {
            let bit = src.read(1)?;
            bits.set(i, bit == 1);
        }
        self.bits = bits;
        self.eof = eof;
        Ok(())
    }

    /// Packed bytes covering the loaded program, MSB-first.
    pub fn loaded_bytes(&self) -> &[u8] {
        let len = (self.eof as usize).div_ceil(8);
        &self.bits.as_raw_slice()[..len]
    }

    /// Cursor reading instruction fields starting at bit `at`, bounded by `eof`.
    pub fn cursor(&self, at: u32) -> ProgramCursor<'_> {
        ProgramCursor {
            bits: &self.bits[..self.eof as usize],
            pos: at,
        }
    }
}

impl AddressSpace for ProgramMemory {
    type Cell = bool;

    fn size(&self) -> u32 {
        self.bits.len() as u32
    }

    fn get(&self, addr: u32) -> Result<bool, MemoryError> {
        let i = self.check(addr)?;
        Ok(self.bits[i])
    }

    fn set(&mut self, addr: u32, val: bool) -> Result<(), MemoryError> {
        let i = self.check(addr)?;
        self.bits.set(i, val);
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error(transparent)]
    Bits(#[from] BitError),
}

pub struct ProgramCursor<'a> {
    bits: &'a BitSlice<u8, Msb0>,
    pos: u32,
}

impl BitRead for ProgramCursor<'_> {
    fn read(&mut self, width: u8) -> Result<u32, BitError> {
        if width == 0 || width > crate::bits::MAX_FIELD_WIDTH {
            return Err(BitError::BadWidth(width));
        }
        let start = self.pos as usize;
        let end = start + width as usize;
        if end > self.bits.len() {
            let missing = (end - self.bits.len().max(start)).min(width as usize);
            return Err(BitError::Truncated {
                offset: start as u64,
                width,
                missing: missing as u8,
            });
        }
        let value = self.bits[start..end]
            .iter()
            .by_vals()
            .fold(0u32, |acc, bit| (acc << 1) | u32::from(bit));
        self.pos += u32::from(width);
        Ok(value)
    }

    fn position(&self) -> u64 {
        u64::from(self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitReader;

    #[test]
    fn data_memory_bounds() {
        let mut m = DataMemory::new(16);
        m.set(15, -3).unwrap();
        assert_eq!(m.get(15).unwrap(), -3);
        assert_eq!(
            m.get(16),
            Err(MemoryError::OutOfBounds { addr: 16, size: 16 })
        );
        assert!(m.set(200, 1).is_err());
    }

    #[test]
    fn program_cursor_stops_at_eof() {
        let bytes = [0b1010_1100u8, 0b0100_0000];
        let mut pm = ProgramMemory::new(256);
        pm.fill(&mut BitReader::new(&bytes[..]), 10).unwrap();
        assert_eq!(pm.eof(), 10);
        assert_eq!(pm.loaded_bytes(), &[0b1010_1100, 0b0100_0000]);
        assert!(pm.get(0).unwrap());
        assert!(!pm.get(1).unwrap());
        assert!(pm.get(9).unwrap());
        assert!(!pm.get(10).unwrap());

        let mut c = pm.cursor(0);
        assert_eq!(c.read(4).unwrap(), 0b1010);
        assert_eq!(c.read(4).unwrap(), 0b1100);
        assert_eq!(c.position(), 8);
        let err = c.read(4).unwrap_err();
        assert!(matches!(
            err,
            BitError::Truncated { offset: 8, width: 4, missing: 2 }
        ));
        assert_eq!(c.position(), 8);
    }

    #[test]
    fn program_memory_is_bit_addressed() {
        let pm = ProgramMemory::new(256);
        assert_eq!(pm.size(), 256);
        assert!(pm.loaded_bytes().is_empty());
        assert!(pm.get(256).is_err());
    }

    #[test]
    fn short_source_keeps_previous_program() {
        let mut pm = ProgramMemory::new(256);
        pm.fill(&mut BitReader::new(&[0xC0u8][..]), 2).unwrap();
        let err = pm.fill(&mut BitReader::new(&[0xFFu8][..]), 12).unwrap_err();
        assert!(matches!(err, LoadError::Bits(BitError::Truncated { .. })));
        assert_eq!(pm.eof(), 2);
        assert!(pm.get(0).unwrap());
        assert!(pm.get(1).unwrap());
        assert!(!pm.get(2).unwrap());
    }

    #[test]
    fn oversized_program_is_refused() {
        let bytes = [0u8; 8];
        let mut pm = ProgramMemory::new(16);
        let err = pm.fill(&mut BitReader::new(&bytes[..]), 17).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Memory(MemoryError::ProgramTooLarge { bits: 17, size: 16 })
        ));
        assert_eq!(pm.eof(), 0);
    }
}
