//! MSB-first packing of fixed-width unsigned fields into a byte stream.
//!
//! [`BitWriter`] appends fields to any [`Write`] sink and zero-pads the final
//! byte on [`BitWriter::flush`]. [`BitReader`] pulls fields back out of any
//! [`Read`] source one byte at a time. Anything that hands out fields in the
//! same order implements [`BitRead`], which is what the instruction codec
//! decodes from.

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

/// Widest field a single `write`/`read` call accepts.
pub const MAX_FIELD_WIDTH: u8 = 32;

#[derive(thiserror::Error, Debug)]
pub enum BitError {
    #[error("value {value} does not fit in a {width}-bit field")]
    Encoding { value: u32, width: u8 },
    #[error("field width {0} outside 1..=32")]
    BadWidth(u8),
    #[error("stream ends inside a {width}-bit field starting at bit {offset} ({missing} bit(s) missing)")]
    Truncated { offset: u64, width: u8, missing: u8 },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// True when `value` is representable in `width` bits.
pub fn fits(value: u32, width: u8) -> bool {
    u64::from(value) >> width == 0
}

/// Validate a field before anything is emitted for it.
pub fn check_field(value: u32, width: u8) -> Result<(), BitError> {
    check_width(width)?;
    if !fits(value, width) {
        return Err(BitError::Encoding { value, width });
    }
    Ok(())
}

fn check_width(width: u8) -> Result<(), BitError> {
    if width == 0 || width > MAX_FIELD_WIDTH {
        return Err(BitError::BadWidth(width));
    }
    Ok(())
}

/// Layout of the debug text mirror.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MirrorStyle {
    /// Fields run together: `0000000101`
    #[default]
    Dense,
    /// Fields separated by a space: `0000 00 0101`
    Pretty,
}

#[derive(Debug)]
struct Mirror {
    style: MirrorStyle,
    text: String,
    fields_on_line: usize,
}

impl Mirror {
    fn new(style: MirrorStyle) -> Self {
        Self {
            style,
            text: String::new(),
            fields_on_line: 0,
        }
    }

    fn field(&mut self, value: u32, width: u8) {
        if self.style == MirrorStyle::Pretty && self.fields_on_line > 0 {
            self.text.push(' ');
        }
        self.text
            .push_str(&format!("{:0>width$b}", value, width = width as usize));
        self.fields_on_line += 1;
    }

    fn end_line(&mut self) {
        if self.fields_on_line > 0 {
            self.text.push('\n');
            self.fields_on_line = 0;
        }
    }
}

/// What a [`BitWriter`] produced once finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finished {
    /// Number of meaningful bits written, padding excluded.
    pub bits: u64,
    /// Debug mirror text, if the writer was created with one.
    pub mirror: Option<String>,
}

/// Packs fields MSB-first into `sink`.
///
/// A partially filled byte is flushed when the writer is finished or dropped,
/// so the sink always ends on a byte boundary.
pub struct BitWriter<W: Write> {
    sink: W,
    acc: u8,
    used: u8,
    bits: u64,
    mirror: Option<Mirror>,
}

impl<W: Write> BitWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            acc: 0,
            used: 0,
            bits: 0,
            mirror: None,
        }
    }

    /// Writer that also keeps a textual mirror of every field.
    pub fn with_mirror(sink: W, style: MirrorStyle) -> Self {
        let mut w = Self::new(sink);
        w.mirror = Some(Mirror::new(style));
        w
    }

    pub fn bits_written(&self) -> u64 {
        self.bits
    }

    /// Append the low `width` bits of `value`, most significant bit first.
    pub fn write(&mut self, value: u32, width: u8) -> Result<(), BitError> {
        check_field(value, width)?;
        for shift in (0..width).rev() {
            let bit = ((value >> shift) & 1) as u8;
            self.acc = (self.acc << 1) | bit;
            self.used += 1;
            if self.used == 8 {
                let byte = self.acc;
                self.acc = 0;
                self.used = 0;
                self.sink.write_all(&[byte])?;
            }
        }
        self.bits += u64::from(width);
        if let Some(m) = self.mirror.as_mut() {
            m.field(value, width);
        }
        Ok(())
    }

    /// Close the current mirror line. Has no effect on the packed output.
    pub fn end_record(&mut self) {
        if let Some(m) = self.mirror.as_mut() {
            m.end_line();
        }
    }

    /// Emit any partial byte, zero-padded on the right.
    pub fn flush(&mut self) -> Result<(), BitError> {
        if self.used > 0 {
            let byte = self.acc << (8 - self.used);
            self.acc = 0;
            self.used = 0;
            self.sink.write_all(&[byte])?;
        }
        self.sink.flush()?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<Finished, BitError> {
        self.flush()?;
        Ok(Finished {
            bits: self.bits,
            mirror: self.mirror.take().map(|m| m.text),
        })
    }
}

impl<W: Write> Drop for BitWriter<W> {
    fn drop(&mut self) {
        // Errors surface through `finish`; here the sink only gets its tail.
        let _ = self.flush();
    }
}

/// Anything that yields MSB-first bit fields in sequence.
pub trait BitRead {
    fn read(&mut self, width: u8) -> Result<u32, BitError>;
    /// Bits consumed so far.
    fn position(&self) -> u64;
}

/// Unpacks fields from a byte-oriented source, refilling one byte at a time.
pub struct BitReader<R: Read> {
    source: R,
    acc: u8,
    left: u8,
    pos: u64,
}

impl<R: Read> BitReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            acc: 0,
            left: 0,
            pos: 0,
        }
    }
}

impl<R: Read> BitRead for BitReader<R> {
    fn read(&mut self, width: u8) -> Result<u32, BitError> {
        check_width(width)?;
        let start = self.pos;
        let mut value = 0u32;
        for taken in 0..width {
            if self.left == 0 {
                let mut byte = [0u8; 1];
                match self.source.read_exact(&mut byte) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                        return Err(BitError::Truncated {
                            offset: start,
                            width,
                            missing: width - taken,
                        });
                    }
                    Err(e) => return Err(e.into()),
                }
                self.acc = byte[0];
                self.left = 8;
            }
            self.left -= 1;
            value = (value << 1) | u32::from((self.acc >> self.left) & 1);
            self.pos += 1;
        }
        Ok(value)
    }

    fn position(&self) -> u64 {
        self.pos
    }
}
