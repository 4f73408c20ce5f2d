use std::fmt;

use serde::Serialize;

use crate::bits::{BitError, BitRead, BitReader};
use crate::codec::{CodecError, InstructionCodec};
use crate::decoder::{Instruction, Operand};
use crate::image::Image;

/// Render an instruction in assembler syntax, e.g. `ADD R0, R1, 5`.
pub fn fmt_instruction(instr: &Instruction) -> String {
    let operands: Vec<String> = instr
        .operands()
        .iter()
        .map(|op| match op {
            Operand::Reg(r) => format!("R{r}"),
            Operand::Addr(a) => a.to_string(),
        })
        .collect();
    if operands.is_empty() {
        instr.op().mnemonic().to_string()
    } else {
        format!("{} {}", instr.op().mnemonic(), operands.join(", "))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&fmt_instruction(self))
    }
}

/// One decoded line of a listing.
#[derive(Debug, Serialize)]
pub struct Line {
    /// Bit offset of the instruction's opcode field.
    pub offset: u32,
    pub width: u32,
    #[serde(serialize_with = "text")]
    pub result: Result<Instruction, CodecError>,
}

fn text<S: serde::Serializer>(
    r: &Result<Instruction, CodecError>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match r {
        Ok(i) => s.serialize_str(&fmt_instruction(i)),
        Err(e) => s.serialize_str(&format!("<error: {e}>")),
    }
}

/// Decode `image` up to its end marker. Stops after the first decode error,
/// which becomes the last line.
pub fn disassemble(image: &Image) -> Vec<Line> {
    let codec = InstructionCodec::new();
    let mut reader = BitReader::new(image.body());
    let end = u64::from(image.bit_len());
    let mut lines = Vec::new();
    while reader.position() < end {
        let offset = reader.position() as u32;
        let result = codec.decode(&mut reader);
        let width = result.as_ref().map_or(0, |i| i.encoded_width());
        // Padding bits are readable, so an instruction can run past the end.
        let result = match result {
            Ok(_) if u64::from(offset + width) > end => Err(CodecError::Bits(BitError::Truncated {
                offset: u64::from(offset),
                width: width as u8,
                missing: (u64::from(offset + width) - end) as u8,
            })),
            other => other,
        };
        let stop = result.is_err();
        lines.push(Line {
            offset,
            width: if stop { 0 } else { width },
            result,
        });
        if stop {
            break;
        }
    }
    lines
}
