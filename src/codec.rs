use std::io::Write;

use crate::bits::{check_field, BitError, BitRead, BitWriter};
use crate::decoder::{Instruction, Operand};
use crate::instructions::{by_code, OperandKind, OPCODE_WIDTH};

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error(transparent)]
    Bits(#[from] BitError),
    #[error("unknown opcode {0:#06b}")]
    UnknownOpcode(u32),
    #[error("unknown mnemonic '{0}'")]
    UnknownMnemonic(String),
    #[error("{mnemonic} takes {expected} operand(s), got {got}")]
    OperandCount {
        mnemonic: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("operand {index} of {mnemonic} must be {expected:?}, found {found:?}")]
    OperandKind {
        mnemonic: &'static str,
        index: usize,
        expected: OperandKind,
        found: OperandKind,
    },
    #[error("'{0}' is neither a register (R<n>) nor a decimal address")]
    BadOperand(String),
}

/// Encodes instructions as a 4-bit opcode followed by their operand fields,
/// with no padding between fields, and decodes them back.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstructionCodec;

impl InstructionCodec {
    pub fn new() -> Self {
        Self
    }

    /// Write `instr` to `out`. Every field is validated first, so a failing
    /// instruction leaves no bits behind.
    pub fn encode<W: Write>(
        &self,
        instr: &Instruction,
        out: &mut BitWriter<W>,
    ) -> Result<u32, CodecError> {
        let desc = instr.op().desc();
        for operand in instr.operands() {
            check_field(operand.value(), operand.kind().width())?;
        }
        out.write(desc.code, OPCODE_WIDTH)?;
        for operand in instr.operands() {
            out.write(operand.value(), operand.kind().width())?;
        }
        out.end_record();
        Ok(desc.encoded_width())
    }

    /// Read one instruction. Register operands are not range-checked here.
    pub fn decode<B: BitRead>(&self, src: &mut B) -> Result<Instruction, CodecError> {
        let code = src.read(OPCODE_WIDTH)?;
        let desc = by_code(code).ok_or(CodecError::UnknownOpcode(code))?;
        let operands = desc
            .operands
            .iter()
            .map(|&kind| Ok(Operand::of_kind(kind, src.read(kind.width())?)))
            .collect::<Result<Vec<_>, CodecError>>()?;
        Instruction::new(desc.op, operands)
    }
}
