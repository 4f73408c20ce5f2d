use serde::{Deserialize, Serialize};

use crate::codec::CodecError;
use crate::instructions::{InstrDesc, OperandKind, TABLE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Op {
    Mover = 0,
    Movem = 1,
    Add = 2,
    Sub = 3,
    Halt = 4,
    In = 5,
    Out = 6,
}

impl Op {
    /// Table row for this opcode.
    pub fn desc(self) -> &'static InstrDesc {
        &TABLE[self as usize]
    }

    pub fn mnemonic(self) -> &'static str {
        self.desc().mnemonic
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// Register reference, `R0`..`R3`.
    Reg(u32),
    /// Data-memory address.
    Addr(u32),
}

impl Operand {
    pub fn kind(self) -> OperandKind {
        match self {
            Operand::Reg(_) => OperandKind::Reg,
            Operand::Addr(_) => OperandKind::Addr,
        }
    }

    pub fn value(self) -> u32 {
        match self {
            Operand::Reg(v) | Operand::Addr(v) => v,
        }
    }

    pub(crate) fn of_kind(kind: OperandKind, value: u32) -> Self {
        match kind {
            OperandKind::Reg => Operand::Reg(value),
            OperandKind::Addr => Operand::Addr(value),
        }
    }
}

/// One instruction whose operand count and kinds match its opcode's table row.
///
/// Field widths are not checked here; the codec rejects values that do not fit
/// when encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    op: Op,
    operands: Vec<Operand>,
}

impl Instruction {
    pub fn new(op: Op, operands: Vec<Operand>) -> Result<Self, CodecError> {
        let desc = op.desc();
        if operands.len() != desc.arity() {
            return Err(CodecError::OperandCount {
                mnemonic: desc.mnemonic,
                expected: desc.arity(),
                got: operands.len(),
            });
        }
        for (index, (operand, kind)) in operands.iter().zip(desc.operands).enumerate() {
            if operand.kind() != *kind {
                return Err(CodecError::OperandKind {
                    mnemonic: desc.mnemonic,
                    index,
                    expected: *kind,
                    found: operand.kind(),
                });
            }
        }
        Ok(Self { op, operands })
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    /// Bits this instruction occupies once encoded.
    pub fn encoded_width(&self) -> u32 {
        self.op.desc().encoded_width()
    }
}
