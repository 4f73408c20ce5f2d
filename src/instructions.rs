//! The opcode table. Encoder, decoder, assembler and executor all look rows
//! up here by reference.

use serde::{Deserialize, Serialize};

use crate::decoder::Op;

/// Width of the opcode field that starts every instruction.
pub const OPCODE_WIDTH: u8 = 4;

/// Register slots in the register file.
pub const REGISTER_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperandKind {
    /// Register reference.
    Reg,
    /// Data-memory address.
    Addr,
}

impl OperandKind {
    pub const fn width(self) -> u8 {
        match self {
            OperandKind::Reg => 2,
            OperandKind::Addr => 4,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InstrDesc {
    pub op: Op,
    pub code: u32,
    pub mnemonic: &'static str,
    pub operands: &'static [OperandKind],
}

impl InstrDesc {
    pub fn arity(&self) -> usize {
        self.operands.len()
    }

    pub fn encoded_width(&self) -> u32 {
        u32::from(OPCODE_WIDTH)
            + self
                .operands
                .iter()
                .map(|k| u32::from(k.width()))
                .sum::<u32>()
    }
}

use OperandKind::{Addr, Reg};

/// Indexed by opcode value.
pub static TABLE: [InstrDesc; 7] = [
    InstrDesc {
        op: Op::Mover,
        code: 0,
        mnemonic: "MOVER",
        operands: &[Reg, Addr],
    },
    InstrDesc {
        op: Op::Movem,
        code: 1,
        mnemonic: "MOVEM",
        operands: &[Reg, Addr],
    },
    InstrDesc {
        op: Op::Add,
        code: 2,
        mnemonic: "ADD",
        operands: &[Reg, Reg, Addr],
    },
    InstrDesc {
        op: Op::Sub,
        code: 3,
        mnemonic: "SUB",
        operands: &[Reg, Reg, Addr],
    },
    InstrDesc {
        op: Op::Halt,
        code: 4,
        mnemonic: "HALT",
        operands: &[],
    },
    InstrDesc {
        op: Op::In,
        code: 5,
        mnemonic: "IN",
        operands: &[Reg],
    },
    InstrDesc {
        op: Op::Out,
        code: 6,
        mnemonic: "OUT",
        operands: &[Reg],
    },
];

pub fn by_code(code: u32) -> Option<&'static InstrDesc> {
    TABLE.get(code as usize)
}

/// Exact, case-sensitive mnemonic lookup.
pub fn by_mnemonic(mnemonic: &str) -> Option<&'static InstrDesc> {
    TABLE.iter().find(|d| d.mnemonic == mnemonic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_code() {
        for (i, d) in TABLE.iter().enumerate() {
            assert_eq!(d.code as usize, i);
            assert_eq!(d.op as usize, i);
            assert!(std::ptr::eq(d.op.desc(), d));
        }
        assert!(by_code(7).is_none());
        assert!(by_code(15).is_none());
    }

    #[test]
    fn widths_follow_operand_kinds() {
        assert_eq!(Op::Mover.desc().encoded_width(), 10);
        assert_eq!(Op::Add.desc().encoded_width(), 12);
        assert_eq!(Op::Halt.desc().encoded_width(), 4);
        assert_eq!(Op::Out.desc().encoded_width(), 6);
    }

    #[test]
    fn mnemonics_are_case_sensitive() {
        assert_eq!(by_mnemonic("SUB").map(|d| d.op), Some(Op::Sub));
        assert!(by_mnemonic("sub").is_none());
        assert!(by_mnemonic("JMP").is_none());
    }
}
