use tracing::warn;

use crate::codec::CodecError;
use crate::console::Console;
use crate::cpu::{Access, Cpu, CpuState, Effects, Fault, MemAccess, RegMask};
use crate::decoder::{Instruction, Op, Operand};
use crate::memory::AddressSpace;

impl Cpu {
    /// Run the handler for an already-decoded instruction fetched at `pc`.
    ///
    /// Handlers read everything they need before writing, so a failing
    /// instruction leaves registers and data memory untouched.
    pub(crate) fn dispatch<C: Console>(
        &mut self,
        pc: u32,
        instr: &Instruction,
        console: &mut C,
    ) -> Result<Effects, Fault> {
        let mut fx = Effects::default();
        match (instr.op(), instr.operands()) {
            (Op::Mover, &[Operand::Reg(r), Operand::Addr(a)]) => {
                self.check_reg(pc, r)?;
                let v = self.load(pc, a)?;
                self.write_reg(pc, r, v, &mut fx)?;
                fx.memory = Some(MemAccess { addr: a, value: v, kind: Access::Read });
            }
            (Op::Movem, &[Operand::Reg(r), Operand::Addr(a)]) => {
                let v = self.read_reg(pc, r)?;
                self.data
                    .set(a, v)
                    .map_err(|source| Fault::Memory { pc, source })?;
                fx.memory = Some(MemAccess { addr: a, value: v, kind: Access::Write });
            }
            (Op::Add, &[Operand::Reg(d), Operand::Reg(s), Operand::Addr(a)]) => {
                self.check_reg(pc, d)?;
                let lhs = self.read_reg(pc, s)?;
                let rhs = self.load(pc, a)?;
                self.write_reg(pc, d, lhs.wrapping_add(rhs), &mut fx)?;
                fx.memory = Some(MemAccess { addr: a, value: rhs, kind: Access::Read });
            }
            (Op::Sub, &[Operand::Reg(d), Operand::Reg(s), Operand::Addr(a)]) => {
                self.check_reg(pc, d)?;
                let lhs = self.read_reg(pc, s)?;
                let rhs = self.load(pc, a)?;
                self.write_reg(pc, d, lhs.wrapping_sub(rhs), &mut fx)?;
                fx.memory = Some(MemAccess { addr: a, value: rhs, kind: Access::Read });
            }
            (Op::Halt, &[]) => {
                self.pc = self.program.eof();
                self.state = CpuState::Halted;
            }
            (Op::In, &[Operand::Reg(r)]) => {
                self.check_reg(pc, r)?;
                // Bad input of any kind leaves the register alone.
                match console.input(r) {
                    Ok(Some(line)) => match line.trim().parse::<i32>() {
                        // Wider inputs keep their low 8 bits.
                        Ok(v) => self.write_reg(pc, r, v as i8, &mut fx)?,
                        Err(e) => warn!(pc, reg = r, "ignoring IN value: {e}"),
                    },
                    Ok(None) => warn!(pc, reg = r, "IN found no more input"),
                    Err(e) => warn!(pc, reg = r, "IN could not read input: {e}"),
                }
            }
            (Op::Out, &[Operand::Reg(r)]) => {
                let v = self.read_reg(pc, r)?;
                console
                    .output(r, v)
                    .map_err(|source| Fault::Io { pc, source })?;
            }
            (op, operands) => {
                let desc = op.desc();
                return Err(Fault::Decode {
                    pc,
                    source: CodecError::OperandCount {
                        mnemonic: desc.mnemonic,
                        expected: desc.arity(),
                        got: operands.len(),
                    },
                });
            }
        }
        Ok(fx)
    }

    fn check_reg(&self, pc: u32, index: u32) -> Result<(), Fault> {
        self.read_reg(pc, index).map(|_| ())
    }

    fn read_reg(&self, pc: u32, index: u32) -> Result<i8, Fault> {
        self.regs
            .get(index)
            .map_err(|source| Fault::Register { pc, source })
    }

    fn write_reg(&mut self, pc: u32, index: u32, value: i8, fx: &mut Effects) -> Result<(), Fault> {
        self.regs
            .set(index, value)
            .map_err(|source| Fault::Register { pc, source })?;
        fx.changed |= RegMask::of(index);
        Ok(())
    }

    fn load(&self, pc: u32, addr: u32) -> Result<i8, Fault> {
        self.data
            .get(addr)
            .map_err(|source| Fault::Memory { pc, source })
    }
}
