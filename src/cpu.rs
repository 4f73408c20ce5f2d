use std::io;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bits::BitRead;
use crate::codec::{CodecError, InstructionCodec};
use crate::console::Console;
use crate::decoder::Instruction;
use crate::image::{Image, ImageError};
use crate::instructions::REGISTER_COUNT;
use crate::memory::{AddressSpace, DataMemory, MemoryError, ProgramMemory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuConfig {
    /// Program memory size in bits.
    pub program_bits: u32,
    /// Data memory size in cells.
    pub data_cells: u32,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            program_bits: 256,
            data_cells: 256,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    #[error("invalid register R{index}; only R0-R3 exist")]
    InvalidRegister { index: u32 },
}

/// Four 8-bit two's-complement registers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterFile {
    regs: [i8; REGISTER_COUNT],
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: u32) -> Result<i8, RegisterError> {
        self.regs
            .get(index as usize)
            .copied()
            .ok_or(RegisterError::InvalidRegister { index })
    }

    pub fn set(&mut self, index: u32, value: i8) -> Result<(), RegisterError> {
        let slot = self
            .regs
            .get_mut(index as usize)
            .ok_or(RegisterError::InvalidRegister { index })?;
        *slot = value;
        Ok(())
    }

    pub fn as_array(&self) -> [i8; REGISTER_COUNT] {
        self.regs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    Ready,
    Running,
    Halted,
    Faulted,
}

#[derive(thiserror::Error, Debug)]
pub enum Fault {
    #[error("decode failed at bit {pc}: {source}")]
    Decode {
        pc: u32,
        #[source]
        source: CodecError,
    },
    #[error("register access failed at bit {pc}: {source}")]
    Register {
        pc: u32,
        #[source]
        source: RegisterError,
    },
    #[error("data access failed at bit {pc}: {source}")]
    Memory {
        pc: u32,
        #[source]
        source: MemoryError,
    },
    #[error("console I/O failed at bit {pc}: {source}")]
    Io {
        pc: u32,
        #[source]
        source: io::Error,
    },
    #[error("cpu already faulted at bit {pc}")]
    Stopped { pc: u32 },
}

impl Fault {
    pub fn pc(&self) -> u32 {
        match self {
            Fault::Decode { pc, .. }
            | Fault::Register { pc, .. }
            | Fault::Memory { pc, .. }
            | Fault::Io { pc, .. }
            | Fault::Stopped { pc } => *pc,
        }
    }
}

bitflags! {
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegMask: u8 {
const R0 = 1 << 0;
const R1 = 1 << 1;
const R2 = 1 << 2;
const R3 = 1 << 3;
}
}

impl Default for RegMask {
    fn default() -> Self {
        Self::empty()
    }
}

impl RegMask {
    pub fn of(index: u32) -> Self {
        Self::from_bits_truncate(1u8.checked_shl(index).unwrap_or(0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemAccess {
    pub addr: u32,
    pub value: i8,
    pub kind: Access,
}

/// Side effects of one executed instruction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Effects {
    pub changed: RegMask,
    pub memory: Option<MemAccess>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub pc: u32,
    pub next_pc: u32,
    pub instr: Instruction,
    pub changed: RegMask,
    pub memory: Option<MemAccess>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Executed(StepRecord),
    Halted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CpuSnapshot {
    pub state: CpuState,
    pub pc: u32,
    pub eof: u32,
    /// Loaded program, packed MSB-first.
    pub program: Vec<u8>,
    pub registers: [i8; REGISTER_COUNT],
    pub data: Vec<i8>,
}

/// Fetch-decode-execute engine owning its registers and both memories.
#[derive(Debug, Clone)]
pub struct Cpu {
    pub(crate) pc: u32,
    pub(crate) state: CpuState,
    pub(crate) regs: RegisterFile,
    pub(crate) program: ProgramMemory,
    pub(crate) data: DataMemory,
    codec: InstructionCodec,
}

impl Cpu {
    pub fn new(cfg: CpuConfig) -> Self {
        Self {
            pc: 0,
            state: CpuState::Ready,
            regs: RegisterFile::new(),
            program: ProgramMemory::new(cfg.program_bits),
            data: DataMemory::new(cfg.data_cells),
            codec: InstructionCodec::new(),
        }
    }

    /// Replace program memory with `image` and rewind to bit 0.
    ///
    /// Registers and data memory are left as they are.
    pub fn load_image(&mut self, image: &Image) -> Result<(), ImageError> {
        image.unpack_into(&mut self.program)?;
        self.pc = 0;
        self.state = CpuState::Ready;
        debug!(bits = image.bit_len(), "program loaded");
        Ok(())
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn eof(&self) -> u32 {
        self.program.eof()
    }

    pub fn state(&self) -> CpuState {
        self.state
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    pub fn program(&self) -> &ProgramMemory {
        &self.program
    }

    pub fn data(&self) -> &DataMemory {
        &self.data
    }

    /// Data memory for preloading values before a run.
    pub fn data_mut(&mut self) -> &mut DataMemory {
        &mut self.data
    }

    pub fn snapshot(&self) -> CpuSnapshot {
        CpuSnapshot {
            state: self.state,
            pc: self.pc,
            eof: self.program.eof(),
            program: self.program.loaded_bytes().to_vec(),
            registers: self.regs.as_array(),
            data: self.data.cells().to_vec(),
        }
    }

    /// Execute one instruction.
    ///
    /// The program counter moves past the instruction before its handler runs.
    /// Any decode or dispatch error leaves the CPU `Faulted`.
    pub fn step<C: Console>(&mut self, console: &mut C) -> Result<Step, Fault> {
        match self.state {
            CpuState::Halted => return Ok(Step::Halted),
            CpuState::Faulted => return Err(Fault::Stopped { pc: self.pc }),
            CpuState::Ready | CpuState::Running => {}
        }
        let pc = self.pc;
        if pc >= self.program.eof() || pc >= self.program.size() {
            self.state = CpuState::Halted;
            debug!(pc, "end of program");
            return Ok(Step::Halted);
        }
        self.state = CpuState::Running;

        let decoded = {
            let mut cursor = self.program.cursor(pc);
            self.codec
                .decode(&mut cursor)
                .map(|instr| (instr, cursor.position() as u32))
        };
        let (instr, next_pc) = match decoded {
            Ok(d) => d,
            Err(source) => return Err(self.fault(Fault::Decode { pc, source })),
        };
        self.pc = next_pc;
        debug!(pc, next_pc, op = instr.op().mnemonic(), "execute");

        let fx = match self.dispatch(pc, &instr, console) {
            Ok(fx) => fx,
            Err(fault) => return Err(self.fault(fault)),
        };
        Ok(Step::Executed(StepRecord {
            pc,
            next_pc: self.pc,
            instr,
            changed: fx.changed,
            memory: fx.memory,
        }))
    }

    /// Step until the CPU halts, returning the number of executed instructions.
    pub fn run<C: Console>(&mut self, console: &mut C) -> Result<u64, Fault> {
        self.run_with(console, |_| {})
    }

    /// Like [`Cpu::run`], handing every step record to `on_step`.
    pub fn run_with<C, F>(&mut self, console: &mut C, mut on_step: F) -> Result<u64, Fault>
    where
        C: Console,
        F: FnMut(&StepRecord),
    {
        let mut executed = 0u64;
        loop {
            match self.step(console)? {
                Step::Executed(rec) => {
                    executed += 1;
                    on_step(&rec);
                }
                Step::Halted => return Ok(executed),
            }
        }
    }

    fn fault(&mut self, fault: Fault) -> Fault {
        self.state = CpuState::Faulted;
        warn!(pc = fault.pc(), "cpu faulted: {fault}");
        fault
    }
}
