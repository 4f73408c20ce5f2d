pub mod asm;
pub mod bits;
pub mod codec;
pub mod console;
pub mod cpu;
pub mod decoder;
pub mod disasm;
pub mod exec;
pub mod image;
pub mod instructions;
pub mod memory;

pub use asm::{AsmConfig, AsmError, Assembler, Assembly, Statement};
pub use bits::{BitError, BitRead, BitReader, BitWriter, MirrorStyle};
pub use codec::{CodecError, InstructionCodec};
pub use console::{Console, ScriptedConsole, StdConsole};
pub use cpu::{Cpu, CpuConfig, CpuSnapshot, CpuState, Fault, RegisterFile, Step, StepRecord};
pub use decoder::{Instruction, Op, Operand};
pub use image::{Image, ImageError};
pub use memory::{AddressSpace, DataMemory, MemoryError, ProgramMemory};
