//! Assembler driver: turns tokenized statements into a program image.
//!
//! Tokenizing source text is left to the caller; this module only sees one
//! mnemonic plus its operand strings per statement.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bits::{BitError, BitWriter, MirrorStyle};
use crate::codec::{CodecError, InstructionCodec};
use crate::decoder::{Instruction, Operand};
use crate::image::{Image, ImageError};
use crate::instructions::by_mnemonic;

/// One source statement, already split into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// 1-based source line, used in diagnostics.
    pub line: usize,
    pub mnemonic: String,
    pub operands: Vec<String>,
}

impl Statement {
    pub fn new(line: usize, mnemonic: &str, operands: &[&str]) -> Self {
        Self {
            line,
            mnemonic: mnemonic.to_string(),
            operands: operands.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mnemonic.is_empty()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum AsmError {
    #[error("line {line}: {source}")]
    Statement {
        line: usize,
        #[source]
        source: CodecError,
    },
    #[error(transparent)]
    Bits(#[from] BitError),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("program of {0} bits is too long for an image header")]
    TooLarge(u64),
}

impl AsmError {
    /// Source line for statement errors.
    pub fn line(&self) -> Option<usize> {
        match self {
            AsmError::Statement { line, .. } => Some(*line),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsmConfig {
    /// Produce the binary text mirror alongside the image.
    pub mirror: Option<MirrorStyle>,
    /// Treat statements that would be skipped as fatal.
    pub strict: bool,
}

/// Output of a successful assembly run.
#[derive(Debug)]
pub struct Assembly {
    pub image: Image,
    pub mirror: Option<String>,
    /// Statements dropped because of a recoverable error, in source order.
    pub skipped: Vec<AsmError>,
    /// Number of statements that were encoded.
    pub statements: usize,
}

/// Classify an operand token: `R<n>` is a register, plain decimal digits an
/// address.
pub fn parse_operand(token: &str) -> Result<Operand, CodecError> {
    let bad = || CodecError::BadOperand(token.to_string());
    let (digits, reg) = match token.strip_prefix('R') {
        Some(rest) => (rest, true),
        None => (token, false),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }
    let value = digits.parse::<u32>().map_err(|_| bad())?;
    Ok(if reg {
        Operand::Reg(value)
    } else {
        Operand::Addr(value)
    })
}

#[derive(Debug, Clone, Default)]
pub struct Assembler {
    codec: InstructionCodec,
    cfg: AsmConfig,
}

impl Assembler {
    pub fn new(cfg: AsmConfig) -> Self {
        Self {
            codec: InstructionCodec::new(),
            cfg,
        }
    }

    /// Look the mnemonic up and build a checked instruction from the operands.
    pub fn resolve(&self, stmt: &Statement) -> Result<Instruction, CodecError> {
        let desc = by_mnemonic(&stmt.mnemonic)
            .ok_or_else(|| CodecError::UnknownMnemonic(stmt.mnemonic.clone()))?;
        if stmt.operands.len() != desc.arity() {
            return Err(CodecError::OperandCount {
                mnemonic: desc.mnemonic,
                expected: desc.arity(),
                got: stmt.operands.len(),
            });
        }
        let operands = stmt
            .operands
            .iter()
            .map(|t| parse_operand(t))
            .collect::<Result<Vec<_>, _>>()?;
        Instruction::new(desc.op, operands)
    }

    /// Encode every statement in order.
    ///
    /// An unknown mnemonic aborts the run. Other statement errors skip the
    /// statement and are collected in [`Assembly::skipped`], unless the
    /// assembler is strict.
    pub fn assemble<'a, I>(&self, statements: I) -> Result<Assembly, AsmError>
    where
        I: IntoIterator<Item = &'a Statement>,
    {
        let mut body = Vec::new();
        let mut writer = match self.cfg.mirror {
            Some(style) => BitWriter::with_mirror(&mut body, style),
            None => BitWriter::new(&mut body),
        };
        let mut skipped = Vec::new();
        let mut encoded = 0usize;

        for stmt in statements {
            if stmt.is_empty() {
                continue;
            }
            let result = self
                .resolve(stmt)
                .and_then(|instr| self.codec.encode(&instr, &mut writer));
            match result {
                Ok(width) => {
                    encoded += 1;
                    debug!(line = stmt.line, mnemonic = %stmt.mnemonic, width, "assembled");
                }
                Err(source) => {
                    let fatal = self.cfg.strict || !recoverable(&source);
                    let err = AsmError::Statement {
                        line: stmt.line,
                        source,
                    };
                    if fatal {
                        return Err(err);
                    }
                    warn!(line = stmt.line, "skipping statement: {err}");
                    skipped.push(err);
                }
            }
        }

        let done = writer.finish()?;
        let bit_len = u32::try_from(done.bits).map_err(|_| AsmError::TooLarge(done.bits))?;
        let image = Image::new(bit_len, body)?;
        debug!(bits = bit_len, statements = encoded, skipped = skipped.len(), "assembly finished");
        Ok(Assembly {
            image,
            mirror: done.mirror,
            skipped,
            statements: encoded,
        })
    }
}

fn recoverable(err: &CodecError) -> bool {
    match err {
        CodecError::OperandCount { .. }
        | CodecError::OperandKind { .. }
        | CodecError::BadOperand(_)
        | CodecError::Bits(BitError::Encoding { .. }) => true,
        CodecError::UnknownMnemonic(_)
        | CodecError::UnknownOpcode(_)
        | CodecError::Bits(_) => false,
    }
}
