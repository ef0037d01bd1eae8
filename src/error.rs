use std::{error::Error, fmt};

use miette::{miette, LabeledSpan, NamedSource, Report, Severity};

use crate::runtime::ProgramId;
use crate::span::Span;
use crate::word::Word;

/// A field did not fit into its bit width.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct EncodingError {
    pub field: &'static str,
    pub value: u32,
    pub bits: u32,
}

impl Error for EncodingError {}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "value {} does not fit in the {}-bit `{}` field",
            self.value, self.bits, self.field
        )
    }
}

// Assembler errors

/// Error assembling a source file. Assembly stops at the first one.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AsmError {
    /// 1-based source line
    pub line: usize,
    pub span: Span,
    pub kind: AsmErrorKind,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum AsmErrorKind {
    Encoding(EncodingError),
    /// Literal outside of `(-4096, 4096)`
    Range { literal: String },
    UnknownOpcode { mnemonic: String },
    InvalidLiteral { text: String },
    MissingOperand {
        mnemonic: &'static str,
        expected: u8,
        found: u8,
    },
}

impl AsmError {
    pub fn new(line: usize, span: Span, kind: AsmErrorKind) -> Self {
        AsmError { line, span, kind }
    }

    /// Render as a diagnostic pointing into `src`.
    pub fn report(&self, name: &str, src: &str) -> Report {
        let (code, help, label) = match &self.kind {
            AsmErrorKind::Encoding(_) => (
                "asm::encoding",
                "fields are 12 bits wide and opcodes range from 0 to 7".to_string(),
                "does not fit",
            ),
            AsmErrorKind::Range { .. } => (
                "asm::range",
                "literals must lie strictly between -4096 and 4096".to_string(),
                "out-of-range literal",
            ),
            AsmErrorKind::UnknownOpcode { .. } => (
                "asm::unknown_opcode",
                "valid opcodes are dat, mov, add, sub, jmp, jmz, djz and cmp".to_string(),
                "unknown opcode",
            ),
            AsmErrorKind::InvalidLiteral { .. } => (
                "asm::bad_lit",
                "operands are a decimal integer with an optional # or @ prefix".to_string(),
                "incorrect literal",
            ),
            AsmErrorKind::MissingOperand { expected, .. } => (
                "asm::missing_operand",
                format!("this instruction expects {expected} operand(s)"),
                "incomplete instruction",
            ),
        };
        miette!(
            severity = Severity::Error,
            code = code,
            help = help,
            labels = vec![LabeledSpan::at(self.span, label)],
            "{}",
            self
        )
        .with_source_code(NamedSource::new(name, src.to_string()))
    }
}

impl Error for AsmError {}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error on line {}: ", self.line)?;
        match &self.kind {
            AsmErrorKind::Encoding(e) => write!(f, "{}", e),
            AsmErrorKind::Range { literal } => write!(f, "literal {} is out of range", literal),
            AsmErrorKind::UnknownOpcode { mnemonic } => {
                write!(f, "unknown opcode `{}`", mnemonic)
            }
            AsmErrorKind::InvalidLiteral { text } => write!(f, "invalid literal `{}`", text),
            AsmErrorKind::MissingOperand {
                mnemonic,
                expected,
                found,
            } => write!(
                f,
                "`{}` expects {} operand(s), found {}",
                mnemonic, expected, found
            ),
        }
    }
}

// Loader errors

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LoadError {
    /// Both programs together do not leave room to spare in the core.
    Capacity { required: usize, available: usize },
    /// A word whose opcode is outside the instruction set.
    InvalidInstruction {
        program: ProgramId,
        index: usize,
        word: Word,
    },
    /// Serialized warrior without its leading entry offset.
    MissingHeader { program: ProgramId },
    InvalidGeometry { width: usize, height: usize },
}

impl LoadError {
    pub fn report(&self) -> Report {
        let (code, help) = match self {
            Self::Capacity { .. } => (
                "load::capacity",
                "use a larger core or shorter warriors",
            ),
            Self::InvalidInstruction { .. } => (
                "load::invalid_instruction",
                "the binary may be corrupt; try reassembling it from source",
            ),
            Self::MissingHeader { .. } => (
                "load::missing_header",
                "serialized warriors start with their entry offset",
            ),
            Self::InvalidGeometry { .. } => (
                "load::geometry",
                "core width and height must both be positive",
            ),
        };
        miette!(severity = Severity::Error, code = code, help = help, "{}", self)
    }
}

impl Error for LoadError {}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capacity {
                required,
                available,
            } => write!(
                f,
                "Programs loaded exceed maximum core memory ({} words for a core of {})",
                required, available
            ),
            Self::InvalidInstruction {
                program,
                index,
                word,
            } => write!(
                f,
                "Loaded bad instruction 0x{:08x} at offset {} of warrior {}",
                word, index, program
            ),
            Self::MissingHeader { program } => {
                write!(f, "Warrior {} has no entry offset", program)
            }
            Self::InvalidGeometry { width, height } => {
                write!(f, "Invalid core geometry {}x{}", width, height)
            }
        }
    }
}

// Execution violations

/// A warrior executed something it could not complete. Ends the battle.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Violation {
    pub program: ProgramId,
    /// Address of the offending instruction
    pub address: usize,
    pub word: Word,
    pub kind: ViolationKind,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ViolationKind {
    ExecutedData,
    UnknownOpcode { opcode: u8 },
    MissingOperand { operand: OperandSide, part: OperandPart },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OperandSide {
    A,
    B,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OperandPart {
    Value,
    Address,
}

impl Error for Violation {}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "warrior {} violated at 0x{:03x} (0x{:08x}): ",
            self.program, self.address, self.word
        )?;
        match self.kind {
            ViolationKind::ExecutedData => write!(f, "executed data"),
            ViolationKind::UnknownOpcode { opcode } => write!(f, "unknown opcode {}", opcode),
            ViolationKind::MissingOperand { operand, part } => {
                let part = match part {
                    OperandPart::Value => "value",
                    OperandPart::Address => "address",
                };
                write!(f, "operand {:?} has no {}", operand, part)
            }
        }
    }
}
