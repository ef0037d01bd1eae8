//! Packing and unpacking of single instruction words.
//!
//! Layout, most significant bit first:
//!
//! ```text
//! | opcode:4 | mode_a:2 | mode_b:2 | field_a:12 | field_b:12 |
//! ```

use std::fmt;

use crate::error::EncodingError;

/// Raw contents of a single core cell.
pub type Word = u32;

/// Fields are 12 bits wide, so all field arithmetic wraps at this value.
pub const FIELD_LIMIT: u32 = 1 << 12;

const OPCODE_BITS: u32 = 4;
const MODE_BITS: u32 = 2;
const FIELD_BITS: u32 = 12;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Opcode {
    Dat = 0,
    Mov,
    Add,
    Sub,
    Jmp,
    Jmz,
    Djz,
    Cmp,
}

impl Opcode {
    const ALL: [Opcode; 8] = [
        Opcode::Dat,
        Opcode::Mov,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Jmp,
        Opcode::Jmz,
        Opcode::Djz,
        Opcode::Cmp,
    ];

    pub fn from_code(code: u8) -> Option<Opcode> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn from_mnemonic(mnemonic: &str) -> Option<Opcode> {
        Self::ALL.into_iter().find(|op| op.mnemonic() == mnemonic)
    }

    /// Lowercase source mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Dat => "dat",
            Opcode::Mov => "mov",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Jmp => "jmp",
            Opcode::Jmz => "jmz",
            Opcode::Djz => "djz",
            Opcode::Cmp => "cmp",
        }
    }

    /// `dat` and `jmp` only take a B operand.
    pub fn is_single_operand(self) -> bool {
        matches!(self, Opcode::Dat | Opcode::Jmp)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Operand addressing mode.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    Immediate = 0,
    Relative = 1,
    Indirect = 2,
}

impl Mode {
    pub fn from_code(code: u8) -> Option<Mode> {
        match code {
            0 => Some(Mode::Immediate),
            1 => Some(Mode::Relative),
            2 => Some(Mode::Indirect),
            _ => None,
        }
    }

    /// Prefix used in source text. Relative operands have none.
    pub fn prefix(self) -> &'static str {
        match self {
            Mode::Immediate => "#",
            Mode::Relative => "",
            Mode::Indirect => "@",
        }
    }
}

/// A decoded word. Holds the raw bit fields, so it may describe an invalid instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Instruction {
    pub opcode: u8,
    pub mode_a: u8,
    pub mode_b: u8,
    pub field_a: u16,
    pub field_b: u16,
}

impl Instruction {
    pub fn op(&self) -> Option<Opcode> {
        Opcode::from_code(self.opcode)
    }

    pub fn is_valid(&self) -> bool {
        is_valid(self)
    }
}

/// Pack the fields of an instruction into a word.
///
/// Fails if any field does not fit in its bit width.
pub fn encode(opcode: u8, mode_a: u8, field_a: u16, mode_b: u8, field_b: u16) -> Result<Word, EncodingError> {
    check_width("opcode", opcode as u32, 3)?;
    check_width("mode_a", mode_a as u32, MODE_BITS)?;
    check_width("mode_b", mode_b as u32, MODE_BITS)?;
    check_width("field_a", field_a as u32, FIELD_BITS)?;
    check_width("field_b", field_b as u32, FIELD_BITS)?;

    Ok((opcode as Word) << (32 - OPCODE_BITS)
        | (mode_a as Word) << 26
        | (mode_b as Word) << 24
        | (field_a as Word) << 12
        | field_b as Word)
}

/// Never fails; validity is checked separately with [`is_valid`].
pub fn decode(word: Word) -> Instruction {
    Instruction {
        opcode: ((word >> 28) & 0xF) as u8,
        mode_a: ((word >> 26) & 0x3) as u8,
        mode_b: ((word >> 24) & 0x3) as u8,
        field_a: ((word >> 12) & 0xFFF) as u16,
        field_b: (word & 0xFFF) as u16,
    }
}

pub fn is_valid(instr: &Instruction) -> bool {
    instr.opcode <= 7 && instr.mode_a <= 2 && instr.mode_b <= 2
}

fn check_width(field: &'static str, value: u32, bits: u32) -> Result<(), EncodingError> {
    if value >> bits != 0 {
        return Err(EncodingError { field, value, bits });
    }
    Ok(())
}
