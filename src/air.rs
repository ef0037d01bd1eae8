use crate::error::{AsmError, AsmErrorKind};
use crate::loader::Warrior;
use crate::span::Span;
use crate::word::{self, Mode, Opcode, Word};

/// Assembly intermediate representation, contains entry offset and list of instructions
#[derive(Debug, Default)]
pub struct Air {
    /// Instruction index to start execution at, set by `LOAD`
    entry: Option<usize>,
    ast: Vec<AsmLine>,
}

impl Air {
    pub fn new() -> Self {
        Air::default()
    }

    /// Mark the next instruction as the entry point. The last call wins.
    pub fn set_entry_here(&mut self) {
        self.entry = Some(self.ast.len());
    }

    pub fn entry(&self) -> usize {
        self.entry.unwrap_or(0)
    }

    pub fn add_stmt(&mut self, stmt: AsmLine) {
        self.ast.push(stmt)
    }

    pub fn get(&self, idx: usize) -> &AsmLine {
        &self.ast[idx]
    }

    pub fn len(&self) -> usize {
        self.ast.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ast.is_empty()
    }

    /// Encode every statement. Either all of them encode or nothing is produced.
    pub fn emit(&self) -> Result<Warrior, AsmError> {
        let words = self
            .ast
            .iter()
            .map(AsmLine::emit)
            .collect::<Result<Vec<Word>, AsmError>>()?;
        Ok(Warrior::new(self.entry() as Word, words))
    }
}

/// Single statement along with where it came from.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AsmLine {
    pub line: usize,
    pub span: Span,
    pub stmt: AirStmt,
}

impl AsmLine {
    pub fn emit(&self) -> Result<Word, AsmError> {
        self.stmt
            .emit()
            .map_err(|e| AsmError::new(self.line, self.span, AsmErrorKind::Encoding(e)))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AirStmt {
    pub opcode: Opcode,
    pub a: Operand,
    pub b: Operand,
}

impl AirStmt {
    /// Single operand instructions leave operand A zeroed.
    pub fn single(opcode: Opcode, b: Operand) -> Self {
        AirStmt {
            opcode,
            a: Operand::immediate(0),
            b,
        }
    }

    pub fn emit(&self) -> Result<Word, crate::error::EncodingError> {
        word::encode(
            self.opcode as u8,
            self.a.mode as u8,
            self.a.field,
            self.b.mode as u8,
            self.b.field,
        )
    }
}

/// Mode plus the already folded 12-bit field.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Operand {
    pub mode: Mode,
    pub field: u16,
}

impl Operand {
    pub fn new(mode: Mode, field: u16) -> Self {
        Operand { mode, field }
    }

    pub fn immediate(field: u16) -> Self {
        Operand::new(Mode::Immediate, field)
    }

    pub fn relative(field: u16) -> Self {
        Operand::new(Mode::Relative, field)
    }
}
