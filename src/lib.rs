// Assembling
mod air;
pub use air::{Air, AirStmt, AsmLine, Operand};
mod lexer;
mod parser;
pub use parser::AsmParser;
mod span;
pub use span::Span;
pub mod word;

// Running
pub mod loader;
pub use loader::{Loader, Warrior};
pub mod memory;
pub mod observer;
pub use observer::{Disassembly, Observer, WriteCounts};
pub mod runtime;
pub use runtime::{Engine, ProgramId, State, TickResult};

pub mod error;
pub use error::{AsmError, AsmErrorKind, EncodingError, LoadError, Violation, ViolationKind};

pub mod env;
#[macro_use]
pub mod output;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 4;

/// Assemble source text into a warrior, failing on the first error.
pub fn assemble(src: &str) -> Result<Warrior, AsmError> {
    AsmParser::new(src).parse()?.emit()
}
