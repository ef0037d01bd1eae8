use std::num::IntErrorKind;

use crate::{
    air::{Air, AirStmt, AsmLine, Operand},
    error::{AsmError, AsmErrorKind},
    lexer::{tokenize, Token, TokenKind},
    span::Span,
    word::{Mode, Opcode, FIELD_LIMIT},
};

/// Directive marking the entry offset. Emits no word.
const LOAD_DIRECTIVE: &str = "LOAD";

/// Transforms assembler source into AIR, one line at a time.
pub struct AsmParser<'a> {
    /// Reference to the source file
    src: &'a str,
    /// Assembly intermediate representation
    air: Air,
}

impl<'a> AsmParser<'a> {
    pub fn new(src: &'a str) -> Self {
        AsmParser {
            src,
            air: Air::new(),
        }
    }

    fn get_span(&self, span: Span) -> &'a str {
        &self.src[span.offs()..span.end()]
    }

    /// Create AIR out of the source. Stops at the first error.
    pub fn parse(mut self) -> Result<Air, AsmError> {
        let mut line = 1;
        let mut words: Vec<Token> = Vec::new();
        for tok in tokenize(self.src) {
            match tok.kind {
                TokenKind::Word => words.push(tok),
                TokenKind::Comment | TokenKind::Whitespace => continue,
                TokenKind::Newline | TokenKind::Eof => {
                    if !words.is_empty() {
                        self.parse_line(line, &words)?;
                        words.clear();
                    }
                    line += 1;
                }
            }
        }
        // Consume self to return AIR
        Ok(self.air)
    }

    fn parse_line(&mut self, line: usize, words: &[Token]) -> Result<(), AsmError> {
        let (head, args) = match words.split_first() {
            Some(split) => split,
            None => return Ok(()),
        };
        let line_span = match words.last() {
            Some(last) => Span::new(head.span.offs(), last.span.end() - head.span.offs()),
            None => head.span,
        };
        let mnemonic = self.get_span(head.span);

        if mnemonic == LOAD_DIRECTIVE {
            self.air.set_entry_here();
            return Ok(());
        }

        let Some(opcode) = Opcode::from_mnemonic(mnemonic) else {
            return Err(AsmError::new(
                line,
                head.span,
                AsmErrorKind::UnknownOpcode {
                    mnemonic: mnemonic.to_string(),
                },
            ));
        };

        let expected = if opcode.is_single_operand() { 1 } else { 2 };
        if args.len() < expected {
            return Err(AsmError::new(
                line,
                line_span,
                AsmErrorKind::MissingOperand {
                    mnemonic: opcode.mnemonic(),
                    expected: expected as u8,
                    found: args.len() as u8,
                },
            ));
        }
        // Anything past the expected operands is ignored
        let stmt = if opcode.is_single_operand() {
            AirStmt::single(opcode, self.parse_operand(line, args[0])?)
        } else {
            AirStmt {
                opcode,
                a: self.parse_operand(line, args[0])?,
                b: self.parse_operand(line, args[1])?,
            }
        };
        self.air.add_stmt(AsmLine {
            line,
            span: line_span,
            stmt,
        });
        Ok(())
    }

    /// `#` selects immediate, `@` indirect, no prefix relative.
    fn parse_operand(&self, line: usize, tok: Token) -> Result<Operand, AsmError> {
        let text = self.get_span(tok.span);
        let (mode, digits) = if let Some(rest) = text.strip_prefix('#') {
            (Mode::Immediate, rest)
        } else if let Some(rest) = text.strip_prefix('@') {
            (Mode::Indirect, rest)
        } else {
            (Mode::Relative, text)
        };

        let limit = FIELD_LIMIT as i64;
        let out_of_range = || {
            AsmError::new(
                line,
                tok.span,
                AsmErrorKind::Range {
                    literal: text.to_string(),
                },
            )
        };
        let mut value = match digits.parse::<i64>() {
            Ok(value) => value,
            Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
                return Err(out_of_range())
            }
            Err(_) => {
                return Err(AsmError::new(
                    line,
                    tok.span,
                    AsmErrorKind::InvalidLiteral {
                        text: text.to_string(),
                    },
                ))
            }
        };
        if !(-limit < value && value < limit) {
            return Err(out_of_range());
        }
        while value < 0 {
            value += limit;
        }
        Ok(Operand::new(mode, value as u16))
    }
}
