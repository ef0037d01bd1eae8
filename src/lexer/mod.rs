use crate::lexer::cursor::Cursor;
use crate::span::Span;

pub mod cursor;

/// Token carrying its kind and location in the source.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TokenKind {
    /// Mnemonic, directive or operand; anything up to whitespace or `;`
    Word,
    Comment,
    Whitespace,
    Newline,
    Eof,
}

/// Lex the whole source, ending with a single [`TokenKind::Eof`].
pub fn tokenize(input: &str) -> impl Iterator<Item = Token> + '_ {
    let mut cursor = Cursor::new(input);
    let mut done = false;
    std::iter::from_fn(move || {
        if done {
            return None;
        }
        let token = cursor.advance_token();
        done = token.kind == TokenKind::Eof;
        Some(token)
    })
}

/// Test if a character separates tokens within a line.
pub(crate) fn is_whitespace(c: char) -> bool {
    c != '\n' && c.is_whitespace()
}

impl Cursor<'_> {
    pub fn advance_token(&mut self) -> Token {
        let start = self.token_start();
        let first_char = match self.bump() {
            Some(c) => c,
            None => {
                return Token {
                    kind: TokenKind::Eof,
                    span: Span::new(start, 0),
                }
            }
        };
        let kind = match first_char {
            '\n' => TokenKind::Newline,
            ';' => {
                self.take_while(|c| c != '\n');
                TokenKind::Comment
            }
            c if is_whitespace(c) => {
                self.take_while(is_whitespace);
                TokenKind::Whitespace
            }
            _ => {
                self.take_while(|c| !c.is_whitespace() && c != ';');
                TokenKind::Word
            }
        };
        let token = Token {
            kind,
            span: Span::new(start, self.pos_in_token()),
        };
        self.reset_pos();
        token
    }
}
