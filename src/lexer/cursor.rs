// Heavily inspired and referenced from `rustc_lexer` and adapted to suit the project.
// See https://doc.rust-lang.org/beta/nightly-rustc/src/rustc_lexer/cursor.rs.html

use std::str::Chars;

/// Peekable iterator over a char sequence.
#[derive(Clone)]
pub struct Cursor<'a> {
    len_remaining: usize,
    /// Byte offset of the start of the current token
    token_start: usize,
    /// Iterator over chars in a &str
    chars: Chars<'a>,
    src_len: usize,
}

pub(crate) const EOF_CHAR: char = '\0';

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str) -> Cursor<'a> {
        Cursor {
            len_remaining: input.len(),
            token_start: 0,
            chars: input.chars(),
            src_len: input.len(),
        }
    }

    /// Peek the next char without consuming it. Returns [`EOF_CHAR`] at the end of input.
    pub fn first(&self) -> char {
        self.chars.clone().next().unwrap_or(EOF_CHAR)
    }

    /// File is finished lexing
    pub fn is_eof(&self) -> bool {
        self.chars.as_str().is_empty()
    }

    /// Advance by one character
    pub fn bump(&mut self) -> Option<char> {
        self.chars.next()
    }

    /// Eat characters while the predicate holds.
    pub fn take_while(&mut self, mut predicate: impl FnMut(char) -> bool) {
        while predicate(self.first()) && !self.is_eof() {
            self.bump();
        }
    }

    /// Bytes consumed since the last call to [`Cursor::reset_pos`].
    pub fn pos_in_token(&self) -> usize {
        self.len_remaining - self.chars.as_str().len()
    }

    /// Byte offset of the current token from the start of the source.
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    pub fn reset_pos(&mut self) {
        self.len_remaining = self.chars.as_str().len();
        self.token_start = self.src_len - self.len_remaining;
    }
}
