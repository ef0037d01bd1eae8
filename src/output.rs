use std::cell::RefCell;
use std::fmt::Write as _;
use std::path::Path;
use std::str::Chars;

use colored::{Color, Colorize};

use crate::loader::Layout;
use crate::observer::{Observer, WriteCounts};
use crate::runtime::ProgramId;
use crate::word::decode;

/// Print a status line, e.g. `  Assembling target imp.red`.
#[macro_export]
macro_rules! status {
    ( $color:ident, $left:expr, $($arg:tt)* ) => {{
        $crate::output::Output::status(
            $crate::output::MsgColor::$color,
            $left,
            &format!($($arg)*),
        );
    }};
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MsgColor {
    Green,
    Cyan,
    Red,
}

impl From<MsgColor> for Color {
    fn from(value: MsgColor) -> Self {
        match value {
            MsgColor::Green => Color::Green,
            MsgColor::Cyan => Color::Cyan,
            MsgColor::Red => Color::Red,
        }
    }
}

pub struct Output;

impl Output {
    thread_local! {
        static IS_MINIMAL: RefCell<bool> = const { RefCell::new(false) };
    }

    pub fn set_minimal(new_value: bool) -> bool {
        Self::IS_MINIMAL.with(|value| value.replace(new_value))
    }

    pub fn is_minimal() -> bool {
        Self::IS_MINIMAL.with(|value| *value.borrow())
    }

    /// Right aligned coloured label followed by a message. Colourless if `--minimal`.
    pub fn status(color: MsgColor, left: &str, right: &str) {
        if Self::is_minimal() {
            println!("{left} {right}");
        } else {
            println!("{:>12} {right}", left.color(color).bold());
        }
    }

    pub fn file_status(color: MsgColor, left: &str, path: &Path) {
        Self::status(color, left, &format!("target {}", path.display()));
    }

    /// One trace line on stderr, e.g. `A 0x01f MOV 0 1`.
    pub fn trace(observer: &Observer<'_>, program: ProgramId, address: usize) {
        let Some(dis) = observer.last_decoded_instruction() else {
            return;
        };
        let line = format!("{} 0x{:03x} {}", program, address, dis);
        if Self::is_minimal() {
            eprintln!("{line}");
        } else {
            eprintln!("{}", line.color(program_color(program)));
        }
    }

    /// Core as a `width` x `height` grid. Cells show the warrior that was loaded there,
    /// `+` for cells written during the battle, `.` for untouched empty cells and `@` for IPs.
    pub fn core_map(observer: &Observer<'_>, writes: &WriteCounts) -> String {
        let len = observer.memory().len();
        let layout = observer.layout();
        let ips = [observer.ip(ProgramId::A), observer.ip(ProgramId::B)];
        let mut out = String::with_capacity(len * 2);

        for row in 0..observer.height() {
            for col in 0..observer.width() {
                let addr = row * observer.width() + col;
                let cell = map_cell(observer, layout, writes, ips, addr);
                if Self::is_minimal() {
                    out.push_str(&cell.0.to_string());
                } else {
                    let _ = write!(out, "{}", cell.0.to_string().color(cell.1));
                }
            }
            out.push('\n');
        }
        out
    }
}

fn program_color(program: ProgramId) -> Color {
    match program {
        ProgramId::A => Color::TrueColor {
            r: 0xb3,
            g: 0x6b,
            b: 0x30,
        },
        ProgramId::B => Color::TrueColor {
            r: 0x2e,
            g: 0x6a,
            b: 0xb3,
        },
    }
}

fn map_cell(
    observer: &Observer<'_>,
    layout: Option<Layout>,
    writes: &WriteCounts,
    ips: [usize; 2],
    addr: usize,
) -> (char, Color) {
    let len = observer.memory().len();
    if let Some(i) = ips.iter().position(|&ip| ip == addr) {
        let program = if i == 0 { ProgramId::A } else { ProgramId::B };
        return ('@', program_color(program));
    }
    // Alternate colour on every write
    match writes.get(addr) {
        0 => (),
        n if n % 2 == 1 => return ('+', Color::Magenta),
        _ => return ('+', Color::Yellow),
    }
    match layout.and_then(|l| l.owner(addr, len)) {
        Some(program) => (
            char::from(b'0' + decode(observer.memory()[addr]).opcode.min(9)),
            program_color(program),
        ),
        None => ('.', Color::BrightBlack),
    }
}

/// Iterator over the chars of a string with ANSI escape sequences removed.
pub struct Decolored<'a> {
    chars: Chars<'a>,
}

impl<'a> Decolored<'a> {
    pub fn new(string: &'a str) -> Self {
        Self {
            chars: string.chars(),
        }
    }
}

impl<'a> Iterator for Decolored<'a> {
    type Item = char;
    fn next(&mut self) -> Option<Self::Item> {
        while let Some(ch) = self.chars.next() {
            // Skip everything between '\x1b' and 'm' (inclusive)
            if ch == '\x1b' {
                while self.chars.next().is_some_and(|ch| ch != 'm') {}
                continue;
            }
            return Some(ch);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assemble, loader::Loader};

    #[test]
    fn decolored() {
        assert_eq!(Decolored::new("abcdef").collect::<String>(), "abcdef");
        assert_eq!(
            Decolored::new("abc\x1b[0;2mdef\x1b[0m").collect::<String>(),
            "abcdef"
        );
        assert_eq!(Decolored::new("abc\x1b[0xyz").collect::<String>(), "abc");
    }

    #[test]
    fn map_shape() {
        let mut engine = Loader::seeded(8, 4, 1)
            .load(
                &assemble("mov #5 0\njmp -1").unwrap(),
                &assemble("jmp 0").unwrap(),
            )
            .unwrap();
        let writes = WriteCounts::new(engine.core().len());
        writes.attach(&mut engine);
        engine.update();

        let map = Output::core_map(&engine.observer(), &writes);
        let plain: String = Decolored::new(&map).collect();
        let rows: Vec<&str> = plain.lines().collect();
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|row| row.chars().count() == 8));
        // A overwrote its first cell and now sits on its jmp, B sits on its own jmp
        assert_eq!(plain.matches('@').count(), 2);
        assert_eq!(plain.matches('+').count(), 1);
        assert_eq!(plain.matches('.').count(), 29);
    }
}
