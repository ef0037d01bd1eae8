//! Read-only view of a running battle, for renderers.

use std::{cell::RefCell, fmt, rc::Rc};

use crate::error::Violation;
use crate::loader::Layout;
use crate::runtime::{Engine, ProgramId};
use crate::word::{self, Instruction, Mode, Word, FIELD_LIMIT};

/// Fields this close to the top of the field range are shown as negative.
const NEGATIVE_WINDOW: i32 = 128;

const MNEMONICS: [&str; 8] = ["DAT", "MOV", "ADD", "SUB", "JMP", "JMZ", "DJZ", "CMP"];

pub struct Observer<'a> {
    engine: &'a Engine,
}

impl Engine {
    pub fn observer(&self) -> Observer<'_> {
        Observer { engine: self }
    }
}

impl<'a> Observer<'a> {
    pub fn memory(&self) -> &'a [Word] {
        self.engine.core().words()
    }

    pub fn memory_snapshot(&self) -> Vec<Word> {
        self.memory().to_vec()
    }

    pub fn width(&self) -> usize {
        self.engine.core().width()
    }

    pub fn height(&self) -> usize {
        self.engine.core().height()
    }

    /// Warrior to move next, and where it will execute.
    pub fn active_ip(&self) -> (ProgramId, usize) {
        let active = self.engine.active();
        (active, self.engine.ip(active))
    }

    pub fn ip(&self, program: ProgramId) -> usize {
        self.engine.ip(program)
    }

    pub fn is_ended(&self) -> bool {
        self.engine.is_ended()
    }

    pub fn winner(&self) -> Option<ProgramId> {
        self.engine.winner()
    }

    pub fn violation(&self) -> Option<Violation> {
        self.engine.violation()
    }

    pub fn ticks(&self) -> u64 {
        self.engine.ticks()
    }

    pub fn layout(&self) -> Option<Layout> {
        self.engine.layout()
    }

    /// Instruction run on the most recent tick, `None` before the first one.
    pub fn last_decoded_instruction(&self) -> Option<Disassembly> {
        self.engine
            .last_executed()
            .map(|last| Disassembly::from(last.instruction))
    }

    /// Addresses past the end wrap around the core.
    pub fn disassemble(&self, addr: usize) -> Disassembly {
        let memory = self.memory();
        Disassembly::from(word::decode(memory[addr % memory.len()]))
    }
}

/// Human readable form of one instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Disassembly {
    /// Uppercase mnemonic, `???` for unknown opcodes
    pub mnemonic: &'static str,
    pub a: DisplayOperand,
    pub b: DisplayOperand,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DisplayOperand {
    pub mode: u8,
    /// Field value, re-biased towards negative near the top of the range
    pub field: i32,
}

impl DisplayOperand {
    fn new(mode: u8, field: u16) -> Self {
        let mut field = field as i32;
        if field - FIELD_LIMIT as i32 > -NEGATIVE_WINDOW {
            field -= FIELD_LIMIT as i32;
        }
        DisplayOperand { mode, field }
    }

    fn prefix(&self) -> &'static str {
        Mode::from_code(self.mode).map_or("?", Mode::prefix)
    }
}

impl From<Instruction> for Disassembly {
    fn from(instr: Instruction) -> Self {
        Disassembly {
            mnemonic: MNEMONICS.get(instr.opcode as usize).copied().unwrap_or("???"),
            a: DisplayOperand::new(instr.mode_a, instr.field_a),
            b: DisplayOperand::new(instr.mode_b, instr.field_b),
        }
    }
}

impl fmt::Display for DisplayOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix(), self.field)
    }
}

impl fmt::Display for Disassembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.mnemonic, self.a, self.b)
    }
}

/// Write hook target counting how often each cell was written during a battle.
#[derive(Clone, Debug)]
pub struct WriteCounts {
    counts: Rc<RefCell<Vec<u32>>>,
}

impl WriteCounts {
    pub fn new(len: usize) -> Self {
        WriteCounts {
            counts: Rc::new(RefCell::new(vec![0; len])),
        }
    }

    /// Attach to `engine`. Clones of `self` keep seeing the counts.
    pub fn attach(&self, engine: &mut Engine) {
        let counts = Rc::clone(&self.counts);
        engine.set_write_hook(move |addr| {
            if let Some(count) = counts.borrow_mut().get_mut(addr) {
                *count = count.saturating_add(1);
            }
        });
    }

    pub fn get(&self, addr: usize) -> u32 {
        self.counts.borrow().get(addr).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> Vec<u32> {
        self.counts.borrow().clone()
    }
}
