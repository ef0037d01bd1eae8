use std::fmt;

use crate::error::{OperandPart, OperandSide, Violation, ViolationKind};
use crate::loader::Layout;
use crate::memory::{Core, Ip, Resolved};
use crate::word::{self, Instruction, Opcode, Word, FIELD_LIMIT};

/// One of the two warriors sharing the core.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ProgramId {
    A,
    B,
}

impl ProgramId {
    pub fn other(self) -> ProgramId {
        match self {
            ProgramId::A => ProgramId::B,
            ProgramId::B => ProgramId::A,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramId::A => f.write_str("A"),
            ProgramId::B => f.write_str("B"),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum State {
    Running,
    Ended { winner: ProgramId },
}

/// Outcome of a single call to [`Engine::update`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TickResult {
    /// The instruction at `address` ran to completion.
    Executed { program: ProgramId, address: usize },
    /// This tick ended the battle.
    Violated(Violation),
    /// Battle was already over, nothing happened.
    Halted { winner: ProgramId },
}

/// Instruction executed on the most recent tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LastExecuted {
    pub program: ProgramId,
    pub address: usize,
    pub instruction: Instruction,
}

/// Both operands of the current instruction, resolved against the core before dispatch.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ResolvedOperands {
    pub a: Resolved,
    pub b: Resolved,
}

impl ResolvedOperands {
    pub fn resolve(core: &Core, instr: &Instruction, ip: Ip) -> Self {
        ResolvedOperands {
            a: core.resolve(instr, OperandSide::A, ip),
            b: core.resolve(instr, OperandSide::B, ip),
        }
    }

    fn side(&self, side: OperandSide) -> &Resolved {
        match side {
            OperandSide::A => &self.a,
            OperandSide::B => &self.b,
        }
    }

    fn value(&self, side: OperandSide) -> Result<Word, ViolationKind> {
        self.side(side).value.ok_or(ViolationKind::MissingOperand {
            operand: side,
            part: OperandPart::Value,
        })
    }

    fn address(&self, side: OperandSide) -> Result<usize, ViolationKind> {
        self.side(side).address.ok_or(ViolationKind::MissingOperand {
            operand: side,
            part: OperandPart::Address,
        })
    }
}

/// How the active IP moves after an instruction completes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Flow {
    Next,
    /// Skip the following instruction
    Skip,
    Jump(usize),
}

/// Turn based executor for two warriors sharing one core.
pub struct Engine {
    core: Core,
    ips: [Ip; 2],
    active: ProgramId,
    state: State,
    last: Option<LastExecuted>,
    violation: Option<Violation>,
    ticks: u64,
    layout: Option<Layout>,
}

impl Engine {
    /// Start a battle on an already populated core. Warrior A moves first.
    pub fn new(core: Core, ip_a: usize, ip_b: usize) -> Self {
        let len = core.len();
        Engine {
            core,
            ips: [Ip::new(ip_a, len), Ip::new(ip_b, len)],
            active: ProgramId::A,
            state: State::Running,
            last: None,
            violation: None,
            ticks: 0,
            layout: None,
        }
    }

    pub(crate) fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Execute one instruction of the active warrior, then hand the turn over.
    pub fn update(&mut self) -> TickResult {
        if let State::Ended { winner } = self.state {
            return TickResult::Halted { winner };
        }

        let program = self.active;
        let ip = self.ips[program.index()];
        let address = ip.get();
        let word = self.core.read(address);
        let instruction = word::decode(word);
        let operands = ResolvedOperands::resolve(&self.core, &instruction, ip);

        self.last = Some(LastExecuted {
            program,
            address,
            instruction,
        });
        self.ticks += 1;

        let flow = match instruction.op() {
            Some(op) => execute(op, &operands, &mut self.core),
            None => Err(ViolationKind::UnknownOpcode {
                opcode: instruction.opcode,
            }),
        };

        match flow {
            Ok(flow) => {
                let ip = &mut self.ips[program.index()];
                match flow {
                    Flow::Next => ip.incr(1),
                    Flow::Skip => ip.incr(2),
                    Flow::Jump(addr) => ip.set(addr),
                }
                self.active = program.other();
                TickResult::Executed { program, address }
            }
            Err(kind) => {
                let violation = Violation {
                    program,
                    address,
                    word,
                    kind,
                };
                self.violation = Some(violation);
                self.state = State::Ended {
                    winner: program.other(),
                };
                TickResult::Violated(violation)
            }
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_ended(&self) -> bool {
        matches!(self.state, State::Ended { .. })
    }

    pub fn winner(&self) -> Option<ProgramId> {
        match self.state {
            State::Ended { winner } => Some(winner),
            State::Running => None,
        }
    }

    pub fn violation(&self) -> Option<Violation> {
        self.violation
    }

    /// Warrior whose instruction runs on the next tick.
    pub fn active(&self) -> ProgramId {
        self.active
    }

    pub fn ip(&self, program: ProgramId) -> usize {
        self.ips[program.index()].get()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn last_executed(&self) -> Option<LastExecuted> {
        self.last
    }

    pub fn layout(&self) -> Option<Layout> {
        self.layout
    }

    pub fn core(&self) -> &Core {
        &self.core
    }

    /// Install a hook that sees every address written during execution.
    pub fn set_write_hook(&mut self, hook: impl FnMut(usize) + 'static) {
        self.core.set_write_hook(hook);
    }
}

/// Run one opcode against the core. Nothing is written unless every operand it needs resolved.
fn execute(op: Opcode, operands: &ResolvedOperands, core: &mut Core) -> Result<Flow, ViolationKind> {
    use OperandSide::{A, B};
    let limit = FIELD_LIMIT as u64;

    match op {
        // Data is never executable
        Opcode::Dat => Err(ViolationKind::ExecutedData),
        Opcode::Mov => {
            let a = operands.value(A)?;
            let addr = operands.address(B)?;
            core.write(addr, a);
            Ok(Flow::Next)
        }
        Opcode::Add => {
            let a = operands.value(A)?;
            let b = operands.value(B)?;
            let addr = operands.address(B)?;
            core.write(addr, ((a as u64 + b as u64) % limit) as Word);
            Ok(Flow::Next)
        }
        Opcode::Sub => {
            let a = operands.value(A)?;
            let b = operands.value(B)?;
            let addr = operands.address(B)?;
            // b - a through the additive complement of a
            let complement = limit as i64 - a as i64;
            let diff = (b as i64 + complement).rem_euclid(limit as i64);
            core.write(addr, diff as Word);
            Ok(Flow::Next)
        }
        Opcode::Jmp => Ok(Flow::Jump(operands.address(B)?)),
        Opcode::Jmz => {
            let a = operands.value(A)?;
            let addr = operands.address(B)?;
            Ok(if a == 0 { Flow::Jump(addr) } else { Flow::Next })
        }
        Opcode::Djz => {
            let counter = operands.address(A)?;
            let addr = operands.address(B)?;
            let value = ((core.read(counter) as u64 + limit - 1) % limit) as Word;
            core.write(counter, value);
            Ok(if value == 0 { Flow::Jump(addr) } else { Flow::Next })
        }
        Opcode::Cmp => {
            let a = operands.value(A)?;
            let b = operands.value(B)?;
            Ok(if a != b { Flow::Skip } else { Flow::Next })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assemble, word::decode};

    /// Core of `len` cells with warrior A's source at 0 and B's at `len / 2`.
    fn battle(len: usize, a: &str, b: &str) -> Engine {
        let mut core = Core::new(len, 1).unwrap();
        let a = assemble(a).unwrap();
        let b = assemble(b).unwrap();
        core.place(0, a.words());
        core.place(len / 2, b.words());
        Engine::new(core, a.entry() as usize, len / 2 + b.entry() as usize)
    }

    const IMP: &str = "mov 0 1";

    #[test]
    fn imp_copies_itself() {
        let mut engine = battle(64, IMP, IMP);
        assert_eq!(
            engine.update(),
            TickResult::Executed {
                program: ProgramId::A,
                address: 0
            }
        );
        assert_eq!(engine.core().read(1), engine.core().read(0));
        assert_eq!(engine.ip(ProgramId::A), 1);
        assert_eq!(engine.active(), ProgramId::B);

        assert_eq!(
            engine.update(),
            TickResult::Executed {
                program: ProgramId::B,
                address: 32
            }
        );
        assert_eq!(engine.active(), ProgramId::A);
        assert_eq!(engine.ticks(), 2);
    }

    #[test]
    fn cmp_skips_when_different() {
        let mut engine = battle(64, "cmp #1 #2", IMP);
        engine.update();
        assert_eq!(engine.ip(ProgramId::A), 2);

        let mut engine = battle(64, "cmp #1 #1", IMP);
        engine.update();
        assert_eq!(engine.ip(ProgramId::A), 1);
    }

    #[test]
    fn djz_jumps_on_zero() {
        let mut engine = battle(64, "djz 2 5\ndat #0\ndat #1", IMP);
        engine.update();
        assert_eq!(engine.core().read(2), 0);
        assert_eq!(engine.ip(ProgramId::A), 5);

        let mut engine = battle(64, "djz 2 5\ndat #0\ndat #2", IMP);
        engine.update();
        assert_eq!(engine.core().read(2), 1);
        assert_eq!(engine.ip(ProgramId::A), 1);
    }

    #[test]
    fn djz_wraps_below_zero() {
        let mut engine = battle(64, "djz 1 5\ndat #0", IMP);
        engine.update();
        assert_eq!(engine.core().read(1), 4095);
        assert_eq!(engine.ip(ProgramId::A), 1);
    }

    #[test]
    fn arithmetic_wraps_at_field_limit() {
        let mut engine = battle(64, "add #4000 1\ndat #100", IMP);
        engine.update();
        assert_eq!(engine.core().read(1), 4);

        // b - a
        let mut engine = battle(64, "sub #3 1\ndat #1", IMP);
        engine.update();
        assert_eq!(engine.core().read(1), 4094);

        let mut engine = battle(64, "sub #1 1\ndat #3", IMP);
        engine.update();
        assert_eq!(engine.core().read(1), 2);
    }

    #[test]
    fn jmp_and_jmz() {
        let mut engine = battle(64, "jmp -1", IMP);
        engine.update();
        assert_eq!(engine.ip(ProgramId::A), 63);

        let mut engine = battle(64, "jmz #0 4", IMP);
        engine.update();
        assert_eq!(engine.ip(ProgramId::A), 4);

        let mut engine = battle(64, "jmz #1 4", IMP);
        engine.update();
        assert_eq!(engine.ip(ProgramId::A), 1);
    }

    #[test]
    fn indirect_bombing() {
        // dwarf: drops a zero every fourth cell
        use std::{cell::RefCell, rc::Rc};

        let writes = Rc::new(RefCell::new(Vec::new()));
        let mut engine = battle(64, "dat 0\nLOAD\nadd #4 -1\nmov #0 @-2\njmp -2", "jmp 0");
        let sink = Rc::clone(&writes);
        engine.set_write_hook(move |addr| sink.borrow_mut().push(addr));
        assert_eq!(engine.ip(ProgramId::A), 1);
        engine.update();
        engine.update();
        assert_eq!(decode(engine.core().read(0)).field_b, 4);
        engine.update();
        engine.update();
        assert_eq!(*writes.borrow(), vec![0, 4]);
        assert_eq!(engine.core().read(4), 0);
        // Back at the add
        assert_eq!(engine.ip(ProgramId::A), 3);
        engine.update();
        engine.update();
        assert_eq!(engine.ip(ProgramId::A), 1);
    }

    #[test]
    fn dat_loses_immediately() {
        let mut engine = battle(64, "dat #0", IMP);
        let result = engine.update();
        let TickResult::Violated(violation) = result else {
            panic!("expected a violation, got {result:?}");
        };
        assert_eq!(violation.program, ProgramId::A);
        assert_eq!(violation.kind, ViolationKind::ExecutedData);
        assert_eq!(engine.winner(), Some(ProgramId::B));
        assert!(engine.is_ended());

        // Terminal, no more mutation
        let before = engine.core().words().to_vec();
        assert_eq!(
            engine.update(),
            TickResult::Halted {
                winner: ProgramId::B
            }
        );
        assert_eq!(engine.core().words(), before.as_slice());
        assert_eq!(engine.ticks(), 1);
    }

    #[test]
    fn b_can_lose_too() {
        let mut engine = battle(64, IMP, "dat #0");
        engine.update();
        assert!(matches!(engine.update(), TickResult::Violated(_)));
        assert_eq!(engine.winner(), Some(ProgramId::A));
    }

    #[test]
    fn missing_operands_violate_without_writing() {
        // Immediate destination has no address
        let mut engine = battle(64, "mov #1 #2", IMP);
        let before = engine.core().words().to_vec();
        let TickResult::Violated(violation) = engine.update() else {
            panic!("expected a violation");
        };
        assert_eq!(
            violation.kind,
            ViolationKind::MissingOperand {
                operand: OperandSide::B,
                part: OperandPart::Address
            }
        );
        assert_eq!(engine.core().words(), before.as_slice());

        let mut engine = battle(64, "djz #1 1", IMP);
        assert!(matches!(engine.update(), TickResult::Violated(_)));
    }

    #[test]
    fn invalid_words_violate() {
        let mut core = Core::new(16, 1).unwrap();
        // opcode 9
        core.place(0, &[0x9000_0000]);
        // mov with mode_a = 3
        core.place(8, &[0x1D00_0001]);
        let mut engine = Engine::new(core, 0, 8);
        assert!(matches!(
            engine.update(),
            TickResult::Violated(Violation {
                kind: ViolationKind::UnknownOpcode { opcode: 9 },
                ..
            })
        ));

        let mut core = Core::new(16, 1).unwrap();
        core.place(0, &[0x1D00_0001]);
        let mut engine = Engine::new(core, 0, 8);
        assert!(matches!(
            engine.update(),
            TickResult::Violated(Violation {
                kind: ViolationKind::MissingOperand {
                    operand: OperandSide::A,
                    part: OperandPart::Value
                },
                ..
            })
        ));
    }

    #[test]
    fn write_hook_counts_execution_writes() {
        use std::{cell::RefCell, rc::Rc};

        let writes = Rc::new(RefCell::new(Vec::new()));
        let mut engine = battle(64, IMP, "jmp 0");
        let sink = Rc::clone(&writes);
        engine.set_write_hook(move |addr| sink.borrow_mut().push(addr));
        for _ in 0..6 {
            engine.update();
        }
        assert_eq!(*writes.borrow(), vec![1, 2, 3]);
    }
}
