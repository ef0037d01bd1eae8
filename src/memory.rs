//! Circular core memory and operand address resolution.

use crate::error::{LoadError, OperandSide};
use crate::word::{Instruction, Mode, Word, FIELD_LIMIT};

/// Fold a displacement into the 12-bit field range, then into the core ring.
#[inline]
fn wrap(value: i64, len: usize) -> usize {
    value.rem_euclid(FIELD_LIMIT as i64) as usize % len
}

/// Instruction pointer. Always lies in `[0, len)`. An empty ring counts as a single cell.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Ip {
    addr: usize,
    len: usize,
}

impl Ip {
    pub fn new(addr: usize, len: usize) -> Self {
        let len = len.max(1);
        Ip {
            addr: addr % len,
            len,
        }
    }

    pub fn get(&self) -> usize {
        self.addr
    }

    /// Set directly to an address that was already resolved into the core.
    pub fn set(&mut self, addr: usize) {
        self.addr = addr % self.len;
    }

    pub fn incr(&mut self, delta: i64) {
        self.addr = self.offset(delta);
    }

    /// Address `delta` cells away, without moving.
    pub fn offset(&self, delta: i64) -> usize {
        // Reduce first, `addr + delta` may not fit
        wrap(self.addr as i64 + delta.rem_euclid(FIELD_LIMIT as i64), self.len)
    }
}

/// Operand after resolution. Immediate operands have no address, invalid modes have neither.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Resolved {
    pub value: Option<Word>,
    pub address: Option<usize>,
}

type WriteHook = Box<dyn FnMut(usize)>;

/// Fixed length ring of raw words, laid out as `width * height`.
pub struct Core {
    mem: Vec<Word>,
    width: usize,
    height: usize,
    on_write: Option<WriteHook>,
}

impl Core {
    pub fn new(width: usize, height: usize) -> Result<Core, LoadError> {
        let len = width.checked_mul(height).unwrap_or(0);
        if len == 0 {
            return Err(LoadError::InvalidGeometry { width, height });
        }
        Ok(Core {
            mem: vec![0; len],
            width,
            height,
            on_write: None,
        })
    }

    pub fn len(&self) -> usize {
        self.mem.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mem.is_empty()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn words(&self) -> &[Word] {
        &self.mem
    }

    #[inline]
    pub fn read(&self, addr: usize) -> Word {
        debug_assert!(addr < self.len());
        self.mem[addr]
    }

    /// Store a word and notify the write hook, if any.
    pub fn write(&mut self, addr: usize, word: Word) {
        debug_assert!(addr < self.len());
        self.mem[addr] = word;
        if let Some(hook) = self.on_write.as_mut() {
            hook(addr);
        }
    }

    /// Copy `words` in starting at `base`, wrapping around the end.
    /// Not reported to the write hook.
    pub fn place(&mut self, base: usize, words: &[Word]) {
        let len = self.len();
        for (i, &word) in words.iter().enumerate() {
            self.mem[(base + i) % len] = word;
        }
    }

    /// Called with the address of every write made while executing.
    pub fn set_write_hook(&mut self, hook: impl FnMut(usize) + 'static) {
        self.on_write = Some(Box::new(hook));
    }

    pub fn clear_write_hook(&mut self) {
        self.on_write = None;
    }

    /// Resolve one operand of `instr`, executing at `ip`.
    pub fn resolve(&self, instr: &Instruction, side: OperandSide, ip: Ip) -> Resolved {
        let (mode, field) = match side {
            OperandSide::A => (instr.mode_a, instr.field_a),
            OperandSide::B => (instr.mode_b, instr.field_b),
        };
        match Mode::from_code(mode) {
            Some(Mode::Immediate) => Resolved {
                value: Some(field as Word),
                address: None,
            },
            Some(Mode::Relative) => {
                let addr = ip.offset(field as i64);
                Resolved {
                    value: Some(self.read(addr)),
                    address: Some(addr),
                }
            }
            Some(Mode::Indirect) => {
                let intermediate = ip.offset(field as i64);
                let addr = wrap(intermediate as i64 + self.read(intermediate) as i64, self.len());
                Resolved {
                    value: Some(self.read(addr)),
                    address: Some(addr),
                }
            }
            None => Resolved::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::word::{decode, encode};
    use proptest::prelude::*;

    #[test]
    fn ip_wraps_through_field_range() {
        let mut ip = Ip::new(1020, 1024);
        ip.incr(10);
        assert_eq!(ip.get(), 6);
        // -1 folds to 4095 first
        let ip = Ip::new(0, 1024);
        assert_eq!(ip.offset(-1), 1023);
        assert_eq!(ip.offset(4095), 1023);
        // Cores that don't divide 4096 see the 12-bit fold
        let ip = Ip::new(0, 1000);
        assert_eq!(ip.offset(-1), 95);
    }

    #[test]
    fn ip_survives_extreme_deltas() {
        let mut ip = Ip::new(5, 1024);
        ip.incr(i64::MAX);
        // i64::MAX is -1 in the field range
        assert_eq!(ip.get(), 4);
        ip.incr(i64::MIN);
        assert!(ip.get() < 1024);

        let mut ip = Ip::new(3, 0);
        ip.incr(7);
        assert_eq!(ip.get(), 0);
    }

    #[test]
    fn geometry() {
        let core = Core::new(64, 16).unwrap();
        assert_eq!(core.len(), 1024);
        assert_eq!(core.words().len(), 1024);
        assert!(Core::new(0, 16).is_err());
        assert!(Core::new(usize::MAX, 2).is_err());
    }

    #[test]
    fn resolve_modes() {
        let mut core = Core::new(8, 2).unwrap();
        // cell 5 holds a pointer 2 cells further on, cell 7 holds the target
        core.place(5, &[2, 0, 99]);
        let ip = Ip::new(3, core.len());

        let instr = decode(encode(1, 0, 7, 1, 2).unwrap());
        assert_eq!(
            core.resolve(&instr, OperandSide::A, ip),
            Resolved {
                value: Some(7),
                address: None
            }
        );
        assert_eq!(
            core.resolve(&instr, OperandSide::B, ip),
            Resolved {
                value: Some(2),
                address: Some(5)
            }
        );

        let instr = decode(encode(1, 2, 2, 3, 0).unwrap());
        assert_eq!(
            core.resolve(&instr, OperandSide::A, ip),
            Resolved {
                value: Some(99),
                address: Some(7)
            }
        );
        assert_eq!(core.resolve(&instr, OperandSide::B, ip), Resolved::default());
    }

    #[test]
    fn resolve_negative_relative() {
        let mut core = Core::new(16, 1).unwrap();
        core.place(15, &[42]);
        let ip = Ip::new(0, core.len());
        // field 4095 is -1
        let instr = decode(encode(1, 1, 4095, 0, 0).unwrap());
        assert_eq!(
            core.resolve(&instr, OperandSide::A, ip),
            Resolved {
                value: Some(42),
                address: Some(15)
            }
        );
    }

    #[test]
    fn place_wraps() {
        let mut core = Core::new(4, 1).unwrap();
        core.place(3, &[1, 2, 3]);
        assert_eq!(core.words(), &[2, 3, 0, 1]);
    }

    #[test]
    fn write_hook_sees_writes_only() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut core = Core::new(4, 1).unwrap();
        let sink = Rc::clone(&seen);
        core.set_write_hook(move |addr| sink.borrow_mut().push(addr));

        core.place(0, &[1, 2]);
        core.write(3, 7);
        core.write(1, 8);
        assert_eq!(*seen.borrow(), vec![3, 1]);
        assert_eq!(core.read(3), 7);

        core.clear_write_hook();
        core.write(0, 1);
        assert_eq!(seen.borrow().len(), 2);
    }

    proptest! {
        #[test]
        fn ip_stays_in_core(start in 0usize..5000, len in 1usize..5000, delta in any::<i64>()) {
            let mut ip = Ip::new(start, len);
            ip.incr(delta);
            prop_assert!(ip.get() < len);
        }
    }
}
