use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::error::LoadError;
use crate::memory::Core;
use crate::runtime::{Engine, ProgramId};
use crate::word::{self, Word};

/// An assembled program: entry offset plus its words.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Warrior {
    entry: Word,
    words: Vec<Word>,
}

impl Warrior {
    pub fn new(entry: Word, words: Vec<Word>) -> Self {
        Warrior { entry, words }
    }

    /// Read the `[offset, word, word, ...]` form. `None` if the offset is missing.
    pub fn from_raw(raw: &[Word]) -> Option<Self> {
        let (&entry, words) = raw.split_first()?;
        Some(Warrior::new(entry, words.to_vec()))
    }

    /// `[offset, word, word, ...]`
    pub fn to_raw(&self) -> Vec<Word> {
        let mut raw = Vec::with_capacity(self.words.len() + 1);
        raw.push(self.entry);
        raw.extend_from_slice(&self.words);
        raw
    }

    pub fn entry(&self) -> Word {
        self.entry
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Bomber that drops a `dat` on every fourth cell.
    pub fn dwarf() -> Self {
        Warrior::new(1, vec![0x0100_0000, 0x2100_4fff, 0x1200_0ffe, 0x4100_0ffe])
    }

    /// `mov 0 1`, copies itself one cell ahead forever.
    pub fn imp() -> Self {
        Warrior::new(0, vec![0x1500_0001])
    }

    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "dwarf" => Some(Self::dwarf()),
            "imp" => Some(Self::imp()),
            _ => None,
        }
    }

    /// Reject words whose opcode is outside the instruction set.
    fn validate(&self, program: ProgramId) -> Result<(), LoadError> {
        for (index, &raw) in self.words.iter().enumerate() {
            if word::decode(raw).op().is_none() {
                return Err(LoadError::InvalidInstruction {
                    program,
                    index,
                    word: raw,
                });
            }
        }
        Ok(())
    }
}

/// Contiguous span of the core occupied by one warrior, possibly wrapping.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Region {
    pub base: usize,
    pub len: usize,
}

impl Region {
    pub fn contains(&self, addr: usize, core_len: usize) -> bool {
        (addr + core_len - self.base) % core_len < self.len
    }
}

/// Where both warriors were placed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Layout {
    pub regions: [Region; 2],
}

impl Layout {
    pub fn region(&self, program: ProgramId) -> Region {
        self.regions[program.index()]
    }

    /// Warrior whose initial code occupied `addr`.
    pub fn owner(&self, addr: usize, core_len: usize) -> Option<ProgramId> {
        [ProgramId::A, ProgramId::B]
            .into_iter()
            .find(|&p| self.region(p).contains(addr, core_len))
    }
}

/// Places two warriors into a fresh core at random, non-overlapping offsets.
pub struct Loader<R: Rng = StdRng> {
    width: usize,
    height: usize,
    rng: R,
}

impl Loader<StdRng> {
    /// Placement depends only on `seed`.
    pub fn seeded(width: usize, height: usize, seed: u64) -> Self {
        Loader::with_rng(width, height, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Loader<R> {
    pub fn with_rng(width: usize, height: usize, rng: R) -> Self {
        Loader { width, height, rng }
    }

    /// Load from the serialized `[offset, word...]` form.
    pub fn load_raw(&mut self, a: &[Word], b: &[Word]) -> Result<Engine, LoadError> {
        let a = Warrior::from_raw(a).ok_or(LoadError::MissingHeader {
            program: ProgramId::A,
        })?;
        let b = Warrior::from_raw(b).ok_or(LoadError::MissingHeader {
            program: ProgramId::B,
        })?;
        self.load(&a, &b)
    }

    /// Nothing is written unless both warriors fit and are valid.
    pub fn load(&mut self, a: &Warrior, b: &Warrior) -> Result<Engine, LoadError> {
        let mut core = Core::new(self.width, self.height)?;
        let len = core.len();

        let required = a.len() + b.len();
        if required >= len {
            return Err(LoadError::Capacity {
                required,
                available: len,
            });
        }
        a.validate(ProgramId::A)?;
        b.validate(ProgramId::B)?;

        let base_a = self.rng.gen_range(0..len);
        let remaining = len - required;
        let base_b = (base_a + a.len() + self.rng.gen_range(0..remaining)) % len;

        core.place(base_a, a.words());
        core.place(base_b, b.words());

        let ip_a = (base_a + a.entry() as usize) % len;
        let ip_b = (base_b + b.entry() as usize) % len;
        let layout = Layout {
            regions: [
                Region {
                    base: base_a,
                    len: a.len(),
                },
                Region {
                    base: base_b,
                    len: b.len(),
                },
            ],
        };
        Ok(Engine::new(core, ip_a, ip_b).with_layout(layout))
    }
}
