use crate::{
    ir::{ClassSet, DataClass, Instr, Location, RegId, Variable},
    target::Target,
    Error, Result,
};

const SLOT_SIZE: u32 = 8;

/// A target with a freely configurable register file.
///
/// Every stack slot is 8 bytes and can hold any class. Moves are emitted as a
/// single copy instruction named `load`, `store` or `mov` depending on whether
/// a stack slot is involved.
///
/// # Examples
///
/// ```rust
/// use regcolor::{ir::{ClassSet, DataClass}, target::{GenericTarget, Target}};
///
/// let target = GenericTarget::new("mixed")
///     .register("r0", ClassSet::GENERAL)
///     .register("f0", ClassSet::FLOAT);
/// assert_eq!(target.legal_locations(DataClass::Float64, false).len(), 1);
/// assert_eq!(target.locations().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct GenericTarget {
    name: String,
    registers: Vec<(String, ClassSet)>,
    stack: Vec<Location>,
    max_stack: Option<usize>,
}

impl GenericTarget {
    /// Creates a target without registers.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registers: Vec::new(),
            stack: Vec::new(),
            max_stack: None,
        }
    }

    /// Creates a target with `count` general purpose registers `r0..`.
    #[must_use]
    pub fn integer(count: u16) -> Self {
        (0..count).fold(Self::new(format!("generic{count}")), |target, i| {
            target.register(format!("r{i}"), ClassSet::GENERAL)
        })
    }

    /// Adds a register holding `classes`. Its [`RegId`] is its position.
    #[must_use]
    pub fn register(mut self, name: impl Into<String>, classes: ClassSet) -> Self {
        self.registers.push((name.into(), classes));
        self
    }

    /// Limits the number of stack slots.
    #[must_use]
    pub fn with_stack_limit(mut self, slots: usize) -> Self {
        self.max_stack = Some(slots);
        self
    }

    /// Returns the name of a register.
    #[must_use]
    pub fn register_name(&self, reg: RegId) -> Option<&str> {
        self.registers
            .get(usize::from(reg.0))
            .map(|(name, _)| name.as_str())
    }

    fn register_locations(&self) -> impl Iterator<Item = (Location, ClassSet)> + '_ {
        self.registers.iter().enumerate().map(|(i, (_, classes))| {
            // Register files beyond u16::MAX entries are not representable.
            (Location::Register(RegId(i as u16)), *classes)
        })
    }
}

impl Target for GenericTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn locations(&self) -> Vec<Location> {
        self.register_locations()
            .map(|(loc, _)| loc)
            .chain(self.stack.iter().copied())
            .collect()
    }

    fn legal_locations(&self, class: DataClass, needs_memory: bool) -> Vec<Location> {
        if needs_memory {
            return self.stack.clone();
        }
        self.register_locations()
            .filter(|(_, classes)| classes.holds(class))
            .map(|(loc, _)| loc)
            .collect()
    }

    fn stack_slots(&self) -> usize {
        self.stack.len()
    }

    fn reset_stack(&mut self, keep: usize) {
        self.stack.truncate(keep);
    }

    fn grow_stack(&mut self, class: DataClass) -> Result<Location> {
        if self.max_stack.is_some_and(|max| self.stack.len() >= max) {
            return Err(Error::StackExhausted { class });
        }
        let slot = u32::try_from(self.stack.len()).map_err(|_| Error::StackExhausted { class })?;
        let loc = Location::Stack {
            slot,
            size: SLOT_SIZE,
        };
        self.stack.push(loc);
        Ok(loc)
    }

    fn emit_move(&self, dst: Variable, src: Variable, _class: DataClass) -> Vec<Instr> {
        let mut instr = Instr::copy(dst, src);
        let on_stack = |var: &Variable| var.as_physical().is_some_and(|loc| loc.is_stack());
        if on_stack(&dst) {
            instr.mnemonic = "store".to_string();
        } else if on_stack(&src) {
            instr.mnemonic = "load".to_string();
        }
        vec![instr]
    }

    fn size_of(&self, _class: DataClass) -> u32 {
        SLOT_SIZE
    }
}
