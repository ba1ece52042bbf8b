//! Allocatable values and the physical locations they are assigned to.
//!
//! Every operand the allocator sees is a [`Variable`]: either a [`VirtualVar`]
//! which still needs a home, or a physical [`Location`] fixed before allocation
//! begins (a register, a stack slot, or a memory-indirect operand).
//!
//! # Equality
//!
//! - Two virtual variables are equal iff their ids match. The data class and the
//!   memory flag are attributes, not part of the identity.
//! - Two physical variables are equal iff their locations are equal.

use std::{
    fmt,
    hash::{Hash, Hasher},
};

use bitflags::bitflags;
use strum::{Display, EnumIter};

/// The data-type tag of a virtual variable.
///
/// The class selects which physical locations are compatible with a value. The
/// variants follow the evaluation-stack types of the managed bytecode the
/// backend compiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
pub enum DataClass {
    /// 32-bit integer
    Int32,
    /// 64-bit integer
    Int64,
    /// Pointer-sized integer
    NativeInt,
    /// Single precision float
    Float32,
    /// Double precision float
    Float64,
    /// Object reference tracked by the garbage collector
    Object,
    /// Managed or unmanaged pointer
    Reference,
    /// A value type which always lives in memory
    ValueType,
    /// No known class; every register is acceptable
    Any,
}

impl DataClass {
    /// Returns the [`ClassSet`] flag for this class.
    #[must_use]
    pub const fn flag(self) -> ClassSet {
        match self {
            DataClass::Int32 => ClassSet::INT32,
            DataClass::Int64 => ClassSet::INT64,
            DataClass::NativeInt => ClassSet::NATIVE_INT,
            DataClass::Float32 => ClassSet::FLOAT32,
            DataClass::Float64 => ClassSet::FLOAT64,
            DataClass::Object => ClassSet::OBJECT,
            DataClass::Reference => ClassSet::REFERENCE,
            DataClass::ValueType => ClassSet::VALUE_TYPE,
            DataClass::Any => ClassSet::all(),
        }
    }

    /// Returns `true` for floating point classes.
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, DataClass::Float32 | DataClass::Float64)
    }
}

bitflags! {
    /// A set of [`DataClass`] values a physical register can hold.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClassSet: u16 {
        /// 32-bit integers
        const INT32 = 1 << 0;
        /// 64-bit integers
        const INT64 = 1 << 1;
        /// Pointer-sized integers
        const NATIVE_INT = 1 << 2;
        /// Single precision floats
        const FLOAT32 = 1 << 3;
        /// Double precision floats
        const FLOAT64 = 1 << 4;
        /// Object references
        const OBJECT = 1 << 5;
        /// Pointers
        const REFERENCE = 1 << 6;
        /// Value types
        const VALUE_TYPE = 1 << 7;

        /// Every integer-like class a general purpose register holds
        const GENERAL = Self::INT32.bits()
            | Self::INT64.bits()
            | Self::NATIVE_INT.bits()
            | Self::OBJECT.bits()
            | Self::REFERENCE.bits();
        /// Every floating point class
        const FLOAT = Self::FLOAT32.bits() | Self::FLOAT64.bits();
    }
}

impl ClassSet {
    /// Returns `true` if a location with this set can hold `class`.
    #[must_use]
    pub fn holds(self, class: DataClass) -> bool {
        match class {
            DataClass::Any => !self.is_empty(),
            _ => self.contains(class.flag()),
        }
    }
}

/// Index of a hardware register within a target's register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegId(pub u16);

impl fmt::Display for RegId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// One concrete hardware location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Location {
    /// A machine register
    Register(RegId),
    /// A slot in the spill area of the current frame
    Stack {
        /// Index of the slot in the target's stack pool
        slot: u32,
        /// Size of the slot in bytes
        size: u32,
    },
    /// The memory addressed by a register plus a constant offset.
    ///
    /// These operands never take part in interference; they are memory, not
    /// something that competes for a register.
    ContentsOf {
        /// Base register
        base: RegId,
        /// Constant byte offset
        offset: i32,
    },
}

impl Location {
    /// Returns `true` for memory-indirect operands.
    #[must_use]
    pub const fn is_memory_indirect(&self) -> bool {
        matches!(self, Location::ContentsOf { .. })
    }

    /// Returns `true` for stack slots.
    #[must_use]
    pub const fn is_stack(&self) -> bool {
        matches!(self, Location::Stack { .. })
    }

    /// Returns `true` for machine registers.
    #[must_use]
    pub const fn is_register(&self) -> bool {
        matches!(self, Location::Register(_))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Register(reg) => write!(f, "{reg}"),
            Location::Stack { slot, size } => write!(f, "stack{slot}:{size}"),
            Location::ContentsOf { base, offset } => write!(f, "[{base}{offset:+}]"),
        }
    }
}

/// A value which still has to be assigned a location.
#[derive(Clone, Copy)]
pub struct VirtualVar {
    id: u32,
    class: DataClass,
    needs_memory: bool,
}

impl VirtualVar {
    /// Creates a register candidate.
    #[must_use]
    pub const fn new(id: u32, class: DataClass) -> Self {
        Self {
            id,
            class,
            needs_memory: false,
        }
    }

    /// Creates a variable which must ultimately reside in memory.
    #[must_use]
    pub const fn in_memory(id: u32, class: DataClass) -> Self {
        Self {
            id,
            class,
            needs_memory: true,
        }
    }

    /// Returns the unique id.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Returns the data class.
    #[must_use]
    pub const fn class(&self) -> DataClass {
        self.class
    }

    /// Returns `true` if the variable must live in memory.
    #[must_use]
    pub const fn needs_memory(&self) -> bool {
        self.needs_memory
    }
}

impl PartialEq for VirtualVar {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for VirtualVar {}

impl Hash for VirtualVar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for VirtualVar {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VirtualVar {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Debug for VirtualVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.needs_memory {
            write!(f, "v{}:{}!mem", self.id, self.class)
        } else {
            write!(f, "v{}:{}", self.id, self.class)
        }
    }
}

impl fmt::Display for VirtualVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.id)
    }
}

/// An operand as seen by the register allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Variable {
    /// A value to be assigned
    Virtual(VirtualVar),
    /// A precolored location
    Physical(Location),
}

impl Variable {
    /// Returns the virtual variable, if this is one.
    #[must_use]
    pub const fn as_virtual(&self) -> Option<VirtualVar> {
        match self {
            Variable::Virtual(v) => Some(*v),
            Variable::Physical(_) => None,
        }
    }

    /// Returns the physical location, if this is one.
    #[must_use]
    pub const fn as_physical(&self) -> Option<Location> {
        match self {
            Variable::Virtual(_) => None,
            Variable::Physical(loc) => Some(*loc),
        }
    }

    /// Returns `true` for virtual variables.
    #[must_use]
    pub const fn is_virtual(&self) -> bool {
        matches!(self, Variable::Virtual(_))
    }

    /// Returns the data class; physical variables report [`DataClass::Any`].
    #[must_use]
    pub const fn class(&self) -> DataClass {
        match self {
            Variable::Virtual(v) => v.class(),
            Variable::Physical(_) => DataClass::Any,
        }
    }
}

impl From<VirtualVar> for Variable {
    fn from(var: VirtualVar) -> Self {
        Variable::Virtual(var)
    }
}

impl From<Location> for Variable {
    fn from(loc: Location) -> Self {
        Variable::Physical(loc)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Virtual(v) => write!(f, "{v}"),
            Variable::Physical(loc) => write!(f, "{loc}"),
        }
    }
}
