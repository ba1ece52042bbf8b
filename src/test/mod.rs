//! Fixtures shared by the unit tests.
//!
//! [`CodeBuilder`] assembles straight-line instruction lists with a fluent
//! interface; the functions below build the small programs most tests start
//! from.

mod builders;

pub use builders::CodeBuilder;

use crate::ir::{Code, DataClass, Variable, VirtualVar};

// Helper function to create a virtual variable of a given class
pub fn var(id: u32, class: DataClass) -> Variable {
    VirtualVar::new(id, class).into()
}

// Helper function to create a 64-bit integer variable
pub fn int(id: u32) -> Variable {
    var(id, DataClass::Int64)
}

/// `a`, `b` and `c` where `a` and `c` never overlap: two colors suffice.
///
/// ```text
/// i0: a =
/// i1: b =
/// i2:   = a
/// i3: c =
/// i4:   = b, c
/// ```
pub fn disjoint_chain() -> Code {
    CodeBuilder::new()
        .def("const", int(0))
        .def("const", int(1))
        .read("use", [int(0)])
        .def("const", int(2))
        .read("use", [int(1), int(2)])
        .build()
}

/// Four values all live at once, used in two pairs.
///
/// ```text
/// i0: a =
/// i1: b =
/// i2: c =
/// i3: d =
/// i4:   = c, d
/// i5:   = a, b
/// ```
pub fn four_live() -> Code {
    CodeBuilder::new()
        .def("const", int(0))
        .def("const", int(1))
        .def("const", int(2))
        .def("const", int(3))
        .read("use", [int(2), int(3)])
        .read("use", [int(0), int(1)])
        .build()
}

/// A copy whose operands never interfere.
///
/// ```text
/// i0: y =
/// i1: x = y
/// i2:   = x
/// ```
pub fn copy_pair() -> Code {
    CodeBuilder::new()
        .def("const", int(1))
        .copy(int(0), int(1))
        .read("ret", [int(0)])
        .build()
}
