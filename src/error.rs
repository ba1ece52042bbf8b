use thiserror::Error;

use crate::ir::{DataClass, InstrId, VirtualVar};

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Register allocation distinguishes two kinds of failure. Malformed collaborator input
/// (liveness without a definition, unreachable uses, copies with the wrong operand count)
/// indicates a bug upstream of the allocator. Resource exhaustion (a data class with no legal
/// location at all) indicates a broken target description. Neither is recoverable.
///
/// Ordinary spilling, constrained or frozen moves are part of normal control flow and are
/// never reported through this type.
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::Malformed`] - Collaborator data violates an allocator precondition
/// - [`Error::MissingDefinition`] - A spill candidate has no defining instruction
/// - [`Error::UnreachableUse`] - A use cannot be reached from the definition
///
/// ## Target Errors
/// - [`Error::NoLegalLocation`] - The target offers nothing for a data class
/// - [`Error::StackExhausted`] - The target cannot grow its stack pool
/// - [`Error::RegisterPressure`] - One instruction needs more registers than exist
///
/// ## Internal Errors
/// - [`Error::RoundLimit`] - The spill-retry loop did not converge
/// - [`Error::Validation`] - The final coloring violates an allocator invariant
///
/// # Examples
///
/// ```rust,no_run
/// use regcolor::{prelude::*, Error};
///
/// let mut code = Code::new();
/// let target = GenericTarget::integer(2);
/// let mut allocator = RegisterAllocator::new(target, AllocatorConfig::default());
///
/// match allocator.allocate_code(&mut code) {
///     Ok(allocation) => println!("{} rounds", allocation.rounds()),
///     Err(Error::NoLegalLocation { var, class }) => {
///         eprintln!("target cannot hold {var} of class {class}");
///     }
///     Err(e) => eprintln!("allocation failed: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The input handed to the allocator is inconsistent.
    ///
    /// This error indicates that a collaborator (instruction selection or liveness)
    /// produced data the allocator cannot work with. The error includes the source
    /// location where the problem was detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A spill candidate has no recorded defining instruction.
    ///
    /// Spill selection measures the distance from a variable's definition to its
    /// uses. Liveness data without a definition for a live variable is a bug in
    /// the liveness collaborator.
    #[error("Variable {var} has no defining instruction")]
    MissingDefinition {
        /// The variable without a definition
        var: VirtualVar,
    },

    /// A use of a spill candidate cannot be reached from its definition.
    #[error("Use {use_} of {var} is not reachable from its definition {def}")]
    UnreachableUse {
        /// The spill candidate
        var: VirtualVar,
        /// The defining instruction
        def: InstrId,
        /// The unreachable using instruction
        use_: InstrId,
    },

    /// The target offers no legal location for a variable's data class.
    ///
    /// This is a target-description error and is explicitly distinct from
    /// ordinary spilling, which the allocator handles by rewriting and retrying.
    #[error("No legal location for {var} of class {class}")]
    NoLegalLocation {
        /// The variable which cannot be placed
        var: VirtualVar,
        /// Its data class
        class: DataClass,
    },

    /// The target could not provide another stack slot.
    #[error("Unable to allocate a stack slot for class {class}")]
    StackExhausted {
        /// The class the slot was requested for
        class: DataClass,
    },

    /// A single instruction uses more values of one class than the target has
    /// registers for.
    ///
    /// Raised when every variable spilled in a round is a temporary created by
    /// an earlier spill. Spilling such a temporary again only recreates it with
    /// the same live range, so no later round could succeed.
    #[error("Instruction {instr} needs more {class} registers at once than the target offers")]
    RegisterPressure {
        /// The instruction whose operands cannot be held in registers together
        instr: InstrId,
        /// The class of the spilled temporary
        class: DataClass,
    },

    /// The spill-retry loop exceeded the configured number of rounds.
    ///
    /// The associated value shows the round limit that was reached.
    #[error("Register allocation did not converge after {0} rounds")]
    RoundLimit(usize),

    /// The final coloring violates one of the allocator's invariants.
    #[error("Allocation validation failed - {0}")]
    Validation(String),
}
