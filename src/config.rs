//! Register allocator configuration
//!
//! This module provides the knobs which change how hard the allocator works
//! for a good result and how much it checks its own output.

/// Configuration for a [`RegisterAllocator`](crate::regalloc::RegisterAllocator)
///
/// The defaults run iterated register coalescing with validation enabled, which
/// is what a compiler backend normally wants. Presets trade checking for speed
/// or disable coalescing entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorConfig {
    /// Coalesce copy instructions (default: true)
    /// When disabled, copies are treated like any other instruction and the
    /// allocator degenerates to plain simplify/spill coloring
    pub coalesce: bool,

    /// Maximum number of build/color/rewrite rounds (default: 32)
    /// Each spilling round rewrites the code and starts over; exceeding this
    /// limit reports [`Error::RoundLimit`](crate::Error::RoundLimit)
    pub max_rounds: usize,

    /// Check the final coloring for soundness, class legality, precoloring and
    /// totality before returning it (default: true)
    pub validate: bool,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            coalesce: true,
            max_rounds: 32,
            validate: true,
        }
    }
}

impl AllocatorConfig {
    /// Creates a configuration for maximum throughput
    ///
    /// Skips validation of the final coloring. Use only with a target
    /// description and collaborators that are known to be correct.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            validate: false,
            ..Self::default()
        }
    }

    /// Creates a configuration which fails early on non-converging input
    ///
    /// Validates the result and allows only a few spill rounds, which surfaces
    /// spill-code bugs in a target description quickly.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            coalesce: true,
            max_rounds: 8,
            validate: true,
        }
    }

    /// Creates a configuration with coalescing disabled
    ///
    /// Every copy survives allocation. Useful for debugging coalescing and for
    /// comparing move counts.
    #[must_use]
    pub fn no_coalescing() -> Self {
        Self {
            coalesce: false,
            ..Self::default()
        }
    }
}
