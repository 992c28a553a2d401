// ============================================================================
// spark-signal-utils - Constants
// Flag bits for node kinds and dirty-state tracking
// ============================================================================

// =============================================================================
// NODE KIND FLAGS
// =============================================================================

/// Plain writable source (the data behind `Signal<T>`)
pub const SOURCE: u32 = 1 << 0;

/// Cached computation, both a source and a reaction
pub const DERIVED: u32 = 1 << 1;

/// Side-effecting reaction
pub const EFFECT: u32 = 1 << 2;

// =============================================================================
// STATUS FLAGS
// =============================================================================

/// Up-to-date
pub const CLEAN: u32 = 1 << 10;

/// Definitely needs to re-run
pub const DIRTY: u32 = 1 << 11;

/// An upstream derived changed; dependencies must be checked
pub const MAYBE_DIRTY: u32 = 1 << 12;

/// Set while the reaction body is executing
pub const REACTION_IS_UPDATING: u32 = 1 << 13;

/// Effect has been disposed and must never run again
pub const DESTROYED: u32 = 1 << 14;

/// Mask that clears CLEAN, DIRTY and MAYBE_DIRTY
pub const STATUS_MASK: u32 = !(DIRTY | MAYBE_DIRTY | CLEAN);
