// ============================================================================
// spark-signal-utils - Reactivity Module
// Dependency tracking, dirty propagation, scheduling and batching
// ============================================================================

pub mod batching;
pub mod scheduling;
pub mod tracking;

pub use batching::{batch, is_batching, is_untracking, untrack};
pub use scheduling::{flush_pending_reactions, flush_sync};
pub use tracking::{is_dirty, mark_reactions, notify_write, remove_reactions, track_read};
