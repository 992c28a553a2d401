// ============================================================================
// spark-signal-utils - Core Module
// Graph traits, flag constants and the thread-local context
// ============================================================================

pub mod constants;
pub mod context;
pub mod types;

pub use constants::*;
pub use context::{is_tracking, with_context, ReactiveContext};
pub use types::{default_equals, AnyReaction, AnySource, EqualsFn, SourceInner};
