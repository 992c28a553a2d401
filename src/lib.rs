// ============================================================================
// spark-signal-utils - Reactive Collections and Timers
// ============================================================================
//
// Maps, sets and timer-backed flags whose reads are tracked by a small
// signal engine, plus futures that wait for a reactive value to match.
//
// Everything is single-threaded: handles are `Rc`-based and effects run
// synchronously after the write that dirtied them.
// ============================================================================

pub mod collections;
pub mod core;
pub mod error;
pub mod primitives;
pub mod reactivity;
pub mod timer;

pub use core::constants;
pub use core::context::{is_tracking, with_context, ReactiveContext};
pub use core::types::{default_equals, AnyReaction, AnySource, EqualsFn, SourceInner};

pub use primitives::derived::{derived, derived_with_equals, Derived};
pub use primitives::effect::{
    effect, effect_tracking, effect_with_cleanup, CleanupFn, DisposeFn, EffectFn,
};
pub use primitives::pending::{Activation, PendingFlag, Subscription};
pub use primitives::readable::Readable;
pub use primitives::signal::{signal, signal_with_equals, Signal};
pub use primitives::wait::{
    wait_for_match, wait_for_match_with_timer, wait_for_value, wait_for_value_with_timer, Wait,
};

pub use reactivity::batching::{batch, is_batching, is_untracking, untrack};
pub use reactivity::scheduling::flush_sync;

pub use collections::{
    KeyedCollection, MapValue, ReactiveCollection, ReactiveMap, ReactiveSet, UniqueCollection,
};
pub use error::{Error, Result};
pub use timer::{ManualTimer, Timer, TimerHandle, TokioTimer};
