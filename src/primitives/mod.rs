// ============================================================================
// spark-signal-utils - Primitives Module
// Signals, deriveds and effects, plus the pending flag and wait helpers
// ============================================================================

pub mod derived;
pub mod effect;
pub mod pending;
pub mod readable;
pub mod signal;
pub mod wait;

pub use derived::{derived, derived_with_equals, Derived, DerivedInner};
pub use effect::{
    destroy_effect, effect, effect_tracking, effect_with_cleanup, update_effect, CleanupFn,
    DisposeFn, EffectFn, EffectInner,
};
pub use pending::{Activation, PendingFlag, Subscription};
pub use readable::Readable;
pub use signal::{signal, signal_with_equals, Signal};
pub use wait::{
    wait_for_match, wait_for_match_with_timer, wait_for_value, wait_for_value_with_timer, Wait,
};
