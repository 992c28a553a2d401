// ============================================================================
// spark-signal-utils - Batching
// Grouping writes and reading without tracking
// ============================================================================

use crate::core::context::with_context;
use crate::reactivity::scheduling::flush_pending_reactions;

/// Run `f` with effects deferred until the outermost batch returns.
///
/// # Example
///
/// ```
/// use spark_signal_utils::{batch, effect, signal};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let a = signal(1);
/// let b = signal(2);
/// let runs = Rc::new(Cell::new(0));
///
/// let _dispose = effect({
///     let (a, b, runs) = (a.clone(), b.clone(), runs.clone());
///     move || {
///         let _ = a.get() + b.get();
///         runs.set(runs.get() + 1);
///     }
/// });
///
/// batch(|| {
///     a.set(10);
///     b.set(20);
/// });
///
/// assert_eq!(runs.get(), 2);
/// ```
pub fn batch<T>(f: impl FnOnce() -> T) -> T {
    struct BatchGuard;

    impl Drop for BatchGuard {
        fn drop(&mut self) {
            if with_context(|ctx| ctx.exit_batch()) == 0 {
                flush_pending_reactions();
            }
        }
    }

    with_context(|ctx| ctx.enter_batch());
    let _guard = BatchGuard;
    f()
}

pub fn is_batching() -> bool {
    with_context(|ctx| ctx.is_batching())
}

/// Run `f` without registering any dependency on what it reads.
pub fn untrack<T>(f: impl FnOnce() -> T) -> T {
    struct UntrackGuard {
        prev: bool,
    }

    impl Drop for UntrackGuard {
        fn drop(&mut self) {
            with_context(|ctx| ctx.set_untracking(self.prev));
        }
    }

    let _guard = UntrackGuard {
        prev: with_context(|ctx| ctx.set_untracking(true)),
    };
    f()
}

pub fn is_untracking() -> bool {
    with_context(|ctx| ctx.is_untracking())
}
