// ============================================================================
// spark-signal-utils - Timers
// Delayed callbacks behind a small trait, with a per-thread default
// ============================================================================
//
// Components never talk to a runtime directly. They schedule through a
// `Timer`, which is either passed in explicitly or taken from the thread's
// current timer. `TokioTimer` drives real time inside a `LocalSet`;
// `ManualTimer` is a virtual clock advanced by hand.
// ============================================================================

mod manual;
mod runtime;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

pub use manual::ManualTimer;
pub use runtime::TokioTimer;

/// Callback run once when a scheduled delay elapses
pub type TimerCallback = Box<dyn FnOnce()>;

/// Identifies one scheduled callback on the timer that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Schedules callbacks after a delay on the current thread.
pub trait Timer {
    /// Run `callback` once after `delay`.
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;

    /// Cancel a scheduled callback. Unknown or already-fired handles are ignored.
    fn cancel(&self, handle: TimerHandle);
}

/// Normalize an optional delay. `None` and `Duration::MAX` never fire.
pub(crate) fn finite(delay: Option<Duration>) -> Option<Duration> {
    delay.filter(|d| *d != Duration::MAX)
}

// =============================================================================
// CURRENT TIMER
// =============================================================================

thread_local! {
    static CURRENT: RefCell<Option<Rc<dyn Timer>>> = const { RefCell::new(None) };
}

/// The timer used by components built without an explicit one.
///
/// Defaults to a `TokioTimer` the first time it is asked for. Scheduling
/// on that default panics outside a `tokio::task::LocalSet`.
pub fn current() -> Rc<dyn Timer> {
    CURRENT.with(|current| {
        current
            .borrow_mut()
            .get_or_insert_with(|| Rc::new(TokioTimer::new()))
            .clone()
    })
}

/// Replace this thread's current timer, returning the previous one.
pub fn set_current(timer: Rc<dyn Timer>) -> Option<Rc<dyn Timer>> {
    CURRENT.with(|current| current.borrow_mut().replace(timer))
}

/// Run `f` with `timer` as the current timer, restoring the previous one after.
pub fn with_timer<R>(timer: Rc<dyn Timer>, f: impl FnOnce() -> R) -> R {
    struct Restore(Option<Rc<dyn Timer>>);

    impl Drop for Restore {
        fn drop(&mut self) {
            let prev = self.0.take();
            CURRENT.with(|current| *current.borrow_mut() = prev);
        }
    }

    let _restore = Restore(set_current(timer));
    f()
}
