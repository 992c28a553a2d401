// ============================================================================
// spark-signal-utils - Manual Timer
// A virtual clock that only moves when told to
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::time::Duration;

use super::{Timer, TimerCallback, TimerHandle};

/// Deterministic timer for tests and simulations.
///
/// Nothing fires until [`advance`](ManualTimer::advance) moves the clock.
///
/// ```
/// use spark_signal_utils::timer::{ManualTimer, Timer};
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use std::time::Duration;
///
/// let timer = ManualTimer::new();
/// let fired = Rc::new(Cell::new(false));
///
/// let f = fired.clone();
/// timer.schedule(Duration::from_millis(100), Box::new(move || f.set(true)));
///
/// timer.advance(Duration::from_millis(99));
/// assert!(!fired.get());
/// timer.advance(Duration::from_millis(1));
/// assert!(fired.get());
/// ```
#[derive(Default)]
pub struct ManualTimer {
    now: Cell<Duration>,
    next_id: Cell<u64>,
    /// Keyed by deadline, then scheduling order
    queue: RefCell<BTreeMap<(Duration, u64), TimerCallback>>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed on the virtual clock.
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Callbacks scheduled and not yet fired or canceled.
    pub fn pending_count(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Move the clock forward by `by`, firing every callback that comes due.
    ///
    /// Callbacks run in deadline order with the clock set to their deadline,
    /// so a callback that schedules another one relative to "now" sees the
    /// right time. Callbacks scheduled during the advance fire too if they
    /// fall inside the window.
    pub fn advance(&self, by: Duration) {
        let target = self.now.get().saturating_add(by);

        loop {
            let due = {
                let mut queue = self.queue.borrow_mut();
                match queue.first_key_value() {
                    Some((&(deadline, _), _)) if deadline <= target => queue.pop_first(),
                    _ => None,
                }
            };

            let Some(((deadline, _), callback)) = due else {
                break;
            };
            self.now.set(deadline.max(self.now.get()));
            callback();
        }

        self.now.set(target);
    }
}

impl Timer for ManualTimer {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let deadline = self.now.get().saturating_add(delay);
        self.queue.borrow_mut().insert((deadline, id), callback);
        TimerHandle::new(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        let removed = {
            let mut queue = self.queue.borrow_mut();
            let key = queue.keys().find(|(_, id)| TimerHandle::new(*id) == handle).copied();
            key.and_then(|key| queue.remove(&key))
        };
        // Dropped outside the borrow; the callback may own things that cancel on drop
        drop(removed);
    }
}
