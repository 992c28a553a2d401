// ============================================================================
// spark-signal-utils - Wait
// Futures that resolve once a reactive value matches
// ============================================================================
//
// A watcher effect re-checks the predicate on every change and an optional
// timer gives up after a timeout. Whichever fires first resolves the
// future; a guard flag makes the other path a no-op, and both paths tear
// down the watcher and the timer.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{ready, Context, Poll};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::debug;

use crate::primitives::effect::{effect, DisposeFn};
use crate::primitives::readable::Readable;
use crate::timer::{self, finite, Timer, TimerHandle};

struct WaitState {
    resolved: Cell<bool>,
    sender: RefCell<Option<oneshot::Sender<bool>>>,
    dispose: RefCell<Option<DisposeFn>>,
    timeout: Cell<Option<TimerHandle>>,
    timer: Rc<dyn Timer>,
}

impl WaitState {
    /// Resolve with `matched`. Only the first call has any effect.
    fn resolve(&self, matched: bool) {
        if !self.finish() {
            return;
        }
        debug!(matched, "wait resolved");
        if let Some(sender) = self.sender.borrow_mut().take() {
            let _ = sender.send(matched);
        }
    }

    /// Mark resolved and tear down the watcher and timer.
    /// Returns false if this already happened.
    fn finish(&self) -> bool {
        if self.resolved.replace(true) {
            return false;
        }
        if let Some(handle) = self.timeout.take() {
            self.timer.cancel(handle);
        }
        let dispose = self.dispose.borrow_mut().take();
        if let Some(dispose) = dispose {
            dispose();
        }
        true
    }
}

/// Future returned by [`wait_for_value`] and [`wait_for_match`].
///
/// Resolves to `true` on a match and `false` on timeout. Dropping it before
/// it resolves stops watching and cancels the timeout.
#[must_use = "futures do nothing unless awaited"]
pub struct Wait {
    receiver: oneshot::Receiver<bool>,
    outcome: Option<bool>,
    state: Rc<WaitState>,
}

impl Future for Wait {
    type Output = bool;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        if let Some(outcome) = self.outcome {
            return Poll::Ready(outcome);
        }
        let outcome = ready!(Pin::new(&mut self.receiver).poll(cx)).unwrap_or(false);
        self.outcome = Some(outcome);
        Poll::Ready(outcome)
    }
}

impl Drop for Wait {
    fn drop(&mut self) {
        self.state.finish();
    }
}

/// Wait until `source` equals `target`, or until `timeout` elapses.
///
/// A `timeout` of `None` waits forever. Uses this thread's current timer.
///
/// # Panics
///
/// With a finite `timeout` and the default
/// [`TokioTimer`](crate::timer::TokioTimer), panics outside a
/// `tokio::task::LocalSet`. Use the `_with_timer` form, or install another
/// timer with [`timer::with_timer`], elsewhere.
pub fn wait_for_value<T, S>(source: &S, target: T, timeout: Option<Duration>) -> Wait
where
    T: PartialEq + 'static,
    S: Readable<T> + Clone + 'static,
{
    wait_for_value_with_timer(source, target, timeout, timer::current())
}

pub fn wait_for_value_with_timer<T, S>(
    source: &S,
    target: T,
    timeout: Option<Duration>,
    timer: Rc<dyn Timer>,
) -> Wait
where
    T: PartialEq + 'static,
    S: Readable<T> + Clone + 'static,
{
    wait_for_match_with_timer(source, move |value| *value == target, timeout, timer)
}

/// Wait until `predicate` accepts the value of `source`, or until `timeout`
/// elapses.
///
/// A `timeout` of `None` waits forever. Uses this thread's current timer.
///
/// # Panics
///
/// With a finite `timeout` and the default
/// [`TokioTimer`](crate::timer::TokioTimer), panics outside a
/// `tokio::task::LocalSet`. Use the `_with_timer` form, or install another
/// timer with [`timer::with_timer`], elsewhere.
///
/// ```
/// use spark_signal_utils::{signal, wait_for_match};
/// use spark_signal_utils::timer::{self, ManualTimer};
/// use std::rc::Rc;
///
/// # tokio_test_block_on(async {
/// let count = signal(0);
/// let wait = timer::with_timer(Rc::new(ManualTimer::new()), || {
///     wait_for_match(&count, |n: &i32| *n > 2, None)
/// });
///
/// count.set(3);
/// assert!(wait.await);
/// # });
/// # fn tokio_test_block_on(f: impl std::future::Future<Output = ()>) {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
pub fn wait_for_match<T, S, P>(source: &S, predicate: P, timeout: Option<Duration>) -> Wait
where
    T: 'static,
    S: Readable<T> + Clone + 'static,
    P: FnMut(&T) -> bool + 'static,
{
    wait_for_match_with_timer(source, predicate, timeout, timer::current())
}

pub fn wait_for_match_with_timer<T, S, P>(
    source: &S,
    mut predicate: P,
    timeout: Option<Duration>,
    timer: Rc<dyn Timer>,
) -> Wait
where
    T: 'static,
    S: Readable<T> + Clone + 'static,
    P: FnMut(&T) -> bool + 'static,
{
    let (sender, receiver) = oneshot::channel();
    let state = Rc::new(WaitState {
        resolved: Cell::new(false),
        sender: RefCell::new(Some(sender)),
        dispose: RefCell::new(None),
        timeout: Cell::new(None),
        timer,
    });

    let dispose = effect({
        let (source, state) = (source.clone(), state.clone());
        move || {
            if state.resolved.get() {
                return;
            }
            let value = source.read();
            if predicate(&value) {
                state.resolve(true);
            }
        }
    });

    if state.resolved.get() {
        // Matched on the first run, before there was anything to tear down
        dispose();
        return Wait {
            receiver,
            outcome: None,
            state,
        };
    }
    *state.dispose.borrow_mut() = Some(Box::new(dispose));

    if let Some(delay) = finite(timeout) {
        let weak = Rc::downgrade(&state);
        let handle = state.timer.schedule(
            delay,
            Box::new(move || {
                if let Some(state) = weak.upgrade() {
                    debug!(?delay, "wait timed out");
                    state.resolve(false);
                }
            }),
        );
        state.timeout.set(Some(handle));
    }

    Wait {
        receiver,
        outcome: None,
        state,
    }
}
