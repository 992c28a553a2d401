// ============================================================================
// spark-signal-utils - Pending Flag
// A boolean that stays true while any activation is outstanding
// ============================================================================
//
// The registry maps each activation to its expiry timer, if it has one.
// Every mutation recomputes "registry is non-empty" into a signal, so
// dependents only hear about flips between idle and active.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::debug;

use crate::primitives::effect::{effect, DisposeFn};
use crate::primitives::readable::Readable;
use crate::primitives::signal::{signal, Signal};
use crate::reactivity::batching::{batch, untrack};
use crate::timer::{self, finite, Timer, TimerHandle};

/// One outstanding reason for a [`PendingFlag`] to be true.
///
/// Tokens are unique across every flag on the thread, so cancelling one on a
/// flag that did not issue it is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Activation(u64);

thread_local! {
    static NEXT_ACTIVATION: Cell<u64> = const { Cell::new(0) };
}

impl Activation {
    fn next() -> Self {
        NEXT_ACTIVATION.with(|next| {
            let id = next.get();
            next.set(id.wrapping_add(1));
            Activation(id)
        })
    }
}

struct PendingInner {
    active: Signal<bool>,
    count: Signal<usize>,
    activations: RefCell<HashMap<Activation, Option<TimerHandle>>>,
    timer: Rc<dyn Timer>,
}

impl PendingInner {
    fn sync(&self) {
        let count = self.activations.borrow().len();
        batch(|| {
            self.count.set(count);
            self.active.set(count > 0);
        });
    }

    fn expire(&self, activation: Activation) {
        if self.activations.borrow_mut().remove(&activation).is_some() {
            debug!(activation = activation.0, "activation expired");
            self.sync();
        }
    }
}

impl Drop for PendingInner {
    fn drop(&mut self) {
        for handle in self.activations.get_mut().drain().filter_map(|(_, h)| h) {
            self.timer.cancel(handle);
        }
    }
}

/// A reactive boolean that is true while at least one activation is pending.
///
/// Each activation may expire on its own after a delay. Clones share the
/// same registry.
///
/// ```
/// use spark_signal_utils::PendingFlag;
/// use spark_signal_utils::timer::ManualTimer;
/// use std::rc::Rc;
/// use std::time::Duration;
///
/// let timer = Rc::new(ManualTimer::new());
/// let saving = PendingFlag::with_timer(timer.clone());
///
/// let forever = saving.activate(None);
/// saving.activate(Duration::from_millis(100));
/// saving.cancel(forever);
/// assert!(saving.peek());
///
/// timer.advance(Duration::from_millis(100));
/// assert!(!saving.peek());
/// ```
#[derive(Clone)]
pub struct PendingFlag {
    inner: Rc<PendingInner>,
}

impl PendingFlag {
    /// Create an idle flag using this thread's current timer.
    ///
    /// # Panics
    ///
    /// With the default [`TokioTimer`](crate::timer::TokioTimer), a timed
    /// [`activate`](PendingFlag::activate) panics outside a
    /// `tokio::task::LocalSet`. Use [`with_timer`](PendingFlag::with_timer)
    /// or [`timer::with_timer`] elsewhere.
    pub fn new() -> Self {
        Self::with_timer(timer::current())
    }

    /// Create an idle flag scheduling expiries on `timer`.
    pub fn with_timer(timer: Rc<dyn Timer>) -> Self {
        Self {
            inner: Rc::new(PendingInner {
                active: signal(false),
                count: signal(0),
                activations: RefCell::new(HashMap::new()),
                timer,
            }),
        }
    }

    /// Add an activation. It expires after `duration`, or never when the
    /// duration is `None` or `Duration::MAX`.
    pub fn activate(&self, duration: impl Into<Option<Duration>>) -> Activation {
        let activation = Activation::next();

        let delay = finite(duration.into());
        let handle = delay.map(|delay| {
            let weak: Weak<PendingInner> = Rc::downgrade(&self.inner);
            self.inner.timer.schedule(
                delay,
                Box::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.expire(activation);
                    }
                }),
            )
        });

        self.inner
            .activations
            .borrow_mut()
            .insert(activation, handle);
        debug!(activation = activation.0, ?delay, "activation created");
        self.inner.sync();
        activation
    }

    /// Remove an activation and cancel its timer. Unknown tokens are ignored.
    pub fn cancel(&self, activation: Activation) {
        let removed = self.inner.activations.borrow_mut().remove(&activation);
        let Some(handle) = removed else {
            return;
        };

        if let Some(handle) = handle {
            self.inner.timer.cancel(handle);
        }
        debug!(activation = activation.0, "activation canceled");
        self.inner.sync();
    }

    /// Cancel every activation. The flag is false afterwards.
    pub fn clear(&self) {
        let drained = std::mem::take(&mut *self.inner.activations.borrow_mut());
        debug!(count = drained.len(), "activations cleared");

        for handle in drained.into_values().flatten() {
            self.inner.timer.cancel(handle);
        }
        self.inner.sync();
    }

    /// Whether any activation is pending, registering a dependency.
    pub fn get(&self) -> bool {
        self.inner.active.get()
    }

    /// Whether any activation is pending, read from the registry.
    pub fn peek(&self) -> bool {
        !self.inner.activations.borrow().is_empty()
    }

    /// Number of pending activations, registering a dependency.
    pub fn active_count(&self) -> usize {
        self.inner.count.get()
    }

    pub fn peek_active_count(&self) -> usize {
        self.inner.activations.borrow().len()
    }

    /// Call `f` with the current value now and after every change.
    ///
    /// `f` runs untracked, so reads inside it do not resubscribe. The
    /// subscription ends when the returned handle is dropped or
    /// [`unsubscribe`](Subscription::unsubscribe)d.
    pub fn subscribe(&self, mut f: impl FnMut(bool) + 'static) -> Subscription {
        let active = self.inner.active.clone();
        let dispose = effect(move || {
            let value = active.get();
            untrack(|| f(value));
        });

        Subscription {
            dispose: Some(Box::new(dispose)),
        }
    }
}

impl Default for PendingFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl Readable<bool> for PendingFlag {
    fn read(&self) -> bool {
        self.get()
    }

    fn peek(&self) -> bool {
        PendingFlag::peek(self)
    }
}

/// Formats the tracked value as `true` or `false`.
impl fmt::Display for PendingFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.get(), f)
    }
}

impl fmt::Debug for PendingFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingFlag")
            .field("active", &self.peek())
            .field("activations", &self.peek_active_count())
            .finish()
    }
}

impl PartialEq<bool> for PendingFlag {
    fn eq(&self, other: &bool) -> bool {
        self.get() == *other
    }
}

impl From<&PendingFlag> for bool {
    fn from(flag: &PendingFlag) -> bool {
        flag.get()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for PendingFlag {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(self.get())
    }
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Keeps a [`PendingFlag::subscribe`] callback alive.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    dispose: Option<DisposeFn>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}
