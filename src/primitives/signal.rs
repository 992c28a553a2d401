// ============================================================================
// spark-signal-utils - Signal Primitive
// The writable reactive cell every component builds on
// ============================================================================

use std::fmt;
use std::rc::Rc;

use crate::core::types::{AnySource, EqualsFn, SourceInner};
use crate::primitives::readable::Readable;
use crate::reactivity::tracking::{notify_write, track_read};

/// A reactive cell holding a value of type `T`.
///
/// `get` registers a dependency when called inside an effect or derived,
/// `peek` never does, and `set` notifies dependents when the value changes.
/// Clones share the same cell.
///
/// # Example
///
/// ```
/// use spark_signal_utils::signal;
///
/// let count = signal(0);
/// assert_eq!(count.get(), 0);
///
/// assert!(count.set(5));
/// assert!(!count.set(5));
/// assert_eq!(count.peek(), 5);
/// ```
pub struct Signal<T> {
    inner: Rc<SourceInner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Signal<T> {
    pub fn new(value: T) -> Self
    where
        T: PartialEq,
    {
        Self {
            inner: Rc::new(SourceInner::new(value)),
        }
    }

    pub fn new_with_equals(value: T, equals: EqualsFn<T>) -> Self {
        Self {
            inner: Rc::new(SourceInner::new_with_equals(value, equals)),
        }
    }

    /// Read the value, registering a dependency.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        track_read(self.inner.clone());
        self.inner.get()
    }

    /// Read the value without registering a dependency.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        self.inner.get()
    }

    /// Borrow the value, registering a dependency.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        track_read(self.inner.clone());
        self.inner.with(f)
    }

    /// Write the value. Returns true and notifies if it changed.
    pub fn set(&self, value: T) -> bool {
        let changed = self.inner.set(value);
        if changed {
            notify_write(self.inner.clone());
        }
        changed
    }

    /// Mutate in place and notify unconditionally.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.inner.update(f);
        notify_write(self.inner.clone());
    }

    pub fn inner(&self) -> &Rc<SourceInner<T>> {
        &self.inner
    }

    pub fn as_any_source(&self) -> Rc<dyn AnySource> {
        self.inner.clone()
    }
}

impl<T: Clone + 'static> Readable<T> for Signal<T> {
    fn read(&self) -> T {
        self.get()
    }

    fn peek(&self) -> T {
        Signal::peek(self)
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner
            .with(|value| f.debug_struct("Signal").field("value", value).finish())
    }
}

/// Create a signal compared with `PartialEq`.
pub fn signal<T>(value: T) -> Signal<T>
where
    T: PartialEq + 'static,
{
    Signal::new(value)
}

/// Create a signal with a custom equality function.
///
/// ```
/// use spark_signal_utils::signal_with_equals;
///
/// let always_notify = signal_with_equals(0, |_, _| false);
/// assert!(always_notify.set(0));
/// ```
pub fn signal_with_equals<T: 'static>(value: T, equals: EqualsFn<T>) -> Signal<T> {
    Signal::new_with_equals(value, equals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect;
    use std::cell::Cell;

    #[test]
    fn set_returns_whether_value_changed() {
        let s = signal(1);
        assert!(s.set(2));
        assert!(!s.set(2));
        assert_eq!(s.get(), 2);
    }

    #[test]
    fn clones_share_the_cell() {
        let a = signal(1);
        let b = a.clone();
        a.set(100);
        assert_eq!(b.get(), 100);
    }

    #[test]
    fn update_always_notifies() {
        let s = signal(vec![1]);
        let runs = Rc::new(Cell::new(0));
        let _dispose = effect({
            let (s, runs) = (s.clone(), runs.clone());
            move || {
                s.with(|v| v.len());
                runs.set(runs.get() + 1);
            }
        });

        s.update(|v| v.push(2));
        assert_eq!(runs.get(), 2);
        assert_eq!(s.peek(), vec![1, 2]);
    }

    #[test]
    fn peek_does_not_subscribe() {
        let s = signal(0);
        let runs = Rc::new(Cell::new(0));
        let _dispose = effect({
            let (s, runs) = (s.clone(), runs.clone());
            move || {
                s.peek();
                runs.set(runs.get() + 1);
            }
        });

        s.set(1);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn readable_read_tracks() {
        fn read_twice<R: Readable<i32>>(r: &R) -> i32 {
            r.read() + r.peek()
        }

        let s = signal(21);
        assert_eq!(read_twice(&s), 42);
    }

    #[test]
    fn debug_shows_value() {
        let s = signal(42);
        assert_eq!(format!("{s:?}"), "Signal { value: 42 }");
    }
}
