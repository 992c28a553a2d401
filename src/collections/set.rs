// ============================================================================
// spark-signal-utils - ReactiveSet
// An insertion-ordered set with change notification
// ============================================================================
//
// Unlike `ReactiveMap::set`, `add` notifies on every call, even when the
// value is already a member. Set algebra is declared but always rejected.
// ============================================================================

use std::cell::{RefCell, RefMut};
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use indexmap::{Equivalent, IndexSet};
use tracing::trace;

use super::{ReactiveCollection, UniqueCollection, Version};
use crate::error::{Error, Result};

struct SetInner<T> {
    data: RefCell<IndexSet<T>>,
    version: Version,
}

/// A set whose reads can be tracked by effects and deriveds.
///
/// Plain reads register a dependency on the whole set; `peek_` reads do
/// not. Clones share the same set.
///
/// ```
/// use spark_signal_utils::{effect, ReactiveSet};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let tags: ReactiveSet<&str> = ReactiveSet::new();
/// let runs = Rc::new(Cell::new(0));
///
/// let _dispose = effect({
///     let (tags, runs) = (tags.clone(), runs.clone());
///     move || {
///         tags.contains("urgent");
///         runs.set(runs.get() + 1);
///     }
/// });
///
/// assert!(tags.add("urgent"));
/// assert!(!tags.add("urgent"));
/// assert_eq!(runs.get(), 3);
/// ```
pub struct ReactiveSet<T> {
    inner: Rc<SetInner<T>>,
}

impl<T: Hash + Eq> ReactiveSet<T> {
    pub fn new() -> Self {
        Self::from_set(IndexSet::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_set(IndexSet::with_capacity(capacity))
    }

    fn from_set(data: IndexSet<T>) -> Self {
        Self {
            inner: Rc::new(SetInner {
                data: RefCell::new(data),
                version: Version::new(),
            }),
        }
    }

    // =========================================================================
    // READS
    // =========================================================================

    pub fn len(&self) -> usize {
        self.inner.version.track();
        self.peek_len()
    }

    pub fn peek_len(&self) -> usize {
        self.inner.data.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn peek_is_empty(&self) -> bool {
        self.peek_len() == 0
    }

    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        Q: ?Sized + Hash + Equivalent<T>,
    {
        self.inner.version.track();
        self.peek_contains(value)
    }

    pub fn peek_contains<Q>(&self, value: &Q) -> bool
    where
        Q: ?Sized + Hash + Equivalent<T>,
    {
        self.inner.data.borrow().contains(value)
    }

    /// Snapshot of the members in insertion order.
    pub fn values(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.inner.version.track();
        self.peek_values()
    }

    pub fn peek_values(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.inner.data.borrow().iter().cloned().collect()
    }

    pub fn iter(&self) -> std::vec::IntoIter<T>
    where
        T: Clone,
    {
        self.values().into_iter()
    }

    pub fn peek_iter(&self) -> std::vec::IntoIter<T>
    where
        T: Clone,
    {
        self.peek_values().into_iter()
    }

    /// Visit every member in order without cloning.
    ///
    /// # Panics
    ///
    /// The set is borrowed for the duration, so mutating it from `f`
    /// panics.
    pub fn for_each(&self, f: impl FnMut(&T)) {
        self.inner.version.track();
        self.peek_for_each(f);
    }

    pub fn peek_for_each(&self, mut f: impl FnMut(&T)) {
        for value in self.inner.data.borrow().iter() {
            f(value);
        }
    }

    // =========================================================================
    // MUTATION
    // =========================================================================

    /// Insert `value` and notify, whether or not it was already a member.
    /// Returns whether it was newly inserted.
    pub fn add(&self, value: T) -> bool {
        let inserted = self.inner.data.borrow_mut().insert(value);
        self.inner.version.bump();
        inserted
    }

    /// Remove `value`. Notifies and returns true only if it was a member.
    pub fn delete<Q>(&self, value: &Q) -> bool
    where
        Q: ?Sized + Hash + Equivalent<T>,
    {
        let removed = self.inner.data.borrow_mut().shift_take(value);
        let Some(removed) = removed else {
            return false;
        };

        drop(removed);
        self.inner.version.bump();
        true
    }

    /// Remove every member and notify, even when already empty.
    pub fn clear(&self) {
        let drained = std::mem::take(&mut *self.inner.data.borrow_mut());
        trace!(members = drained.len(), "reactive set cleared");
        drop(drained);
        self.inner.version.bump();
    }

    // =========================================================================
    // SET ALGEBRA
    // =========================================================================

    pub fn union(&self, _other: &ReactiveSet<T>) -> Result<IndexSet<T>> {
        Err(Error::UnsupportedOperation { operation: "union" })
    }

    pub fn intersection(&self, _other: &ReactiveSet<T>) -> Result<IndexSet<T>> {
        Err(Error::UnsupportedOperation {
            operation: "intersection",
        })
    }

    pub fn difference(&self, _other: &ReactiveSet<T>) -> Result<IndexSet<T>> {
        Err(Error::UnsupportedOperation {
            operation: "difference",
        })
    }

    pub fn symmetric_difference(&self, _other: &ReactiveSet<T>) -> Result<IndexSet<T>> {
        Err(Error::UnsupportedOperation {
            operation: "symmetric_difference",
        })
    }

    pub fn is_subset(&self, _other: &ReactiveSet<T>) -> Result<bool> {
        Err(Error::UnsupportedOperation {
            operation: "is_subset",
        })
    }

    pub fn is_superset(&self, _other: &ReactiveSet<T>) -> Result<bool> {
        Err(Error::UnsupportedOperation {
            operation: "is_superset",
        })
    }

    pub fn is_disjoint(&self, _other: &ReactiveSet<T>) -> Result<bool> {
        Err(Error::UnsupportedOperation {
            operation: "is_disjoint",
        })
    }

    // =========================================================================
    // RAW ACCESS
    // =========================================================================
    //
    // Same contract as the map: call `force_update` after mutating through
    // these, with the guard already dropped.

    pub fn raw_untracked(&self) -> RefMut<'_, IndexSet<T>> {
        self.inner.data.borrow_mut()
    }

    pub fn raw_tracked(&self) -> RefMut<'_, IndexSet<T>> {
        self.inner.version.track();
        self.inner.data.borrow_mut()
    }

    pub fn force_update(&self) {
        trace!("reactive set forced update");
        self.inner.version.bump();
    }
}

impl<T> Clone for ReactiveSet<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Hash + Eq> Default for ReactiveSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Hash + Eq> FromIterator<T> for ReactiveSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_set(iter.into_iter().collect())
    }
}

impl<T: Hash + Eq + Clone> IntoIterator for &ReactiveSet<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for ReactiveSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.inner.data.borrow().iter()).finish()
    }
}

#[cfg(feature = "serde")]
impl<T> serde::Serialize for ReactiveSet<T>
where
    T: Hash + Eq + serde::Serialize,
{
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.inner.version.track();
        serde::Serialize::serialize(&*self.inner.data.borrow(), serializer)
    }
}

impl<T: Hash + Eq> ReactiveCollection for ReactiveSet<T> {
    fn len(&self) -> usize {
        ReactiveSet::len(self)
    }

    fn peek_len(&self) -> usize {
        ReactiveSet::peek_len(self)
    }

    fn clear(&self) {
        ReactiveSet::clear(self)
    }

    fn force_update(&self) {
        ReactiveSet::force_update(self)
    }
}

impl<T: Hash + Eq + Clone> UniqueCollection<T> for ReactiveSet<T> {
    fn contains(&self, value: &T) -> bool {
        ReactiveSet::contains(self, value)
    }

    fn peek_contains(&self, value: &T) -> bool {
        ReactiveSet::peek_contains(self, value)
    }

    fn add(&self, value: T) -> bool {
        ReactiveSet::add(self, value)
    }

    fn delete(&self, value: &T) -> bool {
        ReactiveSet::delete(self, value)
    }

    fn values(&self) -> Vec<T> {
        ReactiveSet::values(self)
    }

    fn peek_values(&self) -> Vec<T> {
        ReactiveSet::peek_values(self)
    }
}
