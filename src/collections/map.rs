// ============================================================================
// spark-signal-utils - ReactiveMap
// An insertion-ordered map with change notification
// ============================================================================

use std::borrow::Cow;
use std::cell::{RefCell, RefMut};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::ffi::OsString;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use indexmap::{Equivalent, IndexMap, IndexSet};
use tracing::trace;

use super::{KeyedCollection, ReactiveCollection, Version};

// =============================================================================
// ABSENT VALUES
// =============================================================================

/// A value storable in a [`ReactiveMap`].
///
/// `set` skips the notification when the stored value equals the new one,
/// except for values that stand for "absent", which always notify. Only
/// `Option::None` is absent among the provided impls.
///
/// Implemented for the primitives, strings, tuples, arrays, slices, smart
/// pointers and the std and `indexmap` collections. Your own types opt in
/// with an empty impl:
///
/// ```
/// use spark_signal_utils::{MapValue, ReactiveMap};
///
/// #[derive(Clone, PartialEq)]
/// struct Point(i32, i32);
/// impl MapValue for Point {}
///
/// let points: ReactiveMap<&str, Point> = ReactiveMap::new();
/// assert!(points.set("origin", Point(0, 0)));
/// assert!(!points.set("origin", Point(0, 0)));
/// ```
pub trait MapValue: PartialEq {
    fn is_absent(&self) -> bool {
        false
    }
}

impl<T: PartialEq> MapValue for Option<T> {
    fn is_absent(&self) -> bool {
        self.is_none()
    }
}

macro_rules! present_values {
    ($($ty:ty),* $(,)?) => {
        $(impl MapValue for $ty {})*
    };
}

present_values!(
    (), bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    String, &str, Duration, Instant, SystemTime, PathBuf, OsString, Ordering,
);

impl<T: PartialEq> MapValue for Vec<T> {}
impl<T: PartialEq> MapValue for VecDeque<T> {}
impl<T: PartialEq> MapValue for &[T] {}
impl<T: PartialEq, const N: usize> MapValue for [T; N] {}
impl<T: PartialEq + ?Sized> MapValue for Box<T> {}
impl<T: PartialEq + ?Sized> MapValue for Rc<T> {}
impl<T: PartialEq + ?Sized> MapValue for Arc<T> {}
impl<B: ?Sized + ToOwned + PartialEq> MapValue for Cow<'_, B> {}
impl<T: PartialEq, E: PartialEq> MapValue for Result<T, E> {}

impl<K: Eq + Hash, V: PartialEq, S: BuildHasher> MapValue for HashMap<K, V, S> {}
impl<T: Eq + Hash, S: BuildHasher> MapValue for HashSet<T, S> {}
impl<K: PartialEq, V: PartialEq> MapValue for BTreeMap<K, V> {}
impl<T: PartialEq> MapValue for BTreeSet<T> {}
impl<K: Eq + Hash, V: PartialEq, S: BuildHasher> MapValue for IndexMap<K, V, S> {}
impl<T: Eq + Hash, S: BuildHasher> MapValue for IndexSet<T, S> {}

macro_rules! tuple_values {
    ($(($($name:ident),+)),* $(,)?) => {
        $(impl<$($name: PartialEq),+> MapValue for ($($name,)+) {})*
    };
}

tuple_values!(
    (A),
    (A, B),
    (A, B, C),
    (A, B, C, D),
    (A, B, C, D, E),
    (A, B, C, D, E, F),
    (A, B, C, D, E, F, G),
    (A, B, C, D, E, F, G, H),
    (A, B, C, D, E, F, G, H, I),
    (A, B, C, D, E, F, G, H, I, J),
    (A, B, C, D, E, F, G, H, I, J, L),
    (A, B, C, D, E, F, G, H, I, J, L, M),
);

// =============================================================================
// REACTIVE MAP
// =============================================================================

struct MapInner<K, V> {
    data: RefCell<IndexMap<K, V>>,
    version: Version,
}

/// A map whose reads can be tracked by effects and deriveds.
///
/// Every read comes in two forms: the plain one registers a dependency on
/// the whole map, the `peek_` one does not. Entries keep insertion order,
/// and deleting a key keeps the order of the rest. Clones share the same
/// map.
///
/// # Example
///
/// ```
/// use spark_signal_utils::{effect, ReactiveMap};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let scores: ReactiveMap<&str, i32> = ReactiveMap::new();
/// let total = Rc::new(Cell::new(0));
///
/// let _dispose = effect({
///     let (scores, total) = (scores.clone(), total.clone());
///     move || total.set(scores.values().into_iter().sum())
/// });
///
/// scores.set("alice", 3);
/// scores.set("bob", 4);
/// assert_eq!(total.get(), 7);
///
/// // Same value, no notification
/// assert!(!scores.set("bob", 4));
/// ```
pub struct ReactiveMap<K, V> {
    inner: Rc<MapInner<K, V>>,
}

impl<K: Hash + Eq, V> ReactiveMap<K, V> {
    pub fn new() -> Self {
        Self::from_map(IndexMap::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_map(IndexMap::with_capacity(capacity))
    }

    fn from_map(data: IndexMap<K, V>) -> Self {
        Self {
            inner: Rc::new(MapInner {
                data: RefCell::new(data),
                version: Version::new(),
            }),
        }
    }

    // =========================================================================
    // SIZE
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

    // =========================================================================
    // LOOKUP
    // =========================================================================

    /// Clone of the value for `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        Q: ?Sized + Hash + Equivalent<K>,
        V: Clone,
    {
        self.inner.version.track();
        self.peek_get(key)
    }

    pub fn peek_get<Q>(&self, key: &Q) -> Option<V>
    where
        Q: ?Sized + Hash + Equivalent<K>,
        V: Clone,
    {
        self.inner.data.borrow().get(key).cloned()
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.inner.version.track();
        self.peek_contains_key(key)
    }

    pub fn peek_contains_key<Q>(&self, key: &Q) -> bool
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.inner.data.borrow().contains_key(key)
    }

    // =========================================================================
    // ITERATION
    // =========================================================================
    //
    // Snapshots, so callers may mutate the map while walking the result.

    pub fn entries(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.inner.version.track();
        self.peek_entries()
    }

    pub fn peek_entries(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.inner
            .data
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.inner.version.track();
        self.peek_keys()
    }

    pub fn peek_keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.inner.data.borrow().keys().cloned().collect()
    }

    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.inner.version.track();
        self.peek_values()
    }

    pub fn peek_values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.inner.data.borrow().values().cloned().collect()
    }

    pub fn iter(&self) -> std::vec::IntoIter<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.entries().into_iter()
    }

    pub fn peek_iter(&self) -> std::vec::IntoIter<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.peek_entries().into_iter()
    }

    /// Visit every entry in order without cloning.
    ///
    /// # Panics
    ///
    /// The map is borrowed for the duration, so mutating it from `f`
    /// panics.
    pub fn for_each(&self, f: impl FnMut(&K, &V)) {
        self.inner.version.track();
        self.peek_for_each(f);
    }

    pub fn peek_for_each(&self, mut f: impl FnMut(&K, &V)) {
        for (k, v) in self.inner.data.borrow().iter() {
            f(k, v);
        }
    }

    // =========================================================================
    // MUTATION
    // =========================================================================

    /// Store `value` under `key`.
    ///
    /// Notifies when the key was missing, the stored value differs, or
    /// `value` is absent (see [`MapValue`]). Returns whether it notified.
    pub fn set(&self, key: K, value: V) -> bool
    where
        V: MapValue,
    {
        let changed = {
            let mut data = self.inner.data.borrow_mut();
            let changed =
                value.is_absent() || data.get(&key).is_none_or(|current| *current != value);
            if changed {
                data.insert(key, value);
            }
            changed
        };

        if changed {
            self.inner.version.bump();
        }
        changed
    }

    /// Remove `key`. Notifies and returns true only if it was present.
    pub fn delete<Q>(&self, key: &Q) -> bool
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        let removed = self.inner.data.borrow_mut().shift_remove(key);
        let Some(removed) = removed else {
            return false;
        };

        drop(removed);
        self.inner.version.bump();
        true
    }

    /// Remove every entry and notify, even when already empty.
    pub fn clear(&self) {
        let drained = std::mem::take(&mut *self.inner.data.borrow_mut());
        trace!(entries = drained.len(), "reactive map cleared");
        drop(drained);
        self.inner.version.bump();
    }

    // =========================================================================
    // RAW ACCESS
    // =========================================================================
    //
    // Mutations through these guards are invisible to dependents until
    // `force_update` is called. Drop the guard before calling it, and before
    // anything that might read the map reactively.

    /// The container itself, without registering a dependency.
    pub fn raw_untracked(&self) -> RefMut<'_, IndexMap<K, V>> {
        self.inner.data.borrow_mut()
    }

    /// The container itself, registering a dependency first.
    pub fn raw_tracked(&self) -> RefMut<'_, IndexMap<K, V>> {
        self.inner.version.track();
        self.inner.data.borrow_mut()
    }

    /// Notify dependents unconditionally.
    pub fn force_update(&self) {
        trace!("reactive map forced update");
        self.inner.version.bump();
    }
}

impl<K, V> Clone for ReactiveMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K: Hash + Eq, V> Default for ReactiveMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq, V> FromIterator<(K, V)> for ReactiveMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_map(iter.into_iter().collect())
    }
}

impl<K, V> IntoIterator for &ReactiveMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    type Item = (K, V);
    type IntoIter = std::vec::IntoIter<(K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for ReactiveMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.inner.data.borrow().iter()).finish()
    }
}

#[cfg(feature = "serde")]
impl<K, V> serde::Serialize for ReactiveMap<K, V>
where
    K: Hash + Eq + serde::Serialize,
    V: serde::Serialize,
{
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.inner.version.track();
        serde::Serialize::serialize(&*self.inner.data.borrow(), serializer)
    }
}

// =============================================================================
// CAPABILITIES
// =============================================================================

impl<K: Hash + Eq, V> ReactiveCollection for ReactiveMap<K, V> {
    fn len(&self) -> usize {
        ReactiveMap::len(self)
    }

    fn peek_len(&self) -> usize {
        ReactiveMap::peek_len(self)
    }

    fn clear(&self) {
        ReactiveMap::clear(self)
    }

    fn force_update(&self) {
        ReactiveMap::force_update(self)
    }
}

impl<K, V> KeyedCollection<K, V> for ReactiveMap<K, V>
where
    K: Hash + Eq + Clone,
    V: MapValue + Clone,
{
    fn get(&self, key: &K) -> Option<V> {
        ReactiveMap::get(self, key)
    }

    fn peek_get(&self, key: &K) -> Option<V> {
        ReactiveMap::peek_get(self, key)
    }

    fn contains_key(&self, key: &K) -> bool {
        ReactiveMap::contains_key(self, key)
    }

    fn peek_contains_key(&self, key: &K) -> bool {
        ReactiveMap::peek_contains_key(self, key)
    }

    fn set(&self, key: K, value: V) -> bool {
        ReactiveMap::set(self, key, value)
    }

    fn delete(&self, key: &K) -> bool {
        ReactiveMap::delete(self, key)
    }

    fn keys(&self) -> Vec<K> {
        ReactiveMap::keys(self)
    }

    fn peek_keys(&self) -> Vec<K> {
        ReactiveMap::peek_keys(self)
    }
}
