// ============================================================================
// spark-signal-utils - Reactive Collections
// Insertion-ordered maps and sets that notify on change
// ============================================================================
//
// Each collection pairs a plain container with a single version cell.
// Reactive reads track the version cell and then read the container; peek
// reads go straight to the container. A mutation bumps the version only
// when it changed what a reader could observe (with the documented
// exceptions: `clear` always bumps, and so does `ReactiveSet::add`).
// ============================================================================

mod map;
mod set;

use std::rc::Rc;

use crate::core::types::SourceInner;
use crate::reactivity::tracking::{notify_write, track_read};

pub use map::{MapValue, ReactiveMap};
pub use set::ReactiveSet;

// =============================================================================
// VERSION CELL
// =============================================================================

/// Change counter shared by a collection's readers.
pub(crate) struct Version(Rc<SourceInner<u64>>);

impl Version {
    pub(crate) fn new() -> Self {
        Self(Rc::new(SourceInner::new(0)))
    }

    /// Register a dependency on the collection.
    pub(crate) fn track(&self) {
        track_read(self.0.clone());
    }

    /// Record a change and notify dependents.
    pub(crate) fn bump(&self) {
        self.0.update(|v| *v = v.wrapping_add(1));
        notify_write(self.0.clone());
    }

    #[cfg(test)]
    pub(crate) fn peek(&self) -> u64 {
        self.0.get()
    }
}

// =============================================================================
// CAPABILITY TRAITS
// =============================================================================

/// Operations shared by every reactive collection.
///
/// Methods without the `peek_` prefix register a dependency when called
/// inside an effect or derived.
pub trait ReactiveCollection {
    fn len(&self) -> usize;

    fn peek_len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn peek_is_empty(&self) -> bool {
        self.peek_len() == 0
    }

    /// Remove everything and notify, even when already empty.
    fn clear(&self);

    /// Notify dependents now, after raw container mutations.
    fn force_update(&self);
}

/// A collection associating keys with values.
pub trait KeyedCollection<K, V>: ReactiveCollection {
    fn get(&self, key: &K) -> Option<V>;

    fn peek_get(&self, key: &K) -> Option<V>;

    fn contains_key(&self, key: &K) -> bool;

    fn peek_contains_key(&self, key: &K) -> bool;

    /// Returns whether dependents were notified.
    fn set(&self, key: K, value: V) -> bool;

    /// Returns whether the key was present.
    fn delete(&self, key: &K) -> bool;

    fn keys(&self) -> Vec<K>;

    fn peek_keys(&self) -> Vec<K>;
}

/// A collection of unique elements.
pub trait UniqueCollection<T>: ReactiveCollection {
    fn contains(&self, value: &T) -> bool;

    fn peek_contains(&self, value: &T) -> bool;

    /// Returns whether the value was newly inserted.
    fn add(&self, value: T) -> bool;

    /// Returns whether the value was present.
    fn delete(&self, value: &T) -> bool;

    fn values(&self) -> Vec<T>;

    fn peek_values(&self) -> Vec<T>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect;
    use std::cell::Cell;

    fn reset<C: ReactiveCollection>(collection: &C) -> usize {
        let before = collection.peek_len();
        collection.clear();
        before
    }

    fn count_len_reruns<C: ReactiveCollection + Clone + 'static>(
        collection: &C,
    ) -> (Rc<Cell<u32>>, impl FnOnce()) {
        let runs = Rc::new(Cell::new(0));
        let dispose = effect({
            let (collection, runs) = (collection.clone(), runs.clone());
            move || {
                collection.len();
                runs.set(runs.get() + 1);
            }
        });
        (runs, dispose)
    }

    #[test]
    fn generic_code_drives_both_collections() {
        let map: ReactiveMap<&str, i32> = [("a", 1), ("b", 2)].into_iter().collect();
        let set: ReactiveSet<i32> = [1, 2, 3].into_iter().collect();

        let (map_runs, _map_dispose) = count_len_reruns(&map);
        let (set_runs, _set_dispose) = count_len_reruns(&set);

        assert_eq!(reset(&map), 2);
        assert_eq!(reset(&set), 3);
        assert!(map.peek_is_empty());
        assert!(ReactiveCollection::peek_is_empty(&set));

        assert_eq!(map_runs.get(), 2);
        assert_eq!(set_runs.get(), 2);
    }

    #[test]
    fn keyed_and_unique_traits_delegate() {
        fn fill<M: KeyedCollection<String, i32>>(map: &M) {
            map.set("x".to_string(), 1);
            map.set("y".to_string(), 2);
            map.delete(&"x".to_string());
        }

        fn fill_unique<S: UniqueCollection<i32>>(set: &S) {
            set.add(1);
            set.add(2);
            set.delete(&1);
        }

        let map: ReactiveMap<String, i32> = ReactiveMap::new();
        fill(&map);
        assert_eq!(KeyedCollection::peek_keys(&map), vec!["y".to_string()]);

        let set: ReactiveSet<i32> = ReactiveSet::new();
        fill_unique(&set);
        assert_eq!(UniqueCollection::peek_values(&set), vec![2]);
    }

    #[test]
    fn version_counts_bumps() {
        let version = Version::new();
        version.bump();
        version.bump();
        assert_eq!(version.peek(), 2);
    }
}
