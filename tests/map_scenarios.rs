use spark_signal_utils::{batch, derived, effect, ReactiveMap, ReactiveSet};
use std::cell::Cell;
use std::rc::Rc;

fn count_size_runs<K, V>(map: &ReactiveMap<K, V>) -> (Rc<Cell<u32>>, impl FnOnce())
where
    K: std::hash::Hash + Eq + 'static,
    V: 'static,
{
    let runs = Rc::new(Cell::new(0));
    let dispose = effect({
        let (map, runs) = (map.clone(), runs.clone());
        move || {
            map.len();
            runs.set(runs.get() + 1);
        }
    });
    (runs, dispose)
}

#[test]
fn test_set_delete_notification_sequence() {
    let map: ReactiveMap<&str, i32> = ReactiveMap::new();
    let (runs, _dispose) = count_size_runs(&map);
    assert_eq!(runs.get(), 1);

    assert!(map.set("a", 1));
    assert_eq!(map.peek_len(), 1);
    assert_eq!(runs.get(), 2);

    // Same value again: silent
    assert!(!map.set("a", 1));
    assert_eq!(runs.get(), 2);

    // Missing key: silent
    assert!(!map.delete("b"));
    assert_eq!(runs.get(), 2);

    assert!(map.delete("a"));
    assert_eq!(map.peek_len(), 0);
    assert_eq!(runs.get(), 3);
}

#[test]
fn test_absent_value_always_notifies() {
    let map: ReactiveMap<&str, Option<u8>> = ReactiveMap::new();
    let (runs, _dispose) = count_size_runs(&map);

    assert!(map.set("slot", None));
    assert!(map.set("slot", None));
    assert_eq!(runs.get(), 3);

    assert!(map.set("slot", Some(1)));
    assert!(!map.set("slot", Some(1)));
    assert_eq!(runs.get(), 4);
}

#[test]
fn test_peek_reads_stay_untracked() {
    let map: ReactiveMap<u32, String> = ReactiveMap::new();
    let runs = Rc::new(Cell::new(0));

    let _dispose = effect({
        let (map, runs) = (map.clone(), runs.clone());
        move || {
            map.peek_get(&1);
            map.peek_keys();
            map.peek_len();
            runs.set(runs.get() + 1);
        }
    });

    map.set(1, "one".into());
    map.set(2, "two".into());
    map.clear();
    assert_eq!(runs.get(), 1);
}

#[test]
fn test_raw_access_needs_force_update() {
    let map: ReactiveMap<&str, i32> = ReactiveMap::new();
    let (runs, _dispose) = count_size_runs(&map);

    map.raw_untracked().insert("hidden", 7);
    assert_eq!(runs.get(), 1);
    assert_eq!(map.peek_get("hidden"), Some(7));

    map.force_update();
    assert_eq!(runs.get(), 2);
}

#[test]
fn test_batch_coalesces_map_writes() {
    let map: ReactiveMap<u32, u32> = ReactiveMap::new();
    let (runs, _dispose) = count_size_runs(&map);

    batch(|| {
        for i in 0..10 {
            map.set(i, i * i);
        }
        map.delete(&0);
    });

    assert_eq!(runs.get(), 2);
    assert_eq!(map.peek_len(), 9);
}

#[test]
fn test_iteration_follows_insertion_order() {
    let map: ReactiveMap<&str, i32> = ReactiveMap::new();
    map.set("z", 1);
    map.set("a", 2);
    map.set("m", 3);
    map.set("z", 4);

    assert_eq!(map.keys(), vec!["z", "a", "m"]);
    assert_eq!(map.values(), vec![4, 2, 3]);

    map.delete("a");
    let order: Vec<_> = map.iter().map(|(k, _)| k).collect();
    assert_eq!(order, vec!["z", "m"]);
}

#[test]
fn test_derived_over_map_and_set() {
    let scores: ReactiveMap<&str, u32> = ReactiveMap::new();
    let banned: ReactiveSet<&str> = ReactiveSet::new();

    let best = derived({
        let (scores, banned) = (scores.clone(), banned.clone());
        move || {
            scores
                .entries()
                .into_iter()
                .filter(|(name, _)| !banned.contains(name))
                .max_by_key(|(_, score)| *score)
                .map(|(name, _)| name)
        }
    });

    scores.set("ada", 10);
    scores.set("bob", 30);
    assert_eq!(best.get(), Some("bob"));

    banned.add("bob");
    assert_eq!(best.get(), Some("ada"));

    banned.delete("bob");
    assert_eq!(best.get(), Some("bob"));
}

#[test]
fn test_set_add_notifies_even_when_present() {
    let tags: ReactiveSet<String> = ReactiveSet::new();
    let runs = Rc::new(Cell::new(0));

    let _dispose = effect({
        let (tags, runs) = (tags.clone(), runs.clone());
        move || {
            tags.contains("rust");
            runs.set(runs.get() + 1);
        }
    });

    assert!(tags.add("rust".into()));
    assert!(!tags.add("rust".into()));
    assert_eq!(runs.get(), 3);

    assert!(!tags.delete("go"));
    assert_eq!(runs.get(), 3);
}

#[test]
fn test_tuple_values_through_public_api() {
    let ranges: ReactiveMap<&str, (i32, i32)> = ReactiveMap::new();
    let (runs, _dispose) = count_size_runs(&ranges);

    assert!(ranges.set("k", (1, 2)));
    assert!(!ranges.set("k", (1, 2)));
    assert_eq!(ranges.peek_get("k"), Some((1, 2)));
    assert_eq!(runs.get(), 2);
}
