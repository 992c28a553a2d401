// ============================================================================
// spark-signal-utils - Type Definitions
// Type-erased graph traits and the storage behind Signal<T>
// ============================================================================
//
// Graph bookkeeping (dirty flags, versions, edges) never needs the value
// type, so sources and reactions are stored as `Rc<dyn AnySource>` and
// `Weak<dyn AnyReaction>`. Only the typed handles touch values.
// ============================================================================

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::constants::*;

// =============================================================================
// TYPE-ERASED TRAITS
// =============================================================================

/// Something a reaction can depend on: a signal source or a derived.
pub trait AnySource: Any {
    fn flags(&self) -> u32;

    fn set_flags(&self, flags: u32);

    /// Global write version at the time of the last value change
    fn write_version(&self) -> u32;

    fn set_write_version(&self, version: u32);

    /// Read version used to deduplicate reads within one reaction run
    fn read_version(&self) -> u32;

    fn set_read_version(&self, version: u32);

    fn reaction_count(&self) -> usize;

    fn add_reaction(&self, reaction: Weak<dyn AnyReaction>);

    /// Drop reactions whose owners are gone
    fn cleanup_dead_reactions(&self);

    /// Visit live reactions; return false from `f` to stop.
    fn for_each_reaction(&self, f: &mut dyn FnMut(Rc<dyn AnyReaction>) -> bool);

    fn remove_reaction(&self, reaction: &Rc<dyn AnyReaction>);

    /// A derived is also a reaction; plain sources return None.
    fn as_derived_reaction(&self) -> Option<Rc<dyn AnyReaction>> {
        None
    }
}

/// Something that re-runs when its dependencies change: an effect or a derived.
pub trait AnyReaction: Any {
    fn flags(&self) -> u32;

    fn set_flags(&self, flags: u32);

    fn dep_count(&self) -> usize;

    fn add_dep(&self, source: Rc<dyn AnySource>);

    /// Truncate the dependency list to `start` entries
    fn remove_deps_from(&self, start: usize);

    fn for_each_dep(&self, f: &mut dyn FnMut(&Rc<dyn AnySource>) -> bool);

    /// Re-run. For deriveds returns whether the cached value changed.
    fn update(&self) -> bool;

    /// A derived is also a source; effects return None.
    fn as_derived_source(&self) -> Option<Rc<dyn AnySource>>;

    fn is_dirty(&self) -> bool {
        self.flags() & DIRTY != 0
    }

    fn is_clean(&self) -> bool {
        self.flags() & CLEAN != 0
    }

    fn is_destroyed(&self) -> bool {
        self.flags() & DESTROYED != 0
    }
}

// =============================================================================
// REACTION LIST
// =============================================================================

/// Weak back-edges from a source to the reactions reading it.
///
/// Shared by `SourceInner` and `DerivedInner` so both sides of the graph
/// handle identity and dead entries the same way.
#[derive(Default)]
pub(crate) struct Reactions(RefCell<Vec<Weak<dyn AnyReaction>>>);

impl Reactions {
    pub(crate) fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub(crate) fn push(&self, reaction: Weak<dyn AnyReaction>) {
        self.0.borrow_mut().push(reaction);
    }

    pub(crate) fn retain_live(&self) {
        self.0.borrow_mut().retain(|w| w.strong_count() > 0);
    }

    pub(crate) fn for_each(&self, f: &mut dyn FnMut(Rc<dyn AnyReaction>) -> bool) {
        for weak in self.0.borrow().iter() {
            if let Some(reaction) = weak.upgrade() {
                if !f(reaction) {
                    break;
                }
            }
        }
    }

    pub(crate) fn remove(&self, reaction: &Rc<dyn AnyReaction>) {
        let target = Rc::as_ptr(reaction) as *const ();
        self.0.borrow_mut().retain(|weak| match weak.upgrade() {
            // Compare data pointers only; vtable pointers may differ per cast site.
            Some(rc) => Rc::as_ptr(&rc) as *const () != target,
            None => false,
        });
    }
}

// =============================================================================
// SOURCE INNER
// =============================================================================

/// Equality function deciding whether a write is a change
pub type EqualsFn<T> = fn(&T, &T) -> bool;

pub fn default_equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

/// The storage behind a `Signal<T>`.
pub struct SourceInner<T> {
    flags: Cell<u32>,
    value: RefCell<T>,
    write_version: Cell<u32>,
    read_version: Cell<u32>,
    reactions: Reactions,
    equals: EqualsFn<T>,
}

impl<T> SourceInner<T> {
    pub fn new(value: T) -> Self
    where
        T: PartialEq,
    {
        Self::new_with_equals(value, default_equals)
    }

    pub fn new_with_equals(value: T, equals: EqualsFn<T>) -> Self {
        Self {
            flags: Cell::new(SOURCE | CLEAN),
            value: RefCell::new(value),
            write_version: Cell::new(0),
            read_version: Cell::new(0),
            reactions: Reactions::default(),
            equals,
        }
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.value.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Store `value` unless it equals the current one. Returns whether it changed.
    pub fn set(&self, value: T) -> bool {
        let changed = !(self.equals)(&self.value.borrow(), &value);
        if changed {
            *self.value.borrow_mut() = value;
        }
        changed
    }

    /// Mutate in place. Always counts as a change.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.value.borrow_mut());
    }
}

impl<T: 'static> AnySource for SourceInner<T> {
    fn flags(&self) -> u32 {
        self.flags.get()
    }

    fn set_flags(&self, flags: u32) {
        self.flags.set(flags);
    }

    fn write_version(&self) -> u32 {
        self.write_version.get()
    }

    fn set_write_version(&self, version: u32) {
        self.write_version.set(version);
    }

    fn read_version(&self) -> u32 {
        self.read_version.get()
    }

    fn set_read_version(&self, version: u32) {
        self.read_version.set(version);
    }

    fn reaction_count(&self) -> usize {
        self.reactions.len()
    }

    fn add_reaction(&self, reaction: Weak<dyn AnyReaction>) {
        self.reactions.push(reaction);
    }

    fn cleanup_dead_reactions(&self) {
        self.reactions.retain_live();
    }

    fn for_each_reaction(&self, f: &mut dyn FnMut(Rc<dyn AnyReaction>) -> bool) {
        self.reactions.for_each(f);
    }

    fn remove_reaction(&self, reaction: &Rc<dyn AnyReaction>) {
        self.reactions.remove(reaction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_inner_starts_clean() {
        let source = SourceInner::new(42);
        assert_eq!(source.get(), 42);
        assert_ne!(source.flags() & SOURCE, 0);
        assert_ne!(source.flags() & CLEAN, 0);
    }

    #[test]
    fn set_reports_change_only_on_inequality() {
        let source = SourceInner::new(1);
        assert!(!source.set(1));
        assert!(source.set(2));
        assert_eq!(source.get(), 2);
    }

    #[test]
    fn custom_equality_can_force_changes() {
        let source = SourceInner::new_with_equals(0, |_, _| false);
        assert!(source.set(0));
    }

    #[test]
    fn update_mutates_in_place() {
        let source = SourceInner::new(vec![1, 2]);
        source.update(|v| v.push(3));
        assert_eq!(source.with(|v| v.len()), 3);
    }
}
