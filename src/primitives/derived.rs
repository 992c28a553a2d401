// ============================================================================
// spark-signal-utils - Derived Primitive
// Lazily computed, cached values
// ============================================================================
//
// A derived is both a source (others read it) and a reaction (it reads
// others). Writes upstream only mark it DIRTY or MAYBE_DIRTY; the value is
// recomputed on the next read, and a MAYBE_DIRTY derived whose inputs did
// not actually change is marked clean without recomputing.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::core::constants::*;
use crate::core::context::with_context;
use crate::core::types::{default_equals, AnyReaction, AnySource, EqualsFn, Reactions};
use crate::primitives::readable::Readable;
use crate::reactivity::tracking::{install_dependencies, set_source_status, track_read};

// =============================================================================
// DERIVED INNER
// =============================================================================

pub struct DerivedInner<T> {
    flags: Cell<u32>,
    compute: Box<dyn Fn() -> T>,

    /// None until the first computation
    value: RefCell<Option<T>>,

    equals: EqualsFn<T>,
    write_version: Cell<u32>,
    read_version: Cell<u32>,
    reactions: Reactions,
    deps: RefCell<Vec<Rc<dyn AnySource>>>,
    self_weak: Weak<DerivedInner<T>>,
}

impl<T: Clone + 'static> DerivedInner<T> {
    pub fn new_with_equals<F>(compute: F, equals: EqualsFn<T>) -> Rc<Self>
    where
        F: Fn() -> T + 'static,
    {
        Rc::new_cyclic(|self_weak| Self {
            flags: Cell::new(DERIVED | SOURCE | DIRTY),
            compute: Box::new(compute),
            value: RefCell::new(None),
            equals,
            write_version: Cell::new(0),
            read_version: Cell::new(0),
            reactions: Reactions::default(),
            deps: RefCell::new(Vec::new()),
            self_weak: self_weak.clone(),
        })
    }

    /// Run the computation. Returns whether the cached value changed.
    fn recompute(&self) -> bool {
        let next = (self.compute)();

        let changed = match self.value.borrow().as_ref() {
            Some(current) => !(self.equals)(current, &next),
            None => true,
        };

        if changed {
            *self.value.borrow_mut() = Some(next);
            self.write_version
                .set(with_context(|ctx| ctx.increment_write_version()));
        }
        changed
    }

    fn cached(&self) -> Option<T> {
        self.value.borrow().clone()
    }
}

impl<T: Clone + 'static> AnySource for DerivedInner<T> {
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

    fn as_derived_reaction(&self) -> Option<Rc<dyn AnyReaction>> {
        self.self_weak
            .upgrade()
            .map(|rc| rc as Rc<dyn AnyReaction>)
    }
}

impl<T: Clone + 'static> AnyReaction for DerivedInner<T> {
    fn flags(&self) -> u32 {
        self.flags.get()
    }

    fn set_flags(&self, flags: u32) {
        self.flags.set(flags);
    }

    fn dep_count(&self) -> usize {
        self.deps.borrow().len()
    }

    fn add_dep(&self, source: Rc<dyn AnySource>) {
        self.deps.borrow_mut().push(source);
    }

    fn remove_deps_from(&self, start: usize) {
        self.deps.borrow_mut().truncate(start);
    }

    fn for_each_dep(&self, f: &mut dyn FnMut(&Rc<dyn AnySource>) -> bool) {
        for dep in self.deps.borrow().iter() {
            if !f(dep) {
                break;
            }
        }
    }

    fn update(&self) -> bool {
        self.recompute()
    }

    fn as_derived_source(&self) -> Option<Rc<dyn AnySource>> {
        self.self_weak.upgrade().map(|rc| rc as Rc<dyn AnySource>)
    }
}

// =============================================================================
// DERIVED<T>
// =============================================================================

/// A read-only value computed from other reactive values.
///
/// ```
/// use spark_signal_utils::{derived, signal};
///
/// let count = signal(1);
/// let doubled = derived({
///     let count = count.clone();
///     move || count.get() * 2
/// });
///
/// assert_eq!(doubled.get(), 2);
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Derived<T> {
    inner: Rc<DerivedInner<T>>,
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> Derived<T> {
    /// Read the value, recomputing if needed and registering a dependency.
    pub fn get(&self) -> T {
        let value = self.peek();
        track_read(self.inner.clone());
        value
    }

    /// Read the value, recomputing if needed, without registering a dependency.
    pub fn peek(&self) -> T {
        update_derived_chain(self.inner.clone());
        // Starts DIRTY, so the chain update always computes before the first read
        self.inner
            .cached()
            .unwrap_or_else(|| unreachable!("derived read before its first computation"))
    }

    pub fn as_any_source(&self) -> Rc<dyn AnySource> {
        self.inner.clone()
    }
}

impl<T: Clone + 'static> Readable<T> for Derived<T> {
    fn read(&self) -> T {
        self.get()
    }

    fn peek(&self) -> T {
        Derived::peek(self)
    }
}

/// Create a derived compared with `PartialEq`.
pub fn derived<T, F>(compute: F) -> Derived<T>
where
    T: Clone + PartialEq + 'static,
    F: Fn() -> T + 'static,
{
    derived_with_equals(compute, default_equals)
}

/// Create a derived with a custom equality function.
pub fn derived_with_equals<T, F>(compute: F, equals: EqualsFn<T>) -> Derived<T>
where
    T: Clone + 'static,
    F: Fn() -> T + 'static,
{
    Derived {
        inner: DerivedInner::new_with_equals(compute, equals),
    }
}

// =============================================================================
// UPDATE DERIVED CHAIN
// =============================================================================

/// Bring `target` and every dirty derived it depends on up to date,
/// deepest first.
pub fn update_derived_chain(target: Rc<dyn AnySource>) {
    if target.flags() & (DIRTY | MAYBE_DIRTY) == 0 {
        return;
    }

    let mut chain: Vec<Rc<dyn AnySource>> = vec![target.clone()];
    let mut visited: Vec<*const ()> = vec![Rc::as_ptr(&target) as *const ()];
    let mut idx = 0;

    while idx < chain.len() {
        let current = chain[idx].clone();
        idx += 1;

        let Some(reaction) = current.as_derived_reaction() else {
            continue;
        };

        let mut found = Vec::new();
        reaction.for_each_dep(&mut |dep| {
            let flags = dep.flags();
            if flags & DERIVED != 0 && flags & (DIRTY | MAYBE_DIRTY) != 0 {
                let ptr = Rc::as_ptr(dep) as *const ();
                if !visited.contains(&ptr) {
                    visited.push(ptr);
                    found.push(dep.clone());
                }
            }
            true
        });
        chain.extend(found);
    }

    for current in chain.iter().rev() {
        let flags = current.flags();
        if flags & DIRTY != 0 {
            update_derived(current);
        } else if flags & MAYBE_DIRTY != 0 {
            if deps_changed(current) {
                update_derived(current);
            } else {
                set_source_status(&**current, CLEAN);
            }
        }
    }
}

fn deps_changed(source: &Rc<dyn AnySource>) -> bool {
    let own = source.write_version();
    let Some(reaction) = source.as_derived_reaction() else {
        return false;
    };

    let mut changed = false;
    reaction.for_each_dep(&mut |dep| {
        changed = dep.write_version() > own;
        !changed
    });
    changed
}

fn update_derived(source: &Rc<dyn AnySource>) {
    let Some(reaction) = source.as_derived_reaction() else {
        return;
    };

    let (prev_reaction, prev_deps) = with_context(|ctx| {
        let prev_reaction = ctx.set_active_reaction(Some(Rc::downgrade(&reaction)));
        ctx.increment_read_version();
        (prev_reaction, ctx.swap_new_deps(Vec::new()))
    });

    reaction.set_flags(reaction.flags() | REACTION_IS_UPDATING);
    reaction.update();
    reaction.set_flags(reaction.flags() & !REACTION_IS_UPDATING);

    let new_deps = with_context(|ctx| {
        ctx.set_active_reaction(prev_reaction);
        ctx.swap_new_deps(prev_deps)
    });

    install_dependencies(reaction, new_deps);
    set_source_status(&**source, CLEAN);
}
