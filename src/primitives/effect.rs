// ============================================================================
// spark-signal-utils - Effect System
// Side effects that re-run when dependencies change
// ============================================================================
//
// An effect lives as long as the dispose closure returned by `effect()`.
// The graph only holds weak references, so dropping the closure without
// calling it also stops the effect.
//
// Disposing an effect from inside its own body is allowed: the effect is
// detached and flagged immediately, and `update_effect` finishes the
// teardown once the body has returned.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::core::constants::*;
use crate::core::context::with_context;
use crate::core::types::{AnyReaction, AnySource};
use crate::reactivity::tracking::{install_dependencies, remove_reactions, set_signal_status};

// =============================================================================
// TYPE ALIASES
// =============================================================================

/// Cleanup function returned by effects, runs before next execution
pub type CleanupFn = Box<dyn FnOnce()>;

/// Effect function signature - returns optional cleanup
pub type EffectFn = Box<dyn FnMut() -> Option<CleanupFn>>;

/// Dispose function returned when creating effects
pub type DisposeFn = Box<dyn FnOnce()>;

// =============================================================================
// EFFECT INNER
// =============================================================================

/// The graph node behind an effect. A reaction only, never a source.
pub struct EffectInner {
    flags: Cell<u32>,

    /// Write version at the end of the last run
    write_version: Cell<u32>,

    func: RefCell<Option<EffectFn>>,

    deps: RefCell<Vec<Rc<dyn AnySource>>>,

    /// Cleanup returned by the last run
    teardown: RefCell<Option<CleanupFn>>,

    self_weak: Weak<EffectInner>,
}

impl EffectInner {
    pub fn new(func: Option<EffectFn>) -> Rc<Self> {
        Rc::new_cyclic(|self_weak| Self {
            flags: Cell::new(EFFECT | DIRTY),
            write_version: Cell::new(0),
            func: RefCell::new(func),
            deps: RefCell::new(Vec::new()),
            teardown: RefCell::new(None),
            self_weak: self_weak.clone(),
        })
    }

    pub fn as_weak_reaction(&self) -> Weak<dyn AnyReaction> {
        self.self_weak.clone()
    }

    pub fn write_version(&self) -> u32 {
        self.write_version.get()
    }
}

impl Drop for EffectInner {
    fn drop(&mut self) {
        if let Some(cleanup) = self.teardown.get_mut().take() {
            cleanup();
        }
    }
}

impl AnyReaction for EffectInner {
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
        if let Some(rc_self) = self.self_weak.upgrade() {
            update_effect(&rc_self);
        }
        false
    }

    fn as_derived_source(&self) -> Option<Rc<dyn AnySource>> {
        None
    }
}

// =============================================================================
// TEARDOWN & DESTROY
// =============================================================================

pub(crate) fn execute_teardown(effect: &EffectInner) {
    let teardown = effect.teardown.borrow_mut().take();
    if let Some(cleanup) = teardown {
        cleanup();
    }
}

/// Detach an effect from the graph and run its teardown.
///
/// Safe to call from inside the effect's own body.
pub fn destroy_effect(effect: Rc<EffectInner>) {
    let flags = effect.flags();
    if flags & DESTROYED != 0 {
        return;
    }

    remove_reactions(effect.clone() as Rc<dyn AnyReaction>, 0);
    set_signal_status(&*effect, DESTROYED);

    // The body is still on the stack; update_effect finishes the job.
    if flags & REACTION_IS_UPDATING != 0 {
        return;
    }

    execute_teardown(&effect);
    let func = effect.func.borrow_mut().take();
    drop(func);
}

// =============================================================================
// UPDATE EFFECT
// =============================================================================

/// Run an effect body with dependency tracking and install what it read.
pub fn update_effect(effect: &Rc<EffectInner>) {
    if effect.flags() & DESTROYED != 0 {
        return;
    }

    set_signal_status(&**effect, CLEAN);
    execute_teardown(effect);

    let (prev_reaction, prev_deps) = with_context(|ctx| {
        let prev_reaction = ctx.set_active_reaction(Some(effect.as_weak_reaction()));
        ctx.increment_read_version();
        let prev_deps = ctx.swap_new_deps(Vec::new());
        effect.set_flags(effect.flags() | REACTION_IS_UPDATING);
        (prev_reaction, prev_deps)
    });

    let teardown = {
        let mut func = effect.func.borrow_mut();
        match func.as_mut() {
            Some(func) => func(),
            None => None,
        }
    };

    let new_deps = with_context(|ctx| {
        effect.set_flags(effect.flags() & !REACTION_IS_UPDATING);
        let new_deps = ctx.swap_new_deps(prev_deps);
        ctx.set_active_reaction(prev_reaction);
        new_deps
    });

    if effect.flags() & DESTROYED != 0 {
        // Disposed by its own body
        drop(new_deps);
        let func = effect.func.borrow_mut().take();
        drop(func);
        if let Some(cleanup) = teardown {
            cleanup();
        }
        return;
    }

    install_dependencies(effect.clone() as Rc<dyn AnyReaction>, new_deps);
    effect
        .write_version
        .set(with_context(|ctx| ctx.increment_write_version()));
    *effect.teardown.borrow_mut() = teardown;
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Create an effect that runs now and again whenever what it read changes.
///
/// Returns a dispose function. The effect stays alive as long as that
/// function does.
///
/// ```
/// use spark_signal_utils::{effect, signal};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let count = signal(0);
/// let seen = Rc::new(Cell::new(-1));
///
/// let dispose = effect({
///     let (count, seen) = (count.clone(), seen.clone());
///     move || seen.set(count.get())
/// });
/// assert_eq!(seen.get(), 0);
///
/// count.set(1);
/// assert_eq!(seen.get(), 1);
///
/// dispose();
/// count.set(2);
/// assert_eq!(seen.get(), 1);
/// ```
pub fn effect<F>(mut f: F) -> impl FnOnce()
where
    F: FnMut() + 'static,
{
    effect_with_cleanup(move || {
        f();
        None
    })
}

/// Create an effect whose body may return a cleanup.
///
/// The cleanup runs before the next run and on dispose.
pub fn effect_with_cleanup<F>(f: F) -> impl FnOnce()
where
    F: FnMut() -> Option<CleanupFn> + 'static,
{
    let effect = create_effect(Box::new(f));
    move || destroy_effect(effect)
}

/// True inside an effect or derived body.
pub fn effect_tracking() -> bool {
    with_context(|ctx| ctx.has_active_reaction())
}

fn create_effect(func: EffectFn) -> Rc<EffectInner> {
    let effect = EffectInner::new(Some(func));
    update_effect(&effect);
    effect
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::signal::signal;

    #[test]
    fn effect_runs_on_creation_and_on_change() {
        let runs = Rc::new(Cell::new(0));
        let count = signal(0);

        let _dispose = effect({
            let (count, runs) = (count.clone(), runs.clone());
            move || {
                count.get();
                runs.set(runs.get() + 1);
            }
        });
        assert_eq!(runs.get(), 1);

        count.set(1);
        count.set(2);
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn cleanup_runs_before_rerun_and_on_dispose() {
        let cleanups = Rc::new(Cell::new(0));
        let count = signal(0);

        let dispose = effect_with_cleanup({
            let (count, cleanups) = (count.clone(), cleanups.clone());
            move || {
                count.get();
                let cleanups = cleanups.clone();
                Some(Box::new(move || cleanups.set(cleanups.get() + 1)) as CleanupFn)
            }
        });
        assert_eq!(cleanups.get(), 0);

        count.set(1);
        assert_eq!(cleanups.get(), 1);

        dispose();
        assert_eq!(cleanups.get(), 2);
    }

    #[test]
    fn disposed_effect_never_runs_again() {
        let runs = Rc::new(Cell::new(0));
        let count = signal(0);

        let dispose = effect({
            let (count, runs) = (count.clone(), runs.clone());
            move || {
                count.get();
                runs.set(runs.get() + 1);
            }
        });
        dispose();

        count.set(1);
        assert_eq!(runs.get(), 1);
        assert_eq!(count.inner().reaction_count(), 0);
    }

    #[test]
    fn dropping_dispose_fn_stops_effect() {
        let runs = Rc::new(Cell::new(0));
        let count = signal(0);

        {
            let _dispose = effect({
                let (count, runs) = (count.clone(), runs.clone());
                move || {
                    count.get();
                    runs.set(runs.get() + 1);
                }
            });
        }

        count.set(1);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn effect_can_dispose_itself_while_running() {
        let runs = Rc::new(Cell::new(0));
        let cleaned = Rc::new(Cell::new(false));
        let count = signal(0);
        let slot: Rc<RefCell<Option<Rc<EffectInner>>>> = Rc::new(RefCell::new(None));

        let inner = create_effect({
            let (count, runs, slot, cleaned) =
                (count.clone(), runs.clone(), slot.clone(), cleaned.clone());
            Box::new(move || {
                runs.set(runs.get() + 1);
                if count.get() == 2 {
                    if let Some(me) = slot.borrow_mut().take() {
                        destroy_effect(me);
                    }
                }
                let cleaned = cleaned.clone();
                Some(Box::new(move || cleaned.set(true)) as CleanupFn)
            })
        });
        *slot.borrow_mut() = Some(inner.clone());

        count.set(1);
        assert_eq!(runs.get(), 2);

        count.set(2);
        assert_eq!(runs.get(), 3);
        assert!(inner.is_destroyed());
        assert!(cleaned.get());
        assert_eq!(count.inner().reaction_count(), 0);

        count.set(3);
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn dependencies_follow_the_last_run() {
        let flag = signal(true);
        let a = signal(1);
        let b = signal(2);
        let runs = Rc::new(Cell::new(0));

        let _dispose = effect({
            let (flag, a, b, runs) = (flag.clone(), a.clone(), b.clone(), runs.clone());
            move || {
                if flag.get() {
                    a.get();
                } else {
                    b.get();
                }
                runs.set(runs.get() + 1);
            }
        });

        flag.set(false);
        assert_eq!(runs.get(), 2);

        a.set(10);
        assert_eq!(runs.get(), 2);

        b.set(20);
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn effect_tracking_is_true_only_inside() {
        assert!(!effect_tracking());

        let inside = Rc::new(Cell::new(false));
        let _dispose = effect({
            let inside = inside.clone();
            move || inside.set(effect_tracking())
        });
        assert!(inside.get());
    }
}
