// ============================================================================
// spark-signal-utils - Dependency Tracking
// Registering reads and propagating writes through the graph
// ============================================================================
//
// RefCell borrows must never be held across a mutation of another node, so
// every walk over an edge list collects first and mutates afterwards.
// ============================================================================

use std::rc::Rc;

use crate::core::constants::*;
use crate::core::context::with_context;
use crate::core::types::{AnyReaction, AnySource};
use crate::reactivity::scheduling::schedule_effect;

// =============================================================================
// TRACK READ
// =============================================================================

/// Register `source` as a dependency of the active reaction, if any.
pub fn track_read(source: Rc<dyn AnySource>) {
    with_context(|ctx| {
        if ctx.is_untracking() {
            return;
        }
        let Some(reaction) = ctx.active_reaction() else {
            return;
        };

        if reaction.flags() & REACTION_IS_UPDATING != 0 {
            // One edge per source per run
            let read_version = ctx.read_version();
            if source.read_version() != read_version {
                source.set_read_version(read_version);
                ctx.add_new_dep(source);
            }
        } else {
            reaction.add_dep(source.clone());
            source.add_reaction(Rc::downgrade(&reaction));
        }
    });
}

// =============================================================================
// NOTIFY WRITE
// =============================================================================

/// Record a change of `source` and mark everything downstream.
///
/// # Panics
///
/// Panics when called while a derived is computing.
pub fn notify_write(source: Rc<dyn AnySource>) {
    with_context(|ctx| {
        if let Some(reaction) = ctx.active_reaction() {
            if reaction.flags() & DERIVED != 0 {
                panic!(
                    "Cannot write to signals inside a derived. \
                     Deriveds should be pure computations with no side effects."
                );
            }
        }
        source.set_write_version(ctx.increment_write_version());
    });

    mark_reactions(source, DIRTY);
}

// =============================================================================
// MARK REACTIONS
// =============================================================================

/// Mark the reactions of `source` with `status`, cascading MAYBE_DIRTY
/// through deriveds and scheduling effects that just became dirty.
pub fn mark_reactions(source: Rc<dyn AnySource>, status: u32) {
    let mut effects: Vec<Rc<dyn AnyReaction>> = Vec::new();
    let mut stack: Vec<(Rc<dyn AnySource>, u32)> = vec![(source, status)];

    while let Some((current, current_status)) = stack.pop() {
        current.cleanup_dead_reactions();

        let reactions: Vec<Rc<dyn AnyReaction>> = {
            let mut collected = Vec::new();
            current.for_each_reaction(&mut |reaction| {
                collected.push(reaction);
                true
            });
            collected
        };

        for reaction in reactions {
            let flags = reaction.flags();
            if flags & DESTROYED != 0 {
                continue;
            }

            // Never downgrade DIRTY to MAYBE_DIRTY
            let not_dirty = flags & DIRTY == 0;
            if not_dirty {
                set_signal_status(&*reaction, current_status);
            }

            if flags & DERIVED != 0 {
                if let Some(derived) = reaction.as_derived_source() {
                    stack.push((derived, MAYBE_DIRTY));
                }
            } else if not_dirty && flags & EFFECT != 0 {
                effects.push(reaction);
            }
        }
    }

    for effect in effects {
        schedule_effect(effect);
    }
}

// =============================================================================
// STATUS HELPERS
// =============================================================================

/// Replace the CLEAN/DIRTY/MAYBE_DIRTY bits of a reaction.
pub fn set_signal_status(target: &dyn AnyReaction, status: u32) {
    target.set_flags((target.flags() & STATUS_MASK) | status);
}

/// Replace the CLEAN/DIRTY/MAYBE_DIRTY bits of a source.
pub fn set_source_status(target: &dyn AnySource, status: u32) {
    target.set_flags((target.flags() & STATUS_MASK) | status);
}

/// DIRTY and MAYBE_DIRTY both count as dirty for effects.
pub fn is_dirty(reaction: &dyn AnyReaction) -> bool {
    reaction.flags() & (DIRTY | MAYBE_DIRTY) != 0
}

// =============================================================================
// EDGE MAINTENANCE
// =============================================================================

/// Detach `reaction` from its dependencies at index `start` and beyond.
pub fn remove_reactions(reaction: Rc<dyn AnyReaction>, start: usize) {
    let stale: Vec<Rc<dyn AnySource>> = {
        let mut collected = Vec::new();
        let mut idx = 0;
        reaction.for_each_dep(&mut |dep| {
            if idx >= start {
                collected.push(dep.clone());
            }
            idx += 1;
            true
        });
        collected
    };

    for dep in stale {
        dep.remove_reaction(&reaction);
    }

    reaction.remove_deps_from(start);
}

/// Replace the dependencies of `reaction` with `new_deps`.
pub fn install_dependencies(reaction: Rc<dyn AnyReaction>, new_deps: Vec<Rc<dyn AnySource>>) {
    remove_reactions(reaction.clone(), 0);

    for dep in new_deps {
        reaction.add_dep(dep.clone());
        dep.add_reaction(Rc::downgrade(&reaction));
    }
}
