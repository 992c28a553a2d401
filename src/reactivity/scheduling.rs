// ============================================================================
// spark-signal-utils - Effect Scheduling
// Queueing dirty effects and flushing them synchronously
// ============================================================================
//
// There are no microtasks to defer to, so a dirty effect runs as soon as the
// write that dirtied it returns, unless a batch or an outer flush is active.
// ============================================================================

use std::rc::Rc;

use crate::core::constants::*;
use crate::core::context::with_context;
use crate::core::types::AnyReaction;
use crate::reactivity::tracking::is_dirty;

/// Flush iterations before an effect cycle is reported
const MAX_FLUSH_COUNT: u32 = 1000;

/// Queue an effect and flush unless batching or already flushing.
pub fn schedule_effect(effect: Rc<dyn AnyReaction>) {
    let should_flush = with_context(|ctx| {
        ctx.add_pending_reaction(Rc::downgrade(&effect));
        !ctx.is_batching() && !ctx.is_flushing()
    });

    if should_flush {
        flush_pending_reactions();
    }
}

/// Run queued effects until the queue stays empty.
///
/// # Panics
///
/// Panics if effects keep re-dirtying each other for more than
/// 1000 rounds.
pub fn flush_pending_reactions() {
    struct FlushGuard {
        was_flushing: bool,
    }

    impl Drop for FlushGuard {
        fn drop(&mut self) {
            with_context(|ctx| ctx.set_flushing(self.was_flushing));
        }
    }

    let _guard = FlushGuard {
        was_flushing: with_context(|ctx| ctx.set_flushing(true)),
    };

    let mut rounds = 0u32;
    loop {
        let pending = with_context(|ctx| ctx.take_pending_reactions());
        if pending.is_empty() {
            break;
        }

        rounds += 1;
        if rounds > MAX_FLUSH_COUNT {
            panic!(
                "Maximum update depth exceeded. This can happen when an effect \
                 continuously triggers itself."
            );
        }

        for reaction in pending.iter().filter_map(|weak| weak.upgrade()) {
            let flags = reaction.flags();
            if flags & DESTROYED != 0 || flags & EFFECT == 0 {
                continue;
            }
            if is_dirty(&*reaction) {
                reaction.update();
            }
        }
    }
}

/// Run every pending effect now, even inside a batch.
pub fn flush_sync() {
    flush_pending_reactions();
}
