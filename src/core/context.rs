// ============================================================================
// spark-signal-utils - Reactive Context
// Thread-local state for the currently running reaction and batching
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::types::{AnyReaction, AnySource};

/// Thread-local state shared by every node of the reactive graph.
pub struct ReactiveContext {
    /// Reaction (effect or derived) whose body is executing
    active_reaction: RefCell<Option<Weak<dyn AnyReaction>>>,

    /// Inside `untrack`
    untracking: Cell<bool>,

    write_version: Cell<u32>,
    read_version: Cell<u32>,

    /// Dependencies collected during the active reaction's run
    new_deps: RefCell<Vec<Rc<dyn AnySource>>>,

    batch_depth: Cell<u32>,

    /// Effects waiting for the current batch or flush to finish
    pending_reactions: RefCell<Vec<Weak<dyn AnyReaction>>>,

    flushing: Cell<bool>,
}

impl ReactiveContext {
    pub fn new() -> Self {
        Self {
            active_reaction: RefCell::new(None),
            untracking: Cell::new(false),
            write_version: Cell::new(1),
            read_version: Cell::new(0),
            new_deps: RefCell::new(Vec::new()),
            batch_depth: Cell::new(0),
            pending_reactions: RefCell::new(Vec::new()),
            flushing: Cell::new(false),
        }
    }

    // =========================================================================
    // ACTIVE REACTION
    // =========================================================================

    /// Set the active reaction, returning the previous one
    pub fn set_active_reaction(
        &self,
        reaction: Option<Weak<dyn AnyReaction>>,
    ) -> Option<Weak<dyn AnyReaction>> {
        self.active_reaction.replace(reaction)
    }

    pub fn active_reaction(&self) -> Option<Rc<dyn AnyReaction>> {
        self.active_reaction.borrow().as_ref().and_then(Weak::upgrade)
    }

    pub fn has_active_reaction(&self) -> bool {
        self.active_reaction.borrow().is_some()
    }

    /// Set untracking mode, returning the previous value
    pub fn set_untracking(&self, value: bool) -> bool {
        self.untracking.replace(value)
    }

    pub fn is_untracking(&self) -> bool {
        self.untracking.get()
    }

    // =========================================================================
    // VERSIONS
    // =========================================================================

    pub fn increment_write_version(&self) -> u32 {
        let v = self.write_version.get().wrapping_add(1);
        self.write_version.set(v);
        v
    }

    pub fn write_version(&self) -> u32 {
        self.write_version.get()
    }

    pub fn increment_read_version(&self) -> u32 {
        let v = self.read_version.get().wrapping_add(1);
        self.read_version.set(v);
        v
    }

    pub fn read_version(&self) -> u32 {
        self.read_version.get()
    }

    // =========================================================================
    // DEPENDENCY COLLECTION
    // =========================================================================

    pub fn swap_new_deps(&self, deps: Vec<Rc<dyn AnySource>>) -> Vec<Rc<dyn AnySource>> {
        self.new_deps.replace(deps)
    }

    pub fn add_new_dep(&self, source: Rc<dyn AnySource>) {
        self.new_deps.borrow_mut().push(source);
    }

    // =========================================================================
    // BATCHING & FLUSHING
    // =========================================================================

    pub fn enter_batch(&self) -> u32 {
        let depth = self.batch_depth.get() + 1;
        self.batch_depth.set(depth);
        depth
    }

    pub fn exit_batch(&self) -> u32 {
        let depth = self.batch_depth.get().saturating_sub(1);
        self.batch_depth.set(depth);
        depth
    }

    pub fn is_batching(&self) -> bool {
        self.batch_depth.get() > 0
    }

    pub fn add_pending_reaction(&self, reaction: Weak<dyn AnyReaction>) {
        self.pending_reactions.borrow_mut().push(reaction);
    }

    pub fn take_pending_reactions(&self) -> Vec<Weak<dyn AnyReaction>> {
        self.pending_reactions.take()
    }

    /// Set the flushing flag, returning the previous value
    pub fn set_flushing(&self, value: bool) -> bool {
        self.flushing.replace(value)
    }

    pub fn is_flushing(&self) -> bool {
        self.flushing.get()
    }
}

impl Default for ReactiveContext {
    fn default() -> Self {
        Self::new()
    }
}

thread_local! {
    static CONTEXT: ReactiveContext = ReactiveContext::new();
}

/// Access the thread-local reactive context.
pub fn with_context<R>(f: impl FnOnce(&ReactiveContext) -> R) -> R {
    CONTEXT.with(f)
}

/// True inside an effect or derived body, outside `untrack`.
pub fn is_tracking() -> bool {
    with_context(|ctx| ctx.has_active_reaction() && !ctx.is_untracking())
}
