// ============================================================================
// spark-signal-utils - Tokio Timer
// Real-time callbacks as local tasks
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tokio::task::AbortHandle;

use super::{Timer, TimerCallback, TimerHandle};

/// Runs callbacks on the tokio runtime with `spawn_local`.
///
/// Must be used from inside a `tokio::task::LocalSet`. Each scheduled
/// callback is a task sleeping for its delay; canceling aborts the task.
/// Clones share the same task table.
#[derive(Clone, Default)]
pub struct TokioTimer {
    inner: Rc<TimerTasks>,
}

#[derive(Default)]
struct TimerTasks {
    next_id: Cell<u64>,
    tasks: RefCell<HashMap<TimerHandle, AbortHandle>>,
}

impl TokioTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks scheduled and not yet fired or canceled.
    pub fn pending_count(&self) -> usize {
        self.inner.tasks.borrow().len()
    }
}

impl Timer for TokioTimer {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        let handle = TimerHandle::new(id);

        let tasks: Weak<TimerTasks> = Rc::downgrade(&self.inner);
        let task = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            if let Some(tasks) = tasks.upgrade() {
                tasks.tasks.borrow_mut().remove(&handle);
            }
            callback();
        });

        self.inner
            .tasks
            .borrow_mut()
            .insert(handle, task.abort_handle());
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        let task = self.inner.tasks.borrow_mut().remove(&handle);
        if let Some(task) = task {
            task.abort();
        }
    }
}

impl Drop for TimerTasks {
    fn drop(&mut self) {
        for (_, task) in self.tasks.get_mut().drain() {
            task.abort();
        }
    }
}
