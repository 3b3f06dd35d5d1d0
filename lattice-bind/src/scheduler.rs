//! Deferred Task Queue
//!
//! A small FIFO of fire-and-forget tasks standing in for "the next turn" of
//! the host's event loop. Value writes for `after<event>` triggers land here.
//!
//! The host decides when a turn ends and calls [`run_deferred`].

use std::cell::RefCell;
use std::collections::VecDeque;

use tracing::trace;

type Task = Box<dyn FnOnce()>;

thread_local! {
    static QUEUE: RefCell<VecDeque<Task>> = RefCell::new(VecDeque::new());
}

/// Enqueue a task for the next turn.
pub fn defer<F>(task: F)
where
    F: FnOnce() + 'static,
{
    QUEUE.with(|queue| queue.borrow_mut().push_back(Box::new(task)));
}

/// Run every pending task in queue order.
///
/// Tasks enqueued while draining run in the same drain. Returns the number
/// of tasks that ran.
pub fn run_deferred() -> usize {
    let mut ran = 0;
    loop {
        // Pop before running so a task may enqueue more work.
        let next = QUEUE.with(|queue| queue.borrow_mut().pop_front());
        match next {
            Some(task) => {
                task();
                ran += 1;
            }
            None => break,
        }
    }
    if ran > 0 {
        trace!(tasks = ran, "drained deferred queue");
    }
    ran
}

/// Number of tasks waiting for the next turn.
pub fn pending() -> usize {
    QUEUE.with(|queue| queue.borrow().len())
}
