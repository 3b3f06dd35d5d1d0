//! Memo Implementation
//!
//! A Memo is a cached, read-only derived value that re-evaluates only when
//! its dependencies change.
//!
//! # How Memos Work
//!
//! 1. On first access, the memo runs its computation and caches the result.
//!
//! 2. When accessed again, if no dependencies have changed, returns cached value.
//!
//! 3. When a dependency changes, the memo is marked "maybe dirty" and its own
//!    readers are notified in turn.
//!
//! 4. On next access, the memo recomputes.

use std::cell::{Cell, RefCell};
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use super::context::ReactiveContext;
use super::runtime::{next_source_id, Reactive, Runtime};
use super::subscriber::SubscriberId;

/// Dirty state for a memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoState {
    /// The cached value is up-to-date.
    Clean,

    /// A dependency might have changed. Need to check.
    MaybeDirty,

    /// The memo definitely needs to recompute.
    Dirty,
}

struct MemoInner<T> {
    /// Source ID other computations subscribe to.
    id: u64,

    /// The subscriber ID used for tracking this memo's own dependencies.
    subscriber_id: SubscriberId,

    compute: Box<dyn Fn() -> T>,

    /// The cached value (None if never computed).
    value: RefCell<Option<T>>,

    state: Cell<MemoState>,
}

impl<T> Reactive for MemoInner<T> {
    fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }

    fn mark_maybe_dirty(&self) {
        if self.state.get() == MemoState::Clean {
            self.state.set(MemoState::MaybeDirty);
            // Readers only exist while we are clean; pass the change on.
            Runtime::notify_signal_change(self.id);
        }
    }

    fn schedule(&self) {}

    fn is_eager(&self) -> bool {
        false
    }
}

impl<T> Drop for MemoInner<T> {
    fn drop(&mut self) {
        Runtime::unregister(self.subscriber_id);
    }
}

/// A cached derived value that recomputes only when dependencies change.
pub struct Memo<T> {
    inner: Rc<MemoInner<T>>,
}

impl<T> Memo<T>
where
    T: Clone + 'static,
{
    /// Create a new memo with the given computation function.
    ///
    /// The computation is not run immediately. It runs on first access.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let inner = Rc::new(MemoInner {
            id: next_source_id(),
            subscriber_id: SubscriberId::new(),
            compute: Box::new(compute),
            value: RefCell::new(None),
            state: Cell::new(MemoState::Dirty),
        });

        let weak: Weak<dyn Reactive> = Rc::downgrade(&inner) as Weak<dyn Reactive>;
        Runtime::register(weak, inner.subscriber_id);

        Self { inner }
    }

    /// Get the memo's source ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Get the current value, recomputing if necessary.
    pub fn get(&self) -> T {
        if let Some(subscriber_id) = ReactiveContext::current_subscriber() {
            ReactiveContext::track_dependency(self.inner.id);
            Runtime::add_dependency(self.inner.id, subscriber_id);
        }

        if self.inner.state.get() != MemoState::Clean {
            return self.recompute();
        }

        match self.inner.value.borrow().as_ref() {
            Some(value) => value.clone(),
            None => unreachable!("clean memo always holds a value"),
        }
    }

    /// Mark the memo as definitely needing recomputation.
    pub fn mark_dirty(&self) {
        self.inner.state.set(MemoState::Dirty);
    }

    fn recompute(&self) -> T {
        let inner = &self.inner;
        Runtime::clear_dependencies(inner.subscriber_id);

        let new_value = {
            let _ctx = ReactiveContext::enter(inner.subscriber_id);
            (inner.compute)()
        };

        *inner.value.borrow_mut() = Some(new_value.clone());
        inner.state.set(MemoState::Clean);

        new_value
    }

    /// Get the current dirty state.
    pub fn state(&self) -> MemoState {
        self.inner.state.get()
    }

    /// Check if the memo has a cached value.
    pub fn has_value(&self) -> bool {
        self.inner.value.borrow().is_some()
    }
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for Memo<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl<T> Debug for Memo<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.inner.id)
            .field("state", &self.inner.state.get())
            .field("has_value", &self.inner.value.borrow().is_some())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Effect, Signal};

    #[test]
    fn memo_computes_on_first_access() {
        let call_count = Rc::new(Cell::new(0));
        let memo = {
            let call_count = call_count.clone();
            Memo::new(move || {
                call_count.set(call_count.get() + 1);
                42
            })
        };

        // Not computed yet
        assert!(!memo.has_value());
        assert_eq!(call_count.get(), 0);

        assert_eq!(memo.get(), 42);
        assert_eq!(call_count.get(), 1);
        assert!(memo.has_value());

        // Second access should use cache
        assert_eq!(memo.get(), 42);
        assert_eq!(call_count.get(), 1);
    }

    #[test]
    fn memo_goes_dirty_when_source_changes() {
        let source = Signal::new(2);
        let doubled = {
            let source = source.clone();
            Memo::new(move || source.get() * 2)
        };

        assert_eq!(doubled.get(), 4);
        assert_eq!(doubled.state(), MemoState::Clean);

        source.set(5);
        assert_eq!(doubled.state(), MemoState::MaybeDirty);
        assert_eq!(doubled.get(), 10);
    }

    #[test]
    fn effect_reading_memo_reruns_on_source_change() {
        let source = Signal::new(1);
        let plus_one = {
            let source = source.clone();
            Memo::new(move || source.get() + 1)
        };
        let seen = Rc::new(Cell::new(0));

        let _effect = {
            let plus_one = plus_one.clone();
            let seen = seen.clone();
            Effect::new(move || seen.set(plus_one.get()))
        };
        assert_eq!(seen.get(), 2);

        source.set(10);
        assert_eq!(seen.get(), 11);
    }

    #[test]
    fn memo_state_transitions() {
        let memo = Memo::new(|| 42);

        assert_eq!(memo.state(), MemoState::Dirty);

        memo.get();
        assert_eq!(memo.state(), MemoState::Clean);

        memo.mark_dirty();
        assert_eq!(memo.state(), MemoState::Dirty);

        memo.get();
        assert_eq!(memo.state(), MemoState::Clean);
    }
}
