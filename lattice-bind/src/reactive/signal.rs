//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive: a writable cell that
//! tracks which computations read it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a reactive context (memo/effect), the
//!    signal registers that context as a subscriber.
//!
//! 2. When a signal's value changes, all subscribers are notified.
//!
//! 3. Notifications trigger re-execution of dependent computations before
//!    `set` returns.
//!
//! Writing a value equal to the current one is not a change and notifies
//! nobody. Use [`Signal::notify`] after mutating shared contents in place.

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use super::context::ReactiveContext;
use super::runtime::{next_source_id, Runtime};

/// A reactive signal holding a value of type T.
///
/// # Example
///
/// ```rust
/// use lattice_bind::reactive::Signal;
///
/// let count = Signal::new(0);
/// assert_eq!(count.get(), 0);
///
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Signal<T> {
    /// Unique identifier for this signal.
    id: u64,

    /// The current value, shared between clones.
    value: Rc<RefCell<T>>,
}

impl<T> Signal<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            id: next_source_id(),
            value: Rc::new(RefCell::new(value)),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get the current value.
    ///
    /// If called within a reactive context, this also registers the
    /// current computation as a subscriber.
    pub fn get(&self) -> T {
        self.track();
        self.value.borrow().clone()
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.value.borrow().clone()
    }

    /// Set a new value and notify subscribers if it changed.
    pub fn set(&self, value: T) {
        let changed = {
            let mut guard = self.value.borrow_mut();
            if *guard == value {
                false
            } else {
                *guard = value;
                true
            }
        };

        if changed {
            Runtime::notify_signal_change(self.id);
        }
    }

    /// Update the value using a function.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let new_value = {
            let guard = self.value.borrow();
            f(&guard)
        };
        self.set(new_value);
    }

    /// Notify subscribers unconditionally.
    pub fn notify(&self) {
        Runtime::notify_signal_change(self.id);
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        Runtime::subscriber_count(self.id)
    }

    fn track(&self) {
        if let Some(subscriber_id) = ReactiveContext::current_subscriber() {
            ReactiveContext::track_dependency(self.id);
            Runtime::add_dependency(self.id, subscriber_id);
        }
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Rc::clone(&self.value),
        }
    }
}

impl<T> PartialEq for Signal<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Debug for Signal<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("value", &*self.value.borrow())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Effect;
    use std::cell::Cell;

    #[test]
    fn signal_get_and_set() {
        let signal = Signal::new(0);
        assert_eq!(signal.get(), 0);

        signal.set(42);
        assert_eq!(signal.get(), 42);
    }

    #[test]
    fn signal_update() {
        let signal = Signal::new(10);
        signal.update(|v| v + 5);
        assert_eq!(signal.get(), 15);
    }

    #[test]
    fn signal_reruns_dependent_effect() {
        let signal = Signal::new(0);
        let seen = Rc::new(Cell::new(-1));

        let _effect = {
            let signal = signal.clone();
            let seen = seen.clone();
            Effect::new(move || seen.set(signal.get()))
        };
        assert_eq!(seen.get(), 0);

        signal.set(7);
        assert_eq!(seen.get(), 7);
    }

    #[test]
    fn equal_write_does_not_notify() {
        let signal = Signal::new(3);
        let runs = Rc::new(Cell::new(0));

        let _effect = {
            let signal = signal.clone();
            let runs = runs.clone();
            Effect::new(move || {
                signal.get();
                runs.set(runs.get() + 1);
            })
        };

        signal.set(3);
        assert_eq!(runs.get(), 1);

        signal.notify();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn untracked_read_does_not_subscribe() {
        let signal = Signal::new(1);
        let _effect = {
            let signal = signal.clone();
            Effect::new(move || {
                signal.get_untracked();
            })
        };
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn signal_clone_shares_state() {
        let signal1 = Signal::new(0);
        let signal2 = signal1.clone();

        signal1.set(42);
        assert_eq!(signal2.get(), 42);
        assert_eq!(signal1, signal2);
    }

    #[test]
    fn signal_ids_are_unique() {
        let s1 = Signal::new(0);
        let s2 = Signal::new(0);

        assert_ne!(s1.id(), s2.id());
        assert_ne!(s1, s2);
    }
}
