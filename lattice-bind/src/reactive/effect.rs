//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change. Every bound node is driven by one.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency changes, the effect re-runs synchronously.
//!
//! 3. Before re-running, the effect clears its old dependencies and tracks
//!    new ones during execution.
//!
//! 4. A change notification that arrives while the effect is already running
//!    is ignored. The run in progress reads the latest values anyway.
//!
//! # Lifetime
//!
//! The runtime only holds weak references. An effect stays alive as long as
//! some [`Effect`] handle does, and stops for good once disposed.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use tracing::trace;

use super::context::ReactiveContext;
use super::runtime::{Reactive, Runtime};
use super::subscriber::SubscriberId;

struct EffectInner {
    subscriber_id: SubscriberId,
    run: Box<dyn Fn()>,
    disposed: Cell<bool>,
    running: Cell<bool>,
    run_count: Cell<usize>,
    dependency_count: Cell<usize>,
}

/// Resets the running flag even if the effect body panics.
struct RunningGuard<'a>(&'a Cell<bool>);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl EffectInner {
    fn execute(&self) {
        if self.disposed.get() {
            return;
        }

        if self.running.get() {
            trace!(subscriber = %self.subscriber_id, "skipping re-entrant effect run");
            return;
        }

        self.running.set(true);
        let _running = RunningGuard(&self.running);

        Runtime::clear_dependencies(self.subscriber_id);

        let dependencies = {
            let _ctx = ReactiveContext::enter(self.subscriber_id);
            (self.run)();
            ReactiveContext::get_dependencies()
        };

        self.dependency_count.set(dependencies.len());
        self.run_count.set(self.run_count.get() + 1);
    }
}

impl Reactive for EffectInner {
    fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }

    fn mark_maybe_dirty(&self) {}

    fn schedule(&self) {
        self.execute();
    }

    fn is_eager(&self) -> bool {
        true
    }
}

impl Drop for EffectInner {
    fn drop(&mut self) {
        Runtime::unregister(self.subscriber_id);
    }
}

/// A side-effecting computation that runs when dependencies change.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use lattice_bind::reactive::{Effect, Signal};
///
/// let count = Signal::new(0);
/// let seen = Rc::new(Cell::new(0));
///
/// let _effect = {
///     let (count, seen) = (count.clone(), seen.clone());
///     Effect::new(move || seen.set(count.get()))
/// };
///
/// count.set(5);
/// assert_eq!(seen.get(), 5);
/// ```
#[derive(Clone)]
pub struct Effect {
    inner: Rc<EffectInner>,
}

impl Effect {
    /// Create a new effect with the given function.
    ///
    /// The function runs immediately to establish initial dependencies.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + 'static,
    {
        let effect = Self::new_lazy(run);
        effect.execute();
        effect
    }

    /// Create a new effect without running it immediately.
    pub fn new_lazy<F>(run: F) -> Self
    where
        F: Fn() + 'static,
    {
        let inner = Rc::new(EffectInner {
            subscriber_id: SubscriberId::new(),
            run: Box::new(run),
            disposed: Cell::new(false),
            running: Cell::new(false),
            run_count: Cell::new(0),
            dependency_count: Cell::new(0),
        });

        let weak: Weak<dyn Reactive> = Rc::downgrade(&inner) as Weak<dyn Reactive>;
        Runtime::register(weak, inner.subscriber_id);

        Self { inner }
    }

    /// Get the subscriber ID for this effect.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.subscriber_id
    }

    /// Execute the effect function within its own tracking context.
    pub fn execute(&self) {
        self.inner.execute();
    }

    /// Schedule the effect to re-run.
    pub fn schedule(&self) {
        self.inner.execute();
    }

    /// Dispose of the effect.
    ///
    /// After disposal, the effect will not run again and holds no
    /// subscriptions.
    pub fn dispose(&self) {
        if !self.inner.disposed.replace(true) {
            trace!(subscriber = %self.inner.subscriber_id, "effect disposed");
            Runtime::unregister(self.inner.subscriber_id);
        }
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.get()
    }

    /// Get the number of distinct sources read during the last run.
    pub fn dependency_count(&self) -> usize {
        self.inner.dependency_count.get()
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("subscriber", &self.inner.subscriber_id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Signal;

    #[test]
    fn effect_runs_on_creation() {
        let run_count = Rc::new(Cell::new(0));
        let _effect = {
            let run_count = run_count.clone();
            Effect::new(move || run_count.set(run_count.get() + 1))
        };

        assert_eq!(run_count.get(), 1);
    }

    #[test]
    fn effect_lazy_does_not_run_on_creation() {
        let run_count = Rc::new(Cell::new(0));
        let effect = {
            let run_count = run_count.clone();
            Effect::new_lazy(move || run_count.set(run_count.get() + 1))
        };

        assert_eq!(run_count.get(), 0);
        assert_eq!(effect.run_count(), 0);

        effect.execute();
        assert_eq!(run_count.get(), 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn effect_does_not_run_after_disposal() {
        let signal = Signal::new(0);
        let run_count = Rc::new(Cell::new(0));

        let effect = {
            let signal = signal.clone();
            let run_count = run_count.clone();
            Effect::new(move || {
                signal.get();
                run_count.set(run_count.get() + 1);
            })
        };
        assert_eq!(signal.subscriber_count(), 1);

        effect.dispose();
        assert!(effect.is_disposed());
        assert_eq!(signal.subscriber_count(), 0);

        signal.set(1);
        effect.schedule();
        assert_eq!(run_count.get(), 1);
    }

    #[test]
    fn effect_tracks_only_latest_dependencies() {
        let use_a = Signal::new(true);
        let a = Signal::new(1);
        let b = Signal::new(2);

        let effect = {
            let (use_a, a, b) = (use_a.clone(), a.clone(), b.clone());
            Effect::new(move || {
                if use_a.get() {
                    a.get();
                } else {
                    b.get();
                }
            })
        };
        assert_eq!(effect.dependency_count(), 2);
        assert_eq!(a.subscriber_count(), 1);

        use_a.set(false);
        assert_eq!(a.subscriber_count(), 0);
        assert_eq!(b.subscriber_count(), 1);
    }

    #[test]
    fn write_during_own_run_is_ignored() {
        let signal = Signal::new(0);
        let effect = {
            let signal = signal.clone();
            Effect::new(move || {
                let current = signal.get();
                if current < 5 {
                    signal.set(current + 1);
                }
            })
        };

        // The nested notification is dropped instead of recursing.
        assert_eq!(effect.run_count(), 1);
        assert_eq!(signal.get_untracked(), 1);
    }

    #[test]
    fn dropping_last_handle_stops_effect() {
        let signal = Signal::new(0);
        let run_count = Rc::new(Cell::new(0));

        {
            let signal = signal.clone();
            let run_count = run_count.clone();
            let _effect = Effect::new(move || {
                signal.get();
                run_count.set(run_count.get() + 1);
            });
        }

        signal.set(1);
        assert_eq!(run_count.get(), 1);
    }
}
