//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals, memos, and
//! effects. It manages the dependency graph and schedules updates when
//! signals change.
//!
//! # How It Works
//!
//! 1. When a memo or effect is created, it registers with the runtime.
//!
//! 2. When a memo or effect reads a source (signal or memo), the runtime
//!    records the dependency.
//!
//! 3. When a source changes, the runtime:
//!    a. Finds all dependent memos/effects, in subscription order
//!    b. Marks them as "maybe dirty"
//!    c. Runs effects synchronously
//!    d. Memos are lazy - they recompute on next access
//!
//! # Threading
//!
//! Binding happens on one thread. All tables live in thread-local storage,
//! so each thread owns an independent reactive graph.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexSet;

use super::context::ReactiveContext;
use super::subscriber::SubscriberId;

/// A trait for types that can be notified when dependencies change.
pub trait Reactive {
    /// Get the subscriber ID for this reactive value.
    fn subscriber_id(&self) -> SubscriberId;

    /// Mark this reactive value as potentially needing update.
    fn mark_maybe_dirty(&self);

    /// Schedule this reactive value for execution (effects only).
    fn schedule(&self);

    /// Check if this reactive value is an effect (eager) or memo (lazy).
    fn is_eager(&self) -> bool;
}

/// Generate a new unique source ID.
///
/// Signals and memos share this ID space because both can be read.
pub(crate) fn next_source_id() -> u64 {
    static SOURCE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);
    SOURCE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

thread_local! {
    // Live reactive values. Weak so the registry never keeps a computation alive.
    static REGISTRY: RefCell<HashMap<SubscriberId, Weak<dyn Reactive>>> = RefCell::new(HashMap::new());
    // Source ID -> subscribers, in the order they first subscribed.
    static SUBSCRIBERS: RefCell<HashMap<u64, IndexSet<SubscriberId>>> = RefCell::new(HashMap::new());
    // Reverse index: subscriber -> sources it currently depends on.
    static DEPENDENCIES: RefCell<HashMap<SubscriberId, HashSet<u64>>> = RefCell::new(HashMap::new());
}

/// The reactive runtime.
///
/// A stateless facade over the thread-local dependency tables.
pub struct Runtime;

impl Runtime {
    /// Register a reactive value with the runtime.
    pub fn register(reactive: Weak<dyn Reactive>, id: SubscriberId) {
        REGISTRY.with(|registry| {
            registry.borrow_mut().insert(id, reactive);
        });
    }

    /// Unregister a reactive value and drop all of its subscriptions.
    ///
    /// Safe to call more than once, and during thread teardown.
    pub fn unregister(id: SubscriberId) {
        let _ = REGISTRY.try_with(|registry| {
            registry.borrow_mut().remove(&id);
        });
        Self::clear_dependencies(id);
    }

    /// Record that a subscriber depends on a source.
    ///
    /// Called automatically when a source is read within a reactive context.
    pub fn add_dependency(source_id: u64, subscriber_id: SubscriberId) {
        SUBSCRIBERS.with(|subscribers| {
            subscribers
                .borrow_mut()
                .entry(source_id)
                .or_default()
                .insert(subscriber_id);
        });
        DEPENDENCIES.with(|dependencies| {
            dependencies
                .borrow_mut()
                .entry(subscriber_id)
                .or_default()
                .insert(source_id);
        });
    }

    /// Remove all dependencies for a subscriber.
    ///
    /// Called before re-running a computation to clear stale dependencies.
    pub fn clear_dependencies(subscriber_id: SubscriberId) {
        let sources = DEPENDENCIES
            .try_with(|dependencies| dependencies.borrow_mut().remove(&subscriber_id))
            .ok()
            .flatten();

        let Some(sources) = sources else {
            return;
        };

        let _ = SUBSCRIBERS.try_with(|subscribers| {
            let mut subscribers = subscribers.borrow_mut();
            for source_id in sources {
                if let Some(set) = subscribers.get_mut(&source_id) {
                    set.shift_remove(&subscriber_id);
                    if set.is_empty() {
                        subscribers.remove(&source_id);
                    }
                }
            }
        });
    }

    /// Notify all subscribers that a source changed.
    ///
    /// This is the core update propagation mechanism. Effects run
    /// synchronously, before this call returns.
    pub fn notify_signal_change(source_id: u64) {
        let subscriber_ids: Vec<SubscriberId> = SUBSCRIBERS.with(|subscribers| {
            subscribers
                .borrow()
                .get(&source_id)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default()
        });

        if subscriber_ids.is_empty() {
            return;
        }

        let targets: Vec<Rc<dyn Reactive>> = REGISTRY.with(|registry| {
            let registry = registry.borrow();
            subscriber_ids
                .iter()
                .filter_map(|id| registry.get(id).and_then(Weak::upgrade))
                .collect()
        });

        for reactive in &targets {
            reactive.mark_maybe_dirty();
        }

        for reactive in targets {
            if reactive.is_eager() {
                reactive.schedule();
            }
        }
    }

    /// Number of subscribers currently depending on a source.
    pub fn subscriber_count(source_id: u64) -> usize {
        SUBSCRIBERS.with(|subscribers| {
            subscribers
                .borrow()
                .get(&source_id)
                .map(IndexSet::len)
                .unwrap_or(0)
        })
    }

    /// Check whether a subscriber is still registered.
    pub fn is_registered(id: SubscriberId) -> bool {
        REGISTRY.with(|registry| registry.borrow().contains_key(&id))
    }

    /// Get the current subscriber being tracked, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        ReactiveContext::current_subscriber()
    }

    /// Check if we're inside a reactive context.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }
}
