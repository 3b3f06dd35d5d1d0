//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a signal is read,
//! we can register the current computation as a dependent.
//!
//! # Implementation
//!
//! We use a thread-local stack to track the currently executing computation.
//! When entering a reactive context (e.g., running a memo or effect), we push
//! the subscriber onto the stack. When the computation completes, we pop it.
//!
//! A suspended entry (pushed by [`ReactiveContext::untracked`]) hides every
//! outer computation, so reads made inside it are not recorded anywhere.

use std::cell::RefCell;

use super::SubscriberId;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the reactive context stack.
#[derive(Debug, Clone)]
struct ContextEntry {
    /// The running computation, or `None` while tracking is suspended.
    subscriber_id: Option<SubscriberId>,
    /// Source IDs read during this computation, in first-read order.
    dependencies: Vec<u64>,
}

/// Guard that pops the context when dropped.
///
/// This ensures the context stack is properly maintained even if
/// the computation panics.
pub struct ReactiveContext {
    subscriber_id: Option<SubscriberId>,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given subscriber.
    ///
    /// While this context is active, any signals that are read will
    /// register the subscriber as a dependent.
    pub fn enter(subscriber_id: SubscriberId) -> Self {
        Self::push(Some(subscriber_id))
    }

    /// Suspend dependency tracking until the returned guard is dropped.
    pub fn suspend() -> Self {
        Self::push(None)
    }

    /// Run `f` without recording any dependencies.
    pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
        let _guard = Self::suspend();
        f()
    }

    fn push(subscriber_id: Option<SubscriberId>) -> Self {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry {
                subscriber_id,
                dependencies: Vec::new(),
            });
        });

        Self { subscriber_id }
    }

    /// Check if there is an active (non-suspended) reactive context.
    pub fn is_active() -> bool {
        Self::current_subscriber().is_some()
    }

    /// Get the current subscriber ID, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().and_then(|entry| entry.subscriber_id))
    }

    /// Record a dependency on the given source.
    ///
    /// This is called by signals and memos when they are read.
    pub fn track_dependency(source_id: u64) {
        CONTEXT_STACK.with(|stack| {
            if let Some(entry) = stack.borrow_mut().last_mut() {
                if entry.subscriber_id.is_some() && !entry.dependencies.contains(&source_id) {
                    entry.dependencies.push(source_id);
                }
            }
        });
    }

    /// Get the dependencies collected in the current context.
    pub fn get_dependencies() -> Vec<u64> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|entry| entry.dependencies.clone())
                .unwrap_or_default()
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let _ = CONTEXT_STACK.try_with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.subscriber_id, self.subscriber_id,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.subscriber_id, entry.subscriber_id
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_tracks_subscriber() {
        let id = SubscriberId::new();

        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_subscriber().is_none());

        {
            let _ctx = ReactiveContext::enter(id);

            assert!(ReactiveContext::is_active());
            assert_eq!(ReactiveContext::current_subscriber(), Some(id));
        }

        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_subscriber().is_none());
    }

    #[test]
    fn context_deduplicates_dependencies() {
        let id = SubscriberId::new();
        let _ctx = ReactiveContext::enter(id);

        ReactiveContext::track_dependency(1);
        ReactiveContext::track_dependency(2);
        ReactiveContext::track_dependency(1);
        ReactiveContext::track_dependency(3);

        assert_eq!(ReactiveContext::get_dependencies(), vec![1, 2, 3]);
    }

    #[test]
    fn suspended_context_hides_outer_subscriber() {
        let id = SubscriberId::new();
        let _ctx = ReactiveContext::enter(id);

        ReactiveContext::untracked(|| {
            assert!(!ReactiveContext::is_active());
            ReactiveContext::track_dependency(7);
        });

        assert_eq!(ReactiveContext::current_subscriber(), Some(id));
        assert!(ReactiveContext::get_dependencies().is_empty());
    }

    #[test]
    fn nested_contexts() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();

        {
            let _ctx1 = ReactiveContext::enter(id1);
            assert_eq!(ReactiveContext::current_subscriber(), Some(id1));

            {
                let _ctx2 = ReactiveContext::enter(id2);
                assert_eq!(ReactiveContext::current_subscriber(), Some(id2));
            }

            assert_eq!(ReactiveContext::current_subscriber(), Some(id1));
        }

        assert!(ReactiveContext::current_subscriber().is_none());
    }
}
