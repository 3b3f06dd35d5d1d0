//! Subscriber identifiers.
//!
//! Every computation that reads cells (a memo, an effect, and through them
//! every bound node) is known to the runtime by a [`SubscriberId`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of one computation in the subscriber table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Allocate a fresh identifier. Identifiers are never reused.
    pub fn new() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_fresh_and_ordered() {
        let first = SubscriberId::new();
        let second = SubscriberId::new();
        assert_ne!(first, second);
        assert!(second > first);
    }

    #[test]
    fn display_names_the_computation() {
        let id = SubscriberId::new();
        assert_eq!(id.to_string(), format!("sub#{}", id.raw()));
    }
}
