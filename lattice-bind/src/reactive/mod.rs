//! Reactive Primitives
//!
//! The cells and computations that keep bound nodes in step with the model.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A [`Signal`] is a writable cell. Reading it inside a running computation
//! records the computation as a subscriber; writing a different value (or
//! calling [`Signal::notify`]) re-runs every subscriber. Observable model
//! values are signals of [`Value`](crate::value::Value).
//!
//! ## Memos
//!
//! A [`Memo`] is a read-only derived cell. It caches its result, recomputes
//! lazily after one of its sources changed, and passes change notifications
//! on to whoever read it.
//!
//! ## Effects
//!
//! An [`Effect`] runs immediately and again, synchronously, whenever a cell
//! it read last time is written. The engine gives every bound node exactly
//! one effect and disposes it when the node is removed.
//!
//! # Tracking
//!
//! Dependencies are found by a thread-local stack of running computations
//! ([`ReactiveContext`]). The [`Runtime`] holds the subscriber table that
//! maps each cell to the computations that read it. Everything here is
//! single-threaded.

mod context;
mod effect;
mod memo;
mod runtime;
mod signal;
mod subscriber;

pub use context::ReactiveContext;
pub use effect::Effect;
pub use memo::{Memo, MemoState};
pub use runtime::{Reactive, Runtime};
pub use signal::Signal;
pub use subscriber::SubscriberId;
