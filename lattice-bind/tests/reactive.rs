//! Integration Tests for Reactive System
//!
//! These tests verify that signals, memos, and effects work together correctly.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use lattice_bind::reactive::{Effect, Memo, ReactiveContext, Runtime, Signal, SubscriberId};

/// Test that a memo picks up a signal change without manual invalidation.
#[test]
fn memo_tracks_signal_dependency() {
    let signal = Signal::new(10);

    let signal_clone = signal.clone();
    let memo = Memo::new(move || signal_clone.get() * 2);

    assert_eq!(memo.get(), 20);

    signal.set(5);
    assert_eq!(memo.get(), 10);
}

/// Test that an effect re-runs synchronously when a signal it read changes.
#[test]
fn effect_reruns_on_signal_change() {
    let signal = Signal::new(0);
    let observed = Rc::new(Cell::new(-1));

    let effect = {
        let (signal, observed) = (signal.clone(), observed.clone());
        Effect::new(move || observed.set(signal.get()))
    };
    assert_eq!(observed.get(), 0);

    signal.set(42);
    assert_eq!(observed.get(), 42);
    assert_eq!(effect.run_count(), 2);
}

/// Test that writing an equal value does not notify.
#[test]
fn unchanged_value_does_not_notify() {
    let signal = Signal::new("a".to_string());
    let effect = {
        let signal = signal.clone();
        Effect::new(move || {
            signal.get();
        })
    };

    signal.set("a".to_string());
    assert_eq!(effect.run_count(), 1);

    signal.notify();
    assert_eq!(effect.run_count(), 2);
}

/// Test that memos cache values correctly.
#[test]
fn memo_caches_expensive_computation() {
    let compute_count = Rc::new(Cell::new(0));
    let compute_clone = compute_count.clone();

    let memo = Memo::new(move || {
        compute_clone.set(compute_clone.get() + 1);
        42
    });

    assert_eq!(memo.get(), 42);
    assert_eq!(memo.get(), 42);
    assert_eq!(memo.get(), 42);
    assert_eq!(compute_count.get(), 1);
}

/// Test that an effect reading a memo follows the memo's own sources.
#[test]
fn effect_through_memo_chain() {
    let base = Signal::new(5);
    let doubled = {
        let base = base.clone();
        Memo::new(move || base.get() * 2)
    };
    let plus_ten = {
        let doubled = doubled.clone();
        Memo::new(move || doubled.get() + 10)
    };

    let seen = Rc::new(RefCell::new(Vec::new()));
    let _effect = {
        let (plus_ten, seen) = (plus_ten.clone(), seen.clone());
        Effect::new(move || seen.borrow_mut().push(plus_ten.get()))
    };

    base.set(10);
    assert_eq!(*seen.borrow(), vec![20, 30]);
}

/// Test effect disposal stops execution.
#[test]
fn disposed_effect_does_not_run() {
    let signal = Signal::new(0);
    let runs = Rc::new(Cell::new(0));

    let effect = {
        let (signal, runs) = (signal.clone(), runs.clone());
        Effect::new(move || {
            signal.get();
            runs.set(runs.get() + 1);
        })
    };
    assert_eq!(runs.get(), 1);

    effect.dispose();
    signal.set(1);
    effect.schedule();
    assert_eq!(runs.get(), 1);
    assert!(effect.is_disposed());
}

/// Test that a nested effect's reads do not leak into the outer effect.
#[test]
fn nested_effects_track_separately() {
    let outer_source = Signal::new(0);
    let inner_source = Signal::new(0);
    let outer_runs = Rc::new(Cell::new(0));
    let inner: Rc<RefCell<Option<Effect>>> = Rc::default();

    let _outer = {
        let (outer_source, inner_source) = (outer_source.clone(), inner_source.clone());
        let (outer_runs, inner) = (outer_runs.clone(), inner.clone());
        Effect::new(move || {
            outer_source.get();
            outer_runs.set(outer_runs.get() + 1);
            let inner_source = inner_source.clone();
            *inner.borrow_mut() = Some(Effect::new(move || {
                inner_source.get();
            }));
        })
    };

    inner_source.set(1);
    assert_eq!(outer_runs.get(), 1);

    outer_source.set(1);
    assert_eq!(outer_runs.get(), 2);
}

/// Test that untracked reads subscribe nothing.
#[test]
fn untracked_reads_are_invisible() {
    let signal = Signal::new(1);
    let effect = {
        let signal = signal.clone();
        Effect::new(move || {
            ReactiveContext::untracked(|| signal.get());
        })
    };
    assert_eq!(effect.dependency_count(), 0);
    assert_eq!(Runtime::subscriber_count(signal.id()), 0);

    signal.set(2);
    assert_eq!(effect.run_count(), 1);
}

/// Test that ReactiveContext correctly tracks nested computations.
#[test]
fn nested_reactive_contexts() {
    let outer_id = SubscriberId::new();
    let inner_id = SubscriberId::new();

    let _outer_ctx = ReactiveContext::enter(outer_id);
    ReactiveContext::track_dependency(1);
    ReactiveContext::track_dependency(2);

    {
        let _inner_ctx = ReactiveContext::enter(inner_id);
        ReactiveContext::track_dependency(3);
        ReactiveContext::track_dependency(4);

        let inner_deps = ReactiveContext::get_dependencies();
        assert_eq!(inner_deps.len(), 2);
        assert!(inner_deps.contains(&3));
        assert!(inner_deps.contains(&4));
    }

    let outer_deps = ReactiveContext::get_dependencies();
    assert_eq!(outer_deps.len(), 2);
    assert!(outer_deps.contains(&1));
    assert!(outer_deps.contains(&2));
}
