#![forbid(unsafe_code)]

//! Change-notification primitives.
//!
//! [`Notifier<E>`] is a single-threaded broadcast list: subscribers register
//! a callback and receive every subsequent [`emit`](Notifier::emit).
//! Callbacks are held as `Weak` references and kept alive by the
//! [`Subscription`] guard returned from `subscribe`, so unsubscription is a
//! drop, never an explicit call that can be forgotten.
//!
//! # Invariants
//!
//! 1. Subscribers are notified in registration order.
//! 2. Dropping a `Subscription` removes the callback before the next emit.
//! 3. Emit snapshots the live subscriber list first, so a callback may
//!    subscribe or unsubscribe (including dropping its own guard)
//!    re-entrantly without aliasing panics.
//! 4. Dead entries are pruned lazily, during emit and counting.
//!
//! # Failure Modes
//!
//! - A panicking callback propagates to the emitter; no poisoning (plain
//!   `RefCell`, single thread).
//! - Emitting with zero subscribers is a no-op.

use core::fmt;
use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

struct Callback<E>(Box<dyn Fn(&E)>);

/// Single-threaded event broadcast with RAII unsubscription.
pub struct Notifier<E> {
    subscribers: RefCell<Vec<Weak<Callback<E>>>>,
}

/// Guard for one [`Notifier`] subscription.
///
/// The callback stays registered for as long as the guard is alive.
#[must_use = "dropping a Subscription immediately unsubscribes its callback"]
pub struct Subscription {
    _keep: Rc<dyn Any>,
}

impl<E: 'static> Notifier<E> {
    /// Create a notifier with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: RefCell::new(Vec::new()),
        }
    }

    /// Register `callback` for future emits.
    pub fn subscribe(&self, callback: impl Fn(&E) + 'static) -> Subscription {
        let cb: Rc<Callback<E>> = Rc::new(Callback(Box::new(callback)));
        self.subscribers.borrow_mut().push(Rc::downgrade(&cb));
        Subscription { _keep: cb }
    }

    /// Deliver `event` to every live subscriber, in registration order.
    pub fn emit(&self, event: &E) {
        let live: Vec<Rc<Callback<E>>> = {
            let mut subs = self.subscribers.borrow_mut();
            subs.retain(|weak| weak.strong_count() > 0);
            subs.iter().filter_map(Weak::upgrade).collect()
        };
        for cb in live {
            (cb.0)(event);
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        let mut subs = self.subscribers.borrow_mut();
        subs.retain(|weak| weak.strong_count() > 0);
        subs.len()
    }
}

impl<E: 'static> Default for Notifier<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Notifier<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("subscribers", &self.subscribers.borrow().len())
            .finish()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn delivers_in_registration_order() {
        let n = Notifier::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l1 = Rc::clone(&log);
        let _s1 = n.subscribe(move |v: &i32| l1.borrow_mut().push(("first", *v)));
        let l2 = Rc::clone(&log);
        let _s2 = n.subscribe(move |v: &i32| l2.borrow_mut().push(("second", *v)));

        n.emit(&7);
        assert_eq!(*log.borrow(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn drop_unsubscribes_before_next_emit() {
        let n = Notifier::new();
        let seen = Rc::new(Cell::new(0));

        let s = Rc::clone(&seen);
        let sub = n.subscribe(move |v: &i32| s.set(*v));
        n.emit(&1);
        assert_eq!(seen.get(), 1);

        drop(sub);
        n.emit(&2);
        assert_eq!(seen.get(), 1, "callback must not fire after drop");
        assert_eq!(n.subscriber_count(), 0);
    }

    #[test]
    fn reentrant_subscribe_during_emit() {
        let n = Rc::new(Notifier::new());
        let held = Rc::new(RefCell::new(Vec::new()));

        let n2 = Rc::clone(&n);
        let h2 = Rc::clone(&held);
        let _outer = n.subscribe(move |_: &()| {
            let sub = n2.subscribe(|_: &()| {});
            h2.borrow_mut().push(sub);
        });

        n.emit(&());
        assert_eq!(n.subscriber_count(), 2);
    }

    #[test]
    fn reentrant_drop_during_emit() {
        let n = Rc::new(Notifier::new());
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let s2 = Rc::clone(&slot);
        let sub = n.subscribe(move |_: &()| {
            // Drop our own guard mid-delivery.
            *s2.borrow_mut() = None;
        });
        *slot.borrow_mut() = Some(sub);

        n.emit(&());
        assert_eq!(n.subscriber_count(), 0);
    }

    #[test]
    fn emit_with_no_subscribers_is_noop() {
        let n: Notifier<i32> = Notifier::new();
        n.emit(&1);
        assert_eq!(n.subscriber_count(), 0);
    }
}
