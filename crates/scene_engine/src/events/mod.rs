//! Publish/subscribe primitive used to keep derived scene state current
//!
//! Key principles:
//! - Listeners are plain closures taking the event arguments by reference
//! - Subscribing returns a [`Subscription`]; dropping it unsubscribes
//! - Invocation is synchronous, in subscription order, over a snapshot of
//!   the listener list taken when [`Event::invoke`] starts
//!
//! Snapshot iteration means a listener removed while an invocation is in
//! flight is still called by that invocation, and a listener added while an
//! invocation is in flight is first called by the next one.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

type Callback<A> = Rc<dyn Fn(&A)>;

struct Listener<A> {
    id: u64,
    callback: Callback<A>,
}

type ListenerList<A> = RefCell<Vec<Listener<A>>>;

/// Event carrying arguments of type `A` to every subscribed listener
pub struct Event<A> {
    listeners: Rc<ListenerList<A>>,
    next_listener: Cell<u64>,
}

impl<A: 'static> Event<A> {
    /// Create an event with no listeners
    pub fn new() -> Self {
        Self {
            listeners: Rc::new(RefCell::new(Vec::new())),
            next_listener: Cell::new(0),
        }
    }

    /// Register a listener; it stays registered while the returned handle lives
    #[must_use = "dropping the subscription immediately unsubscribes the listener"]
    pub fn subscribe(&self, callback: impl Fn(&A) + 'static) -> Subscription {
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);

        self.listeners.borrow_mut().push(Listener {
            id,
            callback: Rc::new(callback),
        });

        let weak: Weak<ListenerList<A>> = Rc::downgrade(&self.listeners);
        Subscription {
            remove: Some(Box::new(move || {
                if let Some(listeners) = weak.upgrade() {
                    listeners.borrow_mut().retain(|listener| listener.id != id);
                }
            })),
        }
    }

    /// Call every listener with `args`
    pub fn invoke(&self, args: &A) {
        let snapshot: Vec<Callback<A>> = self
            .listeners
            .borrow()
            .iter()
            .map(|listener| Rc::clone(&listener.callback))
            .collect();

        for callback in snapshot {
            callback(args);
        }
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Whether no listener is registered
    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }

    /// Remove every listener; outstanding subscriptions become no-ops
    pub fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }
}

impl<A: 'static> Default for Event<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for Event<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}

/// Scoped registration of one listener on one [`Event`]
///
/// The listener is removed when the subscription is dropped or
/// [`unsubscribe`](Self::unsubscribe)d. Removing from an event that no
/// longer exists, or removing twice, does nothing.
pub struct Subscription {
    remove: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Remove the listener now
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.remove.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listeners_called_in_subscription_order() {
        let event = Event::<u32>::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let first_log = Rc::clone(&log);
        let _first = event.subscribe(move |value| first_log.borrow_mut().push(("first", *value)));
        let second_log = Rc::clone(&log);
        let _second = event.subscribe(move |value| second_log.borrow_mut().push(("second", *value)));

        event.invoke(&7);

        assert_eq!(*log.borrow(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let event = Event::<()>::new();
        let calls = Rc::new(Cell::new(0));

        let counter = Rc::clone(&calls);
        let subscription = event.subscribe(move |()| counter.set(counter.get() + 1));
        event.invoke(&());
        drop(subscription);
        event.invoke(&());

        assert_eq!(calls.get(), 1);
        assert!(event.is_empty());
    }

    #[test]
    fn test_unsubscribe_after_event_dropped_is_noop() {
        let event = Event::<()>::new();
        let subscription = event.subscribe(|()| {});
        drop(event);
        subscription.unsubscribe();
    }

    #[test]
    fn test_removing_absent_listener_keeps_others() {
        let event = Event::<()>::new();
        let calls = Rc::new(Cell::new(0));

        let stale = event.subscribe(|()| {});
        event.clear();
        let counter = Rc::clone(&calls);
        let _live = event.subscribe(move |()| counter.set(counter.get() + 1));

        stale.unsubscribe();
        assert_eq!(event.listener_count(), 1);
        event.invoke(&());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_removal_during_invoke_uses_snapshot() {
        let event = Rc::new(Event::<()>::new());
        let second_calls = Rc::new(Cell::new(0));
        let second_slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        // First listener removes the second one mid-invocation
        let slot = Rc::clone(&second_slot);
        let _first = event.subscribe(move |()| {
            slot.borrow_mut().take();
        });
        let counter = Rc::clone(&second_calls);
        *second_slot.borrow_mut() = Some(event.subscribe(move |()| counter.set(counter.get() + 1)));

        event.invoke(&());
        assert_eq!(second_calls.get(), 1, "snapshot still delivers to the removed listener");
        assert_eq!(event.listener_count(), 1);

        event.invoke(&());
        assert_eq!(second_calls.get(), 1);
    }

    #[test]
    fn test_listener_added_during_invoke_waits_for_next_invoke() {
        let event = Rc::new(Event::<()>::new());
        let late_calls = Rc::new(Cell::new(0));
        let held: Rc<RefCell<Vec<Subscription>>> = Rc::new(RefCell::new(Vec::new()));

        let weak_event = Rc::downgrade(&event);
        let counter = Rc::clone(&late_calls);
        let store = Rc::clone(&held);
        let _adder = event.subscribe(move |()| {
            if let Some(event) = weak_event.upgrade() {
                if store.borrow().is_empty() {
                    let counter = Rc::clone(&counter);
                    store
                        .borrow_mut()
                        .push(event.subscribe(move |()| counter.set(counter.get() + 1)));
                }
            }
        });

        event.invoke(&());
        assert_eq!(late_calls.get(), 0);

        event.invoke(&());
        assert_eq!(late_calls.get(), 1);
    }
}
