//! Minimal publish/subscribe primitives.
//!
//! Notification is push-based and synchronous: `notify` calls every current
//! subscriber before returning. Fan-out runs over a snapshot of the
//! subscriber list, so callbacks may subscribe, unsubscribe or clear during
//! a pass. A callback removed mid-pass is skipped for the rest of that pass
//! and never invoked again.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: u64,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }
}

struct Subscriber<T: ?Sized> {
    id: u64,
    active: Cell<bool>,
    callback: RefCell<Box<dyn FnMut(&T)>>,
}

impl<T: ?Sized> Subscriber<T> {
    fn invoke(&self, value: &T) -> bool {
        if !self.active.get() {
            return false;
        }
        match self.callback.try_borrow_mut() {
            Ok(mut callback) => {
                (callback)(value);
                true
            }
            Err(_) => {
                tracing::warn!(
                    "Skipping re-entrant notification for subscriber {}",
                    self.id
                );
                false
            }
        }
    }
}

/// Hook fired after every successful `subscribe`.
pub type SubscribeHook = Rc<dyn Fn(Subscription)>;

/// A set of callbacks with synchronous fan-out.
pub struct Subscribable<T: ?Sized> {
    next_id: Cell<u64>,
    subscribers: RefCell<Vec<Rc<Subscriber<T>>>>,
    on_subscribe: RefCell<Option<SubscribeHook>>,
}

impl<T: ?Sized> Subscribable<T> {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(1),
            subscribers: RefCell::new(Vec::new()),
            on_subscribe: RefCell::new(None),
        }
    }

    /// Install the hook run after each new subscription.
    ///
    /// The hook runs outside any internal borrow, so it may notify or
    /// subscribe again.
    pub fn set_on_subscribe(&self, hook: impl Fn(Subscription) + 'static) {
        *self.on_subscribe.borrow_mut() = Some(Rc::new(hook));
    }

    pub fn subscribe(&self, callback: impl FnMut(&T) + 'static) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.subscribers.borrow_mut().push(Rc::new(Subscriber {
            id,
            active: Cell::new(true),
            callback: RefCell::new(Box::new(callback)),
        }));

        let subscription = Subscription { id };
        let hook = self.on_subscribe.borrow().clone();
        if let Some(hook) = hook {
            hook(subscription);
        }
        subscription
    }

    /// Remove a subscriber. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        match subscribers.iter().position(|s| s.id == subscription.id) {
            Some(index) => {
                let removed = subscribers.remove(index);
                removed.active.set(false);
                true
            }
            None => false,
        }
    }

    pub fn is_subscribed(&self, subscription: &Subscription) -> bool {
        self.subscribers
            .borrow()
            .iter()
            .any(|s| s.id == subscription.id)
    }

    /// Current subscriptions in registration order.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.subscribers
            .borrow()
            .iter()
            .map(|s| Subscription { id: s.id })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.subscribers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.borrow().is_empty()
    }

    /// Call every current subscriber. Returns how many were invoked.
    pub fn notify(&self, value: &T) -> usize {
        let snapshot: Vec<_> = self.subscribers.borrow().iter().cloned().collect();
        snapshot.iter().filter(|s| s.invoke(value)).count()
    }

    /// Call a single subscriber, if it is still registered.
    pub fn notify_one(&self, subscription: &Subscription, value: &T) -> bool {
        let target = self
            .subscribers
            .borrow()
            .iter()
            .find(|s| s.id == subscription.id)
            .cloned();
        target.map(|s| s.invoke(value)).unwrap_or(false)
    }

    /// Drop every subscriber, including ones still pending in a running pass.
    pub fn clear(&self) {
        let removed = std::mem::take(&mut *self.subscribers.borrow_mut());
        for subscriber in &removed {
            subscriber.active.set(false);
        }
    }
}

impl<T: ?Sized> Default for Subscribable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Subscribable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribable")
            .field("subscribers", &self.len())
            .finish()
    }
}

/// A [`Subscribable`] whose notifications are either a value or an error.
///
/// Callbacks receive `Result<&T, &E>`, so exactly one of the two is present
/// on every call.
pub struct FallibleSubscribable<T, E> {
    inner: Subscribable<Result<T, E>>,
}

impl<T, E> FallibleSubscribable<T, E> {
    pub fn new() -> Self {
        Self {
            inner: Subscribable::new(),
        }
    }

    pub fn set_on_subscribe(&self, hook: impl Fn(Subscription) + 'static) {
        self.inner.set_on_subscribe(hook);
    }

    pub fn subscribe(&self, mut callback: impl FnMut(Result<&T, &E>) + 'static) -> Subscription
    where
        T: 'static,
        E: 'static,
    {
        self.inner
            .subscribe(move |outcome: &Result<T, E>| callback(outcome.as_ref()))
    }

    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        self.inner.unsubscribe(subscription)
    }

    pub fn is_subscribed(&self, subscription: &Subscription) -> bool {
        self.inner.is_subscribed(subscription)
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.inner.subscriptions()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn notify(&self, outcome: &Result<T, E>) -> usize {
        self.inner.notify(outcome)
    }

    pub fn notify_one(&self, subscription: &Subscription, outcome: &Result<T, E>) -> bool {
        self.inner.notify_one(subscription, outcome)
    }

    pub fn clear(&self) {
        self.inner.clear();
    }
}

impl<T, E> Default for FallibleSubscribable<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for FallibleSubscribable<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallibleSubscribable")
            .field("subscribers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<i32>>>, impl FnMut(&i32) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, move |v: &i32| sink.borrow_mut().push(*v))
    }

    #[test]
    fn test_notify_fans_out_in_order() {
        let subject = Subscribable::<i32>::new();
        let (a, cb_a) = recorder();
        let (b, cb_b) = recorder();
        subject.subscribe(cb_a);
        subject.subscribe(cb_b);

        assert_eq!(subject.notify(&7), 2);
        assert_eq!(*a.borrow(), vec![7]);
        assert_eq!(*b.borrow(), vec![7]);
    }

    #[test]
    fn test_unsubscribed_callback_is_never_called() {
        let subject = Subscribable::<i32>::new();
        let (seen, cb) = recorder();
        let sub = subject.subscribe(cb);

        assert!(subject.unsubscribe(&sub));
        assert!(!subject.unsubscribe(&sub));
        subject.notify(&1);
        assert!(seen.borrow().is_empty());
        assert!(!subject.notify_one(&sub, &1));
    }

    #[test]
    fn test_unsubscribe_during_pass_skips_pending_callback() {
        let subject = Rc::new(Subscribable::<i32>::new());
        let (seen, cb) = recorder();
        let second = Rc::new(Cell::new(None::<Subscription>));

        let remover_subject = Rc::clone(&subject);
        let remover_target = Rc::clone(&second);
        subject.subscribe(move |_| {
            if let Some(sub) = remover_target.get() {
                remover_subject.unsubscribe(&sub);
            }
        });
        second.set(Some(subject.subscribe(cb)));

        assert_eq!(subject.notify(&3), 1);
        assert!(seen.borrow().is_empty());
        assert_eq!(subject.len(), 1);
    }

    #[test]
    fn test_subscriber_added_during_pass_waits_for_next_pass() {
        let subject = Rc::new(Subscribable::<i32>::new());
        let (seen, cb) = recorder();
        let pending = RefCell::new(Some(cb));

        let adder = Rc::clone(&subject);
        subject.subscribe(move |_| {
            if let Some(cb) = pending.borrow_mut().take() {
                adder.subscribe(cb);
            }
        });

        subject.notify(&1);
        assert!(seen.borrow().is_empty());
        subject.notify(&2);
        assert_eq!(*seen.borrow(), vec![2]);
    }

    #[test]
    fn test_clear_during_pass_stops_fan_out() {
        let subject = Rc::new(Subscribable::<i32>::new());
        let (seen, cb) = recorder();

        let clearer = Rc::clone(&subject);
        subject.subscribe(move |_| clearer.clear());
        subject.subscribe(cb);

        subject.notify(&5);
        assert!(seen.borrow().is_empty());
        assert!(subject.is_empty());
    }

    #[test]
    fn test_on_subscribe_hook_fires_after_registration() {
        let subject = Rc::new(Subscribable::<i32>::new());
        let hooked = Rc::new(RefCell::new(Vec::new()));

        let log = Rc::clone(&hooked);
        let weak = Rc::downgrade(&subject);
        subject.set_on_subscribe(move |sub| {
            let registered = weak.upgrade().map(|s| s.is_subscribed(&sub)).unwrap_or(false);
            log.borrow_mut().push((sub.id(), registered));
        });

        let sub = subject.subscribe(|_| {});
        assert_eq!(*hooked.borrow(), vec![(sub.id(), true)]);
    }

    #[test]
    fn test_fallible_delivers_exactly_one_side() {
        let subject = FallibleSubscribable::<u32, String>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        subject.subscribe(move |outcome| {
            sink.borrow_mut().push(match outcome {
                Ok(v) => format!("ok:{v}"),
                Err(e) => format!("err:{e}"),
            })
        });

        subject.notify(&Ok(1));
        subject.notify(&Err("boom".to_string()));
        assert_eq!(*seen.borrow(), vec!["ok:1", "err:boom"]);
    }
}
