//! Metric lifecycle state machine.
//!
//! A [`MetricLifecycle`] owns exactly one [`MeasurementSource`] and turns
//! its raw entries into reports.
//!
//! ## State Transitions
//!
//! ```text
//! Uninitialized -> Starting -> (Active | Failed) -> Disposed
//! ```
//!
//! The source is only attached when the first subscriber arrives. The most
//! recent outcome (report or error) sits in a single cache slot and is
//! replayed, through the host scheduler, to every subscriber that joins
//! later.
//!
//! Outcomes produced while subscribers are being notified (a callback that
//! makes the source emit again) are queued and delivered after the current
//! pass, so every subscriber sees every outcome once and in order.
//!
//! Handlers should return `Err` for bad entries. A panicking handler is
//! caught and reported as [`MetricError::Processing`] when the build
//! unwinds; under `panic = "abort"` it aborts.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use super::host::Host;
use super::source::{EntryProcessor, EntrySink, MeasurementSource};
use super::subscribable::{FallibleSubscribable, Subscription};
use crate::error::{BoxError, MetricError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Uninitialized,
    Starting,
    Active,
    /// The source could not be attached. Terminal until disposal.
    Failed,
    Disposed,
}

/// Turns one raw entry into a report.
pub type Handler<E, T> = Box<dyn FnMut(&E) -> Result<T, BoxError>>;

type Outcome<T> = Rc<Result<T, MetricError>>;

struct LifecycleInner<E, T> {
    name: String,
    entry_type: String,
    host: Host,
    state: Cell<LifecycleState>,
    source: RefCell<Option<Box<dyn MeasurementSource<E>>>>,
    attached: Cell<bool>,
    handler: RefCell<Handler<E, T>>,
    subscribers: FallibleSubscribable<T, MetricError>,
    last: RefCell<Option<Outcome<T>>>,
    /// Bumped on every synchronous fan-out.
    deliveries: Cell<u64>,
    notifying: Cell<bool>,
    pending: RefCell<VecDeque<Outcome<T>>>,
}

/// Clears the fan-out flag even if a subscriber panics.
struct FanOut<'a>(&'a Cell<bool>);

impl Drop for FanOut<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Owns one measurement source and publishes the reports built from it.
///
/// Dropping the lifecycle disposes it.
pub struct MetricLifecycle<E: 'static, T: 'static> {
    inner: Rc<LifecycleInner<E, T>>,
}

/// Non-owning handle to a lifecycle, safe to capture inside callbacks.
pub struct LifecycleHandle<E: 'static, T: 'static> {
    inner: Weak<LifecycleInner<E, T>>,
}

impl<E: 'static, T: 'static> MetricLifecycle<E, T> {
    pub fn new(
        name: impl Into<String>,
        source: impl MeasurementSource<E> + 'static,
        handler: impl FnMut(&E) -> Result<T, BoxError> + 'static,
        host: Host,
    ) -> Self {
        let entry_type = source.entry_type().to_string();
        let source: Box<dyn MeasurementSource<E>> = Box::new(source);
        let handler: Handler<E, T> = Box::new(handler);
        let inner = Rc::new(LifecycleInner {
            name: name.into(),
            entry_type,
            host,
            state: Cell::new(LifecycleState::Uninitialized),
            source: RefCell::new(Some(source)),
            attached: Cell::new(false),
            handler: RefCell::new(handler),
            subscribers: FallibleSubscribable::new(),
            last: RefCell::new(None),
            deliveries: Cell::new(0),
            notifying: Cell::new(false),
            pending: RefCell::new(VecDeque::new()),
        });

        let weak = Rc::downgrade(&inner);
        inner.subscribers.set_on_subscribe(move |subscription| {
            if let Some(inner) = weak.upgrade() {
                inner.on_subscribe(subscription);
            }
        });

        Self { inner }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn entry_type(&self) -> &str {
        &self.inner.entry_type
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.state.get()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Register a callback. The first call starts the measurement source.
    ///
    /// Never invokes `callback` before returning: a cached outcome is
    /// delivered on the next scheduler tick.
    pub fn subscribe(
        &self,
        callback: impl FnMut(Result<&T, &MetricError>) + 'static,
    ) -> Subscription {
        self.inner.subscribers.subscribe(callback)
    }

    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        self.inner.subscribers.unsubscribe(subscription)
    }

    /// Detach the source, drop subscribers and the cached outcome.
    /// Calling it again is a no-op.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn handle(&self) -> LifecycleHandle<E, T> {
        LifecycleHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl<E: 'static, T: 'static> Drop for MetricLifecycle<E, T> {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

impl<E: 'static, T: 'static> fmt::Debug for MetricLifecycle<E, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricLifecycle")
            .field("name", &self.inner.name)
            .field("entry_type", &self.inner.entry_type)
            .field("state", &self.inner.state.get())
            .field("subscribers", &self.inner.subscribers.len())
            .finish()
    }
}

impl<E: 'static, T: 'static> LifecycleHandle<E, T> {
    /// State of the lifecycle, or `Disposed` once it has been dropped.
    pub fn state(&self) -> LifecycleState {
        self.inner
            .upgrade()
            .map(|inner| inner.state.get())
            .unwrap_or(LifecycleState::Disposed)
    }

    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        self.inner
            .upgrade()
            .map(|inner| inner.subscribers.unsubscribe(subscription))
            .unwrap_or(false)
    }

    pub fn dispose(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.dispose();
        }
    }
}

impl<E: 'static, T: 'static> Clone for LifecycleHandle<E, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<E: 'static, T: 'static> LifecycleInner<E, T> {
    fn on_subscribe(self: &Rc<Self>, subscription: Subscription) {
        match self.state.get() {
            LifecycleState::Uninitialized => {
                self.start();
                // Anything produced while starting reaches subscribers on the next tick.
                for subscription in self.subscribers.subscriptions() {
                    self.schedule_replay(subscription);
                }
            }
            LifecycleState::Active | LifecycleState::Failed => self.schedule_replay(subscription),
            LifecycleState::Starting => {}
            LifecycleState::Disposed => {
                tracing::warn!(
                    "Subscription {} to disposed metric '{}' will never be notified",
                    subscription.id(),
                    self.name
                );
            }
        }
    }

    fn start(self: &Rc<Self>) {
        self.state.set(LifecycleState::Starting);
        tracing::debug!("Starting metric '{}' ({})", self.name, self.entry_type);

        if !self.host.is_supported(&self.entry_type) {
            tracing::info!(
                "Metric '{}' unsupported: host cannot observe '{}'",
                self.name,
                self.entry_type
            );
            self.fail(MetricError::UnsupportedMetric {
                metric: self.name.clone(),
                entry_type: self.entry_type.clone(),
            });
            return;
        }

        if !self.host.time_source().is_available() {
            tracing::info!("Metric '{}' unsupported: no time origin", self.name);
            self.fail(MetricError::UnsupportedTimeSource {
                metric: self.name.clone(),
            });
            return;
        }

        let weak: Weak<dyn EntryProcessor<E>> = Rc::downgrade(self) as Weak<dyn EntryProcessor<E>>;
        let sink = EntrySink::new(weak);
        let attached = {
            let mut source = self.source.borrow_mut();
            match source.as_mut() {
                Some(source) => source.attach(sink),
                None => return,
            }
        };

        if self.state.get() == LifecycleState::Disposed {
            // Disposed from inside `attach`; the source is still in its slot.
            let source = self.source.borrow_mut().take();
            if let (Ok(()), Some(mut source)) = (&attached, source) {
                source.detach();
            }
            tracing::debug!("Metric '{}' disposed while attaching", self.name);
            return;
        }

        match attached {
            Ok(()) => {
                self.attached.set(true);
                self.state.set(LifecycleState::Active);
                tracing::debug!("Metric '{}' active", self.name);
            }
            Err(source) => {
                tracing::warn!("Metric '{}' failed to attach: {}", self.name, source);
                self.fail(MetricError::AttachFailed {
                    metric: self.name.clone(),
                    source,
                });
            }
        }
    }

    fn fail(&self, error: MetricError) {
        self.state.set(LifecycleState::Failed);
        *self.last.borrow_mut() = Some(Rc::new(Err(error)));
    }

    fn schedule_replay(self: &Rc<Self>, subscription: Subscription) {
        if self.last.borrow().is_none() {
            return;
        }
        let generation = self.deliveries.get();
        let weak = Rc::downgrade(self);
        self.host.scheduler().defer(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.replay(subscription, generation);
            }
        }));
    }

    fn replay(&self, subscription: Subscription, generation: u64) {
        if self.state.get() == LifecycleState::Disposed {
            return;
        }
        if self.deliveries.get() != generation {
            // A newer outcome was already fanned out to this subscriber.
            tracing::trace!(
                "Skipping replay for subscription {} of '{}'",
                subscription.id(),
                self.name
            );
            return;
        }
        let last = self.last.borrow().clone();
        if let Some(outcome) = last {
            self.subscribers.notify_one(&subscription, &outcome);
        }
    }

    fn dispose(&self) {
        if self.state.replace(LifecycleState::Disposed) == LifecycleState::Disposed {
            return;
        }

        let source = match self.source.try_borrow_mut() {
            Ok(mut slot) => slot.take(),
            Err(_) => {
                // `start` detaches once `attach` returns.
                tracing::debug!("Metric '{}' disposed while its source is attaching", self.name);
                None
            }
        };
        if let Some(mut source) = source {
            if self.attached.replace(false) {
                source.detach();
            }
        }

        self.subscribers.clear();
        self.pending.borrow_mut().clear();
        self.last.borrow_mut().take();
        tracing::debug!("Metric '{}' disposed", self.name);
    }
}

impl<E: 'static, T: 'static> EntryProcessor<E> for LifecycleInner<E, T> {
    fn process(&self, entry: E) {
        match self.state.get() {
            LifecycleState::Starting | LifecycleState::Active => {}
            state => {
                tracing::trace!("Dropping entry for '{}' in state {:?}", self.name, state);
                return;
            }
        }

        let result = match self.handler.try_borrow_mut() {
            Ok(mut handler) => {
                match panic::catch_unwind(AssertUnwindSafe(|| (handler)(&entry))) {
                    Ok(result) => result,
                    Err(payload) => Err(panic_message(&*payload).into()),
                }
            }
            Err(_) => {
                tracing::warn!("Dropping re-entrant entry for '{}'", self.name);
                return;
            }
        };
        if self.state.get() == LifecycleState::Disposed {
            tracing::trace!("Dropping outcome for '{}': disposed by its handler", self.name);
            return;
        }

        let outcome = Rc::new(result.map_err(|source| {
            tracing::warn!("Failed to process entry for '{}': {}", self.name, source);
            MetricError::Processing {
                metric: self.name.clone(),
                source,
            }
        }));
        *self.last.borrow_mut() = Some(Rc::clone(&outcome));

        if self.state.get() == LifecycleState::Active {
            self.pending.borrow_mut().push_back(outcome);
            self.deliver_pending();
        }
    }
}

impl<E: 'static, T: 'static> LifecycleInner<E, T> {
    /// Fan out queued outcomes in arrival order. Re-entrant calls only queue.
    fn deliver_pending(&self) {
        if self.notifying.replace(true) {
            return;
        }
        let _fan_out = FanOut(&self.notifying);
        while self.state.get() == LifecycleState::Active {
            let next = self.pending.borrow_mut().pop_front();
            match next {
                Some(outcome) => {
                    self.deliveries.set(self.deliveries.get() + 1);
                    self.subscribers.notify(&outcome);
                }
                None => break,
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str));
    match detail {
        Some(detail) => format!("handler panicked: {detail}"),
        None => "handler panicked".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::{MicrotaskQueue, PushHandle, PushSource};
    use crate::time::ManualTimeSource;

    type Seen = Rc<RefCell<Vec<String>>>;

    fn host() -> (Host, MicrotaskQueue) {
        let queue = MicrotaskQueue::new();
        let host = Host::new(Rc::new(ManualTimeSource::new(0.0)), Rc::new(queue.clone()));
        (host, queue)
    }

    fn doubling(host: Host) -> (MetricLifecycle<i64, i64>, PushHandle<i64>) {
        let (source, handle) = PushSource::new("test-entry");
        let lifecycle = MetricLifecycle::new(
            "TEST",
            source,
            |entry: &i64| {
                if *entry < 0 {
                    Err("negative entry".into())
                } else {
                    Ok(entry * 2)
                }
            },
            host,
        );
        (lifecycle, handle)
    }

    fn recorder(seen: &Seen) -> impl FnMut(Result<&i64, &MetricError>) + 'static {
        let seen = Rc::clone(seen);
        move |outcome: Result<&i64, &MetricError>| {
            seen.borrow_mut().push(match outcome {
                Ok(v) => format!("ok:{v}"),
                Err(e) => format!("err:{}", e.metric()),
            })
        }
    }

    #[test]
    fn test_source_untouched_without_subscribers() {
        let (host, _queue) = host();
        let (lifecycle, handle) = doubling(host);

        assert_eq!(lifecycle.state(), LifecycleState::Uninitialized);
        assert!(!handle.is_attached());
        assert!(!handle.push(1));
    }

    #[test]
    fn test_first_subscribe_attaches_and_delivers_synchronously() {
        let (host, _queue) = host();
        let (lifecycle, handle) = doubling(host);
        let seen: Seen = Rc::default();

        lifecycle.subscribe(recorder(&seen));
        assert_eq!(lifecycle.state(), LifecycleState::Active);
        assert!(handle.is_attached());

        handle.push(21);
        assert_eq!(*seen.borrow(), vec!["ok:42"]);
    }

    #[test]
    fn test_late_subscriber_gets_one_deferred_replay() {
        let (host, queue) = host();
        let (lifecycle, handle) = doubling(host);
        let first: Seen = Rc::default();
        let late: Seen = Rc::default();

        lifecycle.subscribe(recorder(&first));
        handle.push(5);

        lifecycle.subscribe(recorder(&late));
        assert!(late.borrow().is_empty());

        assert_eq!(queue.run_until_idle(), 1);
        assert_eq!(*late.borrow(), vec!["ok:10"]);
        assert_eq!(*first.borrow(), vec!["ok:10"]);
    }

    #[test]
    fn test_replay_skipped_when_newer_outcome_arrived() {
        let (host, queue) = host();
        let (lifecycle, handle) = doubling(host);
        let late: Seen = Rc::default();

        lifecycle.subscribe(|_| {});
        handle.push(1);
        lifecycle.subscribe(recorder(&late));
        handle.push(2);

        queue.run_until_idle();
        assert_eq!(*late.borrow(), vec!["ok:4"]);
    }

    #[test]
    fn test_unsubscribed_before_replay_gets_nothing() {
        let (host, queue) = host();
        let (lifecycle, handle) = doubling(host);
        let late: Seen = Rc::default();

        lifecycle.subscribe(|_| {});
        handle.push(1);
        let sub = lifecycle.subscribe(recorder(&late));
        lifecycle.unsubscribe(&sub);

        queue.run_until_idle();
        assert!(late.borrow().is_empty());
    }

    #[test]
    fn test_processing_error_keeps_source_attached() {
        let (host, _queue) = host();
        let (lifecycle, handle) = doubling(host);
        let seen: Seen = Rc::default();

        lifecycle.subscribe(recorder(&seen));
        handle.push(-1);
        handle.push(3);

        assert_eq!(*seen.borrow(), vec!["err:TEST", "ok:6"]);
        assert_eq!(lifecycle.state(), LifecycleState::Active);
    }

    #[test]
    fn test_unsupported_metric_is_replayed_to_everyone() {
        let (host, queue) = host();
        let host = host.with_supported_entry_types(["paint"]);
        let (lifecycle, handle) = doubling(host);
        let first: Seen = Rc::default();
        let second: Seen = Rc::default();

        lifecycle.subscribe(recorder(&first));
        assert_eq!(lifecycle.state(), LifecycleState::Failed);
        assert!(first.borrow().is_empty());
        assert!(!handle.is_attached());

        lifecycle.subscribe(recorder(&second));
        queue.run_until_idle();
        assert_eq!(*first.borrow(), vec!["err:TEST"]);
        assert_eq!(*second.borrow(), vec!["err:TEST"]);
    }

    #[test]
    fn test_missing_time_origin_fails_start() {
        let queue = MicrotaskQueue::new();
        let host = Host::new(Rc::new(ManualTimeSource::unavailable()), Rc::new(queue.clone()));
        let (lifecycle, _handle) = doubling(host);
        let kinds = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&kinds);
        lifecycle.subscribe(move |outcome| {
            if let Err(e) = outcome {
                sink.borrow_mut()
                    .push(matches!(e, MetricError::UnsupportedTimeSource { .. }));
            }
        });
        queue.run_until_idle();
        assert_eq!(*kinds.borrow(), vec![true]);
    }

    #[test]
    fn test_dispose_from_callback() {
        let (host, _queue) = host();
        let (lifecycle, handle) = doubling(host);
        let seen: Seen = Rc::default();

        let lifecycle_handle = lifecycle.handle();
        lifecycle.subscribe(move |_| lifecycle_handle.dispose());
        lifecycle.subscribe(recorder(&seen));

        handle.push(1);
        assert!(seen.borrow().is_empty());
        assert_eq!(lifecycle.state(), LifecycleState::Disposed);
        assert!(!handle.is_attached());
        assert_eq!(lifecycle.subscriber_count(), 0);
    }

    #[test]
    fn test_dispose_is_idempotent_and_drops_replay() {
        let (host, queue) = host();
        let (lifecycle, handle) = doubling(host);
        let late: Seen = Rc::default();

        lifecycle.subscribe(|_| {});
        handle.push(1);
        lifecycle.subscribe(recorder(&late));
        lifecycle.dispose();
        lifecycle.dispose();

        queue.run_until_idle();
        assert!(late.borrow().is_empty());
        assert!(!handle.push(2));
    }

    /// Source that emits one entry from inside `attach`.
    struct EagerSource {
        refuse: bool,
        detaches: Rc<Cell<u32>>,
        sink: Rc<RefCell<Option<EntrySink<i64>>>>,
    }

    impl MeasurementSource<i64> for EagerSource {
        fn entry_type(&self) -> &str {
            "test-entry"
        }

        fn attach(&mut self, sink: EntrySink<i64>) -> Result<(), BoxError> {
            sink.push(7);
            if self.refuse {
                return Err("observer quota exhausted".into());
            }
            *self.sink.borrow_mut() = Some(sink);
            Ok(())
        }

        fn detach(&mut self) {
            self.detaches.set(self.detaches.get() + 1);
            self.sink.borrow_mut().take();
        }
    }

    fn disposing_on_first_entry(
        host: Host,
        refuse: bool,
    ) -> (MetricLifecycle<i64, i64>, Rc<Cell<u32>>, Rc<RefCell<Option<EntrySink<i64>>>>) {
        let detaches = Rc::new(Cell::new(0));
        let sink = Rc::new(RefCell::new(None));
        let source = EagerSource {
            refuse,
            detaches: Rc::clone(&detaches),
            sink: Rc::clone(&sink),
        };
        let slot: Rc<RefCell<Option<LifecycleHandle<i64, i64>>>> = Rc::default();
        let own = Rc::clone(&slot);
        let lifecycle = MetricLifecycle::new(
            "TEST",
            source,
            move |entry: &i64| {
                if let Some(handle) = own.borrow().as_ref() {
                    handle.dispose();
                }
                Ok(*entry)
            },
            host,
        );
        *slot.borrow_mut() = Some(lifecycle.handle());
        (lifecycle, detaches, sink)
    }

    #[test]
    fn test_dispose_during_attach_detaches_once_attach_returns() {
        let (host, queue) = host();
        let (lifecycle, detaches, sink) = disposing_on_first_entry(host, false);
        let seen: Seen = Rc::default();

        lifecycle.subscribe(recorder(&seen));
        queue.run_until_idle();

        assert_eq!(lifecycle.state(), LifecycleState::Disposed);
        assert_eq!(detaches.get(), 1);
        assert!(sink.borrow().is_none());
        assert!(seen.borrow().is_empty());

        drop(lifecycle);
        assert_eq!(detaches.get(), 1);
    }

    #[test]
    fn test_dispose_during_failed_attach_stays_disposed() {
        let (host, queue) = host();
        let (lifecycle, detaches, _sink) = disposing_on_first_entry(host, true);
        let seen: Seen = Rc::default();

        lifecycle.subscribe(recorder(&seen));
        queue.run_until_idle();

        assert_eq!(lifecycle.state(), LifecycleState::Disposed);
        assert_eq!(detaches.get(), 0);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_outcome_emitted_from_callback_reaches_everyone_in_order() {
        let (host, _queue) = host();
        let (lifecycle, handle) = doubling(host);
        let first: Seen = Rc::default();
        let second: Seen = Rc::default();

        let mut record = recorder(&first);
        let feeder = handle.clone();
        lifecycle.subscribe(move |outcome: Result<&i64, &MetricError>| {
            record(outcome);
            if matches!(outcome, Ok(&2)) {
                feeder.push(2);
            }
        });
        lifecycle.subscribe(recorder(&second));

        handle.push(1);
        assert_eq!(*first.borrow(), vec!["ok:2", "ok:4"]);
        assert_eq!(*second.borrow(), vec!["ok:2", "ok:4"]);
    }

    #[test]
    fn test_panicking_handler_becomes_processing_error() {
        let (host, _queue) = host();
        let (source, handle) = PushSource::new("test-entry");
        let lifecycle = MetricLifecycle::new(
            "TEST",
            source,
            |entry: &i64| {
                if *entry == 13 {
                    panic!("unlucky entry");
                }
                Ok(*entry)
            },
            host,
        );
        let messages = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&messages);
        lifecycle.subscribe(move |outcome| {
            sink.borrow_mut().push(match outcome {
                Ok(v) => format!("ok:{v}"),
                Err(e) => e.to_string(),
            })
        });
        handle.push(13);
        handle.push(5);

        let messages = messages.borrow();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("handler panicked: unlucky entry"));
        assert_eq!(messages[1], "ok:5");
        assert_eq!(lifecycle.state(), LifecycleState::Active);
    }

    #[test]
    fn test_handle_reports_disposed_after_drop() {
        let (host, _queue) = host();
        let (lifecycle, handle) = doubling(host);
        lifecycle.subscribe(|_| {});
        let lifecycle_handle = lifecycle.handle();

        drop(lifecycle);
        assert_eq!(lifecycle_handle.state(), LifecycleState::Disposed);
        assert!(!handle.is_attached());
    }
}
