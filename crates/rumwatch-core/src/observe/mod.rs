//! Observation layer: subscription primitives, host collaborators and the
//! metric lifecycle built on top of them.
//!
//! Everything here is single-threaded (`Rc`/`RefCell`). The only deferred
//! work is replaying a cached outcome to a late subscriber, which goes
//! through the host [`Scheduler`].

mod host;
mod lifecycle;
mod scheduler;
mod source;
mod subscribable;

pub use host::Host;
pub use lifecycle::{Handler, LifecycleHandle, LifecycleState, MetricLifecycle};
pub use scheduler::{MicrotaskQueue, Scheduler, Task};
pub use source::{EntrySink, MeasurementSource, PushHandle, PushSource};
pub use subscribable::{FallibleSubscribable, SubscribeHook, Subscribable, Subscription};
