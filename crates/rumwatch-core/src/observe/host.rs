//! Host environment shared by every lifecycle.

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use super::scheduler::Scheduler;
use crate::time::TimeSource;

/// What the embedding host provides to the core: a capability check for
/// entry types, a time origin, and a way to defer work to the next tick.
///
/// Cheap to clone; clones share the same collaborators.
#[derive(Clone)]
pub struct Host {
    capability: Rc<dyn Fn(&str) -> bool>,
    time_source: Rc<dyn TimeSource>,
    scheduler: Rc<dyn Scheduler>,
}

impl Host {
    /// A host that reports every entry type as supported.
    pub fn new(time_source: Rc<dyn TimeSource>, scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            capability: Rc::new(|_| true),
            time_source,
            scheduler,
        }
    }

    /// Replace the capability check.
    pub fn with_capability(mut self, is_supported: impl Fn(&str) -> bool + 'static) -> Self {
        self.capability = Rc::new(is_supported);
        self
    }

    /// Support exactly the listed entry types.
    pub fn with_supported_entry_types<I, S>(self, entry_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let supported: HashSet<String> = entry_types.into_iter().map(Into::into).collect();
        self.with_capability(move |entry_type| supported.contains(entry_type))
    }

    pub fn is_supported(&self, entry_type: &str) -> bool {
        (self.capability)(entry_type)
    }

    pub fn time_source(&self) -> &dyn TimeSource {
        self.time_source.as_ref()
    }

    pub fn shared_time_source(&self) -> Rc<dyn TimeSource> {
        Rc::clone(&self.time_source)
    }

    pub fn scheduler(&self) -> &dyn Scheduler {
        self.scheduler.as_ref()
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("time_source_available", &self.time_source.is_available())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::MicrotaskQueue;
    use crate::time::ManualTimeSource;

    #[test]
    fn test_default_host_supports_everything() {
        let host = Host::new(Rc::new(ManualTimeSource::new(0.0)), Rc::new(MicrotaskQueue::new()));
        assert!(host.is_supported("largest-contentful-paint"));
        assert!(host.time_source().is_available());
    }

    #[test]
    fn test_supported_entry_types_restricts_capability() {
        let host = Host::new(Rc::new(ManualTimeSource::new(0.0)), Rc::new(MicrotaskQueue::new()))
            .with_supported_entry_types(["paint", "layout-shift"]);
        assert!(host.is_supported("paint"));
        assert!(!host.is_supported("event"));
    }
}
