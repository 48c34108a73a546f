//! Measurement source contract.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::BoxError;

/// Receives raw entries on behalf of a lifecycle.
pub(crate) trait EntryProcessor<E> {
    fn process(&self, entry: E);
}

/// Where a [`MeasurementSource`] delivers raw entries once attached.
///
/// The sink does not keep its lifecycle alive; pushing into a sink whose
/// lifecycle is gone is a no-op.
pub struct EntrySink<E> {
    target: Weak<dyn EntryProcessor<E>>,
}

impl<E> EntrySink<E> {
    pub(crate) fn new(target: Weak<dyn EntryProcessor<E>>) -> Self {
        Self { target }
    }

    /// Deliver one entry. Returns `false` if the lifecycle no longer exists.
    pub fn push(&self, entry: E) -> bool {
        match self.target.upgrade() {
            Some(target) => {
                target.process(entry);
                true
            }
            None => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.target.strong_count() == 0
    }
}

impl<E> Clone for EntrySink<E> {
    fn clone(&self) -> Self {
        Self {
            target: Weak::clone(&self.target),
        }
    }
}

impl<E> fmt::Debug for EntrySink<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntrySink")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// The underlying observation a lifecycle owns, such as a performance
/// observer registered for one entry type.
///
/// `attach` is called at most once, on the first subscription. `detach` is
/// called at most once, on disposal, and only after a successful attach.
pub trait MeasurementSource<E> {
    /// Entry type passed to the host capability check.
    fn entry_type(&self) -> &str;

    fn attach(&mut self, sink: EntrySink<E>) -> Result<(), BoxError>;

    fn detach(&mut self);
}

/// A source the host feeds by hand through a [`PushHandle`].
///
/// Bridges callback-style host APIs: the host keeps the handle and pushes
/// every entry its own observer receives.
pub struct PushSource<E> {
    entry_type: String,
    slot: Rc<RefCell<Option<EntrySink<E>>>>,
}

/// Host side of a [`PushSource`].
pub struct PushHandle<E> {
    slot: Rc<RefCell<Option<EntrySink<E>>>>,
}

impl<E> PushSource<E> {
    pub fn new(entry_type: impl Into<String>) -> (Self, PushHandle<E>) {
        let slot = Rc::new(RefCell::new(None));
        let handle = PushHandle {
            slot: Rc::clone(&slot),
        };
        (
            Self {
                entry_type: entry_type.into(),
                slot,
            },
            handle,
        )
    }
}

impl<E> MeasurementSource<E> for PushSource<E> {
    fn entry_type(&self) -> &str {
        &self.entry_type
    }

    fn attach(&mut self, sink: EntrySink<E>) -> Result<(), BoxError> {
        *self.slot.borrow_mut() = Some(sink);
        Ok(())
    }

    fn detach(&mut self) {
        self.slot.borrow_mut().take();
    }
}

impl<E> PushHandle<E> {
    /// Push an entry. Returns `false` while the source is not attached.
    pub fn push(&self, entry: E) -> bool {
        let sink = self.slot.borrow().clone();
        match sink {
            Some(sink) => sink.push(entry),
            None => false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.slot
            .borrow()
            .as_ref()
            .map(|sink| !sink.is_closed())
            .unwrap_or(false)
    }
}

impl<E> Clone for PushHandle<E> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<E> fmt::Debug for PushHandle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushHandle")
            .field("attached", &self.is_attached())
            .finish()
    }
}
