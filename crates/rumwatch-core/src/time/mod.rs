//! Time model.
//!
//! Every timing measurement is built on two immutable value objects:
//!
//! - [`TimeValue`]: an instant, held both relative to the host time origin
//!   and as an absolute wall-clock value.
//! - [`TimeSegment`]: an interval between two instants with a derived,
//!   never-negative duration.
//!
//! Both need a [`TimeSource`] to resolve the origin. A source without an
//! origin is a hard failure, never a silent zero.

mod segment;
mod source;
mod value;

pub use segment::TimeSegment;
pub use source::{ManualTimeSource, SystemTimeSource, TimeSource};
pub use value::{TimeOffset, TimeValue};
