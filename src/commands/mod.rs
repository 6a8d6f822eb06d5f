//! Synchronous user actions over a [`MappingSession`].
//!
//! Every action returns an [`ActionOutcome`]: a success flag plus a report
//! with the table's mapped/unmapped/disabled counts and any conflicts. Input
//! errors (no skeleton selected, unknown bone, bad threshold) fail the
//! action before the table is touched.

mod detect;
mod edit;
mod persist;
mod report;
mod session;
mod validate;

pub use report::{ActionOutcome, ActionReport};
pub use session::MappingSession;
