//! In-flight claims used to serialize idempotent event handling.
//!
//! The dispatcher claims `"{correlation_id}:{handler}"` around the
//! check/handle/mark sequence so two consumers delivering the same event to
//! the same handler cannot both observe it as unprocessed.

mod error;
mod in_flight;

pub use error::LockError;
pub use in_flight::{Claim, InFlight};
