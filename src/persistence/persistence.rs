use uuid::Uuid;

use super::PersistenceError;
use crate::message::Message;

/// Port for the idempotency store consulted by the dispatcher.
///
/// Records which (event, handler) pairs have completed so that redelivered
/// events are not applied twice by the same handler. The dispatcher calls
/// `is_processed` before and `mark_processed` after each handler, holding
/// an in-process claim on the pair in between; that claim does not reach
/// other processes sharing the store.
pub trait Persistence: Send + Sync {
    /// Whether `handler` already processed the event with `correlation_id`.
    fn is_processed(&self, correlation_id: Uuid, handler: &str) -> Result<bool, PersistenceError>;

    /// Record that `handler` processed `event`.
    fn mark_processed(&self, event: &dyn Message, handler: &str) -> Result<(), PersistenceError>;

    /// Atomically record the pair if absent.
    ///
    /// Returns `true` if this call inserted the record, `false` if it was
    /// already present. The dispatcher does not call it; it is the
    /// primitive for consumers in several processes sharing one store,
    /// where the in-process claim does not apply. Stores that support
    /// conditional inserts should override this; the default is
    /// check-then-mark and not atomic.
    fn try_mark_processed(
        &self,
        event: &dyn Message,
        handler: &str,
    ) -> Result<bool, PersistenceError> {
        if self.is_processed(event.header().correlation_id, handler)? {
            return Ok(false);
        }
        self.mark_processed(event, handler)?;
        Ok(true)
    }
}

impl<P: Persistence + ?Sized> Persistence for std::sync::Arc<P> {
    fn is_processed(&self, correlation_id: Uuid, handler: &str) -> Result<bool, PersistenceError> {
        (**self).is_processed(correlation_id, handler)
    }

    fn mark_processed(&self, event: &dyn Message, handler: &str) -> Result<(), PersistenceError> {
        (**self).mark_processed(event, handler)
    }

    fn try_mark_processed(
        &self,
        event: &dyn Message,
        handler: &str,
    ) -> Result<bool, PersistenceError> {
        (**self).try_mark_processed(event, handler)
    }
}
