use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use super::{Persistence, PersistenceError};
use crate::message::Message;

/// In-memory idempotency store.
///
/// Cloning yields another handle to the same storage. Records are lost on
/// restart, so this is meant for tests and single-process deployments.
#[derive(Clone, Default)]
pub struct InMemoryPersistence {
    processed: Arc<RwLock<HashSet<(Uuid, String)>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        InMemoryPersistence {
            processed: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Number of recorded (event, handler) pairs.
    pub fn len(&self) -> usize {
        self.processed.read().map(|set| set.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of the handlers that processed the event, sorted.
    pub fn processed_by(&self, correlation_id: Uuid) -> Result<Vec<String>, PersistenceError> {
        let processed = self
            .processed
            .read()
            .map_err(|_| PersistenceError::LockPoisoned("read"))?;
        let mut handlers: Vec<String> = processed
            .iter()
            .filter(|(id, _)| *id == correlation_id)
            .map(|(_, handler)| handler.clone())
            .collect();
        handlers.sort();
        Ok(handlers)
    }

    /// Forget every record (useful for test cleanup).
    pub fn clear(&self) -> Result<(), PersistenceError> {
        self.processed
            .write()
            .map_err(|_| PersistenceError::LockPoisoned("clear"))?
            .clear();
        Ok(())
    }
}

impl Persistence for InMemoryPersistence {
    fn is_processed(&self, correlation_id: Uuid, handler: &str) -> Result<bool, PersistenceError> {
        let processed = self
            .processed
            .read()
            .map_err(|_| PersistenceError::LockPoisoned("read"))?;
        Ok(processed.contains(&(correlation_id, handler.to_string())))
    }

    fn mark_processed(&self, event: &dyn Message, handler: &str) -> Result<(), PersistenceError> {
        self.try_mark_processed(event, handler).map(|_| ())
    }

    fn try_mark_processed(
        &self,
        event: &dyn Message,
        handler: &str,
    ) -> Result<bool, PersistenceError> {
        let mut processed = self
            .processed
            .write()
            .map_err(|_| PersistenceError::LockPoisoned("write"))?;
        Ok(processed.insert((event.header().correlation_id, handler.to_string())))
    }
}
