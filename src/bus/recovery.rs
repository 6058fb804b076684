//! Error-kind -> recovery function table.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{BusError, ErrorKind};
use crate::message::Reply;

/// A recovery function. Its return value replaces the failed dispatch result.
pub type RecoveryFn = Arc<dyn Fn(BusError) -> Option<Reply> + Send + Sync>;

/// Recovery functions keyed by error kind. The last registration for a kind
/// wins.
#[derive(Clone, Default)]
pub struct ErrorHandlers {
    handlers: HashMap<ErrorKind, RecoveryFn>,
}

impl ErrorHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `recover` for `kind`, replacing any earlier function.
    pub fn insert<F>(&mut self, kind: ErrorKind, recover: F)
    where
        F: Fn(BusError) -> Option<Reply> + Send + Sync + 'static,
    {
        if self.handlers.insert(kind, Arc::new(recover)).is_some() {
            debug!(?kind, "replacing error handler");
        }
    }

    pub fn get(&self, kind: ErrorKind) -> Option<&RecoveryFn> {
        self.handlers.get(&kind)
    }

    pub fn contains(&self, kind: ErrorKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for ErrorHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}
