//! Error types for the dispatch bus.
//!
//! `BusError` is what every public operation returns. Each variant maps to a
//! closed `ErrorKind`, which is the key used by the recovery table consulted
//! when a dispatch fails.

use std::error::Error;

use thiserror::Error;

use crate::config::ConfigError;
use crate::message::MessageKind;
use crate::persistence::PersistenceError;
use crate::transport::TransportError;

/// Closed set of error kinds. Recovery functions are registered per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A command type, dependency name or event handler name was registered twice.
    AlreadyRegistered,
    /// A setup-time operation was attempted after the bus was built.
    AlreadyInitialized,
    /// A handler declared a dependency that was never bound.
    MissingDependency,
    /// The message could not be routed (no command handler, wrong kind, undecodable).
    InvalidMessage,
    /// A handler failed while being constructed or while handling.
    HandlerFailure,
    /// The persistence port failed.
    Persistence,
    /// The transport port failed.
    Transport,
    /// Configuration could not be loaded.
    Config,
    /// An internal lock was poisoned by a panicking thread.
    LockPoisoned,
    /// The framework has been shut down.
    ShutDown,
}

/// Error returned by bus, registry and framework operations.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("command '{0}' is already registered")]
    CommandAlreadyRegistered(&'static str),

    #[error("dependency '{0}' is already registered")]
    DependencyAlreadyRegistered(String),

    /// Two distinct event handler types share a name, and with it their
    /// processed records.
    #[error("event handler name '{0}' is taken by another handler type, override Handler::name")]
    HandlerNameConflict(&'static str),

    #[error("bus already initialized, cannot {0}")]
    AlreadyInitialized(&'static str),

    #[error("handler '{handler}' requires dependency '{dependency}' which is not registered")]
    MissingDependency {
        handler: &'static str,
        dependency: &'static str,
    },

    #[error("no handler registered for command '{0}'")]
    UnhandledCommand(&'static str),

    #[error("message '{name}' of kind {kind:?} cannot be dispatched")]
    UnroutableMessage {
        name: &'static str,
        kind: MessageKind,
    },

    #[error("unknown message type '{0}'")]
    UnknownMessageType(String),

    #[error("failed to decode message '{message_type}': {reason}")]
    Decode {
        message_type: String,
        reason: String,
    },

    #[error("handler '{handler}' failed: {source}")]
    Handler {
        handler: &'static str,
        #[source]
        source: HandlerError,
    },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("lock poisoned during {0}")]
    LockPoisoned(&'static str),

    #[error("framework has been shut down")]
    ShutDown,
}

impl BusError {
    /// The closed kind of this error, used to look up recovery functions.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BusError::CommandAlreadyRegistered(_)
            | BusError::DependencyAlreadyRegistered(_)
            | BusError::HandlerNameConflict(_) => ErrorKind::AlreadyRegistered,
            BusError::AlreadyInitialized(_) => ErrorKind::AlreadyInitialized,
            BusError::MissingDependency { .. } => ErrorKind::MissingDependency,
            BusError::UnhandledCommand(_)
            | BusError::UnroutableMessage { .. }
            | BusError::UnknownMessageType(_)
            | BusError::Decode { .. } => ErrorKind::InvalidMessage,
            BusError::Handler { .. } => ErrorKind::HandlerFailure,
            BusError::Persistence(_) => ErrorKind::Persistence,
            BusError::Transport(_) => ErrorKind::Transport,
            BusError::Config(_) => ErrorKind::Config,
            BusError::LockPoisoned(_) => ErrorKind::LockPoisoned,
            BusError::ShutDown => ErrorKind::ShutDown,
        }
    }

    /// The handler error wrapped by a `HandlerFailure`, if any.
    pub fn handler_error(&self) -> Option<&HandlerError> {
        match self {
            BusError::Handler { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Error raised by a handler while being constructed or while handling.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Business logic rejected the message (validation, invariant violation).
    #[error("rejected: {0}")]
    Rejected(String),

    /// A resource the handler needed was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Payload decode failed.
    #[error("decode failed: {0}")]
    DecodeFailed(String),

    /// A named dependency was not bound.
    #[error("missing dependency '{0}'")]
    MissingDependency(String),

    /// A named dependency was bound to a value of another type.
    #[error("dependency '{name}' is not a {expected}")]
    DependencyType {
        name: String,
        expected: &'static str,
    },

    /// The handler received a message of a type it was not registered for.
    #[error("expected message '{expected}', got '{actual}'")]
    UnexpectedMessage {
        expected: &'static str,
        actual: &'static str,
    },

    /// A nested dispatch issued by the handler failed.
    #[error("nested dispatch failed: {0}")]
    Dispatch(Box<BusError>),

    /// Other error.
    #[error("handler error: {0}")]
    Other(Box<dyn Error + Send + Sync>),
}

impl HandlerError {
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn other(err: impl Error + Send + Sync + 'static) -> Self {
        Self::Other(Box::new(err))
    }
}

impl From<BusError> for HandlerError {
    fn from(err: BusError) -> Self {
        HandlerError::Dispatch(Box::new(err))
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::DecodeFailed(err.to_string())
    }
}
