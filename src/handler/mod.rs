//! Handler contract and dependency injection.
//!
//! A [`Handler`] is registered by type and instantiated by the bus for every
//! invocation, receiving a [`Bus`](crate::Bus) handle and the frozen
//! [`Dependencies`] map. Dependencies are bound once during setup through a
//! [`DependencyRegistry`] and broadcast when the bus is initialized.

mod dependencies;
mod handler;
mod handler_type;

pub use dependencies::{Dependencies, DependencyRegistry};
pub use handler::Handler;
pub use handler_type::HandlerType;
pub(crate) use handler_type::ErasedHandler;
