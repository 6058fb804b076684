//! Dispatch integration tests.
//!
//! Exercises the bus through the `Framework` facade:
//! - Command routing and replies
//! - Event fan-out, ordering and idempotent redelivery
//! - Error recovery by error kind
//! - Dependency injection and setup lifecycle
//! - Concurrent initialization and delivery

mod support;
mod commands;
mod dependencies;
mod framework;
