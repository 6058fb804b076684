//! Transport integration tests.
//!
//! Messages published through the framework reach a `ConsumerWorker`,
//! which decodes them and submits them to the bus.

#[path = "../dispatch/support.rs"]
mod support;
