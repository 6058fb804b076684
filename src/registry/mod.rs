//! Handler registry.

mod registry;

pub use registry::{HandlerRegistry, HandlerSummary};
