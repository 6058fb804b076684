//! Framework facade: setup, lazy initialization and lifecycle of the bus.

mod framework;

pub use framework::Framework;
