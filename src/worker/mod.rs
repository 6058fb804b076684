//! Consumer workers feeding the bus from a transport queue.

mod thread;

pub use thread::{ConsumerWorker, WorkerOptions, WorkerStats};
