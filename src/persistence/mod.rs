//! Persistence port: the idempotency store behind event dispatch.

mod error;
mod in_memory;
mod persistence;

pub use error::PersistenceError;
pub use in_memory::InMemoryPersistence;
pub use persistence::Persistence;
