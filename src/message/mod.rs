//! Message model: the tagged shapes that flow through the bus.
//!
//! Every message carries a [`Header`] (correlation id, version, routing
//! metadata) and exposes its [`MessageKind`]. Concrete messages are plain
//! structs that derive one of `Command`, `Event` or `CommandResponse`:
//!
//! ```ignore
//! use message_bus::{Command, Header};
//!
//! #[derive(Debug, Command)]
//! pub struct CreateUser {
//!     pub header: Header,
//!     pub name: String,
//!     pub email: String,
//! }
//! ```

mod header;
mod message;

pub use header::{Header, Metadata};
pub use message::{
    reply, AsAny, Command, CommandResponse, Event, Message, MessageKind, Named, Reply,
};
