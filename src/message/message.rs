//! The message taxonomy routed by the bus.

use std::any::Any;
use std::fmt;

use super::header::Header;

/// Closed tag the dispatcher switches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// A request for exactly one effectful operation, routed to one handler.
    Command,
    /// A fact that occurred, routed to zero or more handlers.
    Event,
    /// The result of a command handler. Never dispatched.
    CommandResponse,
}

/// Access to the concrete type behind a trait object.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Static routing name of a message type.
///
/// Implemented by the message derives; kept apart from `Message` so that
/// `dyn Message` stays object safe.
pub trait Named {
    const NAME: &'static str;
}

/// Anything that travels through the bus.
///
/// Usually implemented with `#[derive(Command)]`, `#[derive(Event)]` or
/// `#[derive(CommandResponse)]`.
pub trait Message: AsAny + Send + Sync + fmt::Debug + 'static {
    fn header(&self) -> &Header;

    fn kind(&self) -> MessageKind;

    fn message_name(&self) -> &'static str;
}

/// Marker for command messages.
pub trait Command: Message {}

/// Marker for event messages.
pub trait Event: Message {}

/// Marker for command responses.
pub trait CommandResponse: Message {}

/// What a handler hands back to the caller of `Bus::handle`.
pub type Reply = Box<dyn Message>;

impl dyn Message {
    /// Returns `true` if the message is of type `T`.
    pub fn is<T: Message>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Downcast to the concrete message type.
    pub fn downcast_ref<T: Message>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Identity of the message is its correlation id.
    pub fn same_as(&self, other: &dyn Message) -> bool {
        self.header() == other.header()
    }
}

/// Box a message into a `Reply`.
pub fn reply<M: Message>(message: M) -> Option<Reply> {
    Some(Box::new(message))
}
