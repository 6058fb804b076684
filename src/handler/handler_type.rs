use std::any::TypeId;
use std::fmt;

use crate::bus::Bus;
use crate::error::HandlerError;
use crate::message::{Message, Reply};

use super::dependencies::Dependencies;
use super::handler::{short_type_name, Handler};

/// Object-safe view of a constructed handler.
pub(crate) trait ErasedHandler: Send {
    fn handle_erased(&mut self, message: &dyn Message) -> Result<Option<Reply>, HandlerError>;
}

impl<H: Handler> ErasedHandler for H {
    fn handle_erased(&mut self, message: &dyn Message) -> Result<Option<Reply>, HandlerError> {
        let typed = message.downcast_ref::<H::Message>().ok_or_else(|| {
            HandlerError::UnexpectedMessage {
                expected: short_type_name(std::any::type_name::<H::Message>()),
                actual: message.message_name(),
            }
        })?;
        self.handle(typed)
    }
}

type Build = fn(&Bus, &Dependencies) -> Result<Box<dyn ErasedHandler>, HandlerError>;

fn build<H: Handler>(bus: &Bus, deps: &Dependencies) -> Result<Box<dyn ErasedHandler>, HandlerError> {
    Ok(Box::new(H::new(bus.clone(), deps)?))
}

/// A registered handler type: identity, name, declared dependencies and a
/// constructor. Instances are built per invocation.
#[derive(Clone, Copy)]
pub struct HandlerType {
    type_id: TypeId,
    name: &'static str,
    requires: &'static [&'static str],
    build: Build,
}

impl HandlerType {
    pub fn of<H: Handler>() -> Self {
        HandlerType {
            type_id: TypeId::of::<H>(),
            name: H::name(),
            requires: H::REQUIRES,
            build: build::<H>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn requires(&self) -> &'static [&'static str] {
        self.requires
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub(crate) fn instantiate(
        &self,
        bus: &Bus,
        deps: &Dependencies,
    ) -> Result<Box<dyn ErasedHandler>, HandlerError> {
        (self.build)(bus, deps)
    }
}

impl PartialEq for HandlerType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for HandlerType {}

impl fmt::Debug for HandlerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerType")
            .field("name", &self.name)
            .field("requires", &self.requires)
            .finish()
    }
}
