//! The dispatcher: routing, idempotent event delivery and error recovery.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::recovery::ErrorHandlers;
use crate::error::BusError;
use crate::handler::{Dependencies, HandlerType};
use crate::lock::InFlight;
use crate::message::{Message, MessageKind, Reply};
use crate::persistence::Persistence;
use crate::registry::{HandlerRegistry, HandlerSummary};

struct BusInner {
    registry: HandlerRegistry,
    dependencies: Arc<Dependencies>,
    persistence: Arc<dyn Persistence>,
    error_handlers: ErrorHandlers,
    in_flight: InFlight,
}

/// Message bus - routes commands and events to their handlers.
///
/// Commands go to exactly one handler and its reply is returned. Events go
/// to every registered handler in registration order; each (event, handler)
/// pair runs at most once across redeliveries, tracked through the
/// [`Persistence`] port. The first failing event handler stops the fan-out.
///
/// Failures are looked up by [`ErrorKind`](crate::ErrorKind) in the
/// recovery table; a registered function absorbs the error and its return
/// value becomes the result.
///
/// `Bus` is a cheap handle: clones share the same frozen registry, and
/// handlers receive one so they can dispatch from inside `handle`.
///
/// ## Example
///
/// ```ignore
/// let reply = bus.handle(&CreateUser::new("John Doe", "johndoe@me.com"))?;
/// let user = reply.unwrap();
/// let user = user.downcast_ref::<CreateUserResponse>().unwrap();
/// ```
#[derive(Clone)]
pub struct Bus {
    inner: Arc<BusInner>,
}

impl std::fmt::Debug for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus").finish_non_exhaustive()
    }
}

impl Bus {
    /// Build a bus from a frozen registry and dependency set.
    pub fn new(
        registry: HandlerRegistry,
        dependencies: Arc<Dependencies>,
        persistence: Arc<dyn Persistence>,
        error_handlers: ErrorHandlers,
    ) -> Self {
        Self {
            inner: Arc::new(BusInner {
                registry,
                dependencies,
                persistence,
                error_handlers,
                in_flight: InFlight::new(),
            }),
        }
    }

    /// Dispatch a message, applying error recovery on failure.
    ///
    /// Returns the command handler's reply for commands and `None` for
    /// events.
    pub fn handle(&self, message: &dyn Message) -> Result<Option<Reply>, BusError> {
        let name = message.message_name();
        info!(
            message = name,
            correlation_id = %message.header().correlation_id,
            "handling message"
        );
        debug!(payload = ?message, "message payload");

        match self.dispatch(message) {
            Ok(reply) => Ok(reply),
            Err(err) => {
                error!(message = name, error = %err, "error handling message");
                match self.inner.error_handlers.get(err.kind()) {
                    Some(recover) => {
                        warn!(message = name, kind = ?err.kind(), "error recovered by error handler");
                        Ok(recover(err))
                    }
                    None => Err(err),
                }
            }
        }
    }

    /// Routes known to this bus.
    pub fn handlers(&self) -> HandlerSummary {
        self.inner.registry.summary()
    }

    /// The dependencies handed to every handler.
    pub fn dependencies(&self) -> &Dependencies {
        &self.inner.dependencies
    }

    fn dispatch(&self, message: &dyn Message) -> Result<Option<Reply>, BusError> {
        match message.kind() {
            MessageKind::Command => self.dispatch_command(message),
            MessageKind::Event => self.dispatch_event(message).map(|()| None),
            MessageKind::CommandResponse => Err(BusError::UnroutableMessage {
                name: message.message_name(),
                kind: MessageKind::CommandResponse,
            }),
        }
    }

    fn dispatch_command(&self, command: &dyn Message) -> Result<Option<Reply>, BusError> {
        let handler_type = self
            .inner
            .registry
            .resolve_command_handler(command.as_any().type_id())
            .ok_or(BusError::UnhandledCommand(command.message_name()))?;

        let mut handler = self.instantiate(handler_type)?;
        handler
            .handle_erased(command)
            .map_err(|source| BusError::Handler {
                handler: handler_type.name(),
                source,
            })
    }

    fn dispatch_event(&self, event: &dyn Message) -> Result<(), BusError> {
        let correlation_id = event.header().correlation_id;
        let handler_types = self
            .inner
            .registry
            .resolve_event_handlers(event.as_any().type_id());

        if handler_types.is_empty() {
            debug!(event = event.message_name(), "no handlers registered for event");
        }

        for handler_type in handler_types {
            let key = format!("{}:{}", correlation_id, handler_type.name());
            let claim = self
                .inner
                .in_flight
                .claim(key)
                .map_err(|_| BusError::LockPoisoned("in-flight claim"))?;
            let Some(_claim) = claim else {
                debug!(
                    handler = handler_type.name(),
                    %correlation_id,
                    "event already in flight on this thread, skipping"
                );
                continue;
            };

            let mut handler = self.instantiate(handler_type)?;

            if self
                .inner
                .persistence
                .is_processed(correlation_id, handler_type.name())?
            {
                debug!(
                    handler = handler_type.name(),
                    %correlation_id,
                    "event already processed, skipping"
                );
                continue;
            }

            let reply = handler
                .handle_erased(event)
                .map_err(|source| BusError::Handler {
                    handler: handler_type.name(),
                    source,
                })?;
            if let Some(reply) = reply {
                debug!(
                    handler = handler_type.name(),
                    reply = reply.message_name(),
                    "discarding reply from event handler"
                );
            }

            self.inner
                .persistence
                .mark_processed(event, handler_type.name())?;
        }

        Ok(())
    }

    fn instantiate(
        &self,
        handler_type: &HandlerType,
    ) -> Result<Box<dyn crate::handler::ErasedHandler>, BusError> {
        handler_type
            .instantiate(self, &self.inner.dependencies)
            .map_err(|source| BusError::Handler {
                handler: handler_type.name(),
                source,
            })
    }
}
