//! Handler registry: message type -> handler type(s).

use std::any::TypeId;
use std::collections::HashMap;

use tracing::info;

use crate::error::BusError;
use crate::handler::{Handler, HandlerType};
use crate::message::{Command, Event, Named};

struct CommandRoute {
    message: &'static str,
    handler: HandlerType,
}

struct EventRoute {
    message: &'static str,
    handlers: Vec<HandlerType>,
}

/// In-memory mapping from message type to handler types.
///
/// Commands map to exactly one handler; events map to an ordered list of
/// handlers, in registration order, which is also dispatch order.
#[derive(Default)]
pub struct HandlerRegistry {
    commands: HashMap<TypeId, CommandRoute>,
    events: HashMap<TypeId, EventRoute>,
    // Registration order of event types, for stable listings.
    event_order: Vec<TypeId>,
    // Event handler name -> handler type. Names key the processed records.
    event_handler_names: HashMap<&'static str, TypeId>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for command `C`.
    ///
    /// Fails with `CommandAlreadyRegistered` if `C` already has a handler;
    /// the first registration stays in place.
    pub fn register_command_handler<C, H>(&mut self) -> Result<(), BusError>
    where
        C: Command + Named,
        H: Handler<Message = C>,
    {
        let key = TypeId::of::<C>();
        if self.commands.contains_key(&key) {
            return Err(BusError::CommandAlreadyRegistered(C::NAME));
        }

        info!(command = C::NAME, handler = H::name(), "registering command handler");
        self.commands.insert(
            key,
            CommandRoute {
                message: C::NAME,
                handler: HandlerType::of::<H>(),
            },
        );
        Ok(())
    }

    /// Append `H` to the handlers of event `E`.
    ///
    /// Registering the same handler type twice for the same event is a no-op.
    /// Fails with `HandlerNameConflict` if a different handler type already
    /// uses `H::name()`.
    pub fn register_event_handler<E, H>(&mut self) -> Result<(), BusError>
    where
        E: Event + Named,
        H: Handler<Message = E>,
    {
        let key = TypeId::of::<E>();
        let handler = HandlerType::of::<H>();

        match self.event_handler_names.get(handler.name()) {
            Some(existing) if *existing == handler.type_id() => return Ok(()),
            Some(_) => return Err(BusError::HandlerNameConflict(handler.name())),
            None => {}
        }

        if !self.events.contains_key(&key) {
            self.event_order.push(key);
        }
        let route = self.events.entry(key).or_insert_with(|| EventRoute {
            message: E::NAME,
            handlers: Vec::new(),
        });

        info!(event = E::NAME, handler = H::name(), "registering event handler");
        route.handlers.push(handler);
        self.event_handler_names.insert(handler.name(), handler.type_id());
        Ok(())
    }

    /// The handler registered for the command type, if any.
    pub fn resolve_command_handler(&self, command: TypeId) -> Option<&HandlerType> {
        self.commands.get(&command).map(|route| &route.handler)
    }

    /// The handlers registered for the event type, in registration order.
    pub fn resolve_event_handlers(&self, event: TypeId) -> &[HandlerType] {
        self.events
            .get(&event)
            .map(|route| route.handlers.as_slice())
            .unwrap_or(&[])
    }

    /// Every registered handler type, commands first. May repeat a handler
    /// that is registered for several events.
    pub fn handler_types(&self) -> impl Iterator<Item = &HandlerType> {
        self.commands
            .values()
            .map(|route| &route.handler)
            .chain(
                self.event_order
                    .iter()
                    .filter_map(|key| self.events.get(key))
                    .flat_map(|route| route.handlers.iter()),
            )
    }

    /// Listing of routes, for logs and diagnostics.
    pub fn summary(&self) -> HandlerSummary {
        let mut commands: Vec<(&'static str, &'static str)> = self
            .commands
            .values()
            .map(|route| (route.message, route.handler.name()))
            .collect();
        commands.sort_unstable();

        let events = self
            .event_order
            .iter()
            .filter_map(|key| self.events.get(key))
            .map(|route| {
                (
                    route.message,
                    route.handlers.iter().map(|h| h.name()).collect(),
                )
            })
            .collect();

        HandlerSummary { commands, events }
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.events.is_empty()
    }
}

/// Routes known to a registry: command -> handler, event -> handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerSummary {
    pub commands: Vec<(&'static str, &'static str)>,
    pub events: Vec<(&'static str, Vec<&'static str>)>,
}
