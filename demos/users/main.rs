//! Users demo: a command handler that stores a user and emits an event,
//! and an event handler that logs it.
//!
//! Run with `RUST_LOG=debug` to see every dispatch step.

use std::error::Error;
use std::sync::{Arc, Mutex};

use message_bus::{
    logging, reply, Bus, BusConfig, Command, CommandResponse, Dependencies, Event, Framework,
    Handler, HandlerError, Header, InMemoryPersistence, InMemoryTransport, Reply,
};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Command)]
struct CreateNewUser {
    header: Header,
    name: String,
    email: String,
}

#[derive(Debug, CommandResponse)]
struct CreateNewUserResponse {
    header: Header,
    id: String,
    name: String,
    email: String,
}

#[derive(Debug, Event)]
struct NewUserCreated {
    header: Header,
    id: String,
    name: String,
    email: String,
}

#[derive(Debug, Clone)]
struct User {
    id: String,
    name: String,
    email: String,
}

/// A dummy repository for user records.
#[derive(Default)]
struct UsersRepository {
    users: Mutex<Vec<User>>,
}

impl UsersRepository {
    fn add(&self, name: &str, email: &str) -> Result<User, HandlerError> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
        };
        info!(?user, "adding a new user");
        self.users
            .lock()
            .map_err(|_| HandlerError::rejected("users repository poisoned"))?
            .push(user.clone());
        Ok(user)
    }
}

struct CreateNewUserHandler {
    bus: Bus,
    users: Arc<UsersRepository>,
}

impl Handler for CreateNewUserHandler {
    type Message = CreateNewUser;
    const REQUIRES: &'static [&'static str] = &["users"];

    fn new(bus: Bus, deps: &Dependencies) -> Result<Self, HandlerError> {
        Ok(Self {
            bus,
            users: deps.get("users")?,
        })
    }

    fn handle(&mut self, command: &CreateNewUser) -> Result<Option<Reply>, HandlerError> {
        let user = self.users.add(&command.name, &command.email)?;
        self.bus.handle(&NewUserCreated {
            header: Header::new(),
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        })?;
        Ok(reply(CreateNewUserResponse {
            header: Header::new().with_correlation_id(command.header.correlation_id),
            id: user.id,
            name: user.name,
            email: user.email,
        }))
    }
}

struct NewUserCreatedHandler;

impl Handler for NewUserCreatedHandler {
    type Message = NewUserCreated;

    fn new(_bus: Bus, _deps: &Dependencies) -> Result<Self, HandlerError> {
        Ok(NewUserCreatedHandler)
    }

    fn handle(&mut self, event: &NewUserCreated) -> Result<Option<Reply>, HandlerError> {
        info!(?event, "new user created event");
        Ok(None)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    logging::init();

    let config = BusConfig::from_env()?;
    let framework = Framework::bootstrap(
        &config,
        InMemoryTransport::new(),
        InMemoryPersistence::new(),
    )?;
    framework.add_dependency("users", UsersRepository::default())?;
    framework.register_command_handler::<CreateNewUser, CreateNewUserHandler>()?;
    framework.register_event_handler::<NewUserCreated, NewUserCreatedHandler>()?;

    let handlers = framework.handlers();
    info!(commands = ?handlers.commands, events = ?handlers.events, "handlers");

    let response = framework.submit(&CreateNewUser {
        header: Header::new(),
        name: "John Doe".to_string(),
        email: "johndoe@me.com".to_string(),
    })?;
    if let Some(response) = response.as_deref().and_then(|r| r.downcast_ref::<CreateNewUserResponse>()) {
        info!(id = %response.id, name = %response.name, email = %response.email, "response");
    }

    framework.shutdown()?;
    Ok(())
}
