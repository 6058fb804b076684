//! Test domain: users, with a command handler that emits an event and a
//! few recording event handlers.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use message_bus::{
    reply, Bus, Command, CommandResponse, Dependencies, Event, Framework, Handler, HandlerError,
    Header, InMemoryPersistence, InMemoryTransport, Reply,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug, Clone, Command, Serialize, Deserialize)]
pub struct CreateUser {
    #[serde(default)]
    pub header: Header,
    pub name: String,
    pub email: String,
}

impl CreateUser {
    pub fn new(name: &str, email: &str) -> Self {
        Self {
            header: Header::new().with_routing_key("users_rk"),
            name: name.to_string(),
            email: email.to_string(),
        }
    }
}

#[derive(Debug, Clone, CommandResponse)]
pub struct CreateUserResponse {
    pub header: Header,
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Event, Serialize, Deserialize)]
pub struct UserCreated {
    #[serde(default)]
    pub header: Header,
    pub id: String,
    pub name: String,
    pub email: String,
}

impl UserCreated {
    pub fn new(name: &str) -> Self {
        Self {
            header: Header::new(),
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: format!("{}@me.com", name.to_lowercase()),
        }
    }
}

/// Never registered anywhere.
#[derive(Debug, Command)]
pub struct DeleteUser {
    pub header: Header,
    pub id: String,
}

#[derive(Debug, CommandResponse)]
pub struct Sentinel {
    pub header: Header,
    pub reason: String,
}

// ============================================================================
// Dependencies
// ============================================================================

#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// A dummy repository for user records.
#[derive(Default)]
pub struct UsersRepository {
    users: Mutex<Vec<User>>,
}

impl UsersRepository {
    pub fn add(&self, name: &str, email: &str) -> User {
        let user = User {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
        };
        self.users.lock().unwrap().push(user.clone());
        user
    }

    pub fn len(&self) -> usize {
        self.users.lock().unwrap().len()
    }
}

/// Ordered record of what the handlers did.
#[derive(Default)]
pub struct Journal {
    entries: Mutex<Vec<String>>,
}

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.as_str() == entry)
            .count()
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub struct CreateUserHandler {
    bus: Bus,
    users: Arc<UsersRepository>,
}

impl Handler for CreateUserHandler {
    type Message = CreateUser;
    const REQUIRES: &'static [&'static str] = &["users"];

    fn new(bus: Bus, deps: &Dependencies) -> Result<Self, HandlerError> {
        Ok(Self {
            bus,
            users: deps.get("users")?,
        })
    }

    fn handle(&mut self, command: &CreateUser) -> Result<Option<Reply>, HandlerError> {
        if command.email.is_empty() {
            return Err(HandlerError::rejected("email is required"));
        }
        let user = self.users.add(&command.name, &command.email);

        self.bus.handle(&UserCreated {
            header: Header::new(),
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        })?;

        Ok(reply(CreateUserResponse {
            header: Header::new().with_correlation_id(command.header.correlation_id),
            id: user.id,
            name: user.name,
            email: user.email,
        }))
    }
}

macro_rules! recording_handler {
    ($name:ident) => {
        pub struct $name {
            journal: Arc<Journal>,
        }

        impl Handler for $name {
            type Message = UserCreated;
            const REQUIRES: &'static [&'static str] = &["journal"];

            fn new(_bus: Bus, deps: &Dependencies) -> Result<Self, HandlerError> {
                Ok(Self {
                    journal: deps.get("journal")?,
                })
            }

            fn handle(&mut self, _event: &UserCreated) -> Result<Option<Reply>, HandlerError> {
                self.journal.record(stringify!($name));
                Ok(None)
            }
        }
    };
}

recording_handler!(SendWelcomeEmail);
recording_handler!(AuditUserCreated);

/// Fails every time, after recording the attempt.
pub struct FailingWelcome {
    journal: Arc<Journal>,
}

impl Handler for FailingWelcome {
    type Message = UserCreated;
    const REQUIRES: &'static [&'static str] = &["journal"];

    fn new(_bus: Bus, deps: &Dependencies) -> Result<Self, HandlerError> {
        Ok(Self {
            journal: deps.get("journal")?,
        })
    }

    fn handle(&mut self, _event: &UserCreated) -> Result<Option<Reply>, HandlerError> {
        self.journal.record("FailingWelcome");
        Err(HandlerError::rejected("mail server down"))
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub struct TestBus {
    pub framework: Framework<InMemoryTransport>,
    pub persistence: InMemoryPersistence,
    pub users: Arc<UsersRepository>,
    pub journal: Arc<Journal>,
}

/// A framework with the `users` and `journal` dependencies bound and no
/// handlers registered.
pub fn test_bus() -> TestBus {
    let persistence = InMemoryPersistence::new();
    let framework = Framework::new(InMemoryTransport::new(), persistence.clone());
    let users = Arc::new(UsersRepository::default());
    let journal = Arc::new(Journal::default());
    framework
        .add_shared_dependency("users", Arc::clone(&users))
        .unwrap();
    framework
        .add_shared_dependency("journal", Arc::clone(&journal))
        .unwrap();

    TestBus {
        framework,
        persistence,
        users,
        journal,
    }
}

/// Poll `condition` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
