use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use serde::Serialize;
use tracing::info;

use crate::bus::{Bus, ErrorHandlers};
use crate::config::BusConfig;
use crate::error::{BusError, ErrorKind};
use crate::handler::{DependencyRegistry, Handler};
use crate::message::{Command, Event, Message, Named, Reply};
use crate::persistence::Persistence;
use crate::registry::{HandlerRegistry, HandlerSummary};
use crate::transport::{MessageCodec, Transport};

/// Everything collected before the bus is built.
#[derive(Default)]
struct Setup {
    registry: HandlerRegistry,
    dependencies: DependencyRegistry,
    error_handlers: ErrorHandlers,
}

/// Setup-time and runtime surface of the bus.
///
/// Handlers, dependencies and error handlers are collected first; the
/// [`Bus`] is built exactly once, on [`initialize`](Self::initialize) or on
/// the first [`submit`](Self::submit), after which setup operations fail
/// with [`BusError::AlreadyInitialized`].
///
/// `Framework` is `Send + Sync`: share it in an `Arc` between consumer
/// workers. Concurrent first submissions block until the one building the
/// bus is done.
///
/// ## Example
///
/// ```ignore
/// let framework = Framework::bootstrap(&BusConfig::from_env()?, InMemoryTransport::new(), InMemoryPersistence::new())?;
/// framework.add_dependency("users", UsersRepository::default())?;
/// framework.register_command_handler::<CreateUser, CreateUserHandler>()?;
/// framework.register_event_handler::<UserCreated, SendWelcomeEmail>()?;
///
/// let reply = framework.submit(&CreateUser::new("John Doe", "johndoe@me.com"))?;
/// ```
pub struct Framework<T: Transport> {
    transport: Arc<T>,
    persistence: Arc<dyn Persistence>,
    setup: Mutex<Option<Setup>>,
    bus: OnceLock<Bus>,
    shut_down: AtomicBool,
}

impl<T: Transport> Framework<T> {
    pub fn new<P>(transport: T, persistence: P) -> Self
    where
        P: Persistence + 'static,
    {
        Self {
            transport: Arc::new(transport),
            persistence: Arc::new(persistence),
            setup: Mutex::new(Some(Setup::default())),
            bus: OnceLock::new(),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Initialize the transport, declare the configured exchange and queues,
    /// and return a framework ready for setup. The bus itself is still
    /// built lazily.
    pub fn bootstrap<P>(config: &BusConfig, transport: T, persistence: P) -> Result<Self, BusError>
    where
        P: Persistence + 'static,
    {
        transport.initialize()?;
        transport.declare_exchange(&config.exchange, config.exchange_kind)?;
        transport.declare_queues(&config.queues)?;
        info!(
            exchange = %config.exchange,
            kind = %config.exchange_kind,
            queues = config.queues.len(),
            "transport ready"
        );
        Ok(Self::new(transport, persistence))
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn register_command_handler<C, H>(&self) -> Result<(), BusError>
    where
        C: Command + Named,
        H: Handler<Message = C>,
    {
        self.with_setup("register a command handler", |setup| {
            setup.registry.register_command_handler::<C, H>()
        })
    }

    pub fn register_event_handler<E, H>(&self) -> Result<(), BusError>
    where
        E: Event + Named,
        H: Handler<Message = E>,
    {
        self.with_setup("register an event handler", |setup| {
            setup.registry.register_event_handler::<E, H>()
        })
    }

    /// Bind a named dependency. Names are write-once.
    pub fn add_dependency<V>(&self, name: impl Into<String>, value: V) -> Result<(), BusError>
    where
        V: Any + Send + Sync,
    {
        self.with_setup("add a dependency", |setup| {
            setup.dependencies.add(name, value)
        })
    }

    /// Bind a named dependency the caller keeps a handle to.
    pub fn add_shared_dependency<V>(
        &self,
        name: impl Into<String>,
        value: Arc<V>,
    ) -> Result<(), BusError>
    where
        V: Any + Send + Sync,
    {
        self.with_setup("add a dependency", |setup| {
            setup.dependencies.add_shared(name, value)
        })
    }

    /// Register a recovery function for `kind`. A later registration for the
    /// same kind replaces it.
    pub fn add_error_handler<F>(&self, kind: ErrorKind, recover: F) -> Result<(), BusError>
    where
        F: Fn(BusError) -> Option<Reply> + Send + Sync + 'static,
    {
        self.with_setup("add an error handler", |setup| {
            setup.error_handlers.insert(kind, recover);
            Ok(())
        })
    }

    /// Build the bus if it is not built yet and return it.
    ///
    /// Dependencies are checked against every handler's declared
    /// requirements first; on failure nothing is consumed and setup can be
    /// fixed before retrying.
    pub fn initialize(&self) -> Result<Bus, BusError> {
        if let Some(bus) = self.bus.get() {
            return Ok(bus.clone());
        }

        let mut setup = self.lock_setup()?;
        if let Some(bus) = self.bus.get() {
            return Ok(bus.clone());
        }

        let dependencies = match setup.as_ref() {
            Some(pending) => pending.dependencies.broadcast(&pending.registry)?,
            None => return Err(BusError::AlreadyInitialized("initialize")),
        };
        let Some(Setup {
            registry,
            error_handlers,
            ..
        }) = setup.take()
        else {
            return Err(BusError::AlreadyInitialized("initialize"));
        };

        let summary = registry.summary();
        info!(
            commands = ?summary.commands,
            events = ?summary.events,
            dependencies = ?dependencies.names(),
            "bus initialized"
        );

        let bus = Bus::new(
            registry,
            dependencies,
            Arc::clone(&self.persistence),
            error_handlers,
        );
        let bus = self.bus.get_or_init(|| bus).clone();
        Ok(bus)
    }

    pub fn is_initialized(&self) -> bool {
        self.bus.get().is_some()
    }

    /// The bus, once built.
    pub fn bus(&self) -> Option<Bus> {
        self.bus.get().cloned()
    }

    /// Dispatch a message, building the bus on first use.
    pub fn submit(&self, message: &dyn Message) -> Result<Option<Reply>, BusError> {
        if self.is_shut_down() {
            return Err(BusError::ShutDown);
        }
        self.initialize()?.handle(message)
    }

    /// Encode `message` and publish it through the transport.
    pub fn publish<M>(&self, message: &M) -> Result<(), BusError>
    where
        M: Message + Named + Serialize,
    {
        if self.is_shut_down() {
            return Err(BusError::ShutDown);
        }
        let wire = MessageCodec::encode(message)?;
        let routing_key = wire.routing_key.clone();
        self.transport.publish(&routing_key, wire)?;
        Ok(())
    }

    /// Close the transport. Further submissions fail with `ShutDown`.
    pub fn shutdown(&self) -> Result<(), BusError> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!("shutting down");
        self.transport.close()?;
        Ok(())
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Registered routes, before or after initialization.
    pub fn handlers(&self) -> HandlerSummary {
        // `initialize` stores the bus before releasing the setup lock, so a
        // taken setup means the bus is there unless that call panicked.
        let setup = self.setup.lock().unwrap_or_else(PoisonError::into_inner);
        match (setup.as_ref(), self.bus.get()) {
            (Some(pending), _) => pending.registry.summary(),
            (None, Some(bus)) => bus.handlers(),
            (None, None) => HandlerSummary::default(),
        }
    }

    fn lock_setup(&self) -> Result<MutexGuard<'_, Option<Setup>>, BusError> {
        self.setup
            .lock()
            .map_err(|_| BusError::LockPoisoned("framework setup"))
    }

    fn with_setup<R>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut Setup) -> Result<R, BusError>,
    ) -> Result<R, BusError> {
        let mut setup = self.lock_setup()?;
        match setup.as_mut() {
            Some(pending) => f(pending),
            None => Err(BusError::AlreadyInitialized(operation)),
        }
    }
}
