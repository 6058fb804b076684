//! The handler contract.

use crate::bus::Bus;
use crate::error::HandlerError;
use crate::message::{Message, Reply};

use super::dependencies::Dependencies;

/// A unit of application logic bound to exactly one message type.
///
/// Handlers are registered by type. The bus builds a fresh instance for every
/// invocation with [`Handler::new`], passing a handle to itself (so the
/// handler can dispatch further commands and events) and the dependencies
/// injected at initialization.
///
/// ## Example
///
/// ```ignore
/// pub struct CreateUserHandler {
///     bus: Bus,
///     users: Arc<UsersRepository>,
/// }
///
/// impl Handler for CreateUserHandler {
///     type Message = CreateUser;
///     const REQUIRES: &'static [&'static str] = &["users"];
///
///     fn new(bus: Bus, deps: &Dependencies) -> Result<Self, HandlerError> {
///         Ok(Self { bus, users: deps.get("users")? })
///     }
///
///     fn handle(&mut self, command: &CreateUser) -> Result<Option<Reply>, HandlerError> {
///         let user = self.users.add(&command.name, &command.email);
///         self.bus.handle(&UserCreated::from(&user))?;
///         Ok(reply(CreateUserResponse::from(user)))
///     }
/// }
/// ```
pub trait Handler: Sized + Send + 'static {
    /// The message type this handler consumes.
    type Message: Message;

    /// Dependency names read in [`Handler::new`]. Checked when the bus is
    /// initialized.
    const REQUIRES: &'static [&'static str] = &[];

    /// Name used as the idempotency key for this handler.
    ///
    /// Defaults to the unqualified type name. Override it to keep records
    /// stable across renames, or when two event handlers in different
    /// modules share a type name; registering both fails otherwise.
    fn name() -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }

    fn new(bus: Bus, deps: &Dependencies) -> Result<Self, HandlerError>;

    fn handle(&mut self, message: &Self::Message) -> Result<Option<Reply>, HandlerError>;
}

/// `my_app::users::CreateUserHandler<T>` -> `CreateUserHandler`.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
