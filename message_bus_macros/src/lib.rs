mod message;

use proc_macro::TokenStream;

use message::MessageVariant;

// ============================================================================
// Message derives
// ============================================================================

/// Derive macro that implements `message_bus::Message` and `message_bus::Command`.
///
/// The struct must carry a `message_bus::Header`. By default the field named
/// `header` is used; a different field can be selected at the struct level.
///
/// # Usage
///
/// ```ignore
/// #[derive(Debug, Command)]
/// pub struct CreateUser {
///     pub header: Header,
///     pub name: String,
///     pub email: String,
/// }
/// ```
///
/// With a custom header field and routing name:
/// ```ignore
/// #[derive(Debug, Command)]
/// #[message(header = "meta", name = "users.create")]
/// pub struct CreateUser {
///     pub meta: Header,
///     pub name: String,
/// }
/// ```
#[proc_macro_derive(Command, attributes(message))]
pub fn derive_command(input: TokenStream) -> TokenStream {
    message::derive_message(input, MessageVariant::Command)
}

/// Derive macro that implements `message_bus::Message` and `message_bus::Event`.
///
/// Accepts the same `#[message(...)]` options as `#[derive(Command)]`.
#[proc_macro_derive(Event, attributes(message))]
pub fn derive_event(input: TokenStream) -> TokenStream {
    message::derive_message(input, MessageVariant::Event)
}

/// Derive macro that implements `message_bus::Message` and
/// `message_bus::CommandResponse`.
///
/// Accepts the same `#[message(...)]` options as `#[derive(Command)]`.
#[proc_macro_derive(CommandResponse, attributes(message))]
pub fn derive_command_response(input: TokenStream) -> TokenStream {
    message::derive_message(input, MessageVariant::CommandResponse)
}
