//! Message Bus - command/event dispatch
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Bus::handle(&dyn Message)                    │
//! │  - Command  -> exactly one handler, reply returned          │
//! │  - Event    -> every handler, in registration order         │
//! │  - Response -> rejected                                      │
//! └─────────────────────────────────────────────────────────────┘
//!          │                  │                     │
//!          ▼                  ▼                     ▼
//! ┌─────────────────┐ ┌──────────────────┐ ┌─────────────────────┐
//! │ HandlerRegistry │ │ Persistence      │ │ ErrorHandlers       │
//! │ type -> handler │ │ (event, handler) │ │ ErrorKind -> reply  │
//! └─────────────────┘ └──────────────────┘ └─────────────────────┘
//! ```
//!
//! Handlers are built per invocation with a `Bus` clone, so they can
//! dispatch nested commands and events.

mod bus;
mod recovery;

pub use bus::Bus;
pub use recovery::{ErrorHandlers, RecoveryFn};
