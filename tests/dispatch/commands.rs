//! Command routing: one handler per command, reply returned to the caller.

use message_bus::{
    reply, Bus, BusError, Dependencies, ErrorKind, Handler, HandlerError, Header, Reply,
};

use crate::support::{
    test_bus, CreateUser, CreateUserHandler, CreateUserResponse, DeleteUser, SendWelcomeEmail,
    UserCreated,
};

struct ShadowCreateUser;

impl Handler for ShadowCreateUser {
    type Message = CreateUser;

    fn new(_bus: Bus, _deps: &Dependencies) -> Result<Self, HandlerError> {
        Ok(ShadowCreateUser)
    }

    fn handle(&mut self, command: &CreateUser) -> Result<Option<Reply>, HandlerError> {
        Ok(reply(CreateUserResponse {
            header: Header::new(),
            id: "shadow".into(),
            name: command.name.clone(),
            email: command.email.clone(),
        }))
    }
}

// ============================================================================
// Test 1: Create user returns the handler's response
// ============================================================================

#[test]
fn create_user_returns_response() {
    let t = test_bus();
    t.framework
        .register_command_handler::<CreateUser, CreateUserHandler>()
        .unwrap();

    let first = t
        .framework
        .submit(&CreateUser::new("John Doe", "johndoe@me.com"))
        .unwrap()
        .expect("command handlers reply");
    let first = first.downcast_ref::<CreateUserResponse>().unwrap();
    assert_eq!(first.name, "John Doe");
    assert_eq!(first.email, "johndoe@me.com");
    assert!(!first.id.is_empty());

    let second = t
        .framework
        .submit(&CreateUser::new("John Doe", "johndoe@me.com"))
        .unwrap()
        .unwrap();
    let second = second.downcast_ref::<CreateUserResponse>().unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(t.users.len(), 2);
}

// ============================================================================
// Test 2: Duplicate command registration fails, first stays authoritative
// ============================================================================

#[test]
fn duplicate_command_registration_keeps_first() {
    let t = test_bus();
    t.framework
        .register_command_handler::<CreateUser, CreateUserHandler>()
        .unwrap();

    let err = t
        .framework
        .register_command_handler::<CreateUser, ShadowCreateUser>()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyRegistered);

    let response = t
        .framework
        .submit(&CreateUser::new("Ann", "ann@me.com"))
        .unwrap()
        .unwrap();
    let response = response.downcast_ref::<CreateUserResponse>().unwrap();
    assert_ne!(response.id, "shadow");
    assert_eq!(t.users.len(), 1);
}

// ============================================================================
// Test 3: Unhandled command fails and invokes nothing
// ============================================================================

#[test]
fn unhandled_command_is_invalid() {
    let t = test_bus();
    t.framework
        .register_command_handler::<CreateUser, CreateUserHandler>()
        .unwrap();
    t.framework
        .register_event_handler::<UserCreated, SendWelcomeEmail>()
        .unwrap();

    let err = t
        .framework
        .submit(&DeleteUser {
            header: Header::new(),
            id: "u1".into(),
        })
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidMessage);
    assert!(matches!(err, BusError::UnhandledCommand("DeleteUser")));
    assert_eq!(t.users.len(), 0);
    assert!(t.journal.entries().is_empty());
}

// ============================================================================
// Test 4: Responses cannot be dispatched
// ============================================================================

#[test]
fn command_response_is_not_routable() {
    let t = test_bus();
    let err = t
        .framework
        .submit(&CreateUserResponse {
            header: Header::new(),
            id: "1".into(),
            name: "Ann".into(),
            email: "ann@me.com".into(),
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidMessage);
}

// ============================================================================
// Test 5: Handlers dispatch nested events through their bus handle
// ============================================================================

#[test]
fn handler_emits_event_through_bus() {
    let t = test_bus();
    t.framework
        .register_command_handler::<CreateUser, CreateUserHandler>()
        .unwrap();
    t.framework
        .register_event_handler::<UserCreated, SendWelcomeEmail>()
        .unwrap();

    t.framework
        .submit(&CreateUser::new("John Doe", "johndoe@me.com"))
        .unwrap();

    assert_eq!(t.journal.entries(), vec!["SendWelcomeEmail"]);
    assert_eq!(t.persistence.len(), 1);
}

// ============================================================================
// Test 6: Handler rejection surfaces as a handler failure
// ============================================================================

#[test]
fn handler_rejection_propagates() {
    let t = test_bus();
    t.framework
        .register_command_handler::<CreateUser, CreateUserHandler>()
        .unwrap();

    let err = t
        .framework
        .submit(&CreateUser::new("Nobody", ""))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HandlerFailure);
    assert!(matches!(
        err,
        BusError::Handler { handler: "CreateUserHandler", source: HandlerError::Rejected(_) }
    ));
}
