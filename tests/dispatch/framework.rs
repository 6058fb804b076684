//! Facade lifecycle: bootstrap, lazy initialization, shutdown.

use message_bus::{
    BusConfig, BusError, ErrorKind, ExchangeKind, Framework, InMemoryPersistence,
    InMemoryTransport, QueueBinding,
};

use crate::support::{
    test_bus, AuditUserCreated, CreateUser, CreateUserHandler, SendWelcomeEmail, UserCreated,
};

// ============================================================================
// Test 1: Bootstrap declares the configured exchange and queues
// ============================================================================

#[test]
fn bootstrap_declares_topology() {
    let transport = InMemoryTransport::new();
    let framework = Framework::bootstrap(
        &BusConfig::default(),
        transport.clone(),
        InMemoryPersistence::new(),
    )
    .unwrap();

    assert_eq!(
        transport.exchange(),
        Some(("bus".to_string(), ExchangeKind::Direct))
    );
    assert_eq!(
        transport.queues(),
        vec![
            QueueBinding::new("users", "users_rk"),
            QueueBinding::new("reply", "reply_rk"),
        ]
    );
    assert!(!framework.is_initialized());
}

// ============================================================================
// Test 2: The bus is built on first submit
// ============================================================================

#[test]
fn first_submit_initializes() {
    let t = test_bus();
    t.framework
        .register_command_handler::<CreateUser, CreateUserHandler>()
        .unwrap();
    assert!(!t.framework.is_initialized());
    assert!(t.framework.bus().is_none());

    t.framework
        .submit(&CreateUser::new("John Doe", "johndoe@me.com"))
        .unwrap();
    assert!(t.framework.is_initialized());

    let err = t
        .framework
        .register_event_handler::<UserCreated, SendWelcomeEmail>()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyInitialized);
}

// ============================================================================
// Test 3: Handler summary before and after initialization
// ============================================================================

#[test]
fn handler_summary() {
    let t = test_bus();
    t.framework
        .register_command_handler::<CreateUser, CreateUserHandler>()
        .unwrap();
    t.framework
        .register_event_handler::<UserCreated, SendWelcomeEmail>()
        .unwrap();
    t.framework
        .register_event_handler::<UserCreated, AuditUserCreated>()
        .unwrap();

    let before = t.framework.handlers();
    assert_eq!(before.commands, vec![("CreateUser", "CreateUserHandler")]);
    assert_eq!(
        before.events,
        vec![("UserCreated", vec!["SendWelcomeEmail", "AuditUserCreated"])]
    );

    t.framework.initialize().unwrap();
    assert_eq!(t.framework.handlers(), before);
}

// ============================================================================
// Test 4: Initialize is idempotent
// ============================================================================

#[test]
fn initialize_twice_returns_same_bus() {
    let t = test_bus();
    let first = t.framework.initialize().unwrap();
    let second = t.framework.initialize().unwrap();
    assert!(std::ptr::eq(first.dependencies(), second.dependencies()));
}

// ============================================================================
// Test 5: Shutdown closes the transport and stops dispatch
// ============================================================================

#[test]
fn shutdown_stops_dispatch() {
    let t = test_bus();
    t.framework
        .register_command_handler::<CreateUser, CreateUserHandler>()
        .unwrap();
    t.framework.initialize().unwrap();

    t.framework.shutdown().unwrap();
    t.framework.shutdown().unwrap();
    assert!(t.framework.transport().is_closed());

    let err = t
        .framework
        .submit(&CreateUser::new("Ann", "ann@me.com"))
        .unwrap_err();
    assert!(matches!(err, BusError::ShutDown));
    assert_eq!(err.kind(), ErrorKind::ShutDown);
    assert_eq!(t.users.len(), 0);
}
