//! Dependency injection: write-once names, checked at initialization,
//! frozen afterwards.

use std::sync::Arc;

use message_bus::{
    BusError, ErrorKind, Framework, HandlerError, InMemoryPersistence, InMemoryTransport,
};

use crate::support::{
    CreateUser, CreateUserHandler, CreateUserResponse, SendWelcomeEmail, UserCreated,
    UsersRepository,
};

fn bare() -> Framework<InMemoryTransport> {
    Framework::new(InMemoryTransport::new(), InMemoryPersistence::new())
}

// ============================================================================
// Test 1: A missing dependency fails initialization, which can be retried
// ============================================================================

#[test]
fn missing_dependency_fails_initialize() {
    let framework = bare();
    framework
        .register_command_handler::<CreateUser, CreateUserHandler>()
        .unwrap();

    let err = framework
        .submit(&CreateUser::new("Ann", "ann@me.com"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingDependency);
    assert!(matches!(
        err,
        BusError::MissingDependency { handler: "CreateUserHandler", dependency: "users" }
    ));
    assert!(!framework.is_initialized());

    framework
        .add_dependency("users", UsersRepository::default())
        .unwrap();
    let reply = framework
        .submit(&CreateUser::new("Ann", "ann@me.com"))
        .unwrap()
        .unwrap();
    assert!(reply.is::<CreateUserResponse>());
}

// ============================================================================
// Test 2: Dependency names are write-once
// ============================================================================

#[test]
fn duplicate_dependency_fails() {
    let framework = bare();
    framework
        .add_dependency("users", UsersRepository::default())
        .unwrap();

    let err = framework
        .add_dependency("users", UsersRepository::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyRegistered);
}

// ============================================================================
// Test 3: Late additions are rejected
// ============================================================================

#[test]
fn late_dependency_is_rejected() {
    let framework = bare();
    framework.initialize().unwrap();

    let err = framework
        .add_dependency("users", UsersRepository::default())
        .unwrap_err();
    assert!(matches!(err, BusError::AlreadyInitialized(_)));
}

// ============================================================================
// Test 4: Handlers share the bound instance
// ============================================================================

#[test]
fn handlers_share_dependency_instances() {
    let framework = bare();
    let users = Arc::new(UsersRepository::default());
    framework
        .add_shared_dependency("users", Arc::clone(&users))
        .unwrap();
    framework
        .register_command_handler::<CreateUser, CreateUserHandler>()
        .unwrap();

    framework.submit(&CreateUser::new("Ann", "ann@me.com")).unwrap();
    framework.submit(&CreateUser::new("Bob", "bob@me.com")).unwrap();
    assert_eq!(users.len(), 2);

    let bus = framework.bus().unwrap();
    assert_eq!(bus.dependencies().names(), vec!["users"]);
    assert!(Arc::ptr_eq(
        &bus.dependencies().get::<UsersRepository>("users").unwrap(),
        &users
    ));
}

// ============================================================================
// Test 5: A dependency bound to the wrong type fails at construction
// ============================================================================

#[test]
fn wrong_dependency_type_is_a_handler_failure() {
    let framework = bare();
    framework.add_dependency("journal", "not a journal").unwrap();
    framework
        .register_event_handler::<UserCreated, SendWelcomeEmail>()
        .unwrap();

    let err = framework.submit(&UserCreated::new("Ann")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HandlerFailure);
    assert!(matches!(
        err.handler_error(),
        Some(HandlerError::DependencyType { name, .. }) if name == "journal"
    ));
}
