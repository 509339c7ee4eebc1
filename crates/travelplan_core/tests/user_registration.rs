use travelplan_core::db::open_db_in_memory;
use travelplan_core::{NewUser, SqliteUserRepository, UserService, UserServiceError, UserValidationError};
use uuid::Uuid;

fn new_user(email: &str, first_name: &str, last_name: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
    }
}

#[test]
fn register_then_read_profile() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(SqliteUserRepository::try_new(&conn).unwrap());

    let user = service
        .register(&new_user("Grace@Example.com", "Grace", "Hopper"))
        .unwrap();
    assert_eq!(user.email, "grace@example.com");

    let profile = service.profile(user.id).unwrap();
    assert_eq!(profile, user);
    assert_eq!(
        service.find_by_email("GRACE@example.com").unwrap(),
        Some(user)
    );
}

#[test]
fn duplicate_email_is_rejected_case_insensitively() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(SqliteUserRepository::try_new(&conn).unwrap());
    service
        .register(&new_user("grace@example.com", "Grace", "Hopper"))
        .unwrap();

    let err = service
        .register(&new_user("GRACE@example.com", "Other", "Person"))
        .unwrap_err();
    assert!(matches!(err, UserServiceError::EmailTaken(ref email) if email == "grace@example.com"));
}

#[test]
fn missing_names_surface_readable_messages() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(SqliteUserRepository::try_new(&conn).unwrap());

    let err = service
        .register(&new_user("a@example.com", " ", "Hopper"))
        .unwrap_err();
    assert!(matches!(
        err,
        UserServiceError::Validation(UserValidationError::FirstNameMissing)
    ));
    assert_eq!(err.to_string(), "First name was not specified");

    let err = service
        .register(&new_user("a@example.com", "Grace", ""))
        .unwrap_err();
    assert_eq!(err.to_string(), "Last name was not specified");
}

#[test]
fn unknown_profile_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(SqliteUserRepository::try_new(&conn).unwrap());
    let missing = Uuid::new_v4();

    assert!(matches!(
        service.profile(missing),
        Err(UserServiceError::UserNotFound(id)) if id == missing
    ));
}
