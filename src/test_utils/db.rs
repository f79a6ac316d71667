use rusqlite::Connection;

use crate::{
    auth::{PasswordHash, ValidatedPassword},
    db::initialize,
    user::{Email, Role, User, create_user},
};

/// A fresh in-memory database with every table created.
pub(crate) fn get_test_connection() -> Connection {
    let connection = Connection::open_in_memory().expect("Could not open database in memory");
    initialize(&connection).expect("Could not initialize database");

    connection
}

/// Insert a user whose password hash is not a real bcrypt hash.
#[track_caller]
pub(crate) fn insert_test_user(email: &str, connection: &Connection) -> User {
    create_user(
        &Email::new_unchecked(email),
        &PasswordHash::new_unchecked("not a real hash"),
        Role::User,
        connection,
    )
    .expect("Could not create test user")
}

/// Insert a user that can log in with `password`.
#[track_caller]
pub(crate) fn insert_test_user_with_password(
    email: &str,
    password: &str,
    role: Role,
    connection: &Connection,
) -> User {
    let password_hash = PasswordHash::new(ValidatedPassword::new_unchecked(password), 4)
        .expect("Could not hash password");

    create_user(
        &Email::new_unchecked(email),
        &password_hash,
        role,
        connection,
    )
    .expect("Could not create test user")
}
