//! Database operations for users.

use rusqlite::{Connection, Row};

use crate::{
    Error,
    auth::PasswordHash,
    db::like_pattern,
    user::{Email, Role, User, UserID, UserStatus},
};

/// Create the user table.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS user (
            id INTEGER PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            full_name TEXT NOT NULL DEFAULT '',
            phone TEXT NOT NULL DEFAULT '',
            role TEXT NOT NULL DEFAULT 'user',
            status TEXT NOT NULL DEFAULT 'active'
        );",
    )?;

    Ok(())
}

/// Insert a new active user with the given role.
///
/// # Errors
///
/// Returns [Error::DuplicateEmail] if the email is already registered.
pub fn create_user(
    email: &Email,
    password_hash: &PasswordHash,
    role: Role,
    connection: &Connection,
) -> Result<User, Error> {
    connection
        .prepare(
            "INSERT INTO user (email, password, role) VALUES (?1, ?2, ?3)
            RETURNING id, email, password, full_name, phone, role, status",
        )?
        .query_row((email.as_ref(), password_hash, role), map_row)
        .map_err(|error| error.into())
}

pub fn get_user_by_id(id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, email, password, full_name, phone, role, status FROM user WHERE id = :id",
        )?
        .query_row(&[(":id", &id.as_i64())], map_row)
        .map_err(|error| error.into())
}

pub fn get_user_by_email(email: &Email, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, email, password, full_name, phone, role, status FROM user
            WHERE email = :email",
        )?
        .query_row(&[(":email", email.as_ref())], map_row)
        .map_err(|error| error.into())
}

/// The number of users, optionally only those with `status`.
pub fn count_users(status: Option<UserStatus>, connection: &Connection) -> Result<u64, Error> {
    let count: i64 = match status {
        Some(status) => connection.query_row(
            "SELECT COUNT(id) FROM user WHERE status = ?1",
            [status],
            |row| row.get(0),
        )?,
        None => connection.query_row("SELECT COUNT(id) FROM user", [], |row| row.get(0))?,
    };

    Ok(count as u64)
}

/// Users whose email or full name contains `search`, ordered by ID.
pub fn search_users(
    search: &str,
    limit: i64,
    offset: i64,
    connection: &Connection,
) -> Result<Vec<User>, Error> {
    connection
        .prepare(
            "SELECT id, email, password, full_name, phone, role, status FROM user
            WHERE email LIKE ?1 ESCAPE '\\' OR full_name LIKE ?1 ESCAPE '\\'
            ORDER BY id ASC LIMIT ?2 OFFSET ?3",
        )?
        .query_map((like_pattern(search), limit, offset), map_row)?
        .map(|maybe_user| maybe_user.map_err(|error| error.into()))
        .collect()
}

/// The number of users [search_users] would return without paging.
pub fn count_search_users(search: &str, connection: &Connection) -> Result<u64, Error> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(id) FROM user
        WHERE email LIKE ?1 ESCAPE '\\' OR full_name LIKE ?1 ESCAPE '\\'",
        [like_pattern(search)],
        |row| row.get(0),
    )?;

    Ok(count as u64)
}

/// Set the full name and phone number of a user.
///
/// # Errors
///
/// Returns [Error::UpdateMissingUser] if the user does not exist.
pub fn update_profile(
    id: UserID,
    full_name: &str,
    phone: &str,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET full_name = ?1, phone = ?2 WHERE id = ?3",
        (full_name.trim(), phone.trim(), id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

pub fn update_password(
    id: UserID,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET password = ?1 WHERE id = ?2",
        (password_hash, id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

pub fn set_user_status(
    id: UserID,
    status: UserStatus,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET status = ?1 WHERE id = ?2",
        (status, id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

pub fn set_user_role(id: UserID, role: Role, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET role = ?1 WHERE id = ?2",
        (role, id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

fn map_row(row: &Row) -> Result<User, rusqlite::Error> {
    let email: String = row.get(1)?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        email: Email::new_unchecked(&email),
        password_hash: row.get(2)?,
        full_name: row.get(3)?,
        phone: row.get(4)?,
        role: row.get(5)?,
        status: row.get(6)?,
    })
}
