//! Database operations for categories.

use rusqlite::{Connection, Row};

use crate::{
    Error,
    category::{Category, CategoryId, CategoryName, CategoryStatus},
    db::like_pattern,
};

/// Initialize the category table and indexes.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            status TEXT NOT NULL DEFAULT 'active'
        );

        CREATE INDEX IF NOT EXISTS idx_category_name ON category(name);",
    )?;

    Ok(())
}

/// Create an active category and return it with its generated ID.
///
/// # Errors
///
/// Returns [Error::DuplicateCategoryName] if a category already uses `name`.
pub fn create_category(name: CategoryName, connection: &Connection) -> Result<Category, Error> {
    connection
        .execute(
            "INSERT INTO category (name, status) VALUES (?1, ?2);",
            (name.as_ref(), CategoryStatus::Active),
        )
        .map_err(|error| with_category_name(error.into(), &name))?;

    let id = connection.last_insert_rowid();

    Ok(Category {
        id,
        name,
        status: CategoryStatus::Active,
    })
}

/// Retrieve a single category by ID.
pub fn get_category(category_id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare("SELECT id, name, status FROM category WHERE id = :id;")?
        .query_row(&[(":id", &category_id)], map_row)
        .map_err(|error| error.into())
}

/// Retrieve the categories users can currently pick, ordered by name.
pub fn get_active_categories(connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare("SELECT id, name, status FROM category WHERE status = ?1 ORDER BY name ASC;")?
        .query_map((CategoryStatus::Active,), map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Retrieve a page of categories whose name contains `search`, ordered by name.
///
/// An empty `search` matches every category.
pub fn search_categories(
    search: &str,
    limit: i64,
    offset: i64,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, name, status FROM category
            WHERE name LIKE ?1 ESCAPE '\\'
            ORDER BY name ASC
            LIMIT ?2 OFFSET ?3;",
        )?
        .query_map((like_pattern(search), limit, offset), map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Count the categories whose name contains `search`.
pub fn count_categories(search: &str, connection: &Connection) -> Result<u64, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM category WHERE name LIKE ?1 ESCAPE '\\';",
            (like_pattern(search),),
            |row| row.get::<_, i64>(0),
        )
        .map(|count| count.max(0) as u64)
        .map_err(|error| error.into())
}

/// Give a category a new name.
///
/// # Errors
///
/// Returns a:
/// - [Error::UpdateMissingCategory] if the category does not exist.
/// - [Error::DuplicateCategoryName] if another category already uses `new_name`.
pub fn rename_category(
    category_id: CategoryId,
    new_name: CategoryName,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection
        .execute(
            "UPDATE category SET name = ?1 WHERE id = ?2",
            (new_name.as_ref(), category_id),
        )
        .map_err(|error| with_category_name(error.into(), &new_name))?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingCategory);
    }

    Ok(())
}

/// Set whether a category can be picked by users.
pub fn set_category_status(
    category_id: CategoryId,
    status: CategoryStatus,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE category SET status = ?1 WHERE id = ?2",
        (status, category_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingCategory);
    }

    Ok(())
}

/// Delete a category by ID.
///
/// Transactions in the category are kept with their category cleared, and
/// limits for the category are removed.
pub fn delete_category(category_id: CategoryId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM category WHERE id = ?1", [category_id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingCategory);
    }

    Ok(())
}

fn with_category_name(error: Error, name: &CategoryName) -> Error {
    match error {
        Error::DuplicateCategoryName(_) => Error::DuplicateCategoryName(name.to_string()),
        error => error,
    }
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_name: String = row.get(1)?;
    let status = row.get(2)?;

    Ok(Category {
        id,
        name: CategoryName::new_unchecked(&raw_name),
        status,
    })
}
