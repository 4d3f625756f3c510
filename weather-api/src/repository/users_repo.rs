//! Repository for `auth.users`.

use postgres::{Client, Row};
use shared::errors::ApiError;

use crate::domain::entities::User;

/// New accounts start with room for one station. No requirement pins this
/// value; it's the smallest quota that lets the `max_stations=1` example
/// be the default rather than something the caller must always override.
pub const DEFAULT_MAX_STATIONS: i64 = 1;

const COLUMNS: &str = "user_id, uuid, username, email, password_hash, max_stations, is_admin, created_at, deleted_at";

fn row_to_user(row: Row) -> User {
    User {
        user_id: row.get("user_id"),
        uuid: row.get("uuid"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        max_stations: row.get("max_stations"),
        is_admin: row.get("is_admin"),
        created_at: row.get("created_at"),
        deleted_at: row.get("deleted_at"),
    }
}

/// Looks up one non-deleted user by UUID or username.
pub fn find_by_ref(client: &mut Client, user_ref: &str) -> Result<Option<User>, ApiError> {
    let sql = format!(
        "SELECT {COLUMNS} FROM auth.users WHERE (uuid::text = $1 OR username = $1) AND deleted_at IS NULL"
    );
    Ok(client.query_opt(&sql, &[&user_ref])?.map(row_to_user))
}

/// Lists non-deleted users, optionally narrowed to a single `userRef`.
pub fn list(client: &mut Client, user_ref: Option<&str>) -> Result<Vec<User>, ApiError> {
    match user_ref {
        Some(r) => Ok(find_by_ref(client, r)?.into_iter().collect()),
        None => {
            let sql = format!("SELECT {COLUMNS} FROM auth.users WHERE deleted_at IS NULL");
            Ok(client.query(&sql, &[])?.into_iter().map(row_to_user).collect())
        }
    }
}

/// Inserts a new user with the default station quota and re-selects the
/// created row. Username/email uniqueness violations surface to the caller
/// as a driver error (`ApiError::DbError`), per §4.5.
pub fn create(
    client: &mut Client,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, ApiError> {
    let sql = format!(
        "INSERT INTO auth.users (user_id, uuid, username, email, password_hash, max_stations, is_admin, created_at) \
         VALUES (gen_random_uuid(), gen_random_uuid(), $1, $2, $3, $4, false, NOW()) \
         RETURNING {COLUMNS}"
    );
    let row = client.query_one(&sql, &[&username, &email, &password_hash, &DEFAULT_MAX_STATIONS])?;
    Ok(row_to_user(row))
}

/// Soft-deletes a user, returning `true` if a row was affected.
pub fn soft_delete(client: &mut Client, user_ref: &str) -> Result<bool, ApiError> {
    let affected = client.execute(
        "UPDATE auth.users SET deleted_at = NOW() WHERE (uuid::text = $1 OR username = $1) AND deleted_at IS NULL",
        &[&user_ref],
    )?;
    Ok(affected > 0)
}

/// Partial update via `COALESCE($n, col)`; any parameter left `None` keeps
/// its current value. Returns the updated row, or `None` if no matching
/// active user exists.
#[allow(clippy::too_many_arguments)]
pub fn patch(
    client: &mut Client,
    user_ref: &str,
    username: Option<&str>,
    email: Option<&str>,
    password_hash: Option<&str>,
    max_stations: Option<i64>,
    is_admin: Option<bool>,
) -> Result<Option<User>, ApiError> {
    let sql = format!(
        "UPDATE auth.users SET \
            username = COALESCE($2, username), \
            email = COALESCE($3, email), \
            password_hash = COALESCE($4, password_hash), \
            max_stations = COALESCE($5, max_stations), \
            is_admin = COALESCE($6, is_admin) \
         WHERE (uuid::text = $1 OR username = $1) AND deleted_at IS NULL \
         RETURNING {COLUMNS}"
    );
    let row = client.query_opt(
        &sql,
        &[&user_ref, &username, &email, &password_hash, &max_stations, &is_admin],
    )?;
    Ok(row.map(row_to_user))
}
