//! # Session & Password Validation
//!
//! The database-backed half of the credential engine — the pure mint/hash
//! primitives live in `shared::auth::session`; this module runs the frozen
//! lookup query against a borrowed connection. Every function here returns
//! a plain `bool`: malformed tokens, expired/revoked sessions, wrong
//! passwords, and "no such user" all collapse to `false` rather than an
//! error. A `DbError` only surfaces when the query itself cannot run.

use postgres::Client;
use uuid::Uuid;

use shared::auth::password::PasswordHasher;
use shared::auth::session::hash_token;
use shared::errors::ApiError;

const VALIDATE_SESSION_SQL: &str = "SELECT 1 \
    FROM auth.user_sessions s \
    JOIN auth.users u ON s.user_id = u.user_id \
    WHERE s.session_token = $1 \
      AND s.expires_at > NOW() \
      AND s.revoked_at IS NULL \
      AND u.deleted_at IS NULL \
      AND (($2::text IS NULL AND u.is_admin) \
        OR ($2::text IS NOT NULL AND (u.is_admin OR u.uuid::text = $2 OR u.username = $2)))";

/// Validates a session token against `userRef` (a UUID or username), or —
/// when `userRef` is `None` — requires the token to belong to an admin.
/// Admins may act on any user; non-admins only on themselves.
pub fn validate_session(
    client: &mut Client,
    user_ref: Option<&str>,
    token_b64: &str,
) -> Result<bool, ApiError> {
    let Some(token_hash) = hash_token(token_b64) else {
        return Ok(false);
    };

    let row = client.query_opt(VALIDATE_SESSION_SQL, &[&token_hash, &user_ref])?;
    Ok(row.is_some())
}

/// Equivalent to `validate_session(client, None, token_b64)` — requires the
/// token to belong to an admin.
pub fn validate_admin_session(client: &mut Client, token_b64: &str) -> Result<bool, ApiError> {
    validate_session(client, None, token_b64)
}

const RESOLVE_SESSION_OWNER_SQL: &str = "SELECT u.user_id \
    FROM auth.user_sessions s \
    JOIN auth.users u ON s.user_id = u.user_id \
    WHERE s.session_token = $1 AND s.expires_at > NOW() AND s.revoked_at IS NULL AND u.deleted_at IS NULL";

/// Resolves the owning user of an active session, for operations (station
/// creation, API-key minting) that need "who is this caller" rather than
/// "is this caller allowed to act on `userRef`". A relaxation of
/// `validate_session`'s frozen query that drops the `userRef`/admin
/// condition and returns the id instead of a bare boolean.
pub fn resolve_session_owner(client: &mut Client, token_b64: &str) -> Result<Option<Uuid>, ApiError> {
    let Some(token_hash) = hash_token(token_b64) else {
        return Ok(None);
    };
    let row = client.query_opt(RESOLVE_SESSION_OWNER_SQL, &[&token_hash])?;
    Ok(row.map(|r| r.get("user_id")))
}

const FETCH_PASSWORD_HASH_SQL: &str =
    "SELECT password_hash FROM auth.users WHERE (uuid::text = $1 OR username = $1) AND deleted_at IS NULL";

/// Verifies `plaintext` against the stored hash for the user referenced by
/// UUID or username. `false` if the user doesn't exist or the password is
/// wrong; never distinguishes the two, to avoid user enumeration.
pub fn validate_password(
    client: &mut Client,
    user_ref: &str,
    plaintext: &str,
    hasher: &PasswordHasher,
) -> Result<bool, ApiError> {
    let Some(row) = client.query_opt(FETCH_PASSWORD_HASH_SQL, &[&user_ref])? else {
        return Ok(false);
    };
    let stored_hash: String = row.get("password_hash");
    hasher.verify(plaintext, &stored_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_token_never_reaches_the_database() {
        // `hash_token` rejects malformed base64 before any query is built;
        // this is the only part of `validate_session` testable without a
        // live connection.
        assert_eq!(shared::auth::session::hash_token("not base64 at all!!"), None);
    }
}
