//! Repository for `auth.user_sessions`.

use chrono::{DateTime, Utc};
use postgres::{Client, Row};
use uuid::Uuid;

use shared::errors::ApiError;

use crate::domain::entities::Session;

const COLUMNS: &str =
    "uuid, user_id, session_token AS token_hash, created_at, last_seen_at, expires_at, reauth_at, revoked_at, ip_address, user_agent";

fn row_to_session(row: Row) -> Session {
    Session {
        uuid: row.get("uuid"),
        user_id: row.get("user_id"),
        token_hash: row.get("token_hash"),
        created_at: row.get("created_at"),
        last_seen_at: row.get("last_seen_at"),
        expires_at: row.get("expires_at"),
        reauth_at: row.get("reauth_at"),
        revoked_at: row.get("revoked_at"),
        ip_address: row.get("ip_address"),
        user_agent: row.get("user_agent"),
    }
}

/// Stores a newly minted session. `token_hash` is the BLAKE3 digest of the
/// plaintext cookie value; the plaintext itself is never persisted.
pub fn create(
    client: &mut Client,
    user_id: Uuid,
    token_hash: &str,
    expires_at: DateTime<Utc>,
    ip_address: Option<&str>,
    user_agent: Option<&str>,
) -> Result<Session, ApiError> {
    let sql = format!(
        "INSERT INTO auth.user_sessions (uuid, user_id, session_token, created_at, last_seen_at, expires_at, ip_address, user_agent) \
         VALUES (gen_random_uuid(), $1, $2, NOW(), NOW(), $3, $4, $5) \
         RETURNING {COLUMNS}"
    );
    let row = client.query_one(&sql, &[&user_id, &token_hash, &expires_at, &ip_address, &user_agent])?;
    Ok(row_to_session(row))
}

/// Lists the active (non-revoked, non-expired) sessions owned by a user,
/// optionally narrowed to a single session UUID.
pub fn list(client: &mut Client, owner_user_id: Uuid, session_uuid: Option<Uuid>) -> Result<Vec<Session>, ApiError> {
    let sql = format!(
        "SELECT {COLUMNS} FROM auth.user_sessions \
         WHERE user_id = $1 AND revoked_at IS NULL AND expires_at > NOW() \
           AND ($2::uuid IS NULL OR uuid = $2) \
         ORDER BY created_at DESC"
    );
    Ok(client
        .query(&sql, &[&owner_user_id, &session_uuid])?
        .into_iter()
        .map(row_to_session)
        .collect())
}

/// Revokes one session owned by `owner_user_id`. Returns `true` if a row
/// was affected (i.e. it existed and wasn't already revoked).
pub fn revoke(client: &mut Client, owner_user_id: Uuid, session_uuid: Uuid) -> Result<bool, ApiError> {
    let affected = client.execute(
        "UPDATE auth.user_sessions SET revoked_at = NOW() WHERE user_id = $1 AND uuid = $2 AND revoked_at IS NULL",
        &[&owner_user_id, &session_uuid],
    )?;
    Ok(affected > 0)
}

/// Revokes every active session for a user. Called after `users_patch`
/// changes credentials, so a stolen session can't outlive a password reset.
pub fn revoke_all(client: &mut Client, user_id: Uuid) -> Result<u64, ApiError> {
    Ok(client.execute(
        "UPDATE auth.user_sessions SET revoked_at = NOW() WHERE user_id = $1 AND revoked_at IS NULL",
        &[&user_id],
    )?)
}
