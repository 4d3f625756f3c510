//! Repository for `auth.api_keys`.

use chrono::{DateTime, Utc};
use postgres::{Client, Row};
use uuid::Uuid;

use shared::errors::ApiError;

use crate::domain::entities::{ApiKey, ApiKeyType};

const COLUMNS: &str = "uuid, user_id, station_id, name, key_hash, api_key_type, expires_at, revoked_at";

fn row_to_api_key(row: Row) -> ApiKey {
    let type_str: String = row.get("api_key_type");
    let api_key_type = ApiKeyType::from_db_str(&type_str)
        .expect("api_key_type column is constrained to the three known values");
    ApiKey {
        uuid: row.get("uuid"),
        user_id: row.get("user_id"),
        station_id: row.get("station_id"),
        name: row.get("name"),
        key_hash: row.get("key_hash"),
        api_key_type,
        expires_at: row.get("expires_at"),
        revoked_at: row.get("revoked_at"),
    }
}

/// Stores a newly minted key. `key_hash` is the BLAKE3 digest of the
/// plaintext; like sessions, the plaintext is handed back once by the
/// service layer and never persisted.
#[allow(clippy::too_many_arguments)]
pub fn create(
    client: &mut Client,
    user_id: Uuid,
    station_id: Option<Uuid>,
    name: &str,
    key_hash: &str,
    api_key_type: ApiKeyType,
    expires_at: Option<DateTime<Utc>>,
) -> Result<ApiKey, ApiError> {
    let sql = format!(
        "INSERT INTO auth.api_keys (uuid, user_id, station_id, name, key_hash, api_key_type, expires_at) \
         VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, $6) \
         RETURNING {COLUMNS}"
    );
    let row = client.query_one(
        &sql,
        &[&user_id, &station_id, &name, &key_hash, &api_key_type.as_db_str(), &expires_at],
    )?;
    Ok(row_to_api_key(row))
}

/// Lists the active (non-revoked, non-expired) keys owned by a user,
/// optionally narrowed to one key UUID.
pub fn list(client: &mut Client, owner_user_id: Uuid, key_uuid: Option<Uuid>) -> Result<Vec<ApiKey>, ApiError> {
    let sql = format!(
        "SELECT {COLUMNS} FROM auth.api_keys \
         WHERE user_id = $1 AND revoked_at IS NULL AND (expires_at IS NULL OR expires_at > NOW()) \
           AND ($2::uuid IS NULL OR uuid = $2) \
         ORDER BY uuid"
    );
    Ok(client
        .query(&sql, &[&owner_user_id, &key_uuid])?
        .into_iter()
        .map(row_to_api_key)
        .collect())
}

/// Revokes one key owned by `owner_user_id`. Returns `true` if a row was
/// affected.
pub fn revoke(client: &mut Client, owner_user_id: Uuid, key_uuid: Uuid) -> Result<bool, ApiError> {
    let affected = client.execute(
        "UPDATE auth.api_keys SET revoked_at = NOW() WHERE user_id = $1 AND uuid = $2 AND revoked_at IS NULL",
        &[&owner_user_id, &key_uuid],
    )?;
    Ok(affected > 0)
}
