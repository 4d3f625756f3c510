//! Repository for `stations.stations`.

use postgres::{Client, Row};
use uuid::Uuid;

use shared::errors::ApiError;

use crate::domain::entities::Station;

const COLUMNS: &str = "uuid, user_id, name, \
    ST_X(location::geometry) AS longitude, ST_Y(location::geometry) AS latitude, ST_Z(location::geometry) AS altitude, \
    deleted_at";

fn row_to_station(row: Row) -> Station {
    Station {
        uuid: row.get("uuid"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        longitude: row.get("longitude"),
        latitude: row.get("latitude"),
        altitude: row.get("altitude"),
        deleted_at: row.get("deleted_at"),
    }
}

/// Inserts a station only if the owner is still under quota. The quota
/// check and the insert run as one statement (`INSERT ... SELECT` gated by
/// a CTE), so a race between two concurrent creates for the same user
/// can't both pass the check and both insert. Zero rows back means the
/// quota was full; the caller maps that to `ApiError::Forbidden`.
pub fn create(
    client: &mut Client,
    owner_user_id: Uuid,
    name: &str,
    longitude: f64,
    latitude: f64,
    altitude: f64,
) -> Result<Option<Station>, ApiError> {
    let sql = format!(
        "WITH quota_check AS (\
            SELECT u.user_id FROM auth.users u \
            WHERE u.user_id = $1 \
              AND (u.max_stations < 0 OR \
                   (SELECT COUNT(*) FROM stations.stations s WHERE s.user_id = u.user_id AND s.deleted_at IS NULL) < u.max_stations) \
         ) \
         INSERT INTO stations.stations (uuid, user_id, name, location, created_at) \
         SELECT gen_random_uuid(), $1, $2, ST_SetSRID(ST_MakePoint($3, $4, $5), 4326)::geography, NOW() \
         FROM quota_check \
         RETURNING {COLUMNS}"
    );
    let row = client.query_opt(&sql, &[&owner_user_id, &name, &longitude, &latitude, &altitude])?;
    Ok(row.map(row_to_station))
}

/// Lists every non-deleted station. Narrowing to one station goes through
/// [`find_by_ref`] instead; there's no "list by owner" path in this
/// server's fixed HTTP surface.
pub fn list(client: &mut Client) -> Result<Vec<Station>, ApiError> {
    let sql = format!("SELECT {COLUMNS} FROM stations.stations WHERE deleted_at IS NULL");
    Ok(client.query(&sql, &[])?.into_iter().map(row_to_station).collect())
}

/// Looks up one non-deleted station by UUID or name.
pub fn find_by_ref(client: &mut Client, station_ref: &str) -> Result<Option<Station>, ApiError> {
    let sql = format!("SELECT {COLUMNS} FROM stations.stations WHERE (uuid::text = $1 OR name = $1) AND deleted_at IS NULL");
    Ok(client.query_opt(&sql, &[&station_ref])?.map(row_to_station))
}
