//! Repository for the weather-data endpoint. Unlike the fixed-shape
//! resources elsewhere in this module, the column set here varies with the
//! request's `fields` bitmask, so rows are projected through
//! [`shared::validation::rowset_to_json`] instead of a `FromSql` struct.

use chrono::{DateTime, Utc};
use postgres::Client;
use serde_json::Value;

use shared::errors::ApiError;
use shared::validation::rowset_to_json;

/// Runs the composed SQL (static or dynamic) against a
/// connection that already has the requester's time zone set on it (see
/// [`crate::query::set_session_timezone`]). Always returns a JSON array,
/// one element per bucket — a weather-data response is never collapsed to
/// a bare object even when it has one row.
pub fn fetch(
    client: &mut Client,
    sql: &str,
    station_ref: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Value, ApiError> {
    let rows = client.query(sql, &[&station_ref, &start, &end])?;
    Ok(rowset_to_json(&rows, false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_rowset_is_empty_array_not_object() {
        assert_eq!(rowset_to_json(&[], false), Value::Array(Vec::new()));
    }
}
