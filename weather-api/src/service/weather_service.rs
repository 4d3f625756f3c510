//! Business logic for `/stations/{ref}/weather-data` (§4.5's
//! `weather_data_list`). Public; no auth required.

use serde_json::Value;

use shared::database::Pool;
use shared::errors::ApiError;

use crate::domain::entities::QueryData;
use crate::query::{build_sql, pick_path, set_session_timezone};
use crate::repository::weather_repo;

#[derive(Clone)]
pub struct WeatherService {
    pool: Pool,
    default_timezone: String,
}

impl WeatherService {
    pub fn new(pool: Pool, default_timezone: String) -> Self {
        Self { pool, default_timezone }
    }

    pub fn list(&self, station_ref: &str, query: QueryData) -> Result<Value, ApiError> {
        let mut conn = self.pool.acquire();
        let client = conn.client();

        // Every weather query re-sets the session's time zone: connections
        // are pooled, so a prior borrower's SET TIME ZONE can leak forward.
        set_session_timezone(client, &query.timezone, &self.default_timezone)?;

        let path = pick_path(&query, &self.default_timezone);
        let sql = build_sql(path, &query);
        weather_repo::fetch(client, &sql, station_ref, query.start_time, query.end_time)
    }
}
