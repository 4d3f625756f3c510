//! # Query Composer (C4)
//!
//! Turns a validated weather-data request into SQL: decides between the
//! static (precomputed summary table) and dynamic (on-the-fly aggregation
//! over the raw table) paths based on timezone equivalence, then builds the
//! bitmask-driven projection for whichever path was chosen.

pub mod composer;
pub mod fields;

use postgres::Client;
use shared::errors::ApiError;

use crate::domain::entities::{Granularity, QueryData};

pub use composer::{build_dynamic_sql, build_static_sql, timezones_equivalent};
pub use fields::parse_fields;

/// Which SELECT the composer decided to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPath {
    Static,
    Dynamic,
}

/// §4.4's routing decision: raw granularity is always static; anything
/// else is static only when the requested zone is observationally
/// identical to the server default over the whole range.
pub fn pick_path(query: &QueryData, default_timezone: &str) -> QueryPath {
    if query.granularity == Granularity::Raw {
        return QueryPath::Static;
    }
    if timezones_equivalent(&query.timezone, default_timezone, query.start_time, query.end_time) {
        QueryPath::Static
    } else {
        QueryPath::Dynamic
    }
}

/// Builds the SQL text for whichever path `pick_path` selected.
pub fn build_sql(path: QueryPath, query: &QueryData) -> String {
    match path {
        QueryPath::Static => build_static_sql(query.granularity, query.fields_bitmask),
        QueryPath::Dynamic => build_dynamic_sql(query.granularity, query.fields_bitmask),
    }
}

/// Sets the session's time zone on the borrowed connection before a
/// weather query runs. Because connections are pooled, a prior borrower's
/// `SET TIME ZONE` can leak forward; every weather query re-sets it rather
/// than relying on a reset during release (§4.4, §9).
///
/// The zone literal is escaped server-side with `quote_literal` to defeat
/// injection. If that escaping call itself fails, the query proceeds under
/// the default zone instead of erroring — preserved as a documented quirk,
/// not repaired (§9 open question).
pub fn set_session_timezone(client: &mut Client, tz: &str, default_timezone: &str) -> Result<(), ApiError> {
    let quoted: Option<String> = client
        .query_one("SELECT quote_literal($1)", &[&tz])
        .ok()
        .map(|row| row.get(0));

    let literal = quoted.unwrap_or_else(|| format!("'{default_timezone}'"));
    client.batch_execute(&format!("SET TIME ZONE {literal}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_query(granularity: Granularity, timezone: &str) -> QueryData {
        QueryData {
            start_time: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap(),
            timezone: timezone.to_string(),
            granularity,
            fields_bitmask: fields::DATA_TEMPERATURE,
        }
    }

    #[test]
    fn raw_granularity_always_takes_the_static_path() {
        let query = sample_query(Granularity::Raw, "America/New_York");
        assert_eq!(pick_path(&query, "Europe/Madrid"), QueryPath::Static);
    }

    #[test]
    fn matching_timezone_takes_the_static_path() {
        let query = sample_query(Granularity::Day, "Europe/Madrid");
        assert_eq!(pick_path(&query, "Europe/Madrid"), QueryPath::Static);
    }

    #[test]
    fn diverging_timezone_takes_the_dynamic_path() {
        let query = sample_query(Granularity::Day, "America/New_York");
        assert_eq!(pick_path(&query, "Europe/Madrid"), QueryPath::Dynamic);
    }
}
