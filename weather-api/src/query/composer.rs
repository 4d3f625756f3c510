//! # SQL Query Composer
//!
//! Builds the two shapes of SELECT a weather-data request can resolve to:
//! the **static** path, which projects precomputed columns straight out of
//! a summary table, and the **dynamic** path, which buckets the raw table
//! with `generate_series` and recomputes the same column set on the fly.
//! Which path runs is decided by [`timezones_equivalent`] — see
//! [`super::pick_path`].

use chrono::{DateTime, Offset, Utc};
use chrono_tz::Tz;
use std::fmt::Write as _;
use std::str::FromStr;

use crate::domain::entities::Granularity;
use super::fields::{FieldKind, FieldSpec, FIELD_TABLE};

/// Threads a growing buffer and appends a trailing comma after every
/// fragment, trimming the final one at the end — the builder shape §9
/// calls for translated into an owned `String`.
struct ProjectionBuilder {
    buffer: String,
}

impl ProjectionBuilder {
    fn new() -> Self {
        Self { buffer: String::new() }
    }

    fn push(&mut self, fragment: &str) {
        self.buffer.push_str(fragment);
        self.buffer.push(',');
    }

    fn finish(mut self) -> String {
        if self.buffer.ends_with(',') {
            self.buffer.pop();
        }
        self.buffer
    }
}

/// The `lower(time_range)`/`upper(time_range)` pair every path begins with,
/// aliased so both paths emit identical column names.
const BASE_PROJECTION: &str = "lower(time_range) AS period_start,upper(time_range) AS period_end";

fn bucket_unit(granularity: Granularity) -> &'static str {
    match granularity {
        Granularity::Raw => unreachable!("raw granularity never reaches the dynamic path"),
        Granularity::Hour => "hour",
        Granularity::Day => "day",
        Granularity::Month => "month",
        Granularity::Year => "year",
    }
}

fn includes_minmax(granularity: Granularity) -> bool {
    matches!(granularity, Granularity::Day | Granularity::Month | Granularity::Year)
}

/// The precomputed column(s) a field projects to on the static path. On the
/// raw path every field is just its bare column name.
fn static_fragment(field: &FieldSpec, granularity: Granularity) -> String {
    if granularity == Granularity::Raw {
        return field.raw_column.to_string();
    }

    match field.kind {
        FieldKind::Standard => {
            let mut cols = format!("avg_{0},stddev_{0}", field.raw_column);
            if includes_minmax(granularity) {
                let _ = write!(cols, ",min_{0},max_{0}", field.raw_column);
            }
            if field.raw_column == "wind_speed" && granularity == Granularity::Day {
                cols.push_str(",wind_run");
            }
            cols
        }
        FieldKind::WindDirection => "avg_wind_direction".to_string(),
        FieldKind::Sum => "rain_total".to_string(),
        FieldKind::GustSpeed => "max_gust_speed".to_string(),
        FieldKind::GustDirection => "max_gust_direction".to_string(),
    }
}

/// The aggregate expression a field recomputes as, on the dynamic path,
/// from the raw table aliased `w` inside a bucket `[bucket_start,
/// bucket_end)`.
fn dynamic_fragment(field: &FieldSpec, granularity: Granularity) -> String {
    let unit = bucket_unit(granularity);
    match field.kind {
        FieldKind::Standard => {
            let c = field.raw_column;
            let mut expr = format!("AVG(w.{c}) AS avg_{c},STDDEV(w.{c}) AS stddev_{c}");
            if includes_minmax(granularity) {
                let _ = write!(expr, ",MIN(w.{c}) AS min_{c},MAX(w.{c}) AS max_{c}");
            }
            if c == "wind_speed" && granularity == Granularity::Day {
                expr.push_str(
                    ",SUM(w.wind_speed * EXTRACT(EPOCH FROM (upper(w.time_range) - lower(w.time_range)))) AS wind_run",
                );
            }
            expr
        }
        // Vector-sum formula: undefined (NULL) when SUM of both components
        // is zero, which ATAN2(0,0) already yields as NaN-safe NULL under
        // Postgres' float semantics when no wind rows are present.
        FieldKind::WindDirection => "MOD(DEGREES(ATAN2(\
            SUM(w.wind_speed * SIN(RADIANS(w.wind_direction))),\
            SUM(w.wind_speed * COS(RADIANS(w.wind_direction)))\
        )) + 360, 360) AS avg_wind_direction"
            .to_string(),
        FieldKind::Sum => "SUM(w.rain) AS rain_total".to_string(),
        FieldKind::GustSpeed => "MAX(w.gust_speed) AS max_gust_speed".to_string(),
        // The direction paired with the row that maximizes gust_speed in
        // this bucket, not the numerical max of directions.
        FieldKind::GustDirection => format!(
            "(SELECT w2.gust_direction \
             FROM weather.weather_data w2 \
             WHERE w2.station_id = w.station_id \
               AND w2.time_range && tstzrange(b.bucket_start, b.bucket_start + interval '1 {unit}') \
             ORDER BY w2.gust_speed DESC NULLS LAST LIMIT 1) AS max_gust_direction"
        ),
    }
}

fn projected_fields(bitmask: u32) -> impl Iterator<Item = &'static FieldSpec> {
    FIELD_TABLE.iter().filter(move |f| bitmask & f.bit != 0)
}

/// Builds the static-path SELECT, per §6.4's frozen shape: project from the
/// granularity's table, filter by station and range, order by bucket start.
/// Parameters: `$1` = station ref (UUID or name), `$2` = start, `$3` = end.
pub fn build_static_sql(granularity: Granularity, bitmask: u32) -> String {
    let mut projection = ProjectionBuilder::new();
    projection.push(BASE_PROJECTION);
    for field in projected_fields(bitmask) {
        projection.push(&static_fragment(field, granularity));
    }

    format!(
        "SELECT {cols} FROM {table} \
         WHERE station_id = (SELECT station_id FROM stations.stations WHERE name = $1 OR uuid::text = $1) \
           AND time_range && tstzrange($2, $3) \
         ORDER BY lower(time_range)",
        cols = projection.finish(),
        table = granularity.static_table(),
    )
}

/// Builds the dynamic-path SELECT: a `generate_series` bucket grid left-
/// joined against the raw table, grouped per bucket. Parameters: `$1` =
/// station ref, `$2` = start, `$3` = end. The session's time zone must
/// already be set on the connection (see [`super::set_session_timezone`])
/// so `generate_series`/`date_trunc` bucket in the requester's zone.
pub fn build_dynamic_sql(granularity: Granularity, bitmask: u32) -> String {
    let unit = bucket_unit(granularity);

    let mut projection = ProjectionBuilder::new();
    for field in projected_fields(bitmask) {
        projection.push(&dynamic_fragment(field, granularity));
    }
    let cols = projection.finish();

    format!(
        "WITH buckets AS (\
            SELECT generate_series(date_trunc('{unit}', $2::timestamptz), $3::timestamptz, interval '1 {unit}') AS bucket_start\
         ) \
         SELECT b.bucket_start AS period_start, b.bucket_start + interval '1 {unit}' AS period_end, {cols} \
         FROM buckets b \
         LEFT JOIN weather.weather_data w \
           ON w.station_id = (SELECT station_id FROM stations.stations WHERE name = $1 OR uuid::text = $1) \
          AND w.time_range && tstzrange(b.bucket_start, b.bucket_start + interval '1 {unit}') \
         GROUP BY b.bucket_start \
         ORDER BY b.bucket_start"
    )
}

/// Walks the range in one-day steps, comparing each zone's fixed UTC
/// offset at that instant. All zones change offset at local midnight in
/// this service's target regions, so sampling once per day is sufficient
/// (§4.4, §9's documented approximation — sub-daily transitions can be
/// missed, accepted as-is).
pub fn timezones_equivalent(
    requested_tz: &str,
    default_tz: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> bool {
    if requested_tz == default_tz {
        return true;
    }
    let (Ok(requested), Ok(default)) = (Tz::from_str(requested_tz), Tz::from_str(default_tz)) else {
        return false;
    };

    let mut cursor = start;
    while cursor <= end {
        let naive = cursor.naive_utc();
        let offset_requested = requested.offset_from_utc_datetime(&naive).fix().local_minus_utc();
        let offset_default = default.offset_from_utc_datetime(&naive).fix().local_minus_utc();
        if offset_requested != offset_default {
            return false;
        }
        cursor += chrono::Duration::days(1);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::fields::{DATA_TEMPERATURE, DATA_WIND_DIRECTION};
    use chrono::TimeZone;

    #[test]
    fn identical_timezone_names_short_circuit() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert!(timezones_equivalent("Europe/Madrid", "Europe/Madrid", start, end));
    }

    #[test]
    fn offset_divergence_across_dst_is_detected() {
        // Europe/Madrid observes DST; UTC never does, so a range spanning
        // a DST transition must be judged non-equivalent.
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        assert!(!timezones_equivalent("Europe/Madrid", "UTC", start, end));
    }

    #[test]
    fn unknown_timezone_name_is_not_equivalent() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        assert!(!timezones_equivalent("Not/AZone", "Europe/Madrid", start, end));
    }

    #[test]
    fn static_projection_follows_fixed_field_order() {
        let sql = build_static_sql(Granularity::Raw, DATA_TEMPERATURE | DATA_WIND_DIRECTION);
        assert!(sql.contains("temperature,wind_direction"));
        assert!(sql.starts_with("SELECT lower(time_range) AS period_start,upper(time_range) AS period_end,"));
    }

    #[test]
    fn summary_projection_adds_minmax_from_day_up() {
        let hourly = build_static_sql(Granularity::Hour, DATA_TEMPERATURE);
        assert!(hourly.contains("avg_temperature,stddev_temperature"));
        assert!(!hourly.contains("min_temperature"));

        let daily = build_static_sql(Granularity::Day, DATA_TEMPERATURE);
        assert!(daily.contains("min_temperature,max_temperature"));
    }
}
