//! # Domain Entities
//!
//! Plain structs mirroring the persisted shapes of `auth.users`,
//! `auth.user_sessions`, `auth.api_keys`, `stations.stations`, and the
//! `weather.*` tables. Rows are read back from `postgres::Row` through
//! `shared::validation::rowset_to_json` for the weather-data endpoint (whose
//! column set varies with the request bitmask), but the fixed-shape
//! resources below are read through `postgres`'s built-in `FromSql` impls
//! (`Row::get`) in the `repository` submodules instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account. `password_hash` is an Argon2id PHC string and is
/// never serialized back to a client — see [`UserProfile`].
#[derive(Debug, Clone)]
pub struct User {
    /// Surrogate primary key other tables' `user_id` foreign keys point
    /// at. `uuid` below is the public identifier handed out in API
    /// responses and matched against `userRef`; the two are distinct
    /// columns per the frozen `validate_session` query (§6.4) even though
    /// nothing in this service ever rotates one independently of the
    /// other.
    pub user_id: Uuid,
    pub uuid: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    /// Non-negative station quota, or `-1` for unlimited.
    pub max_stations: i64,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// The public projection of [`User`] returned from the API: excludes the
/// password hash entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub uuid: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub max_stations: i64,
    pub is_admin: bool,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            uuid: user.uuid,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
            max_stations: user.max_stations,
            is_admin: user.is_admin,
        }
    }
}

/// A session record. Only `token_hash` is ever persisted or looked up;
/// the plaintext is returned to the caller exactly once, at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub uuid: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub reauth_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl Session {
    /// A session is active iff it hasn't expired, hasn't been revoked, and
    /// its owning user hasn't been soft-deleted. The user-deletion half of
    /// this is enforced by the SQL join in `validate_session`, not here;
    /// this helper covers the two fields a `Session` alone can answer.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now && self.revoked_at.is_none()
    }
}

/// The three roles an API key can hold. Display form matches the
/// persisted column value exactly (`weather_upload`, `stations_management`,
/// `stations_control`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeyType {
    WeatherUpload,
    StationsManagement,
    StationsControl,
}

impl ApiKeyType {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::WeatherUpload => "weather_upload",
            Self::StationsManagement => "stations_management",
            Self::StationsControl => "stations_control",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "weather_upload" => Some(Self::WeatherUpload),
            "stations_management" => Some(Self::StationsManagement),
            "stations_control" => Some(Self::StationsControl),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub uuid: Uuid,
    pub user_id: Uuid,
    pub station_id: Option<Uuid>,
    pub name: String,
    #[serde(skip_serializing)]
    pub key_hash: String,
    pub api_key_type: ApiKeyType,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// A weather station. `longitude`/`latitude`/`altitude` are extracted from
/// the stored PostGIS geography column at read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub uuid: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub longitude: f64,
    pub latitude: f64,
    pub altitude: f64,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Requested aggregation bucket width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Raw,
    Hour,
    Day,
    Month,
    Year,
}

impl Granularity {
    pub fn from_query_str(value: &str) -> Option<Self> {
        match value {
            "raw" => Some(Self::Raw),
            "hour" => Some(Self::Hour),
            "day" => Some(Self::Day),
            "month" => Some(Self::Month),
            "year" => Some(Self::Year),
            _ => None,
        }
    }

    /// Name of the table this granularity reads from on the static path.
    pub fn static_table(self) -> &'static str {
        match self {
            Self::Raw => "weather.weather_data",
            Self::Hour => "weather.weather_hourly_summary",
            Self::Day => "weather.weather_daily_summary",
            Self::Month => "weather.weather_monthly_summary",
            Self::Year => "weather.weather_yearly_summary",
        }
    }
}

/// Request-scoped parameters for a weather-data query, resolved by the
/// router/handler before reaching the query composer.
#[derive(Debug, Clone)]
pub struct QueryData {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub timezone: String,
    pub granularity: Granularity,
    pub fields_bitmask: u32,
}

/// Everything a handler needs to build the final HTTP response: the JSON
/// body, the status (resolved per §4.7's method-default table unless the
/// service overrides it), and — for `sessions_create` only — the plaintext
/// token and max-age to mint a `Set-Cookie` header from.
#[derive(Debug, Clone)]
pub struct ResponseData {
    pub body: serde_json::Value,
    pub set_session_token: Option<String>,
    pub session_max_age: Option<i64>,
}

impl ResponseData {
    pub fn body_only(body: serde_json::Value) -> Self {
        Self {
            body,
            set_session_token: None,
            session_max_age: None,
        }
    }

    /// Used by `sessions_create` only: the body plus the plaintext token
    /// and max-age the handler turns into a `Set-Cookie` header.
    pub fn with_session(body: serde_json::Value, token: String, max_age: i64) -> Self {
        Self {
            body,
            set_session_token: Some(token),
            session_max_age: Some(max_age),
        }
    }
}
