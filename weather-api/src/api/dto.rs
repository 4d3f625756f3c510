//! # Data Transfer Objects
//!
//! Request bodies are deserialized here and checked against the C2
//! validators in the handler, not with derive-macro field attributes —
//! the validation rules are bespoke ASCII-level checks
//! (`shared::validation`), not a generic `email`/`length` ruleset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::{ApiKey, ApiKeyType, Station};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct PatchUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub old_password: Option<String>,
    pub max_stations: Option<i64>,
    pub is_admin: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub password: String,
    /// Session lifetime in seconds. Defaults to
    /// [`crate::service::sessions_service::DEFAULT_MAX_AGE_SECONDS`] when
    /// absent.
    pub max_age: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub uuid: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<crate::domain::entities::Session> for SessionResponse {
    fn from(session: crate::domain::entities::Session) -> Self {
        Self {
            uuid: session.uuid,
            created_at: session.created_at,
            expires_at: session.expires_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateApiKeyRequest {
    pub name: String,
    pub api_key_type: ApiKeyType,
    pub station_id: Option<Uuid>,
}

/// Unlike [`SessionResponse`], the plaintext lives in the body here rather
/// than a cookie — the HTTP surface table has api-key creation return "key
/// (plaintext once)" directly.
#[derive(Debug, Serialize)]
pub struct ApiKeyResponse {
    pub uuid: Uuid,
    pub name: String,
    pub api_key_type: ApiKeyType,
    pub station_id: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
    pub key: String,
}

/// What `GET .../api-keys[/{keyId}]` returns: the key's metadata, never the
/// plaintext (that's [`ApiKeyResponse`], returned once on creation).
#[derive(Debug, Serialize)]
pub struct ApiKeySummary {
    pub uuid: Uuid,
    pub name: String,
    pub api_key_type: ApiKeyType,
    pub station_id: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<ApiKey> for ApiKeySummary {
    fn from(key: ApiKey) -> Self {
        Self {
            uuid: key.uuid,
            name: key.name,
            api_key_type: key.api_key_type,
            station_id: key.station_id,
            expires_at: key.expires_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateStationRequest {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub altitude: f64,
}

#[derive(Debug, Serialize)]
pub struct StationResponse {
    pub uuid: Uuid,
    pub name: String,
    pub longitude: f64,
    pub latitude: f64,
    pub altitude: f64,
}

impl From<Station> for StationResponse {
    fn from(station: Station) -> Self {
        Self {
            uuid: station.uuid,
            name: station.name,
            longitude: station.longitude,
            latitude: station.latitude,
            altitude: station.altitude,
        }
    }
}

/// Query parameters for `GET /stations/{ref}/weather-data`. Each field is
/// parsed with the C2 validators before `QueryData` is built.
#[derive(Debug, Deserialize)]
pub struct WeatherDataQuery {
    pub granularity: String,
    pub start_time: String,
    pub end_time: String,
    pub timezone: Option<String>,
    pub fields: Option<String>,
}
