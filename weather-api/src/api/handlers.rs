//! # Request Handlers (C7)
//!
//! Everything reaches the services through a single catch-all
//! [`dispatch`], which matches `(method, router::Endpoint)` and delegates
//! to one `handle_*` function per operation. Each `handle_*` parses the
//! body/query (if any), runs the C2 validators a service expects its
//! caller to have already applied, calls exactly one service method via
//! [`block`], and maps the outcome to the status/body pair §4.7 specifies.

use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use shared::auth::middleware::AuthMaterial;
use shared::database::{self, Pool};
use shared::errors::ApiError;
use shared::validation::{validate_email, validate_name, validate_timestamp};

use crate::credentials::resolve_session_owner;
use crate::domain::entities::{Granularity, QueryData, ResponseData, User};
use crate::router::{self, Endpoint};
use crate::service::users_service::UserPatch;
use crate::AppState;

use super::dto::{
    ApiKeyResponse, ApiKeySummary, CreateApiKeyRequest, CreateSessionRequest, CreateStationRequest,
    CreateUserRequest, PatchUserRequest, SessionResponse, StationResponse, WeatherDataQuery,
};

const DEFAULT_SESSION_MAX_AGE_SECONDS: i64 = crate::service::sessions_service::DEFAULT_MAX_AGE_SECONDS;

/// Runs a blocking closure on actix's dedicated thread pool and unwraps
/// its `Result` — this is what lets handlers built on the synchronous
/// pool/service layer run under an async reactor without blocking it
/// (§4.1, §5).
async fn block<F, T>(f: F) -> Result<T, actix_web::Error>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    web::block(f).await?.map_err(Into::into)
}

fn parse_body<T: DeserializeOwned>(body: &web::Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(ApiError::JsonError)
}

fn require_token(auth: &AuthMaterial) -> Result<String, ApiError> {
    auth.session_token.clone().ok_or(ApiError::AuthError)
}

fn parse_path_uuid(value: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(value).map_err(|_| ApiError::InvalidParams)
}

/// Resolves the `"me"` self-alias to the caller's own UUID before the
/// request reaches the service layer. Not a new service operation — a
/// router/handler-level convenience (§4.5 supplement).
async fn resolve_id(pool: &Pool, id: String, auth: &AuthMaterial) -> Result<String, actix_web::Error> {
    if id != "me" {
        return Ok(id);
    }
    let token = require_token(auth)?;
    let pool = pool.clone();
    let owner = block(move || {
        let mut conn = pool.acquire();
        resolve_session_owner(conn.client(), &token)
    })
    .await?;
    owner
        .map(|uuid| uuid.to_string())
        .ok_or_else(|| ApiError::AuthError.into())
}

fn user_profile_json(user: User) -> serde_json::Value {
    serde_json::to_value(crate::domain::entities::UserProfile::from(user)).unwrap_or(serde_json::Value::Null)
}

/// The default status for a successful response, keyed off the HTTP
/// method per §4.7's table (GET/PATCH → 200, POST → 201, DELETE → 204).
/// A handler overrides this only by setting a different status itself
/// (none currently do; all of them map cleanly onto this table).
fn default_status(method: &actix_web::http::Method) -> StatusCode {
    use actix_web::http::Method;
    match *method {
        Method::POST => StatusCode::CREATED,
        Method::DELETE => StatusCode::NO_CONTENT,
        _ => StatusCode::OK,
    }
}

/// Turns a handler's [`ResponseData`] into the actual HTTP response: picks
/// the status from the method, attaches the `Set-Cookie` header when the
/// handler minted a session, and omits the body on a 204.
fn render(method: &actix_web::http::Method, data: ResponseData) -> HttpResponse {
    let status = default_status(method);
    let mut builder = HttpResponse::build(status);

    if let Some(token) = data.set_session_token {
        let max_age = data.session_max_age.unwrap_or(DEFAULT_SESSION_MAX_AGE_SECONDS);
        let cookie = Cookie::build("sessiontoken", token)
            .path("/")
            .http_only(true)
            .secure(true)
            .same_site(SameSite::Lax)
            .max_age(CookieDuration::seconds(max_age))
            .finish();
        builder.cookie(cookie);
    }

    if status == StatusCode::NO_CONTENT {
        builder.finish()
    } else {
        builder.json(data.body)
    }
}

/// The single entry point every request is routed through. `path` is
/// matched against the fixed table in [`router::route`]; unmatched paths
/// and unsupported methods on matched paths both surface as 404, per
/// §4.6 ("Unmatched paths yield HTTP 404"). Each `handle_*` only builds the
/// [`ResponseData`] payload; [`render`] is the one place that turns it into
/// an `HttpResponse`.
pub async fn dispatch(req: HttpRequest, body: web::Bytes, state: web::Data<AppState>) -> actix_web::Result<HttpResponse> {
    let auth = AuthMaterial::from_request(&req);
    let method = req.method().clone();

    let Some(endpoint) = router::route(req.path()) else {
        return Err(ApiError::NotFound.into());
    };

    use actix_web::http::Method;

    let data = match (method.clone(), endpoint) {
        (Method::POST, Endpoint::Users) => handle_users_create(&state, &body).await,
        (Method::GET, Endpoint::Users) => handle_users_list_bare(&state, &auth).await,

        (Method::GET, Endpoint::User { id }) => handle_user_get(&state, id, &auth).await,
        (Method::PATCH, Endpoint::User { id }) => handle_user_patch(&state, id, &auth, &body).await,
        (Method::DELETE, Endpoint::User { id }) => handle_user_delete(&state, id, &auth).await,

        (Method::POST, Endpoint::UserSessions { id }) => handle_sessions_create(&state, id, &auth, &body).await,
        (Method::GET, Endpoint::UserSessions { id }) => handle_sessions_list(&state, id, &auth, None).await,

        (Method::GET, Endpoint::UserSession { id, session_uuid }) => {
            let session_uuid = parse_path_uuid(&session_uuid)?;
            handle_sessions_list(&state, id, &auth, Some(session_uuid)).await
        }
        (Method::DELETE, Endpoint::UserSession { id, session_uuid }) => {
            let session_uuid = parse_path_uuid(&session_uuid)?;
            handle_sessions_delete(&state, id, &auth, session_uuid).await
        }

        (Method::POST, Endpoint::UserApiKeys { id }) => handle_api_keys_create(&state, id, &auth, &body).await,
        (Method::GET, Endpoint::UserApiKeys { id }) => handle_api_keys_list(&state, id, &auth, None).await,

        (Method::GET, Endpoint::UserApiKey { id, key_id }) => {
            let key_uuid = parse_path_uuid(&key_id)?;
            handle_api_keys_list(&state, id, &auth, Some(key_uuid)).await
        }
        (Method::DELETE, Endpoint::UserApiKey { id, key_id }) => {
            let key_uuid = parse_path_uuid(&key_id)?;
            handle_api_keys_delete(&state, id, &auth, key_uuid).await
        }

        (Method::POST, Endpoint::Stations) => handle_stations_create(&state, &auth, &body).await,
        (Method::GET, Endpoint::Stations) => handle_stations_list(&state, None).await,

        (Method::GET, Endpoint::Station { station_ref }) => handle_stations_list(&state, Some(station_ref)).await,

        (Method::GET, Endpoint::StationWeatherData { station_ref }) => {
            handle_weather_data(&state, station_ref, req.query_string()).await
        }

        _ => Err(ApiError::NotFound.into()),
    }?;

    Ok(render(&method, data))
}

// ── Users ───────────────────────────────────────────────────────────────

async fn handle_users_create(state: &AppState, body: &web::Bytes) -> actix_web::Result<ResponseData> {
    let request: CreateUserRequest = parse_body(body)?;
    if !validate_name(&request.username) || !validate_email(&request.email) {
        return Err(ApiError::InvalidParams.into());
    }

    let service = state.users_service.clone();
    let user = block(move || service.create(&request.username, &request.email, &request.password)).await?;
    Ok(ResponseData::body_only(user_profile_json(user)))
}

async fn handle_users_list_bare(state: &AppState, auth: &AuthMaterial) -> actix_web::Result<ResponseData> {
    let token = require_token(auth)?;
    let service = state.users_service.clone();
    let users = block(move || service.list(None, &token)).await?;
    let profiles: Vec<_> = users.into_iter().map(user_profile_json).collect();
    Ok(ResponseData::body_only(serde_json::Value::Array(profiles)))
}

async fn handle_user_get(state: &AppState, id: String, auth: &AuthMaterial) -> actix_web::Result<ResponseData> {
    let token = require_token(auth)?;
    let id = resolve_id(&state.pool, id, auth).await?;

    let service = state.users_service.clone();
    let mut users = block(move || service.list(Some(&id), &token)).await?;
    let user = users.pop().ok_or(ApiError::NotFound)?;
    Ok(ResponseData::body_only(user_profile_json(user)))
}

async fn handle_user_patch(
    state: &AppState,
    id: String,
    auth: &AuthMaterial,
    body: &web::Bytes,
) -> actix_web::Result<ResponseData> {
    let token = require_token(auth)?;
    let id = resolve_id(&state.pool, id, auth).await?;
    let request: PatchUserRequest = parse_body(body)?;

    if let Some(username) = &request.username {
        if !validate_name(username) {
            return Err(ApiError::InvalidParams.into());
        }
    }
    if let Some(email) = &request.email {
        if !validate_email(email) {
            return Err(ApiError::InvalidParams.into());
        }
    }

    let patch = UserPatch {
        username: request.username,
        email: request.email,
        max_stations: request.max_stations,
        is_admin: request.is_admin,
        old_password: request.old_password,
        new_password: request.password,
    };

    let service = state.users_service.clone();
    let user = block(move || service.patch(&id, patch, &token)).await?;
    Ok(ResponseData::body_only(user_profile_json(user)))
}

async fn handle_user_delete(state: &AppState, id: String, auth: &AuthMaterial) -> actix_web::Result<ResponseData> {
    let token = require_token(auth)?;
    let id = resolve_id(&state.pool, id, auth).await?;
    let service = state.users_service.clone();
    block(move || service.delete(&id, &token)).await?;
    Ok(ResponseData::body_only(serde_json::Value::Null))
}

// ── Sessions ────────────────────────────────────────────────────────────

async fn handle_sessions_create(
    state: &AppState,
    id: String,
    auth: &AuthMaterial,
    body: &web::Bytes,
) -> actix_web::Result<ResponseData> {
    let id = resolve_id(&state.pool, id, auth).await?;
    let request: CreateSessionRequest = parse_body(body)?;
    let max_age = request.max_age.unwrap_or(DEFAULT_SESSION_MAX_AGE_SECONDS);
    let peer_ip = auth.peer_ip.clone();
    let user_agent = auth.user_agent.clone();

    let service = state.sessions_service.clone();
    let (session, plaintext) =
        block(move || service.create(&id, &request.password, max_age, peer_ip.as_deref(), user_agent.as_deref()))
            .await?;

    let body = serde_json::to_value(SessionResponse::from(session)).unwrap_or(serde_json::Value::Null);
    Ok(ResponseData::with_session(body, plaintext, max_age))
}

async fn handle_sessions_list(
    state: &AppState,
    id: String,
    auth: &AuthMaterial,
    session_uuid: Option<Uuid>,
) -> actix_web::Result<ResponseData> {
    let token = require_token(auth)?;
    let id = resolve_id(&state.pool, id, auth).await?;
    let service = state.sessions_service.clone();
    let mut sessions = block(move || service.list(&id, session_uuid, &token)).await?;

    if session_uuid.is_some() {
        let session = sessions.pop().ok_or(ApiError::NotFound)?;
        let body = serde_json::to_value(SessionResponse::from(session)).unwrap_or(serde_json::Value::Null);
        Ok(ResponseData::body_only(body))
    } else {
        let body: Vec<_> = sessions.into_iter().map(SessionResponse::from).collect();
        Ok(ResponseData::body_only(serde_json::to_value(body).unwrap_or(serde_json::Value::Null)))
    }
}

async fn handle_sessions_delete(
    state: &AppState,
    id: String,
    auth: &AuthMaterial,
    session_uuid: Uuid,
) -> actix_web::Result<ResponseData> {
    let token = require_token(auth)?;
    let id = resolve_id(&state.pool, id, auth).await?;
    let service = state.sessions_service.clone();
    block(move || service.delete(&id, session_uuid, &token)).await?;
    Ok(ResponseData::body_only(serde_json::Value::Null))
}

// ── API keys ────────────────────────────────────────────────────────────

async fn handle_api_keys_create(
    state: &AppState,
    id: String,
    auth: &AuthMaterial,
    body: &web::Bytes,
) -> actix_web::Result<ResponseData> {
    let token = require_token(auth)?;
    let id = resolve_id(&state.pool, id, auth).await?;
    let request: CreateApiKeyRequest = parse_body(body)?;
    if !validate_name(&request.name) {
        return Err(ApiError::InvalidParams.into());
    }

    let service = state.api_keys_service.clone();
    let (key, plaintext) =
        block(move || service.create(&id, &request.name, request.api_key_type, request.station_id, &token)).await?;

    let response = ApiKeyResponse {
        uuid: key.uuid,
        name: key.name,
        api_key_type: key.api_key_type,
        station_id: key.station_id,
        expires_at: key.expires_at,
        key: plaintext,
    };
    Ok(ResponseData::body_only(serde_json::to_value(response).unwrap_or(serde_json::Value::Null)))
}

async fn handle_api_keys_list(
    state: &AppState,
    id: String,
    auth: &AuthMaterial,
    key_uuid: Option<Uuid>,
) -> actix_web::Result<ResponseData> {
    let token = require_token(auth)?;
    let id = resolve_id(&state.pool, id, auth).await?;
    let service = state.api_keys_service.clone();
    let mut keys = block(move || service.list(&id, key_uuid, &token)).await?;

    if key_uuid.is_some() {
        let key = keys.pop().ok_or(ApiError::NotFound)?;
        let body = serde_json::to_value(ApiKeySummary::from(key)).unwrap_or(serde_json::Value::Null);
        Ok(ResponseData::body_only(body))
    } else {
        let body: Vec<_> = keys.into_iter().map(ApiKeySummary::from).collect();
        Ok(ResponseData::body_only(serde_json::to_value(body).unwrap_or(serde_json::Value::Null)))
    }
}

async fn handle_api_keys_delete(
    state: &AppState,
    id: String,
    auth: &AuthMaterial,
    key_uuid: Uuid,
) -> actix_web::Result<ResponseData> {
    let token = require_token(auth)?;
    let id = resolve_id(&state.pool, id, auth).await?;
    let service = state.api_keys_service.clone();
    block(move || service.delete(&id, key_uuid, &token)).await?;
    Ok(ResponseData::body_only(serde_json::Value::Null))
}

// ── Stations ────────────────────────────────────────────────────────────

async fn handle_stations_create(state: &AppState, auth: &AuthMaterial, body: &web::Bytes) -> actix_web::Result<ResponseData> {
    let token = require_token(auth)?;
    let request: CreateStationRequest = parse_body(body)?;
    if !validate_name(&request.name) {
        return Err(ApiError::InvalidParams.into());
    }

    let service = state.stations_service.clone();
    let station = block(move || service.create(&request.name, request.lon, request.lat, request.altitude, &token)).await?;
    let body = serde_json::to_value(StationResponse::from(station)).unwrap_or(serde_json::Value::Null);
    Ok(ResponseData::body_only(body))
}

async fn handle_stations_list(state: &AppState, station_ref: Option<String>) -> actix_web::Result<ResponseData> {
    let service = state.stations_service.clone();
    let single = station_ref.is_some();
    let mut stations = block(move || service.list(station_ref.as_deref())).await?;

    if single {
        let station = stations.pop().ok_or(ApiError::NotFound)?;
        let body = serde_json::to_value(StationResponse::from(station)).unwrap_or(serde_json::Value::Null);
        Ok(ResponseData::body_only(body))
    } else {
        let body: Vec<_> = stations.into_iter().map(StationResponse::from).collect();
        Ok(ResponseData::body_only(serde_json::to_value(body).unwrap_or(serde_json::Value::Null)))
    }
}

// ── Weather data ────────────────────────────────────────────────────────

async fn handle_weather_data(state: &AppState, station_ref: String, query_string: &str) -> actix_web::Result<ResponseData> {
    let query: web::Query<WeatherDataQuery> =
        web::Query::from_query(query_string).map_err(|_| ApiError::InvalidParams)?;

    let granularity = Granularity::from_query_str(&query.granularity).ok_or(ApiError::InvalidParams)?;
    if !validate_timestamp(&query.start_time) || !validate_timestamp(&query.end_time) {
        return Err(ApiError::InvalidParams.into());
    }

    let timezone = query.timezone.clone().unwrap_or_else(|| state.default_timezone.clone());
    let tz: chrono_tz::Tz = timezone.parse().map_err(|_| ApiError::InvalidParams)?;

    let start_time = local_to_utc(&query.start_time, tz)?;
    let end_time = local_to_utc(&query.end_time, tz)?;

    let fields_bitmask = match &query.fields {
        Some(csv) => crate::query::parse_fields(csv),
        None => crate::query::fields::FIELD_TABLE.iter().fold(0u32, |mask, f| mask | f.bit),
    };

    let query_data = QueryData {
        start_time,
        end_time,
        timezone,
        granularity,
        fields_bitmask,
    };

    let service = state.weather_service.clone();
    let body = block(move || service.list(&station_ref, query_data)).await?;
    Ok(ResponseData::body_only(body))
}

fn local_to_utc(value: &str, tz: chrono_tz::Tz) -> Result<chrono::DateTime<chrono::Utc>, ApiError> {
    use chrono::{NaiveDateTime, TimeZone};
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").map_err(|_| ApiError::InvalidParams)?;
    tz.from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .ok_or(ApiError::InvalidParams)
}

/// `GET /healthz`: trivial liveness probe, ambient ops tooling rather than
/// a weather-data feature (§4.5 supplement).
pub async fn health_check(state: web::Data<AppState>) -> actix_web::Result<HttpResponse> {
    let pool = state.pool.clone();
    block(move || database::health_check(&pool)).await?;
    Ok(HttpResponse::Ok().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_path_uuid_rejects_non_uuid() {
        assert!(parse_path_uuid("not-a-uuid").is_err());
        assert!(parse_path_uuid("123e4567-e89b-12d3-a456-426614174000").is_ok());
    }

    #[test]
    fn local_to_utc_converts_a_known_offset() {
        let tz: chrono_tz::Tz = "America/New_York".parse().unwrap();
        let utc = local_to_utc("2024-07-01T12:00:00", tz).unwrap();
        assert_eq!(utc.to_rfc3339(), "2024-07-01T16:00:00+00:00");
    }

    #[test]
    fn local_to_utc_rejects_malformed_timestamps() {
        let tz: chrono_tz::Tz = "UTC".parse().unwrap();
        assert!(local_to_utc("not-a-timestamp", tz).is_err());
    }

    #[test]
    fn parse_body_rejects_invalid_json() {
        let bytes = web::Bytes::from_static(b"not json");
        let result: Result<CreateStationRequest, _> = parse_body(&bytes);
        assert!(result.is_err());
    }

    #[test]
    fn require_token_fails_without_a_session_cookie() {
        let auth = AuthMaterial { session_token: None, api_key: None, peer_ip: None, user_agent: None };
        assert!(require_token(&auth).is_err());
    }
}
