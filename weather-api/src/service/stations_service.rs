//! Business logic for `/stations*` (§4.5's `stations_*` ops).

use shared::database::Pool;
use shared::errors::ApiError;

use crate::credentials::resolve_session_owner;
use crate::domain::entities::Station;
use crate::repository::stations_repo;

#[derive(Clone)]
pub struct StationsService {
    pool: Pool,
}

impl StationsService {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Creates a station for the session's owner. The quota check and the
    /// insert are one atomic statement in the repository layer; an empty
    /// result here means the quota was full.
    pub fn create(&self, name: &str, longitude: f64, latitude: f64, altitude: f64, token: &str) -> Result<Station, ApiError> {
        let mut conn = self.pool.acquire();
        let client = conn.client();

        let owner = resolve_session_owner(client, token)?.ok_or(ApiError::AuthError)?;
        stations_repo::create(client, owner, name, longitude, latitude, altitude)?.ok_or(ApiError::Forbidden)
    }

    /// Public; no auth required. A specific, non-matching `stationRef`
    /// surfaces as `FORBIDDEN` rather than `NOT_FOUND` — preserved per
    /// §9's open question rather than repaired.
    pub fn list(&self, station_ref: Option<&str>) -> Result<Vec<Station>, ApiError> {
        let mut conn = self.pool.acquire();
        let client = conn.client();

        match station_ref {
            None => stations_repo::list(client),
            Some(r) => match stations_repo::find_by_ref(client, r)? {
                Some(station) => Ok(vec![station]),
                None => Err(ApiError::Forbidden),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::users_repo;
    use shared::auth::password::PasswordHasher;
    use shared::auth::session::mint_token;

    // Needs DB_HOST/DB_PORT/DB_NAME/DB_USER/DB_PASS set; run with
    // `cargo test -- --ignored`, same as `shared::database`'s own tests.
    fn test_pool() -> Pool {
        let config = shared::config::AppConfig::from_env().expect("DB_HOST etc. must be set for ignored DB tests");
        Pool::new(&config.database, 1).expect("failed to connect to test database")
    }

    #[test]
    #[ignore]
    fn create_is_rejected_once_the_owners_quota_is_full() {
        let pool = test_pool();
        let hasher = PasswordHasher::new();
        let station_service = StationsService::new(pool.clone());

        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let username = format!("quota_{suffix}");
        let password_hash = hasher.hash("correct horse battery").unwrap();
        let user = {
            let mut conn = pool.acquire();
            users_repo::create(conn.client(), &username, &format!("{username}@example.com"), &password_hash).unwrap()
        };
        assert_eq!(user.max_stations, users_repo::DEFAULT_MAX_STATIONS);

        let minted = mint_token();
        {
            let mut conn = pool.acquire();
            let expires = chrono::Utc::now() + chrono::Duration::hours(1);
            crate::repository::sessions_repo::create(conn.client(), user.user_id, &minted.hash, expires, None, None)
                .unwrap();
        }

        station_service.create("first station", 2.17, 41.38, 12.0, &minted.plaintext).unwrap();

        let result = station_service.create("second station", 2.18, 41.39, 15.0, &minted.plaintext);
        assert!(matches!(result, Err(ApiError::Forbidden)), "quota of 1 must reject the second station");
    }
}
