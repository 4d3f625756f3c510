//! Business logic for `/users/{id}/sessions*` (§4.5's `sessions_*` ops).

use chrono::{Duration, Utc};
use uuid::Uuid;

use shared::auth::password::PasswordHasher;
use shared::auth::session::mint_token;
use shared::database::Pool;
use shared::errors::ApiError;

use crate::credentials::{validate_password, validate_session};
use crate::domain::entities::Session;
use crate::repository::{sessions_repo, users_repo};

pub const DEFAULT_MAX_AGE_SECONDS: i64 = 3600;

#[derive(Clone)]
pub struct SessionsService {
    pool: Pool,
    hasher: PasswordHasher,
}

impl SessionsService {
    pub fn new(pool: Pool, hasher: PasswordHasher) -> Self {
        Self { pool, hasher }
    }

    /// Mints a new session after checking the caller's password. Returns
    /// the stored record and the plaintext token — the only time it ever
    /// exists outside the caller's own memory.
    pub fn create(
        &self,
        user_ref: &str,
        password: &str,
        max_age_seconds: i64,
        peer_ip: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<(Session, String), ApiError> {
        let mut conn = self.pool.acquire();
        let client = conn.client();

        if !validate_password(client, user_ref, password, &self.hasher)? {
            return Err(ApiError::AuthError);
        }
        let user = users_repo::find_by_ref(client, user_ref)?.ok_or(ApiError::NotFound)?;

        let minted = mint_token();
        let expires_at = Utc::now() + Duration::seconds(max_age_seconds);
        let session = sessions_repo::create(client, user.user_id, &minted.hash, expires_at, peer_ip, user_agent)?;
        Ok((session, minted.plaintext))
    }

    /// Lists the caller's own (or, for an admin, any user's) active
    /// sessions, optionally narrowed to one UUID.
    pub fn list(&self, user_ref: &str, session_uuid: Option<Uuid>, token: &str) -> Result<Vec<Session>, ApiError> {
        let mut conn = self.pool.acquire();
        let client = conn.client();

        if !validate_session(client, Some(user_ref), token)? {
            return Err(ApiError::AuthError);
        }
        let user = users_repo::find_by_ref(client, user_ref)?.ok_or(ApiError::NotFound)?;
        sessions_repo::list(client, user.user_id, session_uuid)
    }

    pub fn delete(&self, user_ref: &str, session_uuid: Uuid, token: &str) -> Result<(), ApiError> {
        let mut conn = self.pool.acquire();
        let client = conn.client();

        if !validate_session(client, Some(user_ref), token)? {
            return Err(ApiError::AuthError);
        }
        let user = users_repo::find_by_ref(client, user_ref)?.ok_or(ApiError::NotFound)?;
        if !sessions_repo::revoke(client, user.user_id, session_uuid)? {
            return Err(ApiError::NotFound);
        }
        Ok(())
    }
}
