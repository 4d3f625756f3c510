//! Business logic for `/users/{id}/api-keys*` (§4.5's `api_key_*` ops).
//!
//! Mirrors [`super::sessions_service::SessionsService`]'s lifecycle shape,
//! with the added `api_key_type`/`station_id` fields and no expiry default
//! (a key with `expires_at = None` never expires).

use uuid::Uuid;

use shared::auth::session::mint_token;
use shared::database::Pool;
use shared::errors::ApiError;

use crate::credentials::validate_session;
use crate::domain::entities::{ApiKey, ApiKeyType};
use crate::repository::{api_keys_repo, users_repo};

#[derive(Clone)]
pub struct ApiKeysService {
    pool: Pool,
}

impl ApiKeysService {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn create(
        &self,
        user_ref: &str,
        name: &str,
        api_key_type: ApiKeyType,
        station_id: Option<Uuid>,
        token: &str,
    ) -> Result<(ApiKey, String), ApiError> {
        let mut conn = self.pool.acquire();
        let client = conn.client();

        if !validate_session(client, Some(user_ref), token)? {
            return Err(ApiError::AuthError);
        }
        let user = users_repo::find_by_ref(client, user_ref)?.ok_or(ApiError::NotFound)?;

        let minted = mint_token();
        let key = api_keys_repo::create(client, user.user_id, station_id, name, &minted.hash, api_key_type, None)?;
        Ok((key, minted.plaintext))
    }

    pub fn list(&self, user_ref: &str, key_uuid: Option<Uuid>, token: &str) -> Result<Vec<ApiKey>, ApiError> {
        let mut conn = self.pool.acquire();
        let client = conn.client();

        if !validate_session(client, Some(user_ref), token)? {
            return Err(ApiError::AuthError);
        }
        let user = users_repo::find_by_ref(client, user_ref)?.ok_or(ApiError::NotFound)?;
        api_keys_repo::list(client, user.user_id, key_uuid)
    }

    pub fn delete(&self, user_ref: &str, key_uuid: Uuid, token: &str) -> Result<(), ApiError> {
        let mut conn = self.pool.acquire();
        let client = conn.client();

        if !validate_session(client, Some(user_ref), token)? {
            return Err(ApiError::AuthError);
        }
        let user = users_repo::find_by_ref(client, user_ref)?.ok_or(ApiError::NotFound)?;
        if !api_keys_repo::revoke(client, user.user_id, key_uuid)? {
            return Err(ApiError::NotFound);
        }
        Ok(())
    }
}
