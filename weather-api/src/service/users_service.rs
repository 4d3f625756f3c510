//! Business logic for `/users` and `/users/{id}` (§4.5's `users_*` ops).

use shared::auth::password::PasswordHasher;
use shared::database::Pool;
use shared::errors::ApiError;

use crate::credentials::{validate_admin_session, validate_password, validate_session};
use crate::domain::entities::User;
use crate::repository::{sessions_repo, users_repo};

#[derive(Clone)]
pub struct UsersService {
    pool: Pool,
    hasher: PasswordHasher,
}

/// Partial update requested by `PATCH /users/{id}`. Every field is
/// optional; `COALESCE` in the repository layer fills in the rest.
#[derive(Debug, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub max_stations: Option<i64>,
    pub is_admin: Option<bool>,
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

impl UsersService {
    pub fn new(pool: Pool, hasher: PasswordHasher) -> Self {
        Self { pool, hasher }
    }

    /// `userRef == None` requires the caller to be an admin; otherwise any
    /// caller whose session matches `userRef` (self or admin, per the
    /// frozen `validate_session` query) may list that one user.
    pub fn list(&self, user_ref: Option<&str>, token: &str) -> Result<Vec<User>, ApiError> {
        let mut conn = self.pool.acquire();
        let client = conn.client();

        let authorized = match user_ref {
            None => validate_admin_session(client, token)?,
            Some(r) => validate_session(client, Some(r), token)?,
        };
        if !authorized {
            // Non-admin listing with no userRef is kept as NOT_FOUND rather
            // than 403, preserved as-is rather than repaired.
            return if user_ref.is_none() {
                Err(ApiError::NotFound)
            } else {
                Err(ApiError::AuthError)
            };
        }

        users_repo::list(client, user_ref)
    }

    pub fn create(&self, username: &str, email: &str, password: &str) -> Result<User, ApiError> {
        let password_hash = self.hasher.hash(password)?;
        let mut conn = self.pool.acquire();
        users_repo::create(conn.client(), username, email, &password_hash)
    }

    pub fn delete(&self, user_ref: &str, token: &str) -> Result<(), ApiError> {
        let mut conn = self.pool.acquire();
        let client = conn.client();

        if !validate_session(client, Some(user_ref), token)? {
            return Err(ApiError::AuthError);
        }
        if !users_repo::soft_delete(client, user_ref)? {
            return Err(ApiError::NotFound);
        }
        Ok(())
    }

    pub fn patch(&self, user_ref: &str, patch: UserPatch, token: &str) -> Result<User, ApiError> {
        let requires_admin = patch.max_stations.is_some() || patch.is_admin.is_some();

        let mut conn = self.pool.acquire();
        let client = conn.client();

        let authorized = if requires_admin {
            validate_admin_session(client, token)?
        } else {
            validate_session(client, Some(user_ref), token)?
        };
        if !authorized {
            return Err(ApiError::AuthError);
        }

        let password_hash = match (&patch.old_password, &patch.new_password) {
            (None, None) => None,
            (Some(old), Some(new)) => {
                if !validate_password(client, user_ref, old, &self.hasher)? {
                    return Err(ApiError::AuthError);
                }
                Some(self.hasher.hash(new)?)
            }
            _ => return Err(ApiError::InvalidParams),
        };

        let updated = users_repo::patch(
            client,
            user_ref,
            patch.username.as_deref(),
            patch.email.as_deref(),
            password_hash.as_deref(),
            patch.max_stations,
            patch.is_admin,
        )?
        .ok_or(ApiError::NotFound)?;

        sessions_repo::revoke_all(client, updated.user_id)?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::resolve_session_owner;
    use crate::repository::sessions_repo;
    use chrono::{Duration, Utc};
    use shared::auth::session::mint_token;

    // These exercise real invariants (soft-delete, session-revocation-on-
    // patch) against Postgres; they need DB_HOST/DB_PORT/DB_NAME/DB_USER/
    // DB_PASS set and are skipped otherwise, same as `shared::database`'s
    // own ignored tests.
    //   cargo test -- --ignored

    fn test_pool() -> Pool {
        let config = shared::config::AppConfig::from_env().expect("DB_HOST etc. must be set for ignored DB tests");
        Pool::new(&config.database, 1).expect("failed to connect to test database")
    }

    #[test]
    #[ignore]
    fn soft_deleted_user_is_excluded_from_list_and_get() {
        let pool = test_pool();
        let hasher = PasswordHasher::new();
        let service = UsersService::new(pool.clone(), hasher.clone());

        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let username = format!("softdel_{suffix}");
        let user = service.create(&username, &format!("{username}@example.com"), "correct horse battery").unwrap();

        let mut conn = pool.acquire();
        let client = conn.client();
        let minted = mint_token();
        let expires = Utc::now() + Duration::hours(1);
        sessions_repo::create(client, user.user_id, &minted.hash, expires, None, None).unwrap();
        drop(conn);

        let owner = {
            let mut conn = pool.acquire();
            resolve_session_owner(conn.client(), &minted.plaintext).unwrap()
        };
        assert_eq!(owner, Some(user.user_id));

        service.delete(&user.uuid.to_string(), &minted.plaintext).unwrap();

        let mut conn = pool.acquire();
        let found = crate::repository::users_repo::find_by_ref(conn.client(), &user.uuid.to_string()).unwrap();
        assert!(found.is_none(), "soft-deleted user must not be returned by find_by_ref");
    }

    #[test]
    #[ignore]
    fn patch_revokes_all_active_sessions() {
        let pool = test_pool();
        let hasher = PasswordHasher::new();
        let service = UsersService::new(pool.clone(), hasher.clone());

        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let username = format!("revoke_{suffix}");
        let user = service.create(&username, &format!("{username}@example.com"), "correct horse battery").unwrap();

        let minted = mint_token();
        let expires = Utc::now() + Duration::hours(1);
        {
            let mut conn = pool.acquire();
            sessions_repo::create(conn.client(), user.user_id, &minted.hash, expires, None, None).unwrap();
        }

        let patch = UserPatch { username: Some(format!("{username}_renamed")), ..Default::default() };
        service.patch(&user.uuid.to_string(), patch, &minted.plaintext).unwrap();

        let mut conn = pool.acquire();
        let active = sessions_repo::list(conn.client(), user.user_id, None).unwrap();
        assert!(active.is_empty(), "patch must cascade-revoke every active session");
    }
}
