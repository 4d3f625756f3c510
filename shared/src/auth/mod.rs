//! # Authentication Primitives
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`session`] | Opaque token minting/hashing (sessions and API keys) |
//! | [`password`] | Argon2id password hashing |
//! | [`middleware`] | Per-request credential extraction (`AuthMaterial`) |
//!
//! Session/API-key validation itself (the DB lookup against a minted
//! token's hash) lives in `weather-api`'s `credentials` module, since it
//! needs the connection pool; this crate only supplies the pure mint/hash
//! primitives and the request-side extractor.

pub mod middleware;
pub mod password;
pub mod session;

pub use middleware::AuthMaterial;
pub use password::PasswordHasher;
pub use session::{hash_token, mint_token, MintedToken};
