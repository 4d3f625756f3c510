//! # Repositories
//!
//! Thin wrappers around `postgres::Client` queries. Each function borrows a
//! connection already checked out of the pool (services own the borrow,
//! not the repository) and maps rows onto the domain structs in
//! [`crate::domain::entities`]. SQL text here is either frozen verbatim
//! from §6.4 or a direct generalization of it for symmetric operations
//! only described in prose elsewhere (e.g. sessions, API keys).

pub mod api_keys_repo;
pub mod sessions_repo;
pub mod stations_repo;
pub mod users_repo;
pub mod weather_repo;
