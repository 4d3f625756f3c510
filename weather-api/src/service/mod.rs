//! # Resource Services (C5)
//!
//! One service per resource family. Each owns the [`shared::database::Pool`]
//! (and, where relevant, a [`shared::auth::password::PasswordHasher`]),
//! acquires a connection per operation, and returns `Result<_, ApiError>` —
//! the tagged outcome type handlers pattern-match against (§9: "Outcome code
//! maps to a tagged sum type").

pub mod api_keys_service;
pub mod sessions_service;
pub mod stations_service;
pub mod users_service;
pub mod weather_service;

pub use api_keys_service::ApiKeysService;
pub use sessions_service::SessionsService;
pub use stations_service::StationsService;
pub use users_service::UsersService;
pub use weather_service::WeatherService;
