//! # Weather Telemetry API
//!
//! Request-processing core for a multi-tenant weather-telemetry service:
//! a blocking connection pool (C1), validators/codec (C2), a credential
//! engine (C3), a dynamic SQL query composer (C4), per-resource services
//! (C5), a hand-written router (C6), HTTP handlers (C7), and this file's
//! bootstrap (C8).
//!
//! ## Architecture
//!
//! ```text
//! transport → router (C6) → handlers (C7) → services (C5) → pool (C1)
//!                                                 │
//!                                      credentials (C3) / query (C4)
//! ```
//!
//! ## Configuration
//!
//! Environment variables are loaded via [`shared::config::AppConfig`]; see
//! that module for the full list (`DB_HOST`, `DB_PORT`, `MAX_DB_CONN`,
//! `API_PORT`, `DEFAULT_TIMEZONE`, ...).

use actix_cors::Cors;
use actix_web::{http::Method, middleware, web, App, HttpServer};
use shared::auth::password::PasswordHasher;
use shared::config::AppConfig;
use shared::database::Pool;
use shared::tracing_config;
use tracing::info;

mod api;
mod credentials;
mod domain;
mod query;
mod repository;
mod router;
mod service;

use api::routes;
use service::{ApiKeysService, SessionsService, StationsService, UsersService, WeatherService};

/// Shared application state: the connection pool plus one instance of
/// each resource service, injected into every handler via
/// [`actix_web::web::Data`]. Global mutable state is otherwise limited to
/// the pool's own internal mutex/condvar and the DB config strings
/// captured at startup (§5, §9).
pub struct AppState {
    pub pool: Pool,
    pub users_service: UsersService,
    pub sessions_service: SessionsService,
    pub stations_service: StationsService,
    pub api_keys_service: ApiKeysService,
    pub weather_service: WeatherService,
    pub default_timezone: String,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = AppConfig::from_env().expect("failed to load configuration");

    tracing_config::init_tracing(&config.service_name, config.is_production());

    info!(
        service = %config.service_name,
        port = config.server.port,
        "starting weather-api"
    );

    let pool_size = config.pool_size();
    let pool = Pool::new(&config.database, pool_size).expect("failed to establish database connection pool");

    let hasher = PasswordHasher::new();
    let default_timezone = config.database.default_timezone.clone();

    let app_state = web::Data::new(AppState {
        pool: pool.clone(),
        users_service: UsersService::new(pool.clone(), hasher.clone()),
        sessions_service: SessionsService::new(pool.clone(), hasher.clone()),
        stations_service: StationsService::new(pool.clone()),
        api_keys_service: ApiKeysService::new(pool.clone()),
        weather_service: WeatherService::new(pool.clone(), default_timezone),
        default_timezone: config.database.default_timezone.clone(),
    });

    let server_port = config.server.port;
    info!(port = server_port, "server listening");

    let server = HttpServer::new(move || {
        // Cross-origin is opened only for GET, per §4.7.
        let cors = Cors::default().allow_any_origin().allowed_methods(vec![Method::GET]).max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .app_data(app_state.clone())
            .configure(routes::configure)
    })
    .bind(("0.0.0.0", server_port))?
    .run();

    let handle = server.handle();
    actix_rt::spawn(async move {
        let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
        info!("shutdown signal received, draining in-flight requests");
        handle.stop(true).await;
    });

    server.await?;

    pool.shutdown();
    Ok(())
}
