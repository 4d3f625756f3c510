//! # Route Registration
//!
//! Almost everything here funnels through one catch-all handler —
//! [`handlers::dispatch`] — because the actual method+path matching is
//! done by the hand-written router in `crate::router`, not by actix's own
//! routing table. `/healthz` is the one exception, registered directly
//! since it isn't part of the fixed resource table.

use actix_web::web;

use super::handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/healthz", web::get().to(handlers::health_check))
        .route("/{tail:.*}", web::route().to(handlers::dispatch));
}
