//! # HTTP Layer (C7)
//!
//! Request/response DTOs, the single catch-all dispatch handler, and route
//! registration. The router (`crate::router`) decides *which* endpoint a
//! path matches; this module decides what each `(method, endpoint)` pair
//! does and how its outcome becomes an HTTP response.

pub mod dto;
pub mod handlers;
pub mod routes;
