//! Domain types shared by the repository and service layers: persisted
//! entities, their public projections, and the request-scoped value objects
//! (`QueryData`, `ResponseData`) that flow from router to handler to service.

pub mod entities;
