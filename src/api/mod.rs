//! Public entry points: the HTTP router and its payload types.

pub mod http;

pub use http::{create_router, ErrorResponse, HealthResponse};
