//! HTTP boundary: routes, admin capability check and error mapping

pub mod admin;
pub mod error;
pub mod routes;

pub use error::ApiError;
pub use routes::{create_router, AppState};
