//! Middleware for observability.
//!
//! Request logging with latency tracking; `/health` is kept out of the logs.

pub mod logging;

pub use logging::request_logging;
