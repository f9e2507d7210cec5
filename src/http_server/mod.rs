//! # HTTP Server
//!
//! The API surface and the server run loop.
//!
//! The interesting part lives in [`shutdown`]: a coordinator that owns the
//! `Running -> Draining -> Stopped` lifecycle, stops accepting connections on
//! the first termination signal, drains in-flight requests under a deadline,
//! and waits (without a deadline) for all tracked background tasks before the
//! process exits.

pub mod config;
pub mod errors;
pub mod health_routes;
pub mod movie_routes;
pub mod server;
pub mod shutdown;
pub mod user_routes;

pub use config::ServerConfig;
pub use errors::ApiError;
pub use server::{api_router, recover_panics, AppState, Server, ServeError};
pub use shutdown::{Lifecycle, LifecycleHandle, ShutdownCoordinator};

/// API version reported by the healthcheck
pub const VERSION: &str = "1.0.0";
