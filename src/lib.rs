//! reelbase - A movie catalog REST API
//!
//! Backend service exposing a movie catalog and user registration over JSON,
//! with a strict request/response codec, optimistic concurrency control on
//! record updates, fire-and-forget background tasks, and graceful shutdown.

pub mod cli;
pub mod codec;
pub mod http_server;
pub mod mailer;
pub mod observability;
pub mod store;
pub mod tasks;
pub mod validator;
