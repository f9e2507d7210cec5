//! Server run loop and graceful shutdown
//!
//! The run loop owns the listener and supervises the whole process lifetime:
//!
//! 1. a detached signal listener waits for the first SIGINT or SIGTERM and
//!    flips the coordinator to `Draining`;
//! 2. draining closes the listener (no new connections) and gives in-flight
//!    connections up to the configured deadline to finish -- past it the
//!    serve task is aborted and the deadline error is recorded;
//! 3. background tasks are then waited on with no deadline at all;
//! 4. only after both steps does the lifecycle reach `Stopped`, and the
//!    deadline error (if any) wins over a clean background-task finish.
//!
//! The listener ending because of our own shutdown call is the expected
//! termination path, not a failure; any other listener error is one.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::config::ServerConfig;
use super::errors::ApiError;
use super::health_routes::healthcheck_handler;
use super::movie_routes::{
    create_movie_handler, delete_movie_handler, list_movies_handler, show_movie_handler,
    update_movie_handler,
};
use super::shutdown::{LifecycleHandle, ShutdownCoordinator};
use super::user_routes::register_user_handler;
use crate::mailer::Mailer;
use crate::observability::Diagnostics;
use crate::store::{MovieStore, UserStore};
use crate::tasks::TaskTracker;

/// Run-loop failure modes
#[derive(Debug, Error)]
pub enum ServeError {
    /// The listener could not be bound
    #[error("could not bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },

    /// The listener failed for a reason other than our own shutdown call
    #[error("server failed: {0}")]
    Io(io::Error),

    /// In-flight connections did not finish within the drain deadline
    #[error("graceful shutdown did not complete within {0:?}")]
    DeadlineExceeded(Duration),
}

/// Dependencies shared by all handlers
pub struct AppState {
    pub config: ServerConfig,
    pub movies: MovieStore,
    pub users: UserStore,
    pub tasks: TaskTracker,
    pub mailer: Arc<Mailer>,
    pub diagnostics: Arc<dyn Diagnostics>,
    pub lifecycle: LifecycleHandle,
}

/// Build the API router over the shared state
pub fn api_router(state: Arc<AppState>) -> Router {
    let cors = if state.config.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = state
            .config
            .cors_origins
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let router = Router::new()
        .route("/v1/healthcheck", get(healthcheck_handler))
        .route(
            "/v1/movies",
            get(list_movies_handler).post(create_movie_handler),
        )
        .route(
            "/v1/movies/:id",
            get(show_movie_handler)
                .patch(update_movie_handler)
                .delete(delete_movie_handler),
        )
        .route("/v1/users", post(register_user_handler))
        .layer(cors)
        // The codec owns the body size limit; axum's built-in limit would
        // answer oversize bodies with a plain-text 413 before decode runs.
        .layer(DefaultBodyLimit::disable())
        .with_state(state);

    recover_panics(router)
}

/// Answer handler panics with the opaque 500 envelope instead of tearing
/// down the connection
pub fn recover_panics(router: Router) -> Router {
    router.layer(CatchPanicLayer::custom(panic_response))
}

fn panic_response(panic: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    };
    ApiError::Internal(detail).into_response()
}

/// A bound, not-yet-running server
pub struct Server {
    listener: TcpListener,
    router: Router,
    state: Arc<AppState>,
    coordinator: ShutdownCoordinator,
}

impl Server {
    /// Bind the configured address. The coordinator is created here so
    /// callers (and tests) can trigger a drain without a process signal.
    pub async fn bind(
        config: ServerConfig,
        mailer: Arc<Mailer>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Result<Self, ServeError> {
        let coordinator = ShutdownCoordinator::new();
        let state = Arc::new(AppState {
            movies: MovieStore::new(),
            users: UserStore::new(),
            tasks: TaskTracker::new(diagnostics.clone()),
            mailer,
            diagnostics,
            lifecycle: coordinator.handle(),
            config: config.clone(),
        });

        let addr = config.socket_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServeError::Bind { addr, source })?;

        Ok(Self {
            router: api_router(state.clone()),
            listener,
            state,
            coordinator,
        })
    }

    /// Actual bound address (differs from the config when port 0 was asked for)
    pub fn local_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Lifecycle owner, for tests and embedders that trigger drains directly
    pub fn coordinator(&self) -> ShutdownCoordinator {
        self.coordinator.clone()
    }

    /// Mount additional routes next to the API surface
    pub fn merge_router(mut self, other: Router) -> Self {
        self.router = self.router.merge(other);
        self
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Run until a termination signal has been handled to completion.
    ///
    /// Returns `Ok(())` after a clean drain, or the first error encountered;
    /// a drain deadline overrun is reported even though the lifecycle still
    /// reaches `Stopped`.
    pub async fn run(self) -> Result<(), ServeError> {
        let Server {
            listener,
            router,
            state,
            coordinator,
        } = self;

        let addr = listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| state.config.socket_addr());
        let diagnostics = state.diagnostics.clone();

        diagnostics.info(
            "starting_server",
            &[("addr", addr.as_str()), ("env", state.config.env.as_str())],
        );

        // Signal listener: the first SIGINT or SIGTERM starts the drain,
        // all later signals hit the idempotent begin_drain and are ignored.
        {
            let coordinator = coordinator.clone();
            let diagnostics = diagnostics.clone();
            tokio::spawn(async move {
                let signal = termination_signal().await;
                diagnostics.info("signal_caught", &[("signal", signal)]);
                coordinator.begin_drain();
            });
        }

        let mut drain_trigger = coordinator.handle();
        let graceful = axum::serve(listener, router)
            .with_graceful_shutdown(async move { drain_trigger.draining().await });
        let mut serve_task = tokio::spawn(async move { graceful.await });

        let mut drain_watch = coordinator.handle();
        let deadline = state.config.shutdown_deadline;
        let deadline_secs = format!("{}", deadline.as_secs());

        let drain_result: Result<(), ServeError> = tokio::select! {
            // The listener ended before any drain was requested. That is
            // never our own shutdown, so Ok from axum here is as unexpected
            // as an error; either way the server is no longer serving.
            res = &mut serve_task => {
                coordinator.begin_drain();
                match res {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(ServeError::Io(e)),
                    Err(join) => Err(ServeError::Io(io::Error::other(join))),
                }
            }

            _ = drain_watch.draining() => {
                diagnostics.info(
                    "drain_started",
                    &[("addr", addr.as_str()), ("deadline_secs", deadline_secs.as_str())],
                );

                match timeout(deadline, &mut serve_task).await {
                    // Graceful close is the expected termination signal
                    Ok(Ok(Ok(()))) => {
                        diagnostics.info("drain_completed", &[("addr", addr.as_str())]);
                        Ok(())
                    }
                    Ok(Ok(Err(e))) => Err(ServeError::Io(e)),
                    Ok(Err(join)) => Err(ServeError::Io(io::Error::other(join))),
                    Err(_) => {
                        // Force shutdown: stop waiting on in-flight
                        // connections. Background tasks are unaffected.
                        serve_task.abort();
                        diagnostics.error(
                            "drain_deadline_exceeded",
                            &[("deadline_secs", deadline_secs.as_str())],
                        );
                        Err(ServeError::DeadlineExceeded(deadline))
                    }
                }
            }
        };

        // Background tasks are waited on unconditionally, deadline or not.
        let outstanding = format!("{}", state.tasks.outstanding());
        diagnostics.info(
            "waiting_background_tasks",
            &[("outstanding", outstanding.as_str())],
        );
        state.tasks.wait().await;

        coordinator.mark_stopped();
        diagnostics.info("server_stopped", &[("addr", addr.as_str())]);

        drain_result
    }
}

/// Wait for the first of the two conventional termination signals
#[cfg(unix)]
async fn termination_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt =
        signal(SignalKind::interrupt()).expect("SIGINT handler registration failed");
    let mut terminate =
        signal(SignalKind::terminate()).expect("SIGTERM handler registration failed");

    tokio::select! {
        _ = interrupt.recv() => "SIGINT",
        _ = terminate.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn termination_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "interrupt"
}
