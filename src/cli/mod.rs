//! CLI module for reelbase
//!
//! Owns everything `main` delegates: argument parsing, runtime construction,
//! wiring the mailer and diagnostics sink, and running the server until a
//! graceful shutdown completes.

mod args;

pub use args::Cli;

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::http_server::{ServeError, Server};
use crate::mailer::{MailError, Mailer, SmtpMailer};
use crate::observability::{Diagnostics, JsonDiagnostics};

/// Top-level CLI failure
#[derive(Debug, Error)]
pub enum CliError {
    #[error("could not start runtime: {0}")]
    Runtime(#[from] io::Error),

    #[error("could not configure mailer: {0}")]
    Mail(#[from] MailError),

    #[error("{0}")]
    Serve(#[from] ServeError),
}

/// Parse arguments and run the server to completion
pub fn run() -> Result<(), CliError> {
    let config = Cli::parse_args().into_config();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let diagnostics: Arc<dyn Diagnostics> = Arc::new(JsonDiagnostics::new());
        let mailer = Arc::new(Mailer::Smtp(SmtpMailer::new(&config.smtp)?));

        let server = Server::bind(config, mailer, diagnostics).await?;
        server.run().await?;
        Ok(())
    })
}
