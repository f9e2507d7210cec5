//! CLI argument definitions using clap

use std::time::Duration;

use clap::Parser;

use crate::http_server::ServerConfig;
use crate::mailer::SmtpConfig;

/// reelbase - movie catalog REST API server
#[derive(Parser, Debug)]
#[command(name = "reelbase")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// API server port
    #[arg(long, default_value_t = 4000)]
    pub port: u16,

    /// Environment (development|staging|production)
    #[arg(long, default_value = "development")]
    pub env: String,

    /// Seconds to wait for in-flight connections on shutdown
    #[arg(long = "shutdown-deadline", default_value_t = 5)]
    pub shutdown_deadline_secs: u64,

    /// CORS allowed origin (repeatable); none means permissive
    #[arg(long = "cors-origin")]
    pub cors_origins: Vec<String>,

    /// SMTP server host
    #[arg(long, default_value = "localhost")]
    pub smtp_host: String,

    /// SMTP server port
    #[arg(long, default_value_t = 1025)]
    pub smtp_port: u16,

    /// SMTP username (empty disables authentication)
    #[arg(long, default_value = "")]
    pub smtp_username: String,

    /// SMTP password
    #[arg(long, default_value = "")]
    pub smtp_password: String,

    /// Sender address for outgoing email
    #[arg(long, default_value = "reelbase <no-reply@reelbase.local>")]
    pub smtp_sender: String,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    pub fn into_config(self) -> ServerConfig {
        ServerConfig {
            host: self.host,
            port: self.port,
            env: self.env,
            shutdown_deadline: Duration::from_secs(self.shutdown_deadline_secs),
            cors_origins: self.cors_origins,
            smtp: SmtpConfig {
                host: self.smtp_host,
                port: self.smtp_port,
                username: self.smtp_username,
                password: self.smtp_password,
                sender: self.smtp_sender,
            },
        }
    }
}
