//! Server configuration

use std::time::Duration;

use crate::mailer::SmtpConfig;

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to (default: "0.0.0.0")
    pub host: String,

    /// Port to bind to (default: 4000)
    pub port: u16,

    /// Deployment environment label, echoed by the healthcheck
    pub env: String,

    /// How long connection draining may take before shutdown is forced
    pub shutdown_deadline: Duration,

    /// CORS allowed origins; empty means permissive (development)
    pub cors_origins: Vec<String>,

    /// SMTP settings for the welcome mailer
    pub smtp: SmtpConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            env: "development".to_string(),
            shutdown_deadline: Duration::from_secs(5),
            cors_origins: Vec::new(),
            smtp: SmtpConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.socket_addr(), "0.0.0.0:4000");
        assert_eq!(config.env, "development");
        assert_eq!(config.shutdown_deadline, Duration::from_secs(5));
    }
}
