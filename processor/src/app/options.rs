//! Application configuration options

use std::time::Duration;

use crate::config::Config;
use crate::deploy::poller::PollOptions;

/// Main application options
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Server configuration
    pub server: ServerOptions,

    /// Operation poll budgets
    pub poll: PollOptions,
}

impl AppOptions {
    /// Options for the configured service address, defaults elsewhere
    pub fn from_config(config: &Config) -> Self {
        Self {
            server: ServerOptions {
                host: config.service.host.clone(),
                port: config.service.port,
            },
            ..Default::default()
        }
    }
}

/// Lifecycle options for the processor
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}
