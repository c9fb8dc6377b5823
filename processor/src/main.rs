//! Infra-manager processor - Entry Point
//!
//! HTTP service that provisions and tears down sandbox deployments through
//! Infrastructure Manager.

use std::env;

use inframgr_processor::app::options::AppOptions;
use inframgr_processor::app::run::run;
use inframgr_processor::config::Config;
use inframgr_processor::logs::init_logging;
use inframgr_processor::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Print version and exit
    let version = version_info();
    if env::args().skip(1).any(|arg| arg == "--version" || arg == "-v") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(_) => println!("{}", version.version),
        }
        return;
    }

    // Load configuration
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize logging
    if let Err(e) = init_logging(config.log.clone()) {
        println!("Failed to initialize logging: {e}");
    }

    // Run the server
    let options = AppOptions::from_config(&config);
    info!(
        version = %version.version,
        git_hash = %version.git_hash,
        "Running infra-manager processor with options: {:?}",
        options
    );
    if let Err(e) = run(config, options, await_shutdown_signal()).await {
        error!("Failed to run the processor: {e}");
        std::process::exit(1);
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                _ => {
                    error!("Failed to install signal handlers, falling back to Ctrl+C");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        info!("Ctrl+C received, shutting down...");
    }
}
