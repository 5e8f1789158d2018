//! Process startup: arguments, configuration, logging, then the server

use crate::app::cli::{Args, ConfigFile, Settings};
use crate::app::pidfile::PidFile;
use crate::core::error_handling::log_error_with_context;
use crate::core::logging::init_logging;
use crate::core::shutdown::ShutdownCoordinator;
use crate::core::validation::ValidationError;
use crate::core::version::{long_version, server_version};
use crate::repository::QueueRepository;
use crate::server::{QueueServer, ServerConfig};
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Initialize application startup
///
/// Exits the process with status 1 on any fatal error.
pub async fn startup() {
    let args = Args::parse();
    if args.version {
        println!("{}", long_version());
        return;
    }

    // logging is not up yet, so configuration errors go to stderr
    let settings = match resolve_settings(&args).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(
        Some(&settings.log_level),
        settings.log_format,
        settings.log_file.as_deref(),
        settings.use_color(),
    ) {
        eprintln!("Error initialising logging: {}", e);
        std::process::exit(1);
    }

    log::info!("{} starting", server_version());
    log::debug!("settings: {:#?}", settings);

    if !run(&settings).await {
        std::process::exit(1);
    }
}

async fn resolve_settings(args: &Args) -> Result<Settings, ValidationError> {
    let config = ConfigFile::discover(args.config_file.as_deref()).await?;
    args.resolve(config)
}

/// Serve until shutdown; `false` after a fatal error has been logged
async fn run(settings: &Settings) -> bool {
    let _pid_file = match &settings.pid_file {
        Some(path) => match PidFile::create(path) {
            Ok(pid_file) => Some(pid_file),
            Err(e) => {
                log_error_with_context(&e, "Writing PID file");
                return false;
            }
        },
        None => None,
    };

    let repo = match QueueRepository::open(&settings.data_dir) {
        Ok(repo) => Arc::new(repo),
        Err(e) => {
            log_error_with_context(&e, "Opening data directory");
            return false;
        }
    };
    log::info!(
        "data directory {} ({} queues)",
        repo.data_path().display(),
        repo.count()
    );

    let listener = match TcpListener::bind(&settings.listen).await {
        Ok(listener) => listener,
        Err(e) => {
            let err = ValidationError::new(format!("Cannot listen on {}: {}", settings.listen, e));
            log_error_with_context(&err, "Binding listener");
            return false;
        }
    };

    let shutdown = ShutdownCoordinator::new();
    shutdown.install_signal_handlers();

    let config = ServerConfig {
        listen: settings.listen.clone(),
        client_timeout: settings.client_timeout,
        max_item_size: settings.max_item_size,
    };
    let server = QueueServer::new(config, repo, shutdown);
    match server.serve(listener).await {
        Ok(()) => true,
        Err(e) => {
            log::error!("server failed: {}", e);
            false
        }
    }
}
