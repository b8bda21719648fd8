use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};

use drivebox::{
    create_remote_storage, AppState, Config, Database, RemoteStorage, SessionVerifier, WebServer,
};

/// Configuration file read at startup.
const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration
    let mut config = match Config::load(CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {CONFIG_PATH}: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    // Initialize logging
    if let Err(e) = drivebox::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        drivebox::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    info!("drivebox starting");
    info!(
        "Server configured on {}:{}",
        config.server.host, config.server.port
    );

    match run(config).await {
        Ok(()) => {
            info!("drivebox stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Fatal error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> drivebox::Result<()> {
    let db = Arc::new(Database::open(&config.database.path, config.database.max_connections).await?);

    let (storage, refresher) = create_remote_storage(&config.drive)?;
    info!("Remote storage backend: {}", storage.backend_name());

    let app_state = Arc::new(AppState::new(db.clone(), storage, refresher, &config)?);
    let verifier = Arc::new(SessionVerifier::new(
        &config.auth.session_secret,
        &config.auth.session_cookie,
    ));

    let server = WebServer::new(&config.server, app_state, verifier)?;
    let result = server.run(shutdown_signal()).await;

    db.close().await;
    result.map_err(drivebox::DriveboxError::from)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
