// src/main.rs

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use assessment::config::Config;
use assessment::error::AppError;
use assessment::routes;
use assessment::scoring::ScoringEngine;
use assessment::session::SessionRegistry;
use assessment::state::AppState;
use assessment::store::PgStore;
use assessment::utils::logging::init_tracing;
use dotenvy::dotenv;

const SESSION_SWEEP_SECS: u64 = 300;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let _guard = init_tracing(&config.rust_log, "app.log");

    match serve(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Server stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: Config) -> Result<(), AppError> {
    let store = PgStore::connect(&config.store).await?;

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    store.migrate().await?;
    tracing::info!("Migrations applied successfully.");

    let engine = ScoringEngine::standard();
    let addr = config.bind_addr;
    let state = AppState::new(Arc::new(store), engine, config);
    tokio::spawn(sweep_sessions(state.sessions.clone()));

    // Create the Axum application router
    let app = routes::create_router(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    // Start the server
    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Drops sessions whose token has expired, every few minutes.
async fn sweep_sessions(sessions: Arc<SessionRegistry>) {
    let mut ticker = tokio::time::interval(Duration::from_secs(SESSION_SWEEP_SECS));
    loop {
        ticker.tick().await;
        let dropped = sessions.sweep_expired().await;
        if dropped > 0 {
            tracing::info!(dropped, "Expired sessions swept");
        }
    }
}
