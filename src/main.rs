//! Fastest Finger Backend Service
//!
//! Main entry point for the live-comment elimination game backend. Boots the
//! database, wires repositories and services, and runs the background ticker
//! that drives every round's lifecycle transitions.

use fastfinger_backend::config::AppConfig;
use fastfinger_backend::database::{create_pool, run_migrations};
use fastfinger_backend::error::{AppError, AppResult};
use fastfinger_backend::services::Ticker;
use fastfinger_backend::AppState;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        AppError::Config(e)
    })?;

    // Initialize tracing/logging with config
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("fastfinger_backend={},sqlx=warn", config.log_level).into()
            }),
        )
        .init();

    info!("Fastest Finger backend starting");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);

    // =========================================================================
    // DATABASE SETUP
    // =========================================================================
    info!("Connecting to database...");

    let pool = create_pool(&config.database).await.map_err(|e| {
        error!("Failed to create database pool: {}", e);
        AppError::Database(e)
    })?;

    info!("Database connection pool created successfully");
    info!("Max connections: {}", config.database.max_connections);

    info!("Running database migrations...");
    run_migrations(&pool).await.map_err(|e| {
        error!("Database migration failed: {}", e);
        AppError::Database(e)
    })?;

    info!("Database migrations completed successfully");

    // =========================================================================
    // SERVICES
    // =========================================================================
    let app_state = Arc::new(AppState::new(pool, config.game.clone()));
    info!("Application state initialized");

    // =========================================================================
    // BACKGROUND TICKER
    // =========================================================================
    let ticker = Ticker::new(app_state.game_cycle.clone(), config.game.tick_interval());

    let ticker_handle = tokio::spawn(async move {
        ticker.start().await;
    });
    info!(
        "Ticker started ({}ms interval)",
        config.game.tick_interval_millis
    );

    info!("Fastest Finger backend ready, press Ctrl+C to shut down");

    // =========================================================================
    // SHUTDOWN HANDLING
    // =========================================================================
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, shutting down gracefully...");
        }
        _ = ticker_handle => {
            error!("Ticker task exited unexpectedly");
        }
    }

    info!("Fastest Finger backend shutdown complete");
    Ok(())
}
