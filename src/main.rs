use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use minter_runway::config::Config;
use minter_runway::monitor::RunwayMonitor;
use minter_runway::scheduler::{self, DailyScheduler};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    // Initialize structured logging (set RUST_LOG=info for output)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    tracing::info!("Minter runway monitor starting");

    // Usage: minter-runway [config.toml] [--once]
    let mut config_path = "config.toml".to_string();
    let mut once = false;
    for arg in std::env::args().skip(1) {
        if arg == "--once" {
            once = true;
        } else {
            config_path = arg;
        }
    }

    let config = Config::load(&config_path)?;
    tracing::info!(
        chain = %config.chain.name,
        minter = %config.minter.address,
        environment = %config.environment,
        "Configuration loaded from {}",
        config_path
    );

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .map_err(|e| eyre::eyre!("Failed to connect to database: {}", e))?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| eyre::eyre!("Failed to run migrations: {}", e))?;

    tracing::info!("Database migrations complete");

    let monitor = Arc::new(RunwayMonitor::init(&config, pool.clone())?);

    if once {
        scheduler::run_job(&monitor).await?;
        return Ok(());
    }

    // Spawn API server
    if config.api.enabled {
        let api_pool = pool.clone();
        let host = config.api.host.clone();
        let port = config.api.port;
        tokio::spawn(async move {
            if let Err(e) = minter_runway::api::serve(api_pool, &host, port).await {
                tracing::error!(error = %e, "API server failed");
            }
        });
    }

    let shutdown = CancellationToken::new();

    let daily = DailyScheduler::new(monitor, config.schedule.cron.clone());
    let scheduler_shutdown = shutdown.clone();
    let handle = tokio::spawn(async move {
        if let Err(e) = daily.run(scheduler_shutdown).await {
            tracing::error!(error = %e, "Scheduler failed");
        }
    });

    tracing::info!("Monitor running. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping scheduler...");
    shutdown.cancel();
    let _ = handle.await;

    tracing::info!("Minter runway monitor stopped gracefully");
    Ok(())
}
