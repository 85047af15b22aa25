mod config;
mod db;
mod domain;
mod error;
mod services;
mod state;
mod time_utils;
mod web;

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use sqlx::postgres::PgPoolOptions;
use tokio_cron_scheduler::{Job, JobScheduler};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::services::algorithm::AlgorithmClient;
use crate::state::{AppState, SharedState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        tracing::error!("Failed to run database migrations: {}", e);
        e
    })?;
    tracing::info!("Database migrations completed");

    let algorithm = AlgorithmClient::new(
        config.algorithm_base_url.clone(),
        Duration::from_secs(config.algorithm_timeout_secs),
    )?;

    let shared: SharedState = Arc::new(AppState {
        pool,
        algorithm,
        config: config.clone(),
    });

    // Retention sweep: purge raw sleep sessions past the retention window,
    // daily at 03:00 KST (18:00 UTC).
    let scheduler = JobScheduler::new().await?;
    let shared_for_sweep = shared.clone();
    scheduler
        .add(Job::new_async("0 0 18 * * *", move |_uuid, _l| {
            let state = shared_for_sweep.clone();
            Box::pin(async move {
                let cutoff = chrono::Utc::now()
                    - ChronoDuration::days(state.config.sleep_retention_days);
                match db::purge_sleep_sessions_before(&state.pool, cutoff).await {
                    Ok(purged) if purged > 0 => {
                        tracing::info!("Retention sweep purged {} sleep sessions", purged);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!("Retention sweep failed: {}", e);
                    }
                }
            })
        })?)
        .await?;
    scheduler.start().await?;
    tracing::info!(
        "Scheduler started: retention sweep daily at 03:00 KST ({} day window)",
        config.sleep_retention_days
    );

    let app = web::routes(shared.clone()).layer(TraceLayer::new_for_http());

    tracing::info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
