use sqlx::PgPool;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::algorithm::AlgorithmClient;

pub struct AppState {
    pub pool: PgPool,
    pub algorithm: AlgorithmClient,
    pub config: AppConfig,
}

pub type SharedState = Arc<AppState>;
