use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::domain::recommend::SleepRatios;
use crate::domain::sounds::{validate_ranks, RankedSound};
use crate::domain::survey::Survey;
use crate::error::ApiError;
use crate::time_utils::DayWindow;

/// The slice of the user record this core reads: existence, survey,
/// preferences. Account fields stay with the account subsystem.
#[derive(Debug, FromRow)]
pub struct DbUser {
    pub user_id: String,
    pub survey: Option<serde_json::Value>,
    pub preferred_sounds: Option<serde_json::Value>,
}

impl DbUser {
    /// Typed survey, if the user has completed onboarding. A survey blob
    /// that no longer matches the expected shape is treated as absent.
    pub fn survey(&self) -> Option<Survey> {
        self.survey
            .as_ref()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Ranked preference list; empty when the user never set one.
    pub fn preferred_sounds(&self) -> Vec<RankedSound> {
        self.preferred_sounds
            .as_ref()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, FromRow)]
pub struct RecommendationRow {
    pub user_id: String,
    pub date: DateTime<Utc>,
    pub recommendation_text: String,
    pub recommended_sounds: serde_json::Value,
}

impl RecommendationRow {
    pub fn sounds(&self) -> Vec<RankedSound> {
        serde_json::from_value(self.recommended_sounds.clone()).unwrap_or_default()
    }
}

#[derive(Debug, FromRow)]
struct AvgSleepRow {
    awake_ratio: f64,
    deep_sleep_ratio: f64,
    light_sleep_ratio: f64,
    rem_sleep_ratio: f64,
    sleep_score: f64,
}

pub async fn find_user_by_user_id(pool: &PgPool, user_id: &str) -> Result<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(
        r#"
        SELECT user_id, survey, preferred_sounds
        FROM users
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Nightly aggregate for one user/day window. A missing row is the primary
/// "no biometric data" branch signal, so absence is an `Ok(None)`.
pub async fn find_avg_sleep_data(
    pool: &PgPool,
    user_id: &str,
    window: DayWindow,
) -> Result<Option<SleepRatios>> {
    let row = sqlx::query_as::<_, AvgSleepRow>(
        r#"
        SELECT awake_ratio, deep_sleep_ratio, light_sleep_ratio, rem_sleep_ratio, sleep_score
        FROM avg_sleep_data
        WHERE user_id = $1
          AND date >= $2
          AND date <= $3
        ORDER BY date DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(window.start)
    .bind(window.end)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| SleepRatios {
        awake_ratio: r.awake_ratio,
        deep_sleep_ratio: r.deep_sleep_ratio,
        light_sleep_ratio: r.light_sleep_ratio,
        rem_sleep_ratio: r.rem_sleep_ratio,
        sleep_score: r.sleep_score,
    }))
}

/// Most recent recommendation in a day window, or `None`. Multiple rows per
/// day are legitimate (append-only store); recency decides which one wins.
pub async fn find_recommendation_in_window(
    pool: &PgPool,
    user_id: &str,
    window: DayWindow,
) -> Result<Option<RecommendationRow>> {
    let row = sqlx::query_as::<_, RecommendationRow>(
        r#"
        SELECT user_id, date, recommendation_text, recommended_sounds
        FROM recommend_sounds
        WHERE user_id = $1
          AND date >= $2
          AND date <= $3
        ORDER BY updated_at DESC, created_at DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(window.start)
    .bind(window.end)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Global latest recommendation for a user regardless of date, the
/// "last known recommendation" fallback.
pub async fn find_most_recent_recommendation(
    pool: &PgPool,
    user_id: &str,
) -> Result<Option<RecommendationRow>> {
    let row = sqlx::query_as::<_, RecommendationRow>(
        r#"
        SELECT user_id, date, recommendation_text, recommended_sounds
        FROM recommend_sounds
        WHERE user_id = $1
        ORDER BY updated_at DESC, created_at DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Append a recommendation row. Never deduplicates or overwrites: a second
/// run for the same day adds a second row and reads resolve by recency.
/// Rank uniqueness is rejected here, before anything is written.
pub async fn insert_recommendation(
    pool: &PgPool,
    user_id: &str,
    date: DateTime<Utc>,
    recommendation_text: &str,
    sounds: &[RankedSound],
) -> Result<Uuid, ApiError> {
    validate_ranks(sounds)?;

    let id = Uuid::new_v4();
    let sounds_json =
        serde_json::to_value(sounds).map_err(|e| ApiError::Internal(e.into()))?;
    sqlx::query(
        r#"
        INSERT INTO recommend_sounds (id, user_id, date, recommendation_text, recommended_sounds)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(date)
    .bind(recommendation_text)
    .bind(sounds_json)
    .execute(pool)
    .await?;
    Ok(id)
}

/// Retention sweep target: raw sleep sessions past the retention window.
pub async fn purge_sleep_sessions_before(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sleep_sessions WHERE date < $1")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
