use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::RecommendationRow;
use crate::domain::sounds::RankedSound;
use crate::error::{ApiError, ApiResult};
use crate::services::recommend::{self, RecommendationResult};
use crate::state::SharedState;
use crate::web::session::AuthedUser;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/execute", post(execute))
        .route("/:user_id/:date/results", get(results))
        .route("/:user_id/latest", get(latest))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub date: String,
}

/// Uniform envelope: whichever branch ran, the caller sees the same shape.
#[derive(Debug, Serialize)]
pub struct RecommendEnvelope {
    pub message: String,
    pub data: RecommendData,
}

#[derive(Debug, Serialize)]
pub struct RecommendData {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub date: String,
    pub recommendation_text: String,
    pub recommended_sounds: Vec<RankedSound>,
}

async fn execute(
    AuthedUser(authed_id): AuthedUser,
    State(state): State<SharedState>,
    Json(payload): Json<ExecuteRequest>,
) -> ApiResult<Json<RecommendEnvelope>> {
    require_self(&authed_id, &payload.user_id)?;

    let result = recommend::execute(&state, &payload.user_id, &payload.date).await?;
    Ok(Json(envelope(
        "recommendation executed successfully",
        result,
    )))
}

async fn results(
    AuthedUser(authed_id): AuthedUser,
    State(state): State<SharedState>,
    Path((user_id, date)): Path<(String, String)>,
) -> ApiResult<Json<RecommendEnvelope>> {
    require_self(&authed_id, &user_id)?;

    let row = recommend::get_results(&state, &user_id, &date).await?;
    Ok(Json(row_envelope("recommendation found", row)))
}

async fn latest(
    AuthedUser(authed_id): AuthedUser,
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<RecommendEnvelope>> {
    require_self(&authed_id, &user_id)?;

    let row = recommend::get_most_recent(&state, &user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no recommendations for '{user_id}'")))?;
    Ok(Json(row_envelope("recommendation found", row)))
}

fn require_self(authed_id: &str, requested_id: &str) -> ApiResult<()> {
    if authed_id != requested_id {
        return Err(ApiError::Forbidden(
            "authenticated user does not match requested userID".to_string(),
        ));
    }
    Ok(())
}

fn envelope(message: &str, result: RecommendationResult) -> RecommendEnvelope {
    RecommendEnvelope {
        message: message.to_string(),
        data: RecommendData {
            user_id: result.user_id,
            date: result.date.to_rfc3339(),
            recommendation_text: result.recommendation_text,
            recommended_sounds: result.recommended_sounds,
        },
    }
}

fn row_envelope(message: &str, row: RecommendationRow) -> RecommendEnvelope {
    let sounds = row.sounds();
    RecommendEnvelope {
        message: message.to_string(),
        data: RecommendData {
            user_id: row.user_id,
            date: row.date.to_rfc3339(),
            recommendation_text: row.recommendation_text,
            recommended_sounds: sounds,
        },
    }
}
