use chrono::{DateTime, Utc};

use crate::db::{self, RecommendationRow};
use crate::domain::recommend::{
    select_branch, Branch, RecommendContext, SleepContext, SleepRatios, SoundContext,
};
use crate::domain::sounds::{top_filenames, RankedSound, TOP_RANK_LIMIT};
use crate::error::{ApiError, ApiResult};
use crate::state::SharedState;
use crate::time_utils;

/// Normalized outcome of one recommendation run, identical for every branch.
#[derive(Debug, Clone)]
pub struct RecommendationResult {
    pub user_id: String,
    pub date: DateTime<Utc>,
    pub recommendation_text: String,
    pub recommended_sounds: Vec<RankedSound>,
}

/// Run the recommendation decision machine for `user_id` on `date_raw`
/// (`YYYY-MM-DD`): gather context, select a branch, call the algorithm
/// service, persist the outcome keyed to the requested date.
pub async fn execute(
    state: &SharedState,
    user_id: &str,
    date_raw: &str,
) -> ApiResult<RecommendationResult> {
    let date = time_utils::parse_date(date_raw)?;
    let window = time_utils::day_window(date);
    let previous_window = time_utils::previous_day_window(date);

    // Required lookups first; their absence is an error, not a branch input.
    let user = db::find_user_by_user_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user '{user_id}' not found")))?;
    let survey = user
        .survey()
        .ok_or_else(|| ApiError::Validation("user has no survey data".to_string()))?;
    survey.require_preference_balance()?;

    // The two presence signals that drive branch selection. The prior
    // recommendation is looked up one day back on purpose: it is the
    // baseline the algorithm diversifies against.
    let current_bio = db::find_avg_sleep_data(&state.pool, user_id, window).await?;
    let prior_recommendation =
        db::find_recommendation_in_window(&state.pool, user_id, previous_window).await?;

    let branch = select_branch(current_bio.is_some(), prior_recommendation.is_some());
    let preferred = top_filenames(&user.preferred_sounds(), TOP_RANK_LIMIT);
    let prior_sounds = prior_recommendation
        .as_ref()
        .map(|row| top_filenames(&row.sounds(), TOP_RANK_LIMIT))
        .unwrap_or_default();

    let context = match (current_bio, branch) {
        (Some(current), Branch::CombinedWithHistory) => {
            let previous_bio =
                db::find_avg_sleep_data(&state.pool, user_id, previous_window).await?;
            build_combined(current, previous_bio, preferred, prior_sounds, true)
        }
        (Some(current), _) => {
            let previous_bio =
                db::find_avg_sleep_data(&state.pool, user_id, previous_window).await?;
            build_combined(current, previous_bio, preferred, Vec::new(), false)
        }
        (None, _) => RecommendContext::SoundOnly {
            sounds: SoundContext {
                preferred_sounds: preferred,
                previous_recommendations: prior_sounds,
            },
        },
    };

    let endpoint = context.endpoint_suffix();
    tracing::info!(user_id, date = date_raw, endpoint, "executing recommendation");

    let request = context.into_request(user_id.to_string(), date_raw.to_string(), survey);
    let reply = state.algorithm.call(endpoint, &request).await?;
    let response = reply.into_recommendation()?;

    // Persist only after a successful upstream response, keyed to the
    // request's target date. Appends a new row; never overwrites.
    db::insert_recommendation(
        &state.pool,
        user_id,
        window.start,
        &response.recommendation_text,
        &response.recommended_sounds,
    )
    .await?;

    Ok(RecommendationResult {
        user_id: user_id.to_string(),
        date: window.start,
        recommendation_text: response.recommendation_text,
        recommended_sounds: response.recommended_sounds,
    })
}

/// Stateless read of the most recent recommendation for one day.
pub async fn get_results(
    state: &SharedState,
    user_id: &str,
    date_raw: &str,
) -> ApiResult<RecommendationRow> {
    let date = time_utils::parse_date(date_raw)?;
    let window = time_utils::day_window(date);

    db::find_user_by_user_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user '{user_id}' not found")))?;

    db::find_recommendation_in_window(&state.pool, user_id, window)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("no recommendation for '{user_id}' on {date_raw}"))
        })
}

/// The "last known recommendation" fallback for consumers that do not care
/// about a specific date.
pub async fn get_most_recent(
    state: &SharedState,
    user_id: &str,
) -> ApiResult<Option<RecommendationRow>> {
    db::find_user_by_user_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user '{user_id}' not found")))?;

    Ok(db::find_most_recent_recommendation(&state.pool, user_id).await?)
}

fn build_combined(
    current: SleepRatios,
    previous_bio: Option<SleepRatios>,
    preferred: Vec<String>,
    prior_sounds: Vec<String>,
    has_history: bool,
) -> RecommendContext {
    let sleep = SleepContext {
        current,
        previous: previous_bio,
    };
    let sounds = SoundContext {
        preferred_sounds: preferred,
        previous_recommendations: prior_sounds,
    };
    if has_history {
        RecommendContext::CombinedWithHistory { sleep, sounds }
    } else {
        RecommendContext::CombinedFirstRun { sleep, sounds }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratios() -> SleepRatios {
        SleepRatios {
            awake_ratio: 0.12,
            deep_sleep_ratio: 0.22,
            light_sleep_ratio: 0.48,
            rem_sleep_ratio: 0.18,
            sleep_score: 78.0,
        }
    }

    #[test]
    fn combined_with_history_keeps_previous_bio_optional() {
        let context = build_combined(
            ratios(),
            None,
            vec!["a.mp3".to_string()],
            vec!["b.mp3".to_string()],
            true,
        );
        match context {
            RecommendContext::CombinedWithHistory { sleep, sounds } => {
                assert!(sleep.previous.is_none());
                assert_eq!(sounds.preferred_sounds, vec!["a.mp3"]);
                assert_eq!(sounds.previous_recommendations, vec!["b.mp3"]);
            }
            other => panic!("wrong branch: {other:?}"),
        }
    }

    #[test]
    fn first_run_carries_no_sound_history() {
        let context = build_combined(
            ratios(),
            Some(ratios()),
            vec!["a.mp3".to_string()],
            Vec::new(),
            false,
        );
        match context {
            RecommendContext::CombinedFirstRun { sleep, sounds } => {
                assert!(sleep.previous.is_some());
                assert!(sounds.previous_recommendations.is_empty());
                assert_eq!(sounds.preferred_sounds, vec!["a.mp3"]);
            }
            other => panic!("wrong branch: {other:?}"),
        }
    }
}
