use serde::{Deserialize, Serialize};

use crate::domain::sounds::RankedSound;
use crate::domain::survey::Survey;

/// Sleep-stage ratios plus score for one civil day, as read from the
/// nightly aggregate store and forwarded to the algorithm service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepRatios {
    pub awake_ratio: f64,
    pub deep_sleep_ratio: f64,
    pub light_sleep_ratio: f64,
    pub rem_sleep_ratio: f64,
    pub sleep_score: f64,
}

/// Biometric context for the combined branches. `previous` stays optional:
/// a missing prior-day aggregate is a valid input, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepContext {
    pub current: SleepRatios,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<SleepRatios>,
}

/// Sound context. Both lists always serialize as arrays - empty when the
/// user has no preferences or no prior recommendation, never null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundContext {
    pub preferred_sounds: Vec<String>,
    pub previous_recommendations: Vec<String>,
}

/// The branch decision of the orchestrator as a tagged union, so each
/// branch's required inputs are statically distinguishable. The implicit
/// fourth branch (missing user, survey, or preferenceBalance)
/// short-circuits before this enum is ever built.
#[derive(Debug, Clone, PartialEq)]
pub enum RecommendContext {
    /// Current biometrics and a prior-day recommendation exist.
    CombinedWithHistory {
        sleep: SleepContext,
        sounds: SoundContext,
    },
    /// Current biometrics exist but no prior-day recommendation.
    CombinedFirstRun {
        sleep: SleepContext,
        sounds: SoundContext,
    },
    /// No biometrics for the requested day; survey and sound history only.
    SoundOnly { sounds: SoundContext },
}

/// Which branch applies, given the two presence signals evaluated up front.
pub fn select_branch(has_current_bio: bool, has_prior_recommendation: bool) -> Branch {
    match (has_current_bio, has_prior_recommendation) {
        (true, true) => Branch::CombinedWithHistory,
        (true, false) => Branch::CombinedFirstRun,
        (false, _) => Branch::SoundOnly,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    CombinedWithHistory,
    CombinedFirstRun,
    SoundOnly,
}

impl RecommendContext {
    /// Endpoint suffix on the algorithm base URL for this branch.
    pub fn endpoint_suffix(&self) -> &'static str {
        match self {
            RecommendContext::CombinedWithHistory { .. } => "/recommend/combined",
            RecommendContext::CombinedFirstRun { .. } => "/recommend/combined-first",
            RecommendContext::SoundOnly { .. } => "/recommend/sound-only",
        }
    }

    /// Assemble the wire payload. Branch selection is invisible to the
    /// caller of the API; it only shows in which fields are present here.
    pub fn into_request(self, user_id: String, date: String, survey: Survey) -> AlgorithmRequest {
        let (sleep_data, sounds) = match self {
            RecommendContext::CombinedWithHistory { sleep, sounds }
            | RecommendContext::CombinedFirstRun { sleep, sounds } => (Some(sleep), sounds),
            RecommendContext::SoundOnly { sounds } => (None, sounds),
        };
        AlgorithmRequest {
            user_id,
            date,
            sleep_data,
            sounds,
            survey,
        }
    }
}

/// Request body sent to the algorithm service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmRequest {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub date: String,
    #[serde(rename = "sleepData", skip_serializing_if = "Option::is_none")]
    pub sleep_data: Option<SleepContext>,
    pub sounds: SoundContext,
    pub survey: Survey,
}

/// Response body required from the algorithm service regardless of branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmResponse {
    pub recommendation_text: String,
    pub recommended_sounds: Vec<RankedSound>,
}
