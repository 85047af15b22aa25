use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Onboarding survey as stored on the user record and forwarded verbatim to
/// the algorithm service. Answers are fixed enumerated choices captured by
/// the mobile client; the `*_other` companions carry free text only when
/// their companion field equals the sentinel `"other"`.
///
/// The orchestrator never interprets individual answers - it only requires
/// the survey (and `preferenceBalance`) to be present, default-fills the
/// optional free-text fields, and passes the rest through.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    pub sleep_light_usage: String,
    pub light_color_temperature: String,
    pub noise_preference: String,
    #[serde(default)]
    pub noise_preference_other: String,
    pub usual_bedtime: String,
    pub usual_wakeup_time: String,
    pub day_activity_type: String,
    pub morning_sunlight_exposure: String,
    pub nap_frequency: String,
    pub nap_duration: String,
    pub most_drowsy_time: String,
    pub average_sleep_duration: String,
    pub sleep_issues: Vec<String>,
    pub emotional_sleep_interference: Vec<String>,
    #[serde(default)]
    pub emotional_sleep_interference_other: String,
    pub preferred_sleep_sound: String,
    pub calming_sound_type: String,
    #[serde(default)]
    pub calming_sound_type_other: String,
    pub sleep_devices_used: Vec<String>,
    pub time_to_fall_asleep: String,
    pub caffeine_intake_level: String,
    pub exercise_frequency: String,
    pub exercise_when: String,
    pub screen_time_before_sleep: String,
    pub stress_level: String,
    pub sleep_goal: String,
    /// Weighting between survey preference and biometric signal, set during
    /// onboarding. Required before any recommendation can run.
    pub preference_balance: Option<f64>,
}

impl Survey {
    /// The balance weight is the one survey field the orchestrator requires
    /// outright; a survey without it short-circuits before branch selection.
    pub fn require_preference_balance(&self) -> Result<f64, ApiError> {
        self.preference_balance.ok_or_else(|| {
            ApiError::Validation("survey is missing preferenceBalance".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn survey_json() -> serde_json::Value {
        serde_json::json!({
            "sleepLightUsage": "moodLight",
            "lightColorTemperature": "warmYellow",
            "noisePreference": "rainsound",
            "usualBedtime": "9to12pm",
            "usualWakeupTime": "5to7am",
            "dayActivityType": "indoor",
            "morningSunlightExposure": "between1to3",
            "napFrequency": "rarely",
            "napDuration": "under15",
            "mostDrowsyTime": "afterLunch",
            "averageSleepDuration": "6to7h",
            "sleepIssues": ["fallAsleepHard", "wakeOften"],
            "emotionalSleepInterference": ["stress"],
            "preferredSleepSound": "nature",
            "calmingSoundType": "rain",
            "sleepDevicesUsed": ["watch", "app"],
            "timeToFallAsleep": "15to30min",
            "caffeineIntakeLevel": "1to2cups",
            "exerciseFrequency": "2to3week",
            "exerciseWhen": "16to20",
            "screenTimeBeforeSleep": "30to1h",
            "stressLevel": "medium",
            "sleepGoal": "deepSleep",
            "preferenceBalance": 0.7
        })
    }

    #[test]
    fn deserializes_with_default_filled_other_fields() {
        let survey: Survey = serde_json::from_value(survey_json()).unwrap();
        assert_eq!(survey.noise_preference, "rainsound");
        assert_eq!(survey.noise_preference_other, "");
        assert_eq!(survey.calming_sound_type_other, "");
        assert_eq!(survey.require_preference_balance().unwrap(), 0.7);
    }

    #[test]
    fn missing_preference_balance_is_a_validation_error() {
        let mut value = survey_json();
        value.as_object_mut().unwrap().remove("preferenceBalance");
        let survey: Survey = serde_json::from_value(value).unwrap();
        assert!(matches!(
            survey.require_preference_balance(),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn serializes_back_to_camel_case() {
        let survey: Survey = serde_json::from_value(survey_json()).unwrap();
        let value = serde_json::to_value(&survey).unwrap();
        assert!(value.get("sleepLightUsage").is_some());
        assert!(value.get("noisePreferenceOther").is_some());
        assert_eq!(value["preferenceBalance"], 0.7);
    }
}
