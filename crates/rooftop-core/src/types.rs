//! Onboarding entity types — dealer groups, rooftops, documents, stats.
//! Pure value types — no sqlx, no DB dependencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Questionnaire status ───────────────────────────────────────

/// Completion state of a rooftop's questionnaire.
///
/// `Draft` until every required question has a non-blank answer and the
/// submitter explicitly marks it complete; answers stay editable in both
/// states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionnaireStatus {
    Draft,
    Completed,
}

impl QuestionnaireStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for QuestionnaireStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── Dealer group ───────────────────────────────────────────────

/// A dealer group — the parent organization owning one or more rooftops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealerGroup {
    pub id: Uuid,
    pub name: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ── Rooftop ────────────────────────────────────────────────────

/// A single dealership location being onboarded onto the voice-agent
/// platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rooftop {
    pub id: Uuid,
    pub dealer_group_id: Uuid,
    pub name: String,
    pub brands: Vec<String>,
    pub website_url: Option<String>,
    pub timezone: String,
    pub questionnaire_status: QuestionnaireStatus,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a rooftop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRooftop {
    pub dealer_group_id: Uuid,
    pub name: String,
    pub brands: Vec<String>,
    pub website_url: Option<String>,
    pub timezone: String,
    pub created_by: Option<Uuid>,
}

// ── Uploaded document metadata ─────────────────────────────────

/// Metadata row for a file uploaded against a rooftop. The binary itself
/// lives behind the `AttachmentStore` port; `file_path` is its blob ref.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RooftopDocument {
    pub id: Uuid,
    pub rooftop_id: Uuid,
    pub file_name: String,
    pub file_path: String,
    pub file_type: String,
    pub file_size: i64,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: Option<Uuid>,
}

// ── Dashboard stats ────────────────────────────────────────────

/// Top-level onboarding counters for the dashboard.
/// `signed_off_rulebooks` counts pushed rulebooks too — a push does not
/// un-sign a rulebook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OnboardingStats {
    pub dealer_groups: i64,
    pub rooftops: i64,
    pub completed_questionnaires: i64,
    pub signed_off_rulebooks: i64,
}

// ── US timezones ───────────────────────────────────────────────

/// A timezone option offered during rooftop setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimezoneOption {
    pub value: &'static str,
    pub label: &'static str,
}

/// Curated US timezones for rooftop configuration.
pub const US_TIMEZONES: &[TimezoneOption] = &[
    TimezoneOption {
        value: "America/New_York",
        label: "Eastern Time (ET)",
    },
    TimezoneOption {
        value: "America/Chicago",
        label: "Central Time (CT)",
    },
    TimezoneOption {
        value: "America/Denver",
        label: "Mountain Time (MT)",
    },
    TimezoneOption {
        value: "America/Los_Angeles",
        label: "Pacific Time (PT)",
    },
    TimezoneOption {
        value: "America/Anchorage",
        label: "Alaska Time (AKT)",
    },
    TimezoneOption {
        value: "Pacific/Honolulu",
        label: "Hawaii Time (HT)",
    },
];

/// Whether `value` is one of the supported US timezones.
pub fn is_supported_timezone(value: &str) -> bool {
    US_TIMEZONES.iter().any(|tz| tz.value == value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_questionnaire_status_round_trip() {
        for status in [QuestionnaireStatus::Draft, QuestionnaireStatus::Completed] {
            let s = status.as_str();
            assert_eq!(
                QuestionnaireStatus::parse(s),
                Some(status),
                "round-trip failed for {s}"
            );
        }
    }

    #[test]
    fn test_questionnaire_status_rejects_unknown() {
        assert_eq!(QuestionnaireStatus::parse("complete"), None);
        assert_eq!(QuestionnaireStatus::parse(""), None);
    }

    #[test]
    fn test_questionnaire_status_serde_snake_case() {
        let json = serde_json::to_string(&QuestionnaireStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
    }

    #[test]
    fn test_supported_timezones() {
        assert!(is_supported_timezone("America/Chicago"));
        assert!(is_supported_timezone("Pacific/Honolulu"));
        assert!(!is_supported_timezone("Europe/London"));
        assert!(!is_supported_timezone(""));
    }

    #[test]
    fn test_timezone_values_unique() {
        for (i, a) in US_TIMEZONES.iter().enumerate() {
            for b in &US_TIMEZONES[i + 1..] {
                assert_ne!(a.value, b.value);
            }
        }
    }
}
