//! Rulebook lifecycle types — the document, its status machine, the
//! append-only edit trail, and the provisioned-agent link.
//! Pure value types — no sqlx, no DB dependencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Rulebook status ────────────────────────────────────────────

/// Rulebook lifecycle status.
///
/// Transitions:
///   Draft → SignedOff (sign-off, gated on no missing-required fields)
///   SignedOff → Pushed (publication succeeded)
///   SignedOff → Draft (explicit regenerate — sign-off metadata cleared)
///   Pushed is terminal.
///
/// This enum is the single authority on what moves are legal; callers
/// never compare status strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RulebookStatus {
    Draft,
    SignedOff,
    Pushed,
}

impl RulebookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::SignedOff => "signed_off",
            Self::Pushed => "pushed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "signed_off" => Some(Self::SignedOff),
            "pushed" => Some(Self::Pushed),
            _ => None,
        }
    }

    /// Whether this status admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Pushed)
    }

    /// Whether content edits (Save) are allowed in this status.
    pub fn can_edit(&self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Whether Generate may overwrite a rulebook in this status.
    /// Regenerating a signed-off rulebook is a deliberate reset; a pushed
    /// rulebook mirrors a live external agent and stays frozen.
    pub fn can_regenerate(&self) -> bool {
        !self.is_terminal()
    }

    /// Whether a direct transition to `next` is legal.
    pub fn can_transition_to(&self, next: RulebookStatus) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::SignedOff)
                | (Self::SignedOff, Self::Pushed)
                | (Self::SignedOff, Self::Draft)
        )
    }
}

impl std::fmt::Display for RulebookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── Rulebook ───────────────────────────────────────────────────

/// The operational rulebook document for a rooftop. Zero or one per
/// rooftop; created only by Generate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rulebook {
    pub id: Uuid,
    pub rooftop_id: Uuid,
    pub content: String,
    pub status: RulebookStatus,
    pub signed_off_at: Option<DateTime<Utc>>,
    pub signed_off_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ── Edit trail ─────────────────────────────────────────────────

/// One entry in the append-only edit history. `content_snapshot` holds
/// the full document as saved, so the trail reconstructs any prior state
/// without diffing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulebookEdit {
    pub id: Uuid,
    pub rulebook_id: Uuid,
    pub user_id: Uuid,
    pub content_snapshot: String,
    pub edit_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ── Agent link ─────────────────────────────────────────────────

/// Outcome of a publication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushStatus {
    Success,
    Failed,
}

impl PushStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for PushStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The association between a rooftop and its provisioned voice agent.
/// One per rooftop; a repeat push overwrites the previous attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLink {
    pub rooftop_id: Uuid,
    pub agent_id: String,
    pub push_status: PushStatus,
    pub push_error: Option<String>,
    pub pushed_at: DateTime<Utc>,
    pub pushed_by: Option<Uuid>,
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rulebook_status_round_trip() {
        for status in [
            RulebookStatus::Draft,
            RulebookStatus::SignedOff,
            RulebookStatus::Pushed,
        ] {
            let s = status.as_str();
            assert_eq!(
                RulebookStatus::parse(s),
                Some(status),
                "round-trip failed for {s}"
            );
        }
        assert_eq!(RulebookStatus::parse("signed-off"), None);
    }

    #[test]
    fn test_push_status_round_trip() {
        for status in [PushStatus::Success, PushStatus::Failed] {
            assert_eq!(PushStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PushStatus::parse("ok"), None);
    }

    #[test]
    fn test_only_pushed_is_terminal() {
        assert!(RulebookStatus::Pushed.is_terminal());
        assert!(!RulebookStatus::Draft.is_terminal());
        assert!(!RulebookStatus::SignedOff.is_terminal());
    }

    #[test]
    fn test_only_draft_is_editable() {
        assert!(RulebookStatus::Draft.can_edit());
        assert!(!RulebookStatus::SignedOff.can_edit());
        assert!(!RulebookStatus::Pushed.can_edit());
    }

    #[test]
    fn test_regenerate_allowed_until_pushed() {
        assert!(RulebookStatus::Draft.can_regenerate());
        assert!(RulebookStatus::SignedOff.can_regenerate());
        assert!(!RulebookStatus::Pushed.can_regenerate());
    }

    #[test]
    fn test_transition_table_exhaustive() {
        use RulebookStatus::*;
        let legal = [(Draft, SignedOff), (SignedOff, Pushed), (SignedOff, Draft)];
        for from in [Draft, SignedOff, Pushed] {
            for to in [Draft, SignedOff, Pushed] {
                let expected = legal.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "transition {from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&RulebookStatus::SignedOff).unwrap();
        assert_eq!(json, "\"signed_off\"");
        let back: RulebookStatus = serde_json::from_str("\"pushed\"").unwrap();
        assert_eq!(back, RulebookStatus::Pushed);
    }
}
