//! sqlx row mirrors for the domain types.
//!
//! `rooftop-core` stays sqlx-free, so each table row decodes into one of
//! these and converts into the domain type. Status columns are TEXT; an
//! unrecognized value is a data-integrity fault, surfaced by the
//! `TryFrom` conversions as a `String` error the stores map to
//! `OnboardError::Integrity`.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use rooftop_core::fact_sheet::FactSheet;
use rooftop_core::questionnaire::Answer;
use rooftop_core::rulebook::{AgentLink, PushStatus, Rulebook, RulebookEdit, RulebookStatus};
use rooftop_core::types::{DealerGroup, QuestionnaireStatus, Rooftop, RooftopDocument};

// ── Dealer groups ──────────────────────────────────────────────

#[derive(FromRow)]
pub struct PgDealerGroupRow {
    pub id: Uuid,
    pub name: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PgDealerGroupRow> for DealerGroup {
    fn from(row: PgDealerGroupRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ── Rooftops ───────────────────────────────────────────────────

#[derive(FromRow)]
pub struct PgRooftopRow {
    pub id: Uuid,
    pub dealer_group_id: Uuid,
    pub name: String,
    pub brands: Vec<String>,
    pub website_url: Option<String>,
    pub timezone: String,
    pub questionnaire_status: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PgRooftopRow> for Rooftop {
    type Error = String;

    fn try_from(row: PgRooftopRow) -> Result<Self, String> {
        let questionnaire_status = QuestionnaireStatus::parse(&row.questionnaire_status)
            .ok_or_else(|| {
                format!(
                    "unknown questionnaire status '{}' for rooftop {}",
                    row.questionnaire_status, row.id
                )
            })?;
        Ok(Self {
            id: row.id,
            dealer_group_id: row.dealer_group_id,
            name: row.name,
            brands: row.brands,
            website_url: row.website_url,
            timezone: row.timezone,
            questionnaire_status,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// ── Questionnaire answers ──────────────────────────────────────

#[derive(FromRow)]
pub struct PgAnswerRow {
    pub id: Uuid,
    pub rooftop_id: Uuid,
    pub question_id: String,
    pub value: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PgAnswerRow> for Answer {
    fn from(row: PgAnswerRow) -> Self {
        Self {
            id: row.id,
            rooftop_id: row.rooftop_id,
            question_id: row.question_id,
            value: row.value,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ── Fact sheets ────────────────────────────────────────────────

#[derive(FromRow)]
pub struct PgFactSheetRow {
    pub rooftop_id: Uuid,
    pub service_address: Option<String>,
    pub weekday_hours: Option<String>,
    pub saturday_hours: Option<String>,
    pub extracted_at: DateTime<Utc>,
    pub extracted_by: Option<Uuid>,
}

impl From<PgFactSheetRow> for FactSheet {
    fn from(row: PgFactSheetRow) -> Self {
        Self {
            rooftop_id: row.rooftop_id,
            service_address: row.service_address,
            weekday_hours: row.weekday_hours,
            saturday_hours: row.saturday_hours,
            extracted_at: row.extracted_at,
            extracted_by: row.extracted_by,
        }
    }
}

// ── Rulebooks ──────────────────────────────────────────────────

#[derive(FromRow)]
pub struct PgRulebookRow {
    pub id: Uuid,
    pub rooftop_id: Uuid,
    pub content: String,
    pub status: String,
    pub signed_off_at: Option<DateTime<Utc>>,
    pub signed_off_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PgRulebookRow> for Rulebook {
    type Error = String;

    fn try_from(row: PgRulebookRow) -> Result<Self, String> {
        let status = RulebookStatus::parse(&row.status).ok_or_else(|| {
            format!("unknown rulebook status '{}' for rulebook {}", row.status, row.id)
        })?;
        Ok(Self {
            id: row.id,
            rooftop_id: row.rooftop_id,
            content: row.content,
            status,
            signed_off_at: row.signed_off_at,
            signed_off_by: row.signed_off_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
pub struct PgEditRow {
    pub id: Uuid,
    pub rulebook_id: Uuid,
    pub user_id: Uuid,
    pub content_snapshot: String,
    pub edit_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<PgEditRow> for RulebookEdit {
    fn from(row: PgEditRow) -> Self {
        Self {
            id: row.id,
            rulebook_id: row.rulebook_id,
            user_id: row.user_id,
            content_snapshot: row.content_snapshot,
            edit_note: row.edit_note,
            created_at: row.created_at,
        }
    }
}

// ── Agent links ────────────────────────────────────────────────

#[derive(FromRow)]
pub struct PgAgentLinkRow {
    pub rooftop_id: Uuid,
    pub agent_id: String,
    pub push_status: String,
    pub push_error: Option<String>,
    pub pushed_at: DateTime<Utc>,
    pub pushed_by: Option<Uuid>,
}

impl TryFrom<PgAgentLinkRow> for AgentLink {
    type Error = String;

    fn try_from(row: PgAgentLinkRow) -> Result<Self, String> {
        let push_status = PushStatus::parse(&row.push_status).ok_or_else(|| {
            format!(
                "unknown push status '{}' for rooftop {}",
                row.push_status, row.rooftop_id
            )
        })?;
        Ok(Self {
            rooftop_id: row.rooftop_id,
            agent_id: row.agent_id,
            push_status,
            push_error: row.push_error,
            pushed_at: row.pushed_at,
            pushed_by: row.pushed_by,
        })
    }
}

// ── Documents ──────────────────────────────────────────────────

#[derive(FromRow)]
pub struct PgDocumentRow {
    pub id: Uuid,
    pub rooftop_id: Uuid,
    pub file_name: String,
    pub file_path: String,
    pub file_type: String,
    pub file_size: i64,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: Option<Uuid>,
}

impl From<PgDocumentRow> for RooftopDocument {
    fn from(row: PgDocumentRow) -> Self {
        Self {
            id: row.id,
            rooftop_id: row.rooftop_id,
            file_name: row.file_name,
            file_path: row.file_path,
            file_type: row.file_type,
            file_size: row.file_size,
            uploaded_at: row.uploaded_at,
            uploaded_by: row.uploaded_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_rulebook_status_is_an_error() {
        let row = PgRulebookRow {
            id: Uuid::new_v4(),
            rooftop_id: Uuid::new_v4(),
            content: "content".into(),
            status: "approved".into(),
            signed_off_at: None,
            signed_off_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let err = Rulebook::try_from(row).unwrap_err();
        assert!(err.contains("unknown rulebook status 'approved'"));
    }

    #[test]
    fn test_known_statuses_convert() {
        for status in ["draft", "signed_off", "pushed"] {
            let row = PgRulebookRow {
                id: Uuid::new_v4(),
                rooftop_id: Uuid::new_v4(),
                content: String::new(),
                status: status.into(),
                signed_off_at: None,
                signed_off_by: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            assert!(Rulebook::try_from(row).is_ok(), "failed for {status}");
        }
    }

    #[test]
    fn test_unknown_push_status_is_an_error() {
        let row = PgAgentLinkRow {
            rooftop_id: Uuid::new_v4(),
            agent_id: "retell_1".into(),
            push_status: "pending".into(),
            push_error: None,
            pushed_at: Utc::now(),
            pushed_by: None,
        };
        let err = AgentLink::try_from(row).unwrap_err();
        assert!(err.contains("unknown push status 'pending'"));
    }
}
