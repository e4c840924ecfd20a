//! Storage port traits for rooftop onboarding.
//! Implemented by rooftop-postgres and by `memory::MemoryStore` — engine
//! and service logic depend only on these traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::OnboardError;
use crate::fact_sheet::FactSheet;
use crate::questionnaire::{Answer, NewAnswer};
use crate::rulebook::{AgentLink, Rulebook, RulebookEdit};
use crate::types::{
    DealerGroup, NewRooftop, OnboardingStats, QuestionnaireStatus, Rooftop, RooftopDocument,
};

pub type Result<T> = std::result::Result<T, OnboardError>;

// ── Dealer groups ──────────────────────────────────────────────

#[async_trait]
pub trait DealerGroupStore: Send + Sync {
    async fn insert_dealer_group(
        &self,
        name: &str,
        created_by: Option<Uuid>,
    ) -> Result<DealerGroup>;

    async fn get_dealer_group(&self, id: Uuid) -> Result<DealerGroup>;

    /// All dealer groups, newest first.
    async fn list_dealer_groups(&self) -> Result<Vec<DealerGroup>>;
}

// ── Rooftops ───────────────────────────────────────────────────

#[async_trait]
pub trait RooftopStore: Send + Sync {
    /// Create a rooftop with `questionnaire_status = Draft`.
    async fn insert_rooftop(&self, new: &NewRooftop) -> Result<Rooftop>;

    async fn get_rooftop(&self, id: Uuid) -> Result<Rooftop>;

    /// Rooftops in a dealer group, newest first.
    async fn list_rooftops_for_group(&self, dealer_group_id: Uuid) -> Result<Vec<Rooftop>>;

    async fn set_questionnaire_status(
        &self,
        rooftop_id: Uuid,
        status: QuestionnaireStatus,
    ) -> Result<()>;
}

// ── Questionnaire answers ──────────────────────────────────────

#[async_trait]
pub trait AnswerStore: Send + Sync {
    /// Upsert a batch of answers keyed on (rooftop_id, question_id).
    /// Re-answering replaces the prior value; answers are never versioned.
    async fn upsert_answers(&self, rooftop_id: Uuid, answers: &[NewAnswer]) -> Result<()>;

    /// All stored answers for a rooftop, ordered by question id.
    async fn list_answers(&self, rooftop_id: Uuid) -> Result<Vec<Answer>>;
}

// ── Fact sheets ────────────────────────────────────────────────

#[async_trait]
pub trait FactSheetStore: Send + Sync {
    /// Upsert keyed on rooftop_id — at most one fact sheet per rooftop,
    /// each save replaces the previous capture wholesale.
    async fn upsert_fact_sheet(&self, sheet: &FactSheet) -> Result<FactSheet>;

    async fn get_fact_sheet(&self, rooftop_id: Uuid) -> Result<Option<FactSheet>>;
}

// ── Rulebooks ──────────────────────────────────────────────────

#[async_trait]
pub trait RulebookStore: Send + Sync {
    /// Insert a new Draft rulebook. Fails with `Integrity` if the rooftop
    /// already has one — callers overwrite via `reset_to_draft` instead.
    async fn insert_draft(&self, rooftop_id: Uuid, content: &str) -> Result<Rulebook>;

    async fn get_rulebook(&self, id: Uuid) -> Result<Rulebook>;

    async fn get_rulebook_for_rooftop(&self, rooftop_id: Uuid) -> Result<Option<Rulebook>>;

    /// Overwrite content and force status back to Draft, clearing
    /// sign-off metadata. Guarded against `Pushed` at write time: returns
    /// `Conflict` if the rulebook was pushed (or vanished) since it was
    /// last read.
    async fn reset_to_draft(&self, rulebook_id: Uuid, content: &str) -> Result<()>;

    /// Append an edit snapshot AND update live content in one atomic
    /// write. Partial application (snapshot without content, or the
    /// reverse) is a store-layer bug.
    async fn save_edit(
        &self,
        rulebook_id: Uuid,
        user_id: Uuid,
        content: &str,
        note: Option<&str>,
    ) -> Result<RulebookEdit>;

    /// Edit history, newest first. Entries are never mutated or deleted.
    async fn list_edits(&self, rulebook_id: Uuid) -> Result<Vec<RulebookEdit>>;

    /// Compare-and-swap Draft → SignedOff, recording who and when.
    /// Returns `Conflict` when the rulebook is no longer Draft at write
    /// time (a concurrent transition won).
    async fn mark_signed_off(
        &self,
        rulebook_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Compare-and-swap SignedOff → Pushed. Returns `Conflict` when the
    /// rulebook is no longer SignedOff at write time.
    async fn mark_pushed(&self, rulebook_id: Uuid) -> Result<()>;
}

// ── Agent links ────────────────────────────────────────────────

#[async_trait]
pub trait AgentLinkStore: Send + Sync {
    /// Upsert keyed on rooftop_id — a repeat push replaces the prior
    /// attempt rather than accumulating rows.
    async fn upsert_agent_link(&self, link: &AgentLink) -> Result<()>;

    async fn get_agent_link(&self, rooftop_id: Uuid) -> Result<Option<AgentLink>>;
}

// ── Uploaded document metadata ─────────────────────────────────

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_document(&self, doc: &RooftopDocument) -> Result<()>;

    async fn get_document(&self, id: Uuid) -> Result<RooftopDocument>;

    /// Documents for a rooftop, newest upload first.
    async fn list_documents(&self, rooftop_id: Uuid) -> Result<Vec<RooftopDocument>>;

    async fn delete_document(&self, id: Uuid) -> Result<()>;
}

// ── Dashboard stats ────────────────────────────────────────────

#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn onboarding_stats(&self) -> Result<OnboardingStats>;
}

// ── Agent provisioning ─────────────────────────────────────────

/// The external voice-agent provisioning service.
///
/// Implementations map their transport failures to
/// `OnboardError::Upstream`; the caller never retries blindly because a
/// repeat could create a second live agent.
#[async_trait]
pub trait AgentProvisioner: Send + Sync {
    /// Create (or replace) the agent for a rooftop from rulebook content.
    /// Returns the provisioned agent id.
    async fn provision(&self, rooftop_id: Uuid, content: &str) -> Result<String>;
}
