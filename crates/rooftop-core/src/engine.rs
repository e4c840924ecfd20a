//! Rulebook lifecycle service — orchestrates the four lifecycle verbs.
//!
//! | Verb     | Status transition         | Key logic                          |
//! |----------|---------------------------|------------------------------------|
//! | generate | (none) → Draft, or reset  | Render answers + facts, track gaps |
//! | save     | Draft (status unchanged)  | Edit snapshot + content, one write |
//! | sign_off | Draft → SignedOff         | Missing-field gate, CAS write      |
//! | push     | SignedOff → Pushed        | Publish via gateway, then CAS      |
//!
//! Every verb re-reads current status before acting; the status-changing
//! writes re-check it compare-and-swap so a lost race surfaces as
//! `Conflict`, never as a double transition.

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::OnboardError;
use crate::gateway::PublicationGateway;
use crate::ports::{AnswerStore, FactSheetStore, Result, RooftopStore, RulebookStore};
use crate::questionnaire::answer_map;
use crate::rulebook::{Rulebook, RulebookEdit, RulebookStatus};
use crate::template::{self, RenderedRulebook};

/// Central rulebook lifecycle service.
pub struct RulebookService<'a> {
    rooftops: &'a dyn RooftopStore,
    answers: &'a dyn AnswerStore,
    fact_sheets: &'a dyn FactSheetStore,
    rulebooks: &'a dyn RulebookStore,
    gateway: PublicationGateway<'a>,
}

/// Result of a Generate: the persisted rulebook plus the required fields
/// that rendered as the missing sentinel.
#[derive(Debug, Clone)]
pub struct GenerateOutcome {
    pub rulebook: Rulebook,
    pub missing_required: Vec<String>,
}

impl<'a> RulebookService<'a> {
    pub fn new(
        rooftops: &'a dyn RooftopStore,
        answers: &'a dyn AnswerStore,
        fact_sheets: &'a dyn FactSheetStore,
        rulebooks: &'a dyn RulebookStore,
        gateway: PublicationGateway<'a>,
    ) -> Self {
        Self {
            rooftops,
            answers,
            fact_sheets,
            rulebooks,
            gateway,
        }
    }

    // ── 1. generate ───────────────────────────────────────────────

    /// Render the rulebook from current answers and fact sheet, then
    /// persist it: first call creates a Draft, later calls overwrite and
    /// force status back to Draft (clearing sign-off metadata). The edit
    /// trail is untouched. Rejected once the rulebook is Pushed.
    pub async fn generate(&self, rooftop_id: Uuid) -> Result<GenerateOutcome> {
        let rooftop = self.rooftops.get_rooftop(rooftop_id).await?;
        let rendered = self.render_current(rooftop_id).await?;

        let rulebook = match self.rulebooks.get_rulebook_for_rooftop(rooftop_id).await? {
            Some(existing) => {
                if !existing.status.can_regenerate() {
                    warn!(%rooftop_id, status = %existing.status, "regenerate rejected");
                    return Err(OnboardError::Precondition(format!(
                        "Cannot regenerate rulebook in status '{}' — pushed rulebooks are frozen",
                        existing.status
                    )));
                }
                self.rulebooks
                    .reset_to_draft(existing.id, &rendered.content)
                    .await?;
                self.rulebooks.get_rulebook(existing.id).await?
            }
            None => {
                self.rulebooks
                    .insert_draft(rooftop_id, &rendered.content)
                    .await?
            }
        };

        info!(
            rooftop_id = %rooftop.id,
            rulebook_id = %rulebook.id,
            missing = rendered.missing_required.len(),
            "generated rulebook"
        );
        Ok(GenerateOutcome {
            rulebook,
            missing_required: rendered.missing_required,
        })
    }

    // ── 2. save ───────────────────────────────────────────────────

    /// Persist an edited draft: append a full-content snapshot to the
    /// edit trail and update live content in one atomic write. Only legal
    /// while Draft — a rejected save leaves neither a snapshot nor a
    /// content change.
    pub async fn save(
        &self,
        rulebook_id: Uuid,
        user_id: Uuid,
        content: &str,
        note: Option<&str>,
    ) -> Result<RulebookEdit> {
        let rulebook = self.rulebooks.get_rulebook(rulebook_id).await?;
        if !rulebook.status.can_edit() {
            warn!(%rulebook_id, status = %rulebook.status, "save rejected");
            return Err(OnboardError::Precondition(format!(
                "Cannot save rulebook in status '{}' — must be draft",
                rulebook.status
            )));
        }

        let edit = self
            .rulebooks
            .save_edit(rulebook_id, user_id, content, note)
            .await?;
        info!(%rulebook_id, edit_id = %edit.id, "saved rulebook edit");
        Ok(edit)
    }

    // ── 3. sign_off ───────────────────────────────────────────────

    /// Transition Draft → SignedOff, recording who and when.
    ///
    /// Gated on the stored content being free of the missing-required
    /// sentinel — the one signal that survives hand edits. When the gate
    /// fires, the error names the still-unresolved fields by re-rendering
    /// from current inputs.
    pub async fn sign_off(&self, rulebook_id: Uuid, user_id: Uuid) -> Result<Rulebook> {
        let rulebook = self.rulebooks.get_rulebook(rulebook_id).await?;
        if rulebook.status != RulebookStatus::Draft {
            warn!(%rulebook_id, status = %rulebook.status, "sign-off rejected");
            return Err(OnboardError::Precondition(format!(
                "Cannot sign off rulebook in status '{}' — must be draft",
                rulebook.status
            )));
        }

        if template::contains_missing_sentinel(&rulebook.content) {
            let rendered = self.render_current(rulebook.rooftop_id).await?;
            let detail = if rendered.missing_required.is_empty() {
                // Inputs are complete but the marker text survives in the
                // content (stale generation or a hand-typed marker).
                "content still contains the missing-required marker".to_string()
            } else {
                format!(
                    "unresolved required fields: {}",
                    rendered.missing_required.join(", ")
                )
            };
            warn!(%rulebook_id, %detail, "sign-off rejected");
            return Err(OnboardError::Precondition(format!(
                "Cannot sign off rulebook — {detail}"
            )));
        }

        self.rulebooks
            .mark_signed_off(rulebook_id, user_id, chrono::Utc::now())
            .await?;
        info!(%rulebook_id, signed_off_by = %user_id, "rulebook signed off");
        self.rulebooks.get_rulebook(rulebook_id).await
    }

    // ── 4. push ───────────────────────────────────────────────────

    /// Publish a signed-off rulebook: provision the agent, record the
    /// link, then transition SignedOff → Pushed. A gateway failure
    /// propagates with the status untouched, so the caller re-reads and
    /// decides — an automatic retry could create a second live agent.
    /// Returns the provisioned agent id.
    pub async fn push(&self, rulebook_id: Uuid, user_id: Uuid) -> Result<String> {
        let rulebook = self.rulebooks.get_rulebook(rulebook_id).await?;
        if rulebook.status != RulebookStatus::SignedOff {
            warn!(%rulebook_id, status = %rulebook.status, "push rejected");
            return Err(OnboardError::Precondition(format!(
                "Cannot push rulebook in status '{}' — must be signed off",
                rulebook.status
            )));
        }

        let agent_id = self
            .gateway
            .publish(rulebook.rooftop_id, &rulebook.content, user_id)
            .await?;
        self.rulebooks.mark_pushed(rulebook_id).await?;

        info!(%rulebook_id, %agent_id, pushed_by = %user_id, "rulebook pushed");
        Ok(agent_id)
    }

    /// Render from the rooftop's current answers and fact sheet.
    async fn render_current(&self, rooftop_id: Uuid) -> Result<RenderedRulebook> {
        let answers = self.answers.list_answers(rooftop_id).await?;
        let facts = self.fact_sheets.get_fact_sheet(rooftop_id).await?;
        Ok(template::render(&answer_map(&answers), facts.as_ref()))
    }
}
