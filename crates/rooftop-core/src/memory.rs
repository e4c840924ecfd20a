//! In-memory implementation of every record-store port.
//!
//! Used by the unit and lifecycle tests and for local development without
//! Postgres. Mirrors the adapter contracts exactly — including the
//! compare-and-swap conflict semantics on rulebook status writes — so
//! engine behavior under test matches production.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::OnboardError;
use crate::fact_sheet::FactSheet;
use crate::ports::{
    AgentLinkStore, AnswerStore, DealerGroupStore, DocumentStore, FactSheetStore, Result,
    RooftopStore, RulebookStore, StatsStore,
};
use crate::questionnaire::{Answer, NewAnswer};
use crate::rulebook::{AgentLink, Rulebook, RulebookEdit, RulebookStatus};
use crate::types::{
    DealerGroup, NewRooftop, OnboardingStats, QuestionnaireStatus, Rooftop, RooftopDocument,
};

/// One store struct implements all record ports, sharing its maps behind
/// `Arc` so clones observe the same data.
#[derive(Default, Clone)]
pub struct MemoryStore {
    dealer_groups: Arc<RwLock<HashMap<Uuid, DealerGroup>>>,
    rooftops: Arc<RwLock<HashMap<Uuid, Rooftop>>>,
    answers: Arc<RwLock<HashMap<(Uuid, String), Answer>>>,
    fact_sheets: Arc<RwLock<HashMap<Uuid, FactSheet>>>,
    rulebooks: Arc<RwLock<HashMap<Uuid, Rulebook>>>,
    edits: Arc<RwLock<Vec<RulebookEdit>>>,
    agent_links: Arc<RwLock<HashMap<Uuid, AgentLink>>>,
    documents: Arc<RwLock<HashMap<Uuid, RooftopDocument>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DealerGroupStore for MemoryStore {
    async fn insert_dealer_group(
        &self,
        name: &str,
        created_by: Option<Uuid>,
    ) -> Result<DealerGroup> {
        let now = Utc::now();
        let group = DealerGroup {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_by,
            created_at: now,
            updated_at: now,
        };
        self.dealer_groups
            .write()
            .await
            .insert(group.id, group.clone());
        Ok(group)
    }

    async fn get_dealer_group(&self, id: Uuid) -> Result<DealerGroup> {
        self.dealer_groups
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| OnboardError::NotFound(format!("dealer group {id}")))
    }

    async fn list_dealer_groups(&self) -> Result<Vec<DealerGroup>> {
        let groups = self.dealer_groups.read().await;
        let mut all: Vec<_> = groups.values().cloned().collect();
        all.sort_by_key(|g| (g.created_at, g.id));
        all.reverse();
        Ok(all)
    }
}

#[async_trait]
impl RooftopStore for MemoryStore {
    async fn insert_rooftop(&self, new: &NewRooftop) -> Result<Rooftop> {
        let now = Utc::now();
        let rooftop = Rooftop {
            id: Uuid::new_v4(),
            dealer_group_id: new.dealer_group_id,
            name: new.name.clone(),
            brands: new.brands.clone(),
            website_url: new.website_url.clone(),
            timezone: new.timezone.clone(),
            questionnaire_status: QuestionnaireStatus::Draft,
            created_by: new.created_by,
            created_at: now,
            updated_at: now,
        };
        self.rooftops
            .write()
            .await
            .insert(rooftop.id, rooftop.clone());
        Ok(rooftop)
    }

    async fn get_rooftop(&self, id: Uuid) -> Result<Rooftop> {
        self.rooftops
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| OnboardError::NotFound(format!("rooftop {id}")))
    }

    async fn list_rooftops_for_group(&self, dealer_group_id: Uuid) -> Result<Vec<Rooftop>> {
        let rooftops = self.rooftops.read().await;
        let mut matching: Vec<_> = rooftops
            .values()
            .filter(|r| r.dealer_group_id == dealer_group_id)
            .cloned()
            .collect();
        matching.sort_by_key(|r| (r.created_at, r.id));
        matching.reverse();
        Ok(matching)
    }

    async fn set_questionnaire_status(
        &self,
        rooftop_id: Uuid,
        status: QuestionnaireStatus,
    ) -> Result<()> {
        let mut rooftops = self.rooftops.write().await;
        let rooftop = rooftops
            .get_mut(&rooftop_id)
            .ok_or_else(|| OnboardError::NotFound(format!("rooftop {rooftop_id}")))?;
        rooftop.questionnaire_status = status;
        rooftop.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl AnswerStore for MemoryStore {
    async fn upsert_answers(&self, rooftop_id: Uuid, answers: &[NewAnswer]) -> Result<()> {
        let mut stored = self.answers.write().await;
        let now = Utc::now();
        for new in answers {
            let key = (rooftop_id, new.question_id.clone());
            match stored.get_mut(&key) {
                Some(existing) => {
                    existing.value = new.value.clone();
                    existing.updated_at = now;
                }
                None => {
                    stored.insert(
                        key,
                        Answer {
                            id: Uuid::new_v4(),
                            rooftop_id,
                            question_id: new.question_id.clone(),
                            value: new.value.clone(),
                            created_at: now,
                            updated_at: now,
                        },
                    );
                }
            }
        }
        Ok(())
    }

    async fn list_answers(&self, rooftop_id: Uuid) -> Result<Vec<Answer>> {
        let stored = self.answers.read().await;
        let mut matching: Vec<_> = stored
            .values()
            .filter(|a| a.rooftop_id == rooftop_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.question_id.cmp(&b.question_id));
        Ok(matching)
    }
}

#[async_trait]
impl FactSheetStore for MemoryStore {
    async fn upsert_fact_sheet(&self, sheet: &FactSheet) -> Result<FactSheet> {
        self.fact_sheets
            .write()
            .await
            .insert(sheet.rooftop_id, sheet.clone());
        Ok(sheet.clone())
    }

    async fn get_fact_sheet(&self, rooftop_id: Uuid) -> Result<Option<FactSheet>> {
        Ok(self.fact_sheets.read().await.get(&rooftop_id).cloned())
    }
}

#[async_trait]
impl RulebookStore for MemoryStore {
    async fn insert_draft(&self, rooftop_id: Uuid, content: &str) -> Result<Rulebook> {
        let mut rulebooks = self.rulebooks.write().await;
        // Uniqueness check and insert under one write lock.
        if rulebooks.values().any(|r| r.rooftop_id == rooftop_id) {
            return Err(OnboardError::Integrity(format!(
                "rooftop {rooftop_id} already has a rulebook"
            )));
        }
        let now = Utc::now();
        let rulebook = Rulebook {
            id: Uuid::new_v4(),
            rooftop_id,
            content: content.to_string(),
            status: RulebookStatus::Draft,
            signed_off_at: None,
            signed_off_by: None,
            created_at: now,
            updated_at: now,
        };
        rulebooks.insert(rulebook.id, rulebook.clone());
        Ok(rulebook)
    }

    async fn get_rulebook(&self, id: Uuid) -> Result<Rulebook> {
        self.rulebooks
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| OnboardError::NotFound(format!("rulebook {id}")))
    }

    async fn get_rulebook_for_rooftop(&self, rooftop_id: Uuid) -> Result<Option<Rulebook>> {
        Ok(self
            .rulebooks
            .read()
            .await
            .values()
            .find(|r| r.rooftop_id == rooftop_id)
            .cloned())
    }

    async fn reset_to_draft(&self, rulebook_id: Uuid, content: &str) -> Result<()> {
        let mut rulebooks = self.rulebooks.write().await;
        let rulebook = match rulebooks.get_mut(&rulebook_id) {
            Some(r) if r.status != RulebookStatus::Pushed => r,
            _ => {
                return Err(OnboardError::Conflict(format!(
                    "rulebook {rulebook_id} not found or already pushed"
                )))
            }
        };
        rulebook.content = content.to_string();
        rulebook.status = RulebookStatus::Draft;
        rulebook.signed_off_at = None;
        rulebook.signed_off_by = None;
        rulebook.updated_at = Utc::now();
        Ok(())
    }

    async fn save_edit(
        &self,
        rulebook_id: Uuid,
        user_id: Uuid,
        content: &str,
        note: Option<&str>,
    ) -> Result<RulebookEdit> {
        // Both locks held across the write — snapshot and content cannot
        // diverge.
        let mut rulebooks = self.rulebooks.write().await;
        let mut edits = self.edits.write().await;

        let rulebook = rulebooks
            .get_mut(&rulebook_id)
            .ok_or_else(|| OnboardError::NotFound(format!("rulebook {rulebook_id}")))?;

        let edit = RulebookEdit {
            id: Uuid::new_v4(),
            rulebook_id,
            user_id,
            content_snapshot: content.to_string(),
            edit_note: note.map(str::to_string),
            created_at: Utc::now(),
        };
        edits.push(edit.clone());
        rulebook.content = content.to_string();
        rulebook.updated_at = edit.created_at;
        Ok(edit)
    }

    async fn list_edits(&self, rulebook_id: Uuid) -> Result<Vec<RulebookEdit>> {
        let edits = self.edits.read().await;
        // Appended chronologically, so reverse insertion order is
        // newest-first even when timestamps collide.
        Ok(edits
            .iter()
            .filter(|e| e.rulebook_id == rulebook_id)
            .rev()
            .cloned()
            .collect())
    }

    async fn mark_signed_off(
        &self,
        rulebook_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut rulebooks = self.rulebooks.write().await;
        let rulebook = match rulebooks.get_mut(&rulebook_id) {
            Some(r) if r.status == RulebookStatus::Draft => r,
            _ => {
                return Err(OnboardError::Conflict(format!(
                    "rulebook {rulebook_id} not found or no longer in draft"
                )))
            }
        };
        rulebook.status = RulebookStatus::SignedOff;
        rulebook.signed_off_at = Some(at);
        rulebook.signed_off_by = Some(user_id);
        rulebook.updated_at = at;
        Ok(())
    }

    async fn mark_pushed(&self, rulebook_id: Uuid) -> Result<()> {
        let mut rulebooks = self.rulebooks.write().await;
        let rulebook = match rulebooks.get_mut(&rulebook_id) {
            Some(r) if r.status == RulebookStatus::SignedOff => r,
            _ => {
                return Err(OnboardError::Conflict(format!(
                    "rulebook {rulebook_id} not found or not signed off"
                )))
            }
        };
        rulebook.status = RulebookStatus::Pushed;
        rulebook.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl AgentLinkStore for MemoryStore {
    async fn upsert_agent_link(&self, link: &AgentLink) -> Result<()> {
        self.agent_links
            .write()
            .await
            .insert(link.rooftop_id, link.clone());
        Ok(())
    }

    async fn get_agent_link(&self, rooftop_id: Uuid) -> Result<Option<AgentLink>> {
        Ok(self.agent_links.read().await.get(&rooftop_id).cloned())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_document(&self, doc: &RooftopDocument) -> Result<()> {
        self.documents.write().await.insert(doc.id, doc.clone());
        Ok(())
    }

    async fn get_document(&self, id: Uuid) -> Result<RooftopDocument> {
        self.documents
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| OnboardError::NotFound(format!("document {id}")))
    }

    async fn list_documents(&self, rooftop_id: Uuid) -> Result<Vec<RooftopDocument>> {
        let documents = self.documents.read().await;
        let mut matching: Vec<_> = documents
            .values()
            .filter(|d| d.rooftop_id == rooftop_id)
            .cloned()
            .collect();
        matching.sort_by_key(|d| (d.uploaded_at, d.id));
        matching.reverse();
        Ok(matching)
    }

    async fn delete_document(&self, id: Uuid) -> Result<()> {
        self.documents.write().await.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl StatsStore for MemoryStore {
    async fn onboarding_stats(&self) -> Result<OnboardingStats> {
        let dealer_groups = self.dealer_groups.read().await.len() as i64;
        let rooftops = self.rooftops.read().await;
        let completed = rooftops
            .values()
            .filter(|r| r.questionnaire_status == QuestionnaireStatus::Completed)
            .count() as i64;
        let rooftop_count = rooftops.len() as i64;
        drop(rooftops);
        let signed_off = self
            .rulebooks
            .read()
            .await
            .values()
            .filter(|r| {
                matches!(
                    r.status,
                    RulebookStatus::SignedOff | RulebookStatus::Pushed
                )
            })
            .count() as i64;
        Ok(OnboardingStats {
            dealer_groups,
            rooftops: rooftop_count,
            completed_questionnaires: completed,
            signed_off_rulebooks: signed_off,
        })
    }
}
