//! Onboarding operations upstream of the rulebook: dealer groups,
//! rooftops, questionnaire answers, fact sheets, dashboard stats.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::OnboardError;
use crate::fact_sheet::{FactSheet, FactSheetInput};
use crate::ports::{
    AnswerStore, DealerGroupStore, FactSheetStore, Result, RooftopStore, StatsStore,
};
use crate::questionnaire::{answer_map, is_known_question, missing_required, NewAnswer};
use crate::types::{
    is_supported_timezone, DealerGroup, NewRooftop, OnboardingStats, QuestionnaireStatus, Rooftop,
};

pub struct OnboardingService<'a> {
    dealer_groups: &'a dyn DealerGroupStore,
    rooftops: &'a dyn RooftopStore,
    answers: &'a dyn AnswerStore,
    fact_sheets: &'a dyn FactSheetStore,
    stats: &'a dyn StatsStore,
}

impl<'a> OnboardingService<'a> {
    pub fn new(
        dealer_groups: &'a dyn DealerGroupStore,
        rooftops: &'a dyn RooftopStore,
        answers: &'a dyn AnswerStore,
        fact_sheets: &'a dyn FactSheetStore,
        stats: &'a dyn StatsStore,
    ) -> Self {
        Self {
            dealer_groups,
            rooftops,
            answers,
            fact_sheets,
            stats,
        }
    }

    // ── Dealer groups ──────────────────────────────────────────────

    pub async fn create_dealer_group(
        &self,
        name: &str,
        created_by: Option<Uuid>,
    ) -> Result<DealerGroup> {
        let name = name.trim();
        if name.is_empty() {
            return Err(OnboardError::Precondition(
                "dealer group name must not be blank".into(),
            ));
        }
        let group = self.dealer_groups.insert_dealer_group(name, created_by).await?;
        info!(group_id = %group.id, name = %group.name, "created dealer group");
        Ok(group)
    }

    pub async fn list_dealer_groups(&self) -> Result<Vec<DealerGroup>> {
        self.dealer_groups.list_dealer_groups().await
    }

    // ── Rooftops ───────────────────────────────────────────────────

    /// Create a rooftop under an existing dealer group. Name must be
    /// non-blank and the timezone must be one of the offered US zones;
    /// brands and website URL are trimmed, blanks dropped.
    pub async fn create_rooftop(&self, new: &NewRooftop) -> Result<Rooftop> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(OnboardError::Precondition(
                "rooftop name must not be blank".into(),
            ));
        }
        self.dealer_groups.get_dealer_group(new.dealer_group_id).await?;
        if !is_supported_timezone(&new.timezone) {
            return Err(OnboardError::Precondition(format!(
                "unsupported timezone '{}'",
                new.timezone
            )));
        }

        let normalized = NewRooftop {
            dealer_group_id: new.dealer_group_id,
            name: name.to_string(),
            brands: new
                .brands
                .iter()
                .map(|b| b.trim().to_string())
                .filter(|b| !b.is_empty())
                .collect(),
            website_url: new
                .website_url
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string),
            timezone: new.timezone.clone(),
            created_by: new.created_by,
        };
        let rooftop = self.rooftops.insert_rooftop(&normalized).await?;
        info!(rooftop_id = %rooftop.id, name = %rooftop.name, "created rooftop");
        Ok(rooftop)
    }

    pub async fn list_rooftops(&self, dealer_group_id: Uuid) -> Result<Vec<Rooftop>> {
        self.rooftops.list_rooftops_for_group(dealer_group_id).await
    }

    // ── Questionnaire ──────────────────────────────────────────────

    /// Upsert a batch of answers. With `mark_complete` the rooftop's
    /// questionnaire flips to Completed, gated on every required question
    /// having a non-blank answer once this batch lands. The gate is
    /// checked against the prospective state before anything is written,
    /// so a rejected mark-complete persists nothing.
    pub async fn record_answers(
        &self,
        rooftop_id: Uuid,
        batch: &[NewAnswer],
        mark_complete: bool,
    ) -> Result<()> {
        self.rooftops.get_rooftop(rooftop_id).await?;
        for answer in batch {
            if !is_known_question(&answer.question_id) {
                return Err(OnboardError::Precondition(format!(
                    "unknown question id '{}'",
                    answer.question_id
                )));
            }
        }

        if mark_complete {
            let stored = self.answers.list_answers(rooftop_id).await?;
            let mut map = answer_map(&stored);
            for answer in batch {
                match &answer.value {
                    Some(v) => {
                        map.insert(answer.question_id.clone(), v.clone());
                    }
                    None => {
                        map.remove(&answer.question_id);
                    }
                }
            }
            let missing = missing_required(&map);
            if !missing.is_empty() {
                warn!(%rooftop_id, missing = missing.len(), "mark-complete rejected");
                return Err(OnboardError::Precondition(format!(
                    "questionnaire incomplete — unanswered required questions: {}",
                    missing.join(", ")
                )));
            }
        }

        self.answers.upsert_answers(rooftop_id, batch).await?;
        if mark_complete {
            self.rooftops
                .set_questionnaire_status(rooftop_id, QuestionnaireStatus::Completed)
                .await?;
            info!(%rooftop_id, "questionnaire completed");
        }
        Ok(())
    }

    // ── Fact sheet ─────────────────────────────────────────────────

    /// Upsert the website fact sheet for a rooftop. Blank fields
    /// normalize to `None`; each save replaces the previous capture
    /// wholesale and restamps `extracted_at`.
    pub async fn save_fact_sheet(
        &self,
        rooftop_id: Uuid,
        input: &FactSheetInput,
        extracted_by: Option<Uuid>,
    ) -> Result<FactSheet> {
        self.rooftops.get_rooftop(rooftop_id).await?;
        let normalized = input.normalized();
        let sheet = FactSheet {
            rooftop_id,
            service_address: normalized.service_address,
            weekday_hours: normalized.weekday_hours,
            saturday_hours: normalized.saturday_hours,
            extracted_at: Utc::now(),
            extracted_by,
        };
        let saved = self.fact_sheets.upsert_fact_sheet(&sheet).await?;
        info!(%rooftop_id, "saved fact sheet");
        Ok(saved)
    }

    // ── Dashboard ──────────────────────────────────────────────────

    pub async fn stats(&self) -> Result<OnboardingStats> {
        self.stats.onboarding_stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::questionnaire::QUESTIONS;

    fn service(store: &MemoryStore) -> OnboardingService<'_> {
        OnboardingService::new(store, store, store, store, store)
    }

    async fn seed_rooftop(store: &MemoryStore) -> Rooftop {
        let svc = service(store);
        let group = svc.create_dealer_group("Premier Auto Group", None).await.unwrap();
        svc.create_rooftop(&NewRooftop {
            dealer_group_id: group.id,
            name: "Premier Toyota".into(),
            brands: vec!["Toyota".into()],
            website_url: None,
            timezone: "America/New_York".into(),
            created_by: None,
        })
        .await
        .unwrap()
    }

    fn required_answers() -> Vec<NewAnswer> {
        QUESTIONS
            .iter()
            .filter(|q| q.required)
            .map(|q| NewAnswer::new(q.id, format!("value for {}", q.id)))
            .collect()
    }

    #[tokio::test]
    async fn dealer_group_name_must_not_be_blank() {
        let store = MemoryStore::new();
        let err = service(&store)
            .create_dealer_group("   ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, OnboardError::Precondition(_)));
    }

    #[tokio::test]
    async fn rooftop_requires_existing_group_and_known_timezone() {
        let store = MemoryStore::new();
        let svc = service(&store);

        let err = svc
            .create_rooftop(&NewRooftop {
                dealer_group_id: Uuid::new_v4(),
                name: "Orphan Motors".into(),
                brands: vec![],
                website_url: None,
                timezone: "America/Chicago".into(),
                created_by: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, OnboardError::NotFound(_)));

        let group = svc.create_dealer_group("Group", None).await.unwrap();
        let err = svc
            .create_rooftop(&NewRooftop {
                dealer_group_id: group.id,
                name: "Bad TZ Motors".into(),
                brands: vec![],
                website_url: None,
                timezone: "Europe/Berlin".into(),
                created_by: None,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timezone"));
    }

    #[tokio::test]
    async fn rooftop_normalizes_brands_and_url() {
        let store = MemoryStore::new();
        let svc = service(&store);
        let group = svc.create_dealer_group("Group", None).await.unwrap();

        let rooftop = svc
            .create_rooftop(&NewRooftop {
                dealer_group_id: group.id,
                name: "  Westside Ford  ".into(),
                brands: vec![" Ford ".into(), "  ".into(), "Lincoln".into()],
                website_url: Some("   ".into()),
                timezone: "America/Denver".into(),
                created_by: None,
            })
            .await
            .unwrap();
        assert_eq!(rooftop.name, "Westside Ford");
        assert_eq!(rooftop.brands, vec!["Ford".to_string(), "Lincoln".to_string()]);
        assert_eq!(rooftop.website_url, None);
        assert_eq!(rooftop.questionnaire_status, QuestionnaireStatus::Draft);
    }

    #[tokio::test]
    async fn unknown_question_id_rejected_before_write() {
        let store = MemoryStore::new();
        let svc = service(&store);
        let rooftop = seed_rooftop(&store).await;

        let batch = vec![
            NewAnswer::new("dealership_name", "Premier Toyota"),
            NewAnswer::new("favorite_color", "blue"),
        ];
        let err = svc
            .record_answers(rooftop.id, &batch, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("favorite_color"));
        assert!(store.list_answers(rooftop.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_complete_gated_on_required_questions() {
        let store = MemoryStore::new();
        let svc = service(&store);
        let rooftop = seed_rooftop(&store).await;

        let mut answers = required_answers();
        let held_back = answers.pop().unwrap();

        let err = svc
            .record_answers(rooftop.id, &answers, true)
            .await
            .unwrap_err();
        assert!(matches!(err, OnboardError::Precondition(_)));
        assert!(err.to_string().contains(&held_back.question_id));
        // The gate fires before any write lands.
        assert!(store.list_answers(rooftop.id).await.unwrap().is_empty());
        let fresh = store.get_rooftop(rooftop.id).await.unwrap();
        assert_eq!(fresh.questionnaire_status, QuestionnaireStatus::Draft);
    }

    #[tokio::test]
    async fn mark_complete_counts_the_incoming_batch() {
        let store = MemoryStore::new();
        let svc = service(&store);
        let rooftop = seed_rooftop(&store).await;

        let mut answers = required_answers();
        let last = answers.pop().unwrap();
        svc.record_answers(rooftop.id, &answers, false).await.unwrap();

        // The final required answer arrives in the same call that marks
        // complete.
        svc.record_answers(rooftop.id, &[last], true).await.unwrap();
        let fresh = store.get_rooftop(rooftop.id).await.unwrap();
        assert_eq!(fresh.questionnaire_status, QuestionnaireStatus::Completed);
    }

    #[tokio::test]
    async fn fact_sheet_blanks_normalize_to_none() {
        let store = MemoryStore::new();
        let svc = service(&store);
        let rooftop = seed_rooftop(&store).await;

        let saved = svc
            .save_fact_sheet(
                rooftop.id,
                &FactSheetInput {
                    service_address: Some("  123 Main St  ".into()),
                    weekday_hours: Some("   ".into()),
                    saturday_hours: None,
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(saved.service_address.as_deref(), Some("123 Main St"));
        assert_eq!(saved.weekday_hours, None);
        assert_eq!(saved.saturday_hours, None);
    }

    #[tokio::test]
    async fn stats_reflect_created_entities() {
        let store = MemoryStore::new();
        let svc = service(&store);
        let rooftop = seed_rooftop(&store).await;
        svc.record_answers(rooftop.id, &required_answers(), true)
            .await
            .unwrap();

        let stats = svc.stats().await.unwrap();
        assert_eq!(stats.dealer_groups, 1);
        assert_eq!(stats.rooftops, 1);
        assert_eq!(stats.completed_questionnaires, 1);
        assert_eq!(stats.signed_off_rulebooks, 0);
    }
}
