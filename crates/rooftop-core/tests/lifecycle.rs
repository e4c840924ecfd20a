//! End-to-end rulebook lifecycle over the in-memory store.
//!
//! Drives the real services — onboarding, rulebook engine, publication
//! gateway — through the full dealer story: answer the questionnaire,
//! capture the fact sheet, generate, hand-edit, sign off, push.

use async_trait::async_trait;
use uuid::Uuid;

use rooftop_core::engine::RulebookService;
use rooftop_core::fact_sheet::FactSheetInput;
use rooftop_core::gateway::{PublicationGateway, TimestampProvisioner};
use rooftop_core::memory::MemoryStore;
use rooftop_core::onboarding::OnboardingService;
use rooftop_core::ports::{AgentLinkStore, AgentProvisioner, RulebookStore};
use rooftop_core::questionnaire::{NewAnswer, QUESTIONS};
use rooftop_core::rulebook::{PushStatus, RulebookStatus};
use rooftop_core::template::MISSING_REQUIRED;
use rooftop_core::types::NewRooftop;
use rooftop_core::{OnboardError, Result};

// ── Fixtures ───────────────────────────────────────────────────

fn onboarding(store: &MemoryStore) -> OnboardingService<'_> {
    OnboardingService::new(store, store, store, store, store)
}

fn rulebooks<'a>(
    store: &'a MemoryStore,
    provisioner: &'a TimestampProvisioner,
) -> RulebookService<'a> {
    RulebookService::new(
        store,
        store,
        store,
        store,
        PublicationGateway::new(store, provisioner),
    )
}

/// Create a dealer group and rooftop and complete the questionnaire.
async fn onboard_rooftop(store: &MemoryStore) -> Uuid {
    let svc = onboarding(store);
    let group = svc
        .create_dealer_group("Heartland Auto Group", None)
        .await
        .unwrap();
    let rooftop = svc
        .create_rooftop(&NewRooftop {
            dealer_group_id: group.id,
            name: "Heartland Honda".into(),
            brands: vec!["Honda".into()],
            website_url: Some("https://heartlandhonda.example.com".into()),
            timezone: "America/Chicago".into(),
            created_by: None,
        })
        .await
        .unwrap();

    let answers: Vec<NewAnswer> = QUESTIONS
        .iter()
        .map(|q| NewAnswer::new(q.id, format!("answer for {}", q.id)))
        .collect();
    svc.record_answers(rooftop.id, &answers, true).await.unwrap();
    rooftop.id
}

async fn save_full_fact_sheet(store: &MemoryStore, rooftop_id: Uuid) {
    onboarding(store)
        .save_fact_sheet(
            rooftop_id,
            &FactSheetInput {
                service_address: Some("4200 Commerce Dr, Springfield".into()),
                weekday_hours: Some("7:00 AM - 6:00 PM".into()),
                saturday_hours: Some("8:00 AM - 2:00 PM".into()),
            },
            None,
        )
        .await
        .unwrap();
}

struct FailingProvisioner;

#[async_trait]
impl AgentProvisioner for FailingProvisioner {
    async fn provision(&self, _rooftop_id: Uuid, _content: &str) -> Result<String> {
        Err(OnboardError::Upstream("agent service is down".into()))
    }
}

// ── Scenarios ──────────────────────────────────────────────────

#[tokio::test]
async fn full_onboarding_happy_path() {
    let store = MemoryStore::new();
    let provisioner = TimestampProvisioner::default();
    let svc = rulebooks(&store, &provisioner);
    let rooftop_id = onboard_rooftop(&store).await;
    save_full_fact_sheet(&store, rooftop_id).await;
    let user = Uuid::new_v4();

    // Generate: complete inputs, sentinel-free draft.
    let outcome = svc.generate(rooftop_id).await.unwrap();
    assert!(outcome.missing_required.is_empty());
    assert_eq!(outcome.rulebook.status, RulebookStatus::Draft);
    assert!(!outcome.rulebook.content.contains(MISSING_REQUIRED));
    assert!(outcome.rulebook.content.contains("answer for dealership_name"));
    let rulebook_id = outcome.rulebook.id;

    // Sign off: status plus audit metadata.
    let signed = svc.sign_off(rulebook_id, user).await.unwrap();
    assert_eq!(signed.status, RulebookStatus::SignedOff);
    assert_eq!(signed.signed_off_by, Some(user));
    assert!(signed.signed_off_at.is_some());

    // Push: agent link recorded, rulebook frozen.
    let agent_id = svc.push(rulebook_id, user).await.unwrap();
    let link = store.get_agent_link(rooftop_id).await.unwrap().unwrap();
    assert_eq!(link.agent_id, agent_id);
    assert_eq!(link.push_status, PushStatus::Success);
    assert_eq!(link.push_error, None);
    assert_eq!(link.pushed_by, Some(user));
    let pushed = store.get_rulebook(rulebook_id).await.unwrap();
    assert_eq!(pushed.status, RulebookStatus::Pushed);

    // Frozen means frozen: no save, no second push, no regenerate.
    let err = svc.save(rulebook_id, user, "late edit", None).await.unwrap_err();
    assert!(matches!(err, OnboardError::Precondition(_)));
    assert!(store.list_edits(rulebook_id).await.unwrap().is_empty());

    let err = svc.push(rulebook_id, user).await.unwrap_err();
    assert!(matches!(err, OnboardError::Precondition(_)));
    let unchanged = store.get_agent_link(rooftop_id).await.unwrap().unwrap();
    assert_eq!(unchanged.agent_id, agent_id);

    let err = svc.generate(rooftop_id).await.unwrap_err();
    assert!(matches!(err, OnboardError::Precondition(_)));
}

#[tokio::test]
async fn missing_weekday_hours_blocks_sign_off_until_fixed() {
    let store = MemoryStore::new();
    let provisioner = TimestampProvisioner::default();
    let svc = rulebooks(&store, &provisioner);
    let rooftop_id = onboard_rooftop(&store).await;
    onboarding(&store)
        .save_fact_sheet(
            rooftop_id,
            &FactSheetInput {
                service_address: Some("4200 Commerce Dr".into()),
                weekday_hours: None,
                saturday_hours: Some("8:00 AM - 2:00 PM".into()),
            },
            None,
        )
        .await
        .unwrap();
    let user = Uuid::new_v4();

    let outcome = svc.generate(rooftop_id).await.unwrap();
    assert_eq!(outcome.missing_required, vec!["weekday_hours".to_string()]);
    assert!(outcome.rulebook.content.contains(MISSING_REQUIRED));

    let err = svc.sign_off(outcome.rulebook.id, user).await.unwrap_err();
    assert!(matches!(err, OnboardError::Precondition(_)));
    assert!(err.to_string().contains("weekday_hours"));

    // Fill the gap, regenerate, sign off.
    save_full_fact_sheet(&store, rooftop_id).await;
    let outcome = svc.generate(rooftop_id).await.unwrap();
    assert!(outcome.missing_required.is_empty());
    let signed = svc.sign_off(outcome.rulebook.id, user).await.unwrap();
    assert_eq!(signed.status, RulebookStatus::SignedOff);
}

#[tokio::test]
async fn regenerate_after_sign_off_resets_draft_and_keeps_history() {
    let store = MemoryStore::new();
    let provisioner = TimestampProvisioner::default();
    let svc = rulebooks(&store, &provisioner);
    let rooftop_id = onboard_rooftop(&store).await;
    save_full_fact_sheet(&store, rooftop_id).await;
    let user = Uuid::new_v4();

    let rulebook = svc.generate(rooftop_id).await.unwrap().rulebook;
    let edited = format!("{}\n## After-Hours Contact\nCall the duty manager.\n", rulebook.content);
    svc.save(rulebook.id, user, &edited, Some("added after-hours section"))
        .await
        .unwrap();
    svc.sign_off(rulebook.id, user).await.unwrap();

    // Regeneration from SignedOff is an explicit restart: back to Draft,
    // sign-off metadata cleared, hand edit overwritten, history intact.
    let regenerated = svc.generate(rooftop_id).await.unwrap().rulebook;
    assert_eq!(regenerated.id, rulebook.id);
    assert_eq!(regenerated.status, RulebookStatus::Draft);
    assert_eq!(regenerated.signed_off_at, None);
    assert_eq!(regenerated.signed_off_by, None);
    assert!(!regenerated.content.contains("After-Hours Contact"));

    let edits = store.list_edits(rulebook.id).await.unwrap();
    assert_eq!(edits.len(), 1);
    assert!(edits[0].content_snapshot.contains("After-Hours Contact"));
    assert_eq!(edits[0].edit_note.as_deref(), Some("added after-hours section"));
}

#[tokio::test]
async fn push_failure_leaves_rulebook_signed_off_and_no_link() {
    let store = MemoryStore::new();
    let rooftop_id = onboard_rooftop(&store).await;
    save_full_fact_sheet(&store, rooftop_id).await;
    let user = Uuid::new_v4();

    let provisioner = TimestampProvisioner::default();
    let svc = rulebooks(&store, &provisioner);
    let rulebook = svc.generate(rooftop_id).await.unwrap().rulebook;
    svc.sign_off(rulebook.id, user).await.unwrap();

    let failing = FailingProvisioner;
    let broken = RulebookService::new(
        &store,
        &store,
        &store,
        &store,
        PublicationGateway::new(&store, &failing),
    );
    let err = broken.push(rulebook.id, user).await.unwrap_err();
    assert!(matches!(err, OnboardError::Upstream(_)));
    assert_eq!(
        store.get_rulebook(rulebook.id).await.unwrap().status,
        RulebookStatus::SignedOff
    );
    assert!(store.get_agent_link(rooftop_id).await.unwrap().is_none());

    // The rulebook is still pushable once the agent service recovers.
    let agent_id = svc.push(rulebook.id, user).await.unwrap();
    let link = store.get_agent_link(rooftop_id).await.unwrap().unwrap();
    assert_eq!(link.agent_id, agent_id);
    assert_eq!(
        store.get_rulebook(rulebook.id).await.unwrap().status,
        RulebookStatus::Pushed
    );
}

#[tokio::test]
async fn edit_history_is_newest_first_and_append_only() {
    let store = MemoryStore::new();
    let provisioner = TimestampProvisioner::default();
    let svc = rulebooks(&store, &provisioner);
    let rooftop_id = onboard_rooftop(&store).await;
    save_full_fact_sheet(&store, rooftop_id).await;
    let user = Uuid::new_v4();

    let rulebook = svc.generate(rooftop_id).await.unwrap().rulebook;
    for n in 1..=3 {
        svc.save(
            rulebook.id,
            user,
            &format!("revision {n}"),
            Some(&format!("note {n}")),
        )
        .await
        .unwrap();
    }

    let edits = store.list_edits(rulebook.id).await.unwrap();
    assert_eq!(edits.len(), 3);
    assert_eq!(edits[0].content_snapshot, "revision 3");
    assert_eq!(edits[2].content_snapshot, "revision 1");
    assert_eq!(
        store.get_rulebook(rulebook.id).await.unwrap().content,
        "revision 3"
    );
}
