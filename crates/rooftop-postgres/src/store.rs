//! Postgres implementations of the rooftop_core port traits.
//!
//! Each adapter is a newtype wrapping PgPool. All SQL is runtime-checked
//! (sqlx::query, not sqlx::query!) to avoid compile-time DB requirement.
//! Status transitions re-check the expected current status in the UPDATE
//! itself; zero rows affected surfaces as `Conflict`.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use rooftop_core::error::OnboardError;
use rooftop_core::fact_sheet::FactSheet;
use rooftop_core::ports::{
    AgentLinkStore, AnswerStore, DealerGroupStore, DocumentStore, FactSheetStore, Result,
    RooftopStore, RulebookStore, StatsStore,
};
use rooftop_core::questionnaire::{Answer, NewAnswer};
use rooftop_core::rulebook::{AgentLink, Rulebook, RulebookEdit};
use rooftop_core::types::{
    DealerGroup, NewRooftop, OnboardingStats, QuestionnaireStatus, Rooftop, RooftopDocument,
};

use crate::rows::{
    PgAgentLinkRow, PgAnswerRow, PgDealerGroupRow, PgDocumentRow, PgEditRow, PgFactSheetRow,
    PgRooftopRow, PgRulebookRow,
};

/// Apply the bundled schema. Every statement is `IF NOT EXISTS`, so this
/// is safe to run on every startup.
pub async fn apply_schema(pool: &PgPool) -> Result<()> {
    sqlx::raw_sql(include_str!("../schema.sql"))
        .execute(pool)
        .await
        .map_err(|e| anyhow!(e))?;
    Ok(())
}

// ── PgDealerGroupStore ─────────────────────────────────────────

pub struct PgDealerGroupStore {
    pool: PgPool,
}

impl PgDealerGroupStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DealerGroupStore for PgDealerGroupStore {
    async fn insert_dealer_group(
        &self,
        name: &str,
        created_by: Option<Uuid>,
    ) -> Result<DealerGroup> {
        let row = sqlx::query_as::<_, PgDealerGroupRow>(
            r#"
            INSERT INTO dealer_groups (name, created_by)
            VALUES ($1, $2)
            RETURNING id, name, created_by, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.into())
    }

    async fn get_dealer_group(&self, id: Uuid) -> Result<DealerGroup> {
        let row = sqlx::query_as::<_, PgDealerGroupRow>(
            r#"
            SELECT id, name, created_by, created_at, updated_at
            FROM dealer_groups
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        row.map(DealerGroup::from)
            .ok_or_else(|| OnboardError::NotFound(format!("dealer group {id}")))
    }

    async fn list_dealer_groups(&self) -> Result<Vec<DealerGroup>> {
        let rows = sqlx::query_as::<_, PgDealerGroupRow>(
            r#"
            SELECT id, name, created_by, created_at, updated_at
            FROM dealer_groups
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(DealerGroup::from).collect())
    }
}

// ── PgRooftopStore ─────────────────────────────────────────────

pub struct PgRooftopStore {
    pool: PgPool,
}

impl PgRooftopStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ROOFTOP_COLUMNS: &str = "id, dealer_group_id, name, brands, website_url, timezone, \
                               questionnaire_status, created_by, created_at, updated_at";

#[async_trait]
impl RooftopStore for PgRooftopStore {
    async fn insert_rooftop(&self, new: &NewRooftop) -> Result<Rooftop> {
        let sql = format!(
            r#"
            INSERT INTO rooftops (dealer_group_id, name, brands, website_url, timezone, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ROOFTOP_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, PgRooftopRow>(&sql)
            .bind(new.dealer_group_id)
            .bind(&new.name)
            .bind(&new.brands)
            .bind(&new.website_url)
            .bind(&new.timezone)
            .bind(new.created_by)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Rooftop::try_from(row).map_err(OnboardError::Integrity)
    }

    async fn get_rooftop(&self, id: Uuid) -> Result<Rooftop> {
        let sql = format!("SELECT {ROOFTOP_COLUMNS} FROM rooftops WHERE id = $1");
        let row = sqlx::query_as::<_, PgRooftopRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        row.ok_or_else(|| OnboardError::NotFound(format!("rooftop {id}")))
            .and_then(|r| Rooftop::try_from(r).map_err(OnboardError::Integrity))
    }

    async fn list_rooftops_for_group(&self, dealer_group_id: Uuid) -> Result<Vec<Rooftop>> {
        let sql = format!(
            "SELECT {ROOFTOP_COLUMNS} FROM rooftops \
             WHERE dealer_group_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, PgRooftopRow>(&sql)
            .bind(dealer_group_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        rows.into_iter()
            .map(|r| Rooftop::try_from(r).map_err(OnboardError::Integrity))
            .collect()
    }

    async fn set_questionnaire_status(
        &self,
        rooftop_id: Uuid,
        status: QuestionnaireStatus,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE rooftops
            SET questionnaire_status = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(rooftop_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        if result.rows_affected() == 0 {
            return Err(OnboardError::NotFound(format!("rooftop {rooftop_id}")));
        }
        Ok(())
    }
}

// ── PgAnswerStore ──────────────────────────────────────────────

pub struct PgAnswerStore {
    pool: PgPool,
}

impl PgAnswerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnswerStore for PgAnswerStore {
    async fn upsert_answers(&self, rooftop_id: Uuid, answers: &[NewAnswer]) -> Result<()> {
        if answers.is_empty() {
            return Ok(());
        }
        // One transaction for the batch: a partially-applied batch never
        // becomes visible.
        let mut tx = self.pool.begin().await.map_err(|e| anyhow!(e))?;
        for answer in answers {
            sqlx::query(
                r#"
                INSERT INTO questionnaire_answers (rooftop_id, question_id, value)
                VALUES ($1, $2, $3)
                ON CONFLICT (rooftop_id, question_id)
                DO UPDATE SET value = EXCLUDED.value, updated_at = now()
                "#,
            )
            .bind(rooftop_id)
            .bind(&answer.question_id)
            .bind(&answer.value)
            .execute(&mut *tx)
            .await
            .map_err(|e| anyhow!(e))?;
        }
        tx.commit().await.map_err(|e| anyhow!(e))?;
        Ok(())
    }

    async fn list_answers(&self, rooftop_id: Uuid) -> Result<Vec<Answer>> {
        let rows = sqlx::query_as::<_, PgAnswerRow>(
            r#"
            SELECT id, rooftop_id, question_id, value, created_at, updated_at
            FROM questionnaire_answers
            WHERE rooftop_id = $1
            ORDER BY question_id
            "#,
        )
        .bind(rooftop_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(Answer::from).collect())
    }
}

// ── PgFactSheetStore ───────────────────────────────────────────

pub struct PgFactSheetStore {
    pool: PgPool,
}

impl PgFactSheetStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FactSheetStore for PgFactSheetStore {
    async fn upsert_fact_sheet(&self, sheet: &FactSheet) -> Result<FactSheet> {
        let row = sqlx::query_as::<_, PgFactSheetRow>(
            r#"
            INSERT INTO website_extractions
                (rooftop_id, service_address, weekday_hours, saturday_hours,
                 extracted_at, extracted_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (rooftop_id) DO UPDATE
            SET service_address = EXCLUDED.service_address,
                weekday_hours   = EXCLUDED.weekday_hours,
                saturday_hours  = EXCLUDED.saturday_hours,
                extracted_at    = EXCLUDED.extracted_at,
                extracted_by    = EXCLUDED.extracted_by
            RETURNING rooftop_id, service_address, weekday_hours, saturday_hours,
                      extracted_at, extracted_by
            "#,
        )
        .bind(sheet.rooftop_id)
        .bind(&sheet.service_address)
        .bind(&sheet.weekday_hours)
        .bind(&sheet.saturday_hours)
        .bind(sheet.extracted_at)
        .bind(sheet.extracted_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.into())
    }

    async fn get_fact_sheet(&self, rooftop_id: Uuid) -> Result<Option<FactSheet>> {
        let row = sqlx::query_as::<_, PgFactSheetRow>(
            r#"
            SELECT rooftop_id, service_address, weekday_hours, saturday_hours,
                   extracted_at, extracted_by
            FROM website_extractions
            WHERE rooftop_id = $1
            "#,
        )
        .bind(rooftop_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.map(FactSheet::from))
    }
}

// ── PgRulebookStore ────────────────────────────────────────────

pub struct PgRulebookStore {
    pool: PgPool,
}

impl PgRulebookStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const RULEBOOK_COLUMNS: &str = "id, rooftop_id, content, status, signed_off_at, signed_off_by, \
                                created_at, updated_at";

#[async_trait]
impl RulebookStore for PgRulebookStore {
    async fn insert_draft(&self, rooftop_id: Uuid, content: &str) -> Result<Rulebook> {
        let sql = format!(
            r#"
            INSERT INTO rulebooks (rooftop_id, content)
            VALUES ($1, $2)
            ON CONFLICT (rooftop_id) DO NOTHING
            RETURNING {RULEBOOK_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, PgRulebookRow>(&sql)
            .bind(rooftop_id)
            .bind(content)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        // DO NOTHING returns no row when a rulebook already exists.
        let row = row.ok_or_else(|| {
            OnboardError::Integrity(format!("rooftop {rooftop_id} already has a rulebook"))
        })?;
        Rulebook::try_from(row).map_err(OnboardError::Integrity)
    }

    async fn get_rulebook(&self, id: Uuid) -> Result<Rulebook> {
        let sql = format!("SELECT {RULEBOOK_COLUMNS} FROM rulebooks WHERE id = $1");
        let row = sqlx::query_as::<_, PgRulebookRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        row.ok_or_else(|| OnboardError::NotFound(format!("rulebook {id}")))
            .and_then(|r| Rulebook::try_from(r).map_err(OnboardError::Integrity))
    }

    async fn get_rulebook_for_rooftop(&self, rooftop_id: Uuid) -> Result<Option<Rulebook>> {
        let sql = format!("SELECT {RULEBOOK_COLUMNS} FROM rulebooks WHERE rooftop_id = $1");
        let row = sqlx::query_as::<_, PgRulebookRow>(&sql)
            .bind(rooftop_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        row.map(|r| Rulebook::try_from(r).map_err(OnboardError::Integrity))
            .transpose()
    }

    async fn reset_to_draft(&self, rulebook_id: Uuid, content: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE rulebooks
            SET content = $2, status = 'draft',
                signed_off_at = NULL, signed_off_by = NULL, updated_at = now()
            WHERE id = $1
              AND status <> 'pushed'
            "#,
        )
        .bind(rulebook_id)
        .bind(content)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        if result.rows_affected() == 0 {
            return Err(OnboardError::Conflict(format!(
                "rulebook {rulebook_id} not found or already pushed"
            )));
        }
        Ok(())
    }

    async fn save_edit(
        &self,
        rulebook_id: Uuid,
        user_id: Uuid,
        content: &str,
        note: Option<&str>,
    ) -> Result<RulebookEdit> {
        // Snapshot and content update in one transaction; an early return
        // rolls both back.
        let mut tx = self.pool.begin().await.map_err(|e| anyhow!(e))?;

        let updated = sqlx::query(
            r#"
            UPDATE rulebooks SET content = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(rulebook_id)
        .bind(content)
        .execute(&mut *tx)
        .await
        .map_err(|e| anyhow!(e))?;
        if updated.rows_affected() == 0 {
            return Err(OnboardError::NotFound(format!("rulebook {rulebook_id}")));
        }

        let row = sqlx::query_as::<_, PgEditRow>(
            r#"
            INSERT INTO rulebook_edits (rulebook_id, user_id, content_snapshot, edit_note)
            VALUES ($1, $2, $3, $4)
            RETURNING id, rulebook_id, user_id, content_snapshot, edit_note, created_at
            "#,
        )
        .bind(rulebook_id)
        .bind(user_id)
        .bind(content)
        .bind(note)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| anyhow!(e))?;

        tx.commit().await.map_err(|e| anyhow!(e))?;
        Ok(row.into())
    }

    async fn list_edits(&self, rulebook_id: Uuid) -> Result<Vec<RulebookEdit>> {
        let rows = sqlx::query_as::<_, PgEditRow>(
            r#"
            SELECT id, rulebook_id, user_id, content_snapshot, edit_note, created_at
            FROM rulebook_edits
            WHERE rulebook_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(rulebook_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(RulebookEdit::from).collect())
    }

    async fn mark_signed_off(
        &self,
        rulebook_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE rulebooks
            SET status = 'signed_off', signed_off_at = $3, signed_off_by = $2,
                updated_at = now()
            WHERE id = $1
              AND status = 'draft'
            "#,
        )
        .bind(rulebook_id)
        .bind(user_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        if result.rows_affected() == 0 {
            return Err(OnboardError::Conflict(format!(
                "rulebook {rulebook_id} not found or no longer in draft"
            )));
        }
        Ok(())
    }

    async fn mark_pushed(&self, rulebook_id: Uuid) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE rulebooks
            SET status = 'pushed', updated_at = now()
            WHERE id = $1
              AND status = 'signed_off'
            "#,
        )
        .bind(rulebook_id)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        if result.rows_affected() == 0 {
            return Err(OnboardError::Conflict(format!(
                "rulebook {rulebook_id} not found or not signed off"
            )));
        }
        Ok(())
    }
}

// ── PgAgentLinkStore ───────────────────────────────────────────

pub struct PgAgentLinkStore {
    pool: PgPool,
}

impl PgAgentLinkStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AgentLinkStore for PgAgentLinkStore {
    async fn upsert_agent_link(&self, link: &AgentLink) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO retell_agents
                (rooftop_id, agent_id, push_status, push_error, pushed_at, pushed_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (rooftop_id) DO UPDATE
            SET agent_id    = EXCLUDED.agent_id,
                push_status = EXCLUDED.push_status,
                push_error  = EXCLUDED.push_error,
                pushed_at   = EXCLUDED.pushed_at,
                pushed_by   = EXCLUDED.pushed_by
            "#,
        )
        .bind(link.rooftop_id)
        .bind(&link.agent_id)
        .bind(link.push_status.as_str())
        .bind(&link.push_error)
        .bind(link.pushed_at)
        .bind(link.pushed_by)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(())
    }

    async fn get_agent_link(&self, rooftop_id: Uuid) -> Result<Option<AgentLink>> {
        let row = sqlx::query_as::<_, PgAgentLinkRow>(
            r#"
            SELECT rooftop_id, agent_id, push_status, push_error, pushed_at, pushed_by
            FROM retell_agents
            WHERE rooftop_id = $1
            "#,
        )
        .bind(rooftop_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        row.map(|r| AgentLink::try_from(r).map_err(OnboardError::Integrity))
            .transpose()
    }
}

// ── PgDocumentStore ────────────────────────────────────────────

pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert_document(&self, doc: &RooftopDocument) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO rooftop_documents
                (id, rooftop_id, file_name, file_path, file_type, file_size,
                 uploaded_at, uploaded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(doc.id)
        .bind(doc.rooftop_id)
        .bind(&doc.file_name)
        .bind(&doc.file_path)
        .bind(&doc.file_type)
        .bind(doc.file_size)
        .bind(doc.uploaded_at)
        .bind(doc.uploaded_by)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(())
    }

    async fn get_document(&self, id: Uuid) -> Result<RooftopDocument> {
        let row = sqlx::query_as::<_, PgDocumentRow>(
            r#"
            SELECT id, rooftop_id, file_name, file_path, file_type, file_size,
                   uploaded_at, uploaded_by
            FROM rooftop_documents
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        row.map(RooftopDocument::from)
            .ok_or_else(|| OnboardError::NotFound(format!("document {id}")))
    }

    async fn list_documents(&self, rooftop_id: Uuid) -> Result<Vec<RooftopDocument>> {
        let rows = sqlx::query_as::<_, PgDocumentRow>(
            r#"
            SELECT id, rooftop_id, file_name, file_path, file_type, file_size,
                   uploaded_at, uploaded_by
            FROM rooftop_documents
            WHERE rooftop_id = $1
            ORDER BY uploaded_at DESC
            "#,
        )
        .bind(rooftop_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(RooftopDocument::from).collect())
    }

    async fn delete_document(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM rooftop_documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(())
    }
}

// ── PgStatsStore ───────────────────────────────────────────────

pub struct PgStatsStore {
    pool: PgPool,
}

impl PgStatsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatsStore for PgStatsStore {
    async fn onboarding_stats(&self) -> Result<OnboardingStats> {
        let (dealer_groups, rooftops, completed_questionnaires, signed_off_rulebooks) =
            sqlx::query_as::<_, (i64, i64, i64, i64)>(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM dealer_groups),
                    (SELECT COUNT(*) FROM rooftops),
                    (SELECT COUNT(*) FROM rooftops
                     WHERE questionnaire_status = 'completed'),
                    (SELECT COUNT(*) FROM rulebooks
                     WHERE status IN ('signed_off', 'pushed'))
                "#,
            )
            .fetch_one(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(OnboardingStats {
            dealer_groups,
            rooftops,
            completed_questionnaires,
            signed_off_rulebooks,
        })
    }
}

// ── PgStores bundle ────────────────────────────────────────────

/// Every Postgres adapter over one shared pool. Convenience for wiring
/// the services at startup and in tests.
pub struct PgStores {
    pub dealer_groups: PgDealerGroupStore,
    pub rooftops: PgRooftopStore,
    pub answers: PgAnswerStore,
    pub fact_sheets: PgFactSheetStore,
    pub rulebooks: PgRulebookStore,
    pub agent_links: PgAgentLinkStore,
    pub documents: PgDocumentStore,
    pub stats: PgStatsStore,
}

impl PgStores {
    pub fn new(pool: PgPool) -> Self {
        Self {
            dealer_groups: PgDealerGroupStore::new(pool.clone()),
            rooftops: PgRooftopStore::new(pool.clone()),
            answers: PgAnswerStore::new(pool.clone()),
            fact_sheets: PgFactSheetStore::new(pool.clone()),
            rulebooks: PgRulebookStore::new(pool.clone()),
            agent_links: PgAgentLinkStore::new(pool.clone()),
            documents: PgDocumentStore::new(pool.clone()),
            stats: PgStatsStore::new(pool),
        }
    }
}
