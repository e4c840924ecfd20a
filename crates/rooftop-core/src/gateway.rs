//! Publication gateway — hands signed-off rulebook content to the agent
//! provisioner and records the resulting link.
//!
//! The gateway never touches rulebook status. Ordering is the caller's
//! contract: the link row is written before the status write, so a crash
//! between the two leaves a SignedOff rulebook with a fresh link — safe
//! to push again — rather than a Pushed rulebook with no agent.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::ports::{AgentLinkStore, AgentProvisioner, Result};
use crate::rulebook::{AgentLink, PushStatus};

pub struct PublicationGateway<'a> {
    links: &'a dyn AgentLinkStore,
    provisioner: &'a dyn AgentProvisioner,
}

impl<'a> PublicationGateway<'a> {
    pub fn new(links: &'a dyn AgentLinkStore, provisioner: &'a dyn AgentProvisioner) -> Self {
        Self { links, provisioner }
    }

    /// Provision an agent for the rooftop and upsert its link row.
    ///
    /// A provisioner failure propagates with no link written; a repeat
    /// call for the same rooftop replaces the prior link. Returns the
    /// provisioned agent id.
    pub async fn publish(&self, rooftop_id: Uuid, content: &str, user_id: Uuid) -> Result<String> {
        let agent_id = self.provisioner.provision(rooftop_id, content).await?;

        let link = AgentLink {
            rooftop_id,
            agent_id: agent_id.clone(),
            push_status: PushStatus::Success,
            push_error: None,
            pushed_at: Utc::now(),
            pushed_by: Some(user_id),
        };
        self.links.upsert_agent_link(&link).await?;

        info!(%rooftop_id, %agent_id, "provisioned agent and recorded link");
        Ok(agent_id)
    }
}

// ── Timestamp provisioner ──────────────────────────────────────

/// In-process provisioner deriving agent ids as `<namespace>_<millis>`.
///
/// Process-unique at expected call rates, not cryptographic: a
/// same-millisecond collision bumps the value forward. Swap in a real
/// HTTP-backed `AgentProvisioner` to talk to a live provisioning API.
pub struct TimestampProvisioner {
    namespace: String,
    last_millis: Mutex<i64>,
}

impl TimestampProvisioner {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            last_millis: Mutex::new(0),
        }
    }
}

impl Default for TimestampProvisioner {
    fn default() -> Self {
        Self::new("retell")
    }
}

#[async_trait]
impl AgentProvisioner for TimestampProvisioner {
    async fn provision(&self, _rooftop_id: Uuid, _content: &str) -> Result<String> {
        let mut last = self.last_millis.lock().await;
        let mut millis = Utc::now().timestamp_millis();
        if millis <= *last {
            millis = *last + 1;
        }
        *last = millis;
        Ok(format!("{}_{}", self.namespace, millis))
    }
}
