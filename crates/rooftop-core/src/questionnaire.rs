//! The global onboarding questionnaire — a fixed set of 20 questions
//! shared by every rooftop. The set is compiled in; answers are the only
//! per-rooftop data.
//!
//! Question ids double as template placeholder keys, so renaming an id is
//! a breaking change to both stored answers and the rulebook template.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Question registry ──────────────────────────────────────────

/// Input widget for a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Text,
    TextArea,
    Select,
}

/// One question in the global questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionSpec {
    pub id: &'static str,
    pub prompt: &'static str,
    pub required: bool,
    pub kind: QuestionKind,
    /// Allowed values for `Select` questions; empty otherwise.
    pub choices: &'static [&'static str],
}

/// The 20 rooftop onboarding questions, in canonical display and
/// generation order.
pub const QUESTIONS: &[QuestionSpec] = &[
    QuestionSpec {
        id: "dealership_name",
        prompt: "What is the official name of your dealership?",
        required: true,
        kind: QuestionKind::Text,
        choices: &[],
    },
    QuestionSpec {
        id: "primary_contact",
        prompt: "Who is the primary contact for service department inquiries?",
        required: true,
        kind: QuestionKind::Text,
        choices: &[],
    },
    QuestionSpec {
        id: "phone_number",
        prompt: "What is the main service department phone number?",
        required: true,
        kind: QuestionKind::Text,
        choices: &[],
    },
    QuestionSpec {
        id: "email_address",
        prompt: "What email should be used for service appointment confirmations?",
        required: true,
        kind: QuestionKind::Text,
        choices: &[],
    },
    QuestionSpec {
        id: "appointment_lead_time",
        prompt: "What is the minimum lead time for scheduling appointments?",
        required: true,
        kind: QuestionKind::Select,
        choices: &["Same day", "Next day", "2 days", "3+ days"],
    },
    QuestionSpec {
        id: "services_offered",
        prompt: "What services does your service department offer?",
        required: true,
        kind: QuestionKind::TextArea,
        choices: &[],
    },
    QuestionSpec {
        id: "express_service",
        prompt: "Do you offer express/quick service options?",
        required: true,
        kind: QuestionKind::Select,
        choices: &["Yes", "No"],
    },
    QuestionSpec {
        id: "loaner_vehicles",
        prompt: "Do you provide loaner vehicles or shuttle service?",
        required: true,
        kind: QuestionKind::Select,
        choices: &["Loaner vehicles", "Shuttle service", "Both", "Neither"],
    },
    QuestionSpec {
        id: "wait_area_amenities",
        prompt: "What amenities are available in your waiting area?",
        required: false,
        kind: QuestionKind::TextArea,
        choices: &[],
    },
    QuestionSpec {
        id: "payment_methods",
        prompt: "What payment methods do you accept?",
        required: true,
        kind: QuestionKind::TextArea,
        choices: &[],
    },
    QuestionSpec {
        id: "warranty_work",
        prompt: "Do you handle warranty work for all brands you service?",
        required: true,
        kind: QuestionKind::Select,
        choices: &["Yes, all brands", "Only specific brands", "No warranty work"],
    },
    QuestionSpec {
        id: "recall_handling",
        prompt: "How do you handle recall notifications and scheduling?",
        required: true,
        kind: QuestionKind::TextArea,
        choices: &[],
    },
    QuestionSpec {
        id: "appointment_confirmation",
        prompt: "How do you confirm appointments with customers?",
        required: true,
        kind: QuestionKind::Select,
        choices: &["Phone call", "Text message", "Email", "Multiple methods"],
    },
    QuestionSpec {
        id: "after_hours_support",
        prompt: "Is there after-hours support or emergency service available?",
        required: false,
        kind: QuestionKind::TextArea,
        choices: &[],
    },
    QuestionSpec {
        id: "special_promotions",
        prompt: "Are there any current service promotions or coupons?",
        required: false,
        kind: QuestionKind::TextArea,
        choices: &[],
    },
    QuestionSpec {
        id: "tire_services",
        prompt: "What tire services do you offer?",
        required: true,
        kind: QuestionKind::TextArea,
        choices: &[],
    },
    QuestionSpec {
        id: "parts_ordering",
        prompt: "How do you handle parts that need to be ordered?",
        required: true,
        kind: QuestionKind::TextArea,
        choices: &[],
    },
    QuestionSpec {
        id: "customer_communication",
        prompt: "How do you keep customers updated during service?",
        required: true,
        kind: QuestionKind::Select,
        choices: &["Phone calls", "Text updates", "App notifications", "Customer portal"],
    },
    QuestionSpec {
        id: "competitor_differentiators",
        prompt: "What makes your service department stand out from competitors?",
        required: false,
        kind: QuestionKind::TextArea,
        choices: &[],
    },
    QuestionSpec {
        id: "additional_notes",
        prompt: "Any additional information the AI agent should know?",
        required: false,
        kind: QuestionKind::TextArea,
        choices: &[],
    },
];

/// Look up a question by its id.
pub fn question_by_id(id: &str) -> Option<&'static QuestionSpec> {
    QUESTIONS.iter().find(|q| q.id == id)
}

/// Whether `id` names a question in the registry.
pub fn is_known_question(id: &str) -> bool {
    question_by_id(id).is_some()
}

/// Required question ids that have no non-blank answer in `answers`,
/// in questionnaire order. Whitespace-only answers count as missing.
pub fn missing_required(answers: &HashMap<String, String>) -> Vec<&'static str> {
    QUESTIONS
        .iter()
        .filter(|q| q.required)
        .filter(|q| {
            answers
                .get(q.id)
                .map(|v| v.trim().is_empty())
                .unwrap_or(true)
        })
        .map(|q| q.id)
        .collect()
}

// ── Answers ────────────────────────────────────────────────────

/// A stored answer to one questionnaire question.
/// Unique per (rooftop, question); upserted, never versioned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub id: Uuid,
    pub rooftop_id: Uuid,
    pub question_id: String,
    pub value: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for upserting one answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAnswer {
    pub question_id: String,
    pub value: Option<String>,
}

impl NewAnswer {
    pub fn new(question_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            value: Some(value.into()),
        }
    }
}

/// Build the question-id → answer lookup used by the renderer and the
/// completion check. Answers with no value are omitted.
pub fn answer_map(answers: &[Answer]) -> HashMap<String, String> {
    answers
        .iter()
        .filter_map(|a| a.value.clone().map(|v| (a.question_id.clone(), v)))
        .collect()
}
