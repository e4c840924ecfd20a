//! Rulebook template rendering.
//!
//! The template is fixed and compiled in; rendering is pure string
//! substitution over `{{key}}` placeholders — no clock, no I/O, no
//! escaping. Identical inputs yield byte-identical output.
//!
//! Unresolved required fields are substituted with a visible sentinel AND
//! tracked in `RenderedRulebook::missing_required`, so callers gate on the
//! structured list instead of grepping the document.

use std::collections::HashMap;

use serde::Serialize;

use crate::fact_sheet::FactSheet;
use crate::questionnaire::QUESTIONS;

/// Sentinel substituted for an unresolved required field. Deliberately
/// loud: it must survive into the document a reviewer reads.
pub const MISSING_REQUIRED: &str = "**MISSING - REQUIRED**";

/// Substituted for an unresolved optional field.
pub const NOT_PROVIDED: &str = "Not provided";

/// Fact-sheet placeholder keys. All three are required fields.
pub const FACT_SHEET_FIELDS: [&str; 3] = ["service_address", "weekday_hours", "saturday_hours"];

/// The rulebook template. Placeholder keys are question ids plus the
/// fact-sheet fields; every key appears exactly once.
pub const RULEBOOK_TEMPLATE: &str = r#"# Service Department Rulebook

## Dealership Information
- **Dealership Name**: {{dealership_name}}
- **Primary Contact**: {{primary_contact}}
- **Phone Number**: {{phone_number}}
- **Email**: {{email_address}}

## Location & Hours
- **Service Address**: {{service_address}}
- **Weekday Hours**: {{weekday_hours}}
- **Saturday Hours**: {{saturday_hours}}

## Appointment Scheduling
- **Minimum Lead Time**: {{appointment_lead_time}}
- **Confirmation Method**: {{appointment_confirmation}}

## Services Offered
{{services_offered}}

### Express Service
{{express_service}}

### Tire Services
{{tire_services}}

## Customer Amenities
- **Transportation**: {{loaner_vehicles}}
- **Waiting Area**: {{wait_area_amenities}}

## Warranty & Recalls
- **Warranty Work**: {{warranty_work}}
- **Recall Handling**: {{recall_handling}}

## Parts & Ordering
{{parts_ordering}}

## Payment Options
{{payment_methods}}

## Customer Communication
- **Update Method**: {{customer_communication}}
- **After Hours Support**: {{after_hours_support}}

## Promotions
{{special_promotions}}

## Differentiators
{{competitor_differentiators}}

## Additional Notes
{{additional_notes}}
"#;

/// A rendered rulebook plus the required fields that had no value.
/// `missing_required` lists question ids in questionnaire order, then
/// fact-sheet fields in `FACT_SHEET_FIELDS` order.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedRulebook {
    pub content: String,
    pub missing_required: Vec<String>,
}

impl RenderedRulebook {
    /// Whether every required field resolved to a value.
    pub fn is_complete(&self) -> bool {
        self.missing_required.is_empty()
    }
}

/// Render the rulebook from questionnaire answers and the fact sheet.
///
/// Resolution per placeholder:
/// - non-blank answer → substituted verbatim;
/// - blank or absent, question required → [`MISSING_REQUIRED`];
/// - blank or absent, question optional → [`NOT_PROVIDED`];
/// - fact-sheet fields are always required.
///
/// Whitespace-only values count as blank.
pub fn render(answers: &HashMap<String, String>, facts: Option<&FactSheet>) -> RenderedRulebook {
    let mut content = RULEBOOK_TEMPLATE.to_string();
    let mut missing = Vec::new();

    for q in QUESTIONS {
        let raw = answers.get(q.id).map(String::as_str);
        let is_blank = raw.map(|v| v.trim().is_empty()).unwrap_or(true);
        let replacement = if !is_blank {
            raw.unwrap_or_default()
        } else if q.required {
            missing.push(q.id.to_string());
            MISSING_REQUIRED
        } else {
            NOT_PROVIDED
        };
        content = content.replace(&placeholder(q.id), replacement);
    }

    for key in FACT_SHEET_FIELDS {
        let raw = fact_field(facts, key);
        let is_blank = raw.map(|v| v.trim().is_empty()).unwrap_or(true);
        let replacement = if !is_blank {
            raw.unwrap_or_default()
        } else {
            missing.push(key.to_string());
            MISSING_REQUIRED
        };
        content = content.replace(&placeholder(key), replacement);
    }

    RenderedRulebook {
        content,
        missing_required: missing,
    }
}

/// Whether `content` still carries the missing-required sentinel.
///
/// This is the only signal available for hand-edited content, so the
/// sign-off gate uses it; a document that legitimately quotes the
/// sentinel text will be held back too.
pub fn contains_missing_sentinel(content: &str) -> bool {
    content.contains(MISSING_REQUIRED)
}

fn placeholder(key: &str) -> String {
    format!("{{{{{key}}}}}")
}

fn fact_field<'a>(facts: Option<&'a FactSheet>, key: &str) -> Option<&'a str> {
    let f = facts?;
    match key {
        "service_address" => f.service_address.as_deref(),
        "weekday_hours" => f.weekday_hours.as_deref(),
        "saturday_hours" => f.saturday_hours.as_deref(),
        _ => None,
    }
}
