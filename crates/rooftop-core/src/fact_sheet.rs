//! Website-derived fact sheet — address and hours captured per rooftop.
//! At most one per rooftop; saving again replaces the previous capture.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Operational facts captured from a rooftop's website.
/// All three fields feed required placeholders in the rulebook template,
/// but each may be absent here — absence surfaces at render time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactSheet {
    pub rooftop_id: Uuid,
    pub service_address: Option<String>,
    pub weekday_hours: Option<String>,
    pub saturday_hours: Option<String>,
    pub extracted_at: DateTime<Utc>,
    pub extracted_by: Option<Uuid>,
}

/// Input fields for saving a fact sheet. Blank strings normalize to `None`
/// so "cleared in the form" and "never captured" are the same state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactSheetInput {
    pub service_address: Option<String>,
    pub weekday_hours: Option<String>,
    pub saturday_hours: Option<String>,
}

/// Trim a field value, mapping blank to `None`.
pub fn normalize_field(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl FactSheetInput {
    /// Normalized copy of this input.
    pub fn normalized(&self) -> Self {
        Self {
            service_address: normalize_field(self.service_address.as_deref()),
            weekday_hours: normalize_field(self.weekday_hours.as_deref()),
            saturday_hours: normalize_field(self.saturday_hours.as_deref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_blank_to_none() {
        assert_eq!(normalize_field(None), None);
        assert_eq!(normalize_field(Some("")), None);
        assert_eq!(normalize_field(Some("   ")), None);
        assert_eq!(
            normalize_field(Some("  123 Main St  ")),
            Some("123 Main St".to_string())
        );
    }

    #[test]
    fn input_normalized_field_by_field() {
        let input = FactSheetInput {
            service_address: Some("123 Main St".into()),
            weekday_hours: Some("  ".into()),
            saturday_hours: None,
        };
        let norm = input.normalized();
        assert_eq!(norm.service_address.as_deref(), Some("123 Main St"));
        assert_eq!(norm.weekday_hours, None);
        assert_eq!(norm.saturday_hours, None);
    }
}
