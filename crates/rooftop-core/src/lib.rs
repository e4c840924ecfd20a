//! Rooftop onboarding core — pure domain types, port traits, and the
//! rulebook lifecycle engine. Zero sqlx.
//!
//! - `questionnaire` / `fact_sheet`: the two input surfaces for a rooftop.
//! - `template`: deterministic rulebook rendering with missing-field tracking.
//! - `engine`: the four lifecycle verbs (generate, save, sign_off, push).
//! - `gateway`: hands a signed-off rulebook to the agent provisioner.
//! - `ports`: storage traits implemented by rooftop-postgres and `memory`.

pub mod attachments;
pub mod engine;
pub mod error;
pub mod fact_sheet;
pub mod gateway;
pub mod memory;
pub mod onboarding;
pub mod ports;
pub mod questionnaire;
pub mod rulebook;
pub mod template;
pub mod types;

pub use error::OnboardError;
pub use ports::Result;
