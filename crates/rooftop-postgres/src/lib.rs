//! PostgreSQL adapter for the rooftop onboarding core.
//!
//! Implements every record-store port from `rooftop_core::ports` as a
//! newtype over `PgPool`. All SQL is runtime-checked (`sqlx::query`, not
//! `sqlx::query!`) so the crate builds without a live database.

pub mod config;
pub mod rows;
pub mod store;

pub use config::DatabaseConfig;
pub use store::{
    apply_schema, PgAgentLinkStore, PgAnswerStore, PgDealerGroupStore, PgDocumentStore,
    PgFactSheetStore, PgRooftopStore, PgRulebookStore, PgStatsStore, PgStores,
};
