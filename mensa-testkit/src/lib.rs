//! Test helpers for Mensa database-backed tests.
//!
//! Provides schema setup, demo menu seeding, request fixtures, and row counts
//! for asserting that failed submissions leave nothing behind.

mod helpers;

pub use helpers::{
    count_rows, sample_request, seed_demo_menu, submission_json, RowCounts,
};

use anyhow::Result;
use sqlx::PgPool;

/// Setup a clean test database by running migrations.
///
/// Convenience function for tests that need a fresh schema.
/// Migrations are located at `migrations/` relative to the workspace root.
pub async fn setup_test_db(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../migrations").run(pool).await?;
    Ok(())
}
