//! Database CLI subcommands for mensad.
//!
//! Provides `db migrate`, `db status`, and `db seed` commands.

use anyhow::{anyhow, Result};
use std::env;
use tracing::info;

use mensa_db::{demo_menu, migrate, seed_menu, status};

/// Run database CLI subcommands.
///
/// Supported commands:
/// - `mensad db migrate` - Run pending migrations
/// - `mensad db status` - Check migration status
/// - `mensad db seed` - Insert the demo menu (existing ids are left alone)
pub async fn run_db_command(args: Vec<String>) -> Result<()> {
    if args.len() < 3 {
        return Err(anyhow!("Usage: mensad db <migrate|status|seed>"));
    }

    let database_url = env::var("DATABASE_URL")
        .map_err(|_| anyhow!("DATABASE_URL environment variable is required for db commands"))?;

    let pool = sqlx::PgPool::connect(&database_url).await?;

    match args[2].as_str() {
        "migrate" => {
            migrate(&pool).await?;
        },
        "status" => {
            status(&pool).await?;
        },
        "seed" => {
            let inserted = seed_menu(&pool, &demo_menu()).await?;
            info!(inserted, "Seeded demo menu");
        },
        _ => {
            return Err(anyhow!("Unknown db command: {}. Use migrate, status, or seed", args[2]));
        },
    }

    Ok(())
}
