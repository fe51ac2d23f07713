//! Mensa Daemon
//!
//! Order intake service: validation, pricing, idempotent persistence.
//!
//! # Usage
//!
//! ```bash
//! # Start with the in-memory store and stub rates
//! cargo run -p mensad
//!
//! # Start against PostgreSQL
//! DATABASE_URL=postgres://localhost/mensa cargo run -p mensad --features postgres
//!
//! # Database maintenance
//! cargo run -p mensad -- db migrate
//! cargo run -p mensad -- db seed
//! ```
//!
//! # Environment Variables
//!
//! - `MENSA_ENV`: Environment (test, development, production)
//! - `MENSA_API_HOST`: API host (default: 0.0.0.0)
//! - `MENSA_API_PORT`: API port (default: 8080)
//! - `MENSA_BASE_CURRENCY` / `MENSA_REPORT_CURRENCY`: (default: EUR / USD)
//! - `MENSA_RATES_URL`: Exchange rate service (default: stub rates)
//! - `MENSA_RATES_TTL_SECS`: Rate cache lifetime (default: 300)
//! - `MENSA_PERSIST_ATTEMPTS`: Order transaction attempts (default: 2)
//! - `DATABASE_URL`: PostgreSQL URL (postgres feature)

use mensad::{db, Config, Daemon};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("mensad=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(String::as_str) == Some("db") {
        let _ = dotenvy::dotenv();
        return db::run_db_command(args).await;
    }

    // Load configuration
    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        api_host = %config.api.host,
        api_port = config.api.port,
        "Mensa Daemon"
    );

    run(config).await
}

#[cfg(feature = "postgres")]
async fn run(config: Config) -> anyhow::Result<()> {
    if config.persistence.database_url.is_some() {
        Daemon::connect(config).await?.run().await?;
    } else {
        info!("DATABASE_URL not set, using in-memory store");
        Daemon::new_stub(config).run().await?;
    }
    Ok(())
}

#[cfg(not(feature = "postgres"))]
async fn run(config: Config) -> anyhow::Result<()> {
    Daemon::new_stub(config).run().await?;
    Ok(())
}
