pub mod auth;
pub mod billing;
pub mod config;
pub mod entitlement;
pub mod error;
pub mod handlers;
pub mod pricing;
pub mod server;
pub mod signals;
pub mod storage;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Embedded SQL migrations, run at startup and by the test suites
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Initialize tracing/logging
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}
