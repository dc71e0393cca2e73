use anyhow::Result;
use arc_swap::ArcSwap;
use axum::{middleware, routing::{get, post}, Router};
use sqlx::SqlitePool;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    auth::{self, AuthMiddlewareState},
    billing::StripeClient,
    config::Config,
    handlers::{self, AppState},
    signals::setup_signal_handlers,
    storage::{CatalogStore, ProjectStore, UserStore},
};

/// Start the CraftPrice server
///
/// This function:
/// 1. Opens the SQLite pool and runs migrations
/// 2. Wires up the stores, entitlement policy, and Stripe client
/// 3. Sets up signal handlers for graceful shutdown and config reload
/// 4. Serves requests until a shutdown signal arrives
pub async fn start_server(config: Config, config_path: PathBuf) -> Result<()> {
    info!("CraftPrice starting...");

    let pool = connect_database(&config.database.path).await?;

    info!("Running database migrations...");
    crate::MIGRATOR
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

    let users = Arc::new(UserStore::new(pool.clone()));
    let projects = Arc::new(ProjectStore::new(pool.clone()));
    let catalog = Arc::new(CatalogStore::new(pool.clone()));
    catalog
        .seed_default_categories()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to seed categories: {}", e))?;

    let stripe = match &config.stripe.secret_key {
        Some(key) => {
            info!("Stripe client configured");
            Some(Arc::new(StripeClient::new(
                key.clone(),
                config.stripe.api_base.clone(),
            )))
        }
        None => {
            tracing::warn!(
                "No Stripe secret configured; subscription endpoints will return errors"
            );
            None
        }
    };

    // Wrap config in ArcSwap for atomic reload support
    let config_swap = Arc::new(ArcSwap::from_pointee(config.clone()));

    // Setup signal handlers (SIGTERM, SIGINT for shutdown; SIGHUP for reload)
    let (shutdown_tx, signal_handle) = setup_signal_handlers(config_swap.clone(), config_path);
    let mut shutdown_rx = shutdown_tx.subscribe();

    let app_state = AppState {
        config: config_swap.clone(),
        users: users.clone(),
        projects,
        catalog,
        stripe,
    };
    let auth_state = Arc::new(AuthMiddlewareState {
        users,
        db_pool: pool.clone(),
    });

    let app = create_router(app_state, auth_state);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    info!("Starting CraftPrice on {}", addr);
    info!(
        "Free tier allows {} calculations per account",
        config.entitlement.free_calculation_limit
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("Shutdown signal received, draining connections...");
        })
        .await?;

    signal_handle.await?;
    info!("Server stopped gracefully");

    Ok(())
}

/// Open the SQLite pool, creating the database file and parent directory
/// on first run
async fn connect_database(path: &str) -> Result<SqlitePool> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = sqlx::sqlite::SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

    SqlitePool::connect_with(options)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))
}

/// Create the Axum router with all routes and middleware
pub fn create_router(app_state: AppState, auth_state: Arc<AuthMiddlewareState>) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/api/auth/register", post(handlers::accounts::register))
        .with_state(app_state.clone());

    let auth_routes = Router::new()
        .route("/api/auth/user", get(handlers::accounts::current_user))
        .route("/api/calculations", post(handlers::calculations::calculate))
        .route(
            "/api/projects",
            get(handlers::projects::list_projects).post(handlers::projects::create_project),
        )
        .route(
            "/api/projects/:id",
            get(handlers::projects::get_project)
                .put(handlers::projects::update_project)
                .delete(handlers::projects::delete_project),
        )
        .route(
            "/api/projects/:id/input",
            get(handlers::projects::get_project_input),
        )
        .route(
            "/api/categories",
            get(handlers::catalog::list_categories).post(handlers::catalog::create_category),
        )
        .route(
            "/api/templates",
            get(handlers::catalog::list_templates).post(handlers::catalog::create_template),
        )
        .route("/api/templates/:id", get(handlers::catalog::get_template))
        .route(
            "/api/subscription/stats",
            get(handlers::subscription::subscription_stats),
        )
        .route(
            "/api/subscription",
            post(handlers::subscription::create_subscription),
        )
        .route(
            "/api/subscription/activate",
            post(handlers::subscription::activate_subscription),
        )
        .route(
            "/api/payment-intent",
            post(handlers::subscription::create_payment_intent),
        )
        .route("/api/analytics/stats", get(handlers::analytics::user_stats))
        .layer(middleware::from_fn_with_state(
            auth_state,
            auth::auth_middleware,
        ))
        .with_state(app_state);

    Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
