//! HTTP surface of the service. Handlers only orchestrate: the boundary
//! layer authenticates, the entitlement policy authorizes, the engine
//! computes, the assembler merges, and the stores persist.

pub mod accounts;
pub mod analytics;
pub mod calculations;
pub mod catalog;
pub mod health;
pub mod projects;
pub mod subscription;

use crate::billing::StripeClient;
use crate::config::Config;
use crate::entitlement::EntitlementPolicy;
use crate::storage::{CatalogStore, ProjectStore, UserStore};
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Shared state for all API handlers
#[derive(Clone)]
pub struct AppState {
    /// Configuration (via ArcSwap for hot reload)
    pub config: Arc<ArcSwap<Config>>,
    pub users: Arc<UserStore>,
    pub projects: Arc<ProjectStore>,
    pub catalog: Arc<CatalogStore>,
    /// Absent when no Stripe secret is configured; subscription endpoints
    /// then report a configuration error instead of panicking.
    pub stripe: Option<Arc<StripeClient>>,
}

impl AppState {
    /// Entitlement policy built from the live configuration, so a SIGHUP
    /// reload of the free-tier limit takes effect without a restart
    pub fn policy(&self) -> EntitlementPolicy {
        EntitlementPolicy::new(self.config.load().entitlement.free_calculation_limit)
    }
}
