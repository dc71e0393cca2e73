use crate::auth::AuthInfo;
use crate::entitlement::{Action, Decision};
use crate::error::AppError;
use crate::handlers::AppState;
use crate::pricing::engine;
use crate::pricing::models::{PricingBreakdown, PricingInput};
use axum::{extract::State, Extension, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct UsageStats {
    pub unlimited: bool,
    pub calculations_used: i64,
    /// Free calculations left; absent for subscribed accounts
    pub calculations_remaining: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CalculationResponse {
    pub breakdown: PricingBreakdown,
    pub usage: UsageStats,
}

/// POST /api/calculations
///
/// The calculate action. Order is load-bearing: authorize, then compute,
/// then consume the free-tier credit, then respond. A denied or failed
/// request never touches the counter.
pub async fn calculate(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthInfo>,
    Json(input): Json<PricingInput>,
) -> Result<Json<CalculationResponse>, AppError> {
    let account = state
        .users
        .get_account(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if let Decision::Denied(_) = state.policy().authorize(&account, Action::Calculate) {
        return Err(AppError::LimitReached(
            "Free calculation limit reached. Please upgrade to continue.".to_string(),
        ));
    }

    let normalized = input.normalized();
    let breakdown = engine::compute(&normalized);

    let usage = if account.subscription_state.is_subscribed() {
        UsageStats {
            unlimited: true,
            calculations_used: account.calculations_used,
            calculations_remaining: None,
        }
    } else {
        state
            .users
            .increment_calculations_used(&account.id)
            .await?;
        let used = account.calculations_used + 1;
        let remaining = state
            .policy()
            .remaining(&account)
            .map(|before| (before - 1).max(0));
        UsageStats {
            unlimited: false,
            calculations_used: used,
            calculations_remaining: remaining,
        }
    };

    Ok(Json(CalculationResponse {
        breakdown: breakdown.rounded(),
        usage,
    }))
}
