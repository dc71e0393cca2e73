use crate::auth::AuthInfo;
use crate::billing::{Plan, StripeClient};
use crate::error::AppError;
use crate::handlers::AppState;
use crate::storage::users::UserAccount;
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct PlanQuery {
    pub plan: String,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionStats {
    pub calculations_used: i64,
    /// Free calculations left; absent for subscribed accounts
    pub calculations_remaining: Option<i64>,
    pub is_subscribed: bool,
    pub subscription_type: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionCheckout {
    pub subscription_id: String,
    /// Drives payment confirmation on the client
    pub client_secret: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentIntentResponse {
    pub client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    pub plan: String,
}

/// GET /api/subscription/stats
pub async fn subscription_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthInfo>,
) -> Result<Json<SubscriptionStats>, AppError> {
    let account = load_account(&state, &auth).await?;

    Ok(Json(SubscriptionStats {
        calculations_used: account.calculations_used,
        calculations_remaining: state.policy().remaining(&account),
        is_subscribed: account.subscription_state.is_subscribed(),
        subscription_type: account
            .subscription_state
            .is_subscribed()
            .then(|| account.subscription_state.as_str()),
    }))
}

/// POST /api/subscription?plan=monthly|yearly
///
/// Creates (or resumes) an incomplete Stripe subscription for the caller.
/// Entitlement is NOT granted here; that happens on payment confirmation
/// via the activate endpoint.
pub async fn create_subscription(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthInfo>,
    Query(query): Query<PlanQuery>,
) -> Result<Json<SubscriptionCheckout>, AppError> {
    let plan = Plan::parse(&query.plan)
        .filter(|p| p.recurring_interval().is_some())
        .ok_or_else(|| AppError::InvalidRequest("Invalid plan".to_string()))?;

    let stripe = stripe_client(&state)?;
    let account = load_account(&state, &auth).await?;

    // Resume an existing subscription if it is already active
    if let Some(subscription_id) = &account.stripe_subscription_id {
        let subscription = stripe.get_subscription(subscription_id).await?;
        if subscription.is_active() {
            let client_secret = subscription.client_secret().map(str::to_string);
            return Ok(Json(SubscriptionCheckout {
                subscription_id: subscription.id,
                client_secret,
            }));
        }
    }

    let customer_id = ensure_customer(&state, stripe, &account).await?;
    let subscription = stripe.create_subscription(&customer_id, plan).await?;

    state
        .users
        .set_stripe_subscription_id(&account.id, &subscription.id)
        .await?;

    tracing::info!(
        user_id = %account.id,
        plan = plan.as_str(),
        subscription_id = %subscription.id,
        "Created Stripe subscription"
    );

    let client_secret = subscription.client_secret().map(str::to_string);
    Ok(Json(SubscriptionCheckout {
        subscription_id: subscription.id,
        client_secret,
    }))
}

/// POST /api/payment-intent?plan=lifetime
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthInfo>,
    Query(query): Query<PlanQuery>,
) -> Result<Json<PaymentIntentResponse>, AppError> {
    let plan = Plan::parse(&query.plan).ok_or_else(|| {
        AppError::InvalidRequest("Invalid plan for one-time purchase".to_string())
    })?;
    if plan.recurring_interval().is_some() {
        return Err(AppError::InvalidRequest(
            "Invalid plan for one-time purchase".to_string(),
        ));
    }

    let stripe = stripe_client(&state)?;
    let account = load_account(&state, &auth).await?;
    let customer_id = ensure_customer(&state, stripe, &account).await?;

    let intent = stripe
        .create_payment_intent(&customer_id, plan, &account.id)
        .await?;

    Ok(Json(PaymentIntentResponse {
        client_secret: intent.client_secret,
    }))
}

/// POST /api/subscription/activate
///
/// Payment-confirmation callback from the billing boundary: records the
/// purchased plan on the account. The entitlement policy only ever reads
/// the state written here.
pub async fn activate_subscription(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthInfo>,
    Json(req): Json<ActivateRequest>,
) -> Result<Json<UserAccount>, AppError> {
    let plan = Plan::parse(&req.plan)
        .ok_or_else(|| AppError::InvalidRequest("Invalid plan".to_string()))?;

    state
        .users
        .set_subscription_state(&auth.user_id, plan.subscription_state())
        .await?;

    tracing::info!(user_id = %auth.user_id, plan = plan.as_str(), "Subscription activated");

    let account = load_account(&state, &auth).await?;
    Ok(Json(account))
}

async fn load_account(state: &AppState, auth: &AuthInfo) -> Result<UserAccount, AppError> {
    state
        .users
        .get_account(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

fn stripe_client(state: &AppState) -> Result<&Arc<StripeClient>, AppError> {
    state.stripe.as_ref().ok_or_else(|| {
        AppError::ConfigError("Stripe is not configured; set STRIPE_SECRET_KEY".to_string())
    })
}

/// Reuse the account's Stripe customer or create one on first purchase
async fn ensure_customer(
    state: &AppState,
    stripe: &StripeClient,
    account: &UserAccount,
) -> Result<String, AppError> {
    if let Some(customer_id) = &account.stripe_customer_id {
        return Ok(customer_id.clone());
    }

    let customer = stripe
        .create_customer(account.email.as_deref(), &account.id)
        .await?;
    state
        .users
        .set_stripe_customer_id(&account.id, &customer.id)
        .await?;

    Ok(customer.id)
}
