use crate::storage::users::SubscriptionState;
use serde::{Deserialize, Serialize};

/// Product name shown on Stripe line items and receipts
pub const PRODUCT_NAME: &str = "CraftPrice Pro";

/// Purchasable plans and their fixed prices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// $1.99 per month
    Monthly,
    /// $9.00 per year
    Yearly,
    /// $29.99 one-time purchase
    Lifetime,
}

impl Plan {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            "lifetime" => Some(Self::Lifetime),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Lifetime => "lifetime",
        }
    }

    /// Price in the smallest currency unit (USD cents)
    pub fn unit_amount_cents(&self) -> i64 {
        match self {
            Self::Monthly => 199,
            Self::Yearly => 900,
            Self::Lifetime => 2999,
        }
    }

    /// Billing interval for recurring plans; `None` for one-time purchase
    pub fn recurring_interval(&self) -> Option<&'static str> {
        match self {
            Self::Monthly => Some("month"),
            Self::Yearly => Some("year"),
            Self::Lifetime => None,
        }
    }

    /// Entitlement state granted once payment is confirmed
    pub fn subscription_state(&self) -> SubscriptionState {
        match self {
            Self::Monthly => SubscriptionState::Monthly,
            Self::Yearly => SubscriptionState::Yearly,
            Self::Lifetime => SubscriptionState::Lifetime,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for plan in [Plan::Monthly, Plan::Yearly, Plan::Lifetime] {
            assert_eq!(Plan::parse(plan.as_str()), Some(plan));
        }
        assert_eq!(Plan::parse("weekly"), None);
    }

    #[test]
    fn test_prices() {
        assert_eq!(Plan::Monthly.unit_amount_cents(), 199);
        assert_eq!(Plan::Yearly.unit_amount_cents(), 900);
        assert_eq!(Plan::Lifetime.unit_amount_cents(), 2999);
    }

    #[test]
    fn test_only_lifetime_is_one_time() {
        assert_eq!(Plan::Monthly.recurring_interval(), Some("month"));
        assert_eq!(Plan::Yearly.recurring_interval(), Some("year"));
        assert_eq!(Plan::Lifetime.recurring_interval(), None);
    }

    #[test]
    fn test_granted_state() {
        assert_eq!(
            Plan::Lifetime.subscription_state(),
            SubscriptionState::Lifetime
        );
        assert!(Plan::Monthly.subscription_state().is_subscribed());
    }
}
