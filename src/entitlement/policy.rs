use crate::storage::users::UserAccount;

/// Number of calculations a non-subscribed account may perform
pub const FREE_CALCULATION_LIMIT: u32 = 7;

/// The gated actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Run the pricing engine; consumes one free-tier credit on success
    Calculate,
    /// Persist a project; never consumes a credit
    Save,
}

/// Why an action was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    LimitReached,
}

/// Outcome of an authorization check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// The freemium decision function over an account's subscription state and
/// usage counter.
///
/// Authorization is a pure read: the counter increment is a separate,
/// atomic storage operation performed by the caller only after the
/// authorized action actually succeeded. The required ordering for a
/// calculate action is authorize, compute, increment, persist.
#[derive(Debug, Clone, Copy)]
pub struct EntitlementPolicy {
    free_limit: u32,
}

impl Default for EntitlementPolicy {
    fn default() -> Self {
        Self::new(FREE_CALCULATION_LIMIT)
    }
}

impl EntitlementPolicy {
    pub fn new(free_limit: u32) -> Self {
        Self { free_limit }
    }

    /// Decide whether `account` may perform `action`.
    ///
    /// Any active subscription is unlimited regardless of the counter.
    /// Both actions share the same free-tier gate; only `Calculate`
    /// consumes a credit afterwards.
    pub fn authorize(&self, account: &UserAccount, _action: Action) -> Decision {
        if account.subscription_state.is_subscribed() {
            return Decision::Allowed;
        }

        if account.calculations_used < i64::from(self.free_limit) {
            Decision::Allowed
        } else {
            Decision::Denied(DenyReason::LimitReached)
        }
    }

    /// Free calculations left, or `None` for unlimited accounts
    pub fn remaining(&self, account: &UserAccount) -> Option<i64> {
        if account.subscription_state.is_subscribed() {
            None
        } else {
            Some((i64::from(self.free_limit) - account.calculations_used).max(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::users::SubscriptionState;

    fn account(state: SubscriptionState, used: i64) -> UserAccount {
        UserAccount {
            id: "user-1".to_string(),
            email: Some("maker@example.com".to_string()),
            subscription_state: state,
            calculations_used: used,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_free_tier_allowed_below_limit() {
        let policy = EntitlementPolicy::default();
        let acct = account(SubscriptionState::None, 6);
        assert_eq!(policy.authorize(&acct, Action::Calculate), Decision::Allowed);
        assert_eq!(policy.remaining(&acct), Some(1));
    }

    #[test]
    fn test_free_tier_denied_at_limit() {
        let policy = EntitlementPolicy::default();
        let acct = account(SubscriptionState::None, 7);
        assert_eq!(
            policy.authorize(&acct, Action::Calculate),
            Decision::Denied(DenyReason::LimitReached)
        );
        assert_eq!(policy.remaining(&acct), Some(0));
    }

    #[test]
    fn test_free_tier_denied_beyond_limit() {
        let policy = EntitlementPolicy::default();
        let acct = account(SubscriptionState::None, 120);
        assert_eq!(
            policy.authorize(&acct, Action::Save),
            Decision::Denied(DenyReason::LimitReached)
        );
        assert_eq!(policy.remaining(&acct), Some(0));
    }

    #[test]
    fn test_subscribed_always_allowed() {
        let policy = EntitlementPolicy::default();
        for state in [
            SubscriptionState::Monthly,
            SubscriptionState::Yearly,
            SubscriptionState::Lifetime,
        ] {
            let acct = account(state, 9999);
            assert_eq!(policy.authorize(&acct, Action::Calculate), Decision::Allowed);
            assert_eq!(policy.authorize(&acct, Action::Save), Decision::Allowed);
            assert_eq!(policy.remaining(&acct), None);
        }
    }

    #[test]
    fn test_custom_limit() {
        let policy = EntitlementPolicy::new(2);
        let acct = account(SubscriptionState::None, 2);
        assert!(!policy.authorize(&acct, Action::Calculate).is_allowed());
    }
}
