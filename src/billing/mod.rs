//! Payment-provider integration. The core entitlement policy never talks
//! to Stripe directly; these types create customers, subscriptions, and
//! payment intents, and the subscription handlers record the outcome.

pub mod plans;
pub mod stripe;

pub use plans::Plan;
pub use stripe::StripeClient;
