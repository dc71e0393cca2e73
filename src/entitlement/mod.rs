//! Freemium usage metering: decides, per account, whether a calculation
//! or project save is permitted.

pub mod policy;

pub use policy::{Action, Decision, DenyReason, EntitlementPolicy, FREE_CALCULATION_LIMIT};
