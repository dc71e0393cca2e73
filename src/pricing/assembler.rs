//! Maps between pricing calculations and stored project records.
//!
//! `to_project` merges an input, its computed breakdown, and descriptive
//! metadata into a persistable record; `to_input` is the lossless inverse
//! used when a stored project is reopened for editing. Correctness here is
//! exhaustive field coverage, not cleverness.

use crate::pricing::models::{ExpenseLine, MaterialLine, PricingBreakdown, PricingInput};
use crate::storage::projects::{NewProject, Project, ProjectStatus};
use thiserror::Error;

/// Descriptive metadata attached to a saved calculation
#[derive(Debug, Clone)]
pub struct ProjectMeta {
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub template_id: Option<i64>,
    pub status: ProjectStatus,
}

/// A stored record whose pricing columns cannot be reconstructed.
/// Surfaced to callers as a data-integrity error, never defaulted away.
#[derive(Debug, Error)]
pub enum AssemblerError {
    #[error("project record has malformed {field} data: {source}")]
    MalformedField {
        field: &'static str,
        source: serde_json::Error,
    },
}

/// Merge a calculation and its metadata into a persistable project record.
///
/// Every input and breakdown field is carried over; the breakdown is stored
/// at currency precision since persistence is a presentation boundary.
/// Timestamps are set by the storage layer at persistence time.
pub fn to_project(
    input: &PricingInput,
    breakdown: &PricingBreakdown,
    meta: ProjectMeta,
) -> NewProject {
    let rounded = breakdown.rounded();
    NewProject {
        owner_id: meta.owner_id,
        name: meta.name,
        description: meta.description,
        category_id: meta.category_id,
        template_id: meta.template_id,

        materials: input.materials.clone(),
        hourly_rate: input.hourly_rate,
        hours_spent: input.hours_spent,
        complexity_factor: input.complexity_factor,
        business_expenses: input.business_expenses.clone(),
        profit_margin_percent: input.profit_margin_percent,
        shipping_cost: input.shipping_cost,
        tax_rate_percent: input.tax_rate_percent,

        materials_cost: rounded.materials_cost,
        labor_cost: rounded.labor_cost,
        business_cost: rounded.business_cost,
        base_cost: rounded.base_cost,
        profit_amount: rounded.profit_amount,
        tax_amount: rounded.tax_amount,
        wholesale_price: rounded.wholesale_price,
        retail_price: rounded.retail_price,

        status: meta.status,
    }
}

/// Reconstruct the pricing input from a stored project for re-editing
/// and recalculation.
pub fn to_input(project: &Project) -> PricingInput {
    PricingInput {
        materials: project.materials.clone(),
        hourly_rate: project.hourly_rate,
        hours_spent: project.hours_spent,
        complexity_factor: project.complexity_factor,
        business_expenses: project.business_expenses.clone(),
        profit_margin_percent: project.profit_margin_percent,
        shipping_cost: project.shipping_cost,
        tax_rate_percent: project.tax_rate_percent,
    }
}

/// Decode the materials JSON column of a stored record
pub fn parse_materials(raw: &str) -> Result<Vec<MaterialLine>, AssemblerError> {
    serde_json::from_str(raw).map_err(|source| AssemblerError::MalformedField {
        field: "materials",
        source,
    })
}

/// Decode the business expenses JSON column of a stored record
pub fn parse_expenses(raw: &str) -> Result<Vec<ExpenseLine>, AssemblerError> {
    serde_json::from_str(raw).map_err(|source| AssemblerError::MalformedField {
        field: "business_expenses",
        source,
    })
}

impl From<AssemblerError> for crate::error::AppError {
    fn from(err: AssemblerError) -> Self {
        Self::InvalidProjectRecord(err.to_string())
    }
}
