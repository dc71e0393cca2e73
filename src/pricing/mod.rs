//! Pricing calculation core: input/breakdown models, the pure pricing
//! engine, and the project assembler that maps between calculations and
//! stored project records.

pub mod assembler;
pub mod engine;
pub mod models;

pub use assembler::{to_input, to_project, AssemblerError, ProjectMeta};
pub use engine::compute;
pub use models::{ExpenseLine, MaterialLine, PricingBreakdown, PricingInput};
