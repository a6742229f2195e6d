//! Commands built on the resolver.

pub mod plan;

pub use plan::{PlanArgs, PlanCommand, PlanOptions, PlanOutput};
