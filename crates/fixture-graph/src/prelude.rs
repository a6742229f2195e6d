//! Convenience re-exports for common usage.
//!
//! # Example
//!
//! ```ignore
//! use fixture_graph::prelude::*;
//! ```

// Error types
pub use crate::error::{FixtureError, FixtureResult, SourceParseError};

// Fixture types
pub use crate::fixtures::{
	ExpressionEvaluator, FieldMap, FixtureFormat, FixtureLabel, FixtureLoader, FixtureParser,
	FixtureRecord, FixtureStore, FixtureTable, LoadReport,
};

// Resolution
pub use crate::associations::{AssociationEntry, AssociationIndex, AssociationKind};
pub use crate::collector::{BackReferenceAssignment, CollectedUniverse, DependencyCollector};
pub use crate::config::{LoaderOptions, ResolverConfig, ReverseClosure};
pub use crate::plan::{FixturePlan, PlanEmitter, PlanStep, ResolvedField};
pub use crate::resolution::FixtureResolver;
pub use crate::resolver::{FieldResolution, ForeignKey, ReferenceResolver, ResolvedReference};
pub use crate::seed::SeedSet;
pub use crate::sequencer::{Sequence, TableGraph};

// Identity functions
pub use crate::identity::{identify_as_integer, identify_as_uuid};

// Command types
pub use crate::commands::{PlanArgs, PlanCommand, PlanOptions, PlanOutput};
