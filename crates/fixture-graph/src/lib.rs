//! Fixture dependency resolution for Rails-style test fixtures.
//!
//! Test suites declare named records ("fixtures") in one YAML file per
//! table. Fixtures reference each other by name (`account: acme`), and a
//! test that uses one fixture needs every fixture it depends on to exist
//! first. This crate works out which fixtures a test needs and in what order
//! to create them, producing identifiers that are reproducible from the
//! fixture's name alone.
//!
//! # Quick Start
//!
//! Given `test/fixtures/accounts.yml`:
//!
//! ```yaml
//! acme:
//!   name: Acme
//! ```
//!
//! and `test/fixtures/cards.yml`:
//!
//! ```yaml
//! card1:
//!   title: Launch
//!   account: acme
//! ```
//!
//! resolve the fixtures a test needs:
//!
//! ```ignore
//! use fixture_graph::prelude::*;
//!
//! let report = FixtureLoader::default().load_dir(Path::new("test/fixtures"))?;
//! let index = AssociationIndex::from_file(Path::new("associations.json"))?;
//! let config = ResolverConfig::default();
//!
//! let seed = SeedSet::labels(["cards:card1".parse()?]);
//! let plan = FixtureResolver::new(&report.store, &index, &config).resolve(&seed);
//!
//! for step in plan.steps() {
//!     // DeferForeignKeys, Insert(accounts:acme), Insert(cards:card1), RestoreForeignKeys
//! }
//! ```
//!
//! # Architecture
//!
//! - [`identity`] - Reproducible UUID and integer identities of a label
//! - [`inflection`] - Table naming conventions
//! - [`fixtures`] - Fixture files, embedded expressions, the fixture store
//! - [`associations`] - Declared model associations
//! - [`resolver`] - Deciding whether a field value names another fixture
//! - [`collector`] - Forward and reverse closure over references
//! - [`sequencer`] - Table ordering with a deterministic cycle fallback
//! - [`plan`] - The emitted insertion plan
//! - [`resolution`] - [`FixtureResolver`], running all of the above
//! - [`commands`] - The `plan` command used by the command-line driver

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod associations;
pub mod collector;
pub mod commands;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod identity;
pub mod inflection;
pub mod plan;
pub mod prelude;
pub mod resolution;
pub mod resolver;
pub mod seed;
pub mod sequencer;

// Re-export commonly used types at crate root
pub use associations::{AssociationEntry, AssociationIndex, AssociationKind};
pub use config::{LoaderOptions, ResolverConfig, ReverseClosure};
pub use error::{FixtureError, FixtureResult, SourceParseError};
pub use fixtures::{FixtureLabel, FixtureLoader, FixtureRecord, FixtureStore, LoadReport};
pub use identity::{identify_as_integer, identify_as_uuid};
pub use plan::{FixturePlan, PlanStep, ResolvedField};
pub use resolution::FixtureResolver;
pub use resolver::{FieldResolution, ForeignKey, ResolvedReference};
pub use seed::SeedSet;
