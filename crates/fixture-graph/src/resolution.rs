//! End-to-end resolution.

use std::collections::BTreeSet;

use crate::associations::AssociationIndex;
use crate::collector::DependencyCollector;
use crate::config::ResolverConfig;
use crate::fixtures::{FixtureLabel, FixtureStore};
use crate::plan::{FixturePlan, PlanEmitter};
use crate::resolver::ReferenceResolver;
use crate::seed::SeedSet;
use crate::sequencer::TableGraph;

/// Turns a seed set into a [`FixturePlan`].
///
/// Resolution is a pure function of the store, the association index, the
/// configuration and the seed set. It never fails: unresolvable values are
/// literals and cycles fall back to a deterministic order.
///
/// # Examples
///
/// ```rust
/// use fixture_graph::prelude::*;
/// use serde_json::json;
///
/// let mut accounts = FixtureTable::new("accounts");
/// accounts.insert("acme", FieldMap::new());
/// let mut cards = FixtureTable::new("cards");
/// let mut fields = FieldMap::new();
/// fields.insert("account".to_string(), json!("acme"));
/// cards.insert("card1", fields);
/// let store: FixtureStore = vec![accounts, cards].into_iter().collect();
/// let index = AssociationIndex::new();
/// let config = ResolverConfig::default();
///
/// let plan = FixtureResolver::new(&store, &index, &config)
///     .resolve(&SeedSet::labels([FixtureLabel::new("cards", "card1")]));
///
/// assert_eq!(
///     plan.order,
///     vec![FixtureLabel::new("accounts", "acme"), FixtureLabel::new("cards", "card1")]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct FixtureResolver<'a> {
	store: &'a FixtureStore,
	index: &'a AssociationIndex,
	config: &'a ResolverConfig,
	excluded: BTreeSet<FixtureLabel>,
}

impl<'a> FixtureResolver<'a> {
	/// Creates a resolver.
	pub fn new(
		store: &'a FixtureStore,
		index: &'a AssociationIndex,
		config: &'a ResolverConfig,
	) -> Self {
		Self {
			store,
			index,
			config,
			excluded: BTreeSet::new(),
		}
	}

	/// Treats these fixtures as already created elsewhere.
	///
	/// They are left out of the plan, and fields referencing them are
	/// emitted as literal foreign keys.
	pub fn with_excluded<I>(mut self, labels: I) -> Self
	where
		I: IntoIterator<Item = FixtureLabel>,
	{
		self.excluded.extend(labels);
		self
	}

	/// Resolves a seed set into a plan.
	pub fn resolve(&self, seed: &SeedSet) -> FixturePlan {
		let resolver = ReferenceResolver::new(self.store, self.index);

		let universe = DependencyCollector::new(self.store, self.index)
			.with_config(self.config)
			.with_excluded(self.excluded.iter().cloned())
			.collect(seed);
		let sequence = TableGraph::from_universe(&universe, &resolver).sequence();
		let plan = PlanEmitter::new(resolver).emit(&universe, &sequence);

		tracing::debug!(
			"Planned {} fixtures across {} tables ({} back-references, {} cyclic tables)",
			plan.len(),
			plan.table_order.len(),
			plan.back_references.len(),
			plan.cyclic_tables.len()
		);

		plan
	}
}
