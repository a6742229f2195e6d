//! Dependency collection.
//!
//! Starting from a seed set, the collector grows the set of fixtures a plan
//! must create (the universe) in three phases:
//!
//! 1. Forward closure: every fixture referenced by a universe member joins.
//! 2. Reverse closure: fixtures outside the universe that reference a member
//!    join, subject to the [`ReverseClosure`] admission rule, followed by
//!    their own forward closure. Repeated until a pass admits nothing.
//! 3. Has-one back-references: pointers from a `has_one` owner to its child,
//!    which can only be set once both records exist.

use std::collections::{BTreeSet, VecDeque};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::associations::AssociationIndex;
use crate::config::{ResolverConfig, ReverseClosure};
use crate::fixtures::{FixtureLabel, FixtureRecord, FixtureStore};
use crate::inflection::singularize;
use crate::resolver::ReferenceResolver;
use crate::seed::SeedSet;

/// A `has_one` pointer assigned after every insert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BackReferenceAssignment {
	/// The `has_one` owner.
	pub parent: FixtureLabel,
	/// Association name on the owner.
	pub association: String,
	/// The fixture the owner points at.
	pub child: FixtureLabel,
}

/// Fixtures a plan must create.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectedUniverse {
	labels: IndexSet<FixtureLabel>,
	back_references: Vec<BackReferenceAssignment>,
	reverse_passes: usize,
}

impl CollectedUniverse {
	/// Returns the labels in admission order.
	pub fn labels(&self) -> impl Iterator<Item = &FixtureLabel> {
		self.labels.iter()
	}

	/// Returns true if the fixture is part of the universe.
	pub fn contains(&self, label: &FixtureLabel) -> bool {
		self.labels.contains(label)
	}

	/// Returns the number of fixtures.
	pub fn len(&self) -> usize {
		self.labels.len()
	}

	/// Returns true if nothing was collected.
	pub fn is_empty(&self) -> bool {
		self.labels.is_empty()
	}

	/// Returns the distinct tables of the universe in admission order.
	pub fn tables(&self) -> Vec<&str> {
		let tables: IndexSet<&str> = self.labels.iter().map(|l| l.table.as_str()).collect();
		tables.into_iter().collect()
	}

	/// Returns the has-one back-references, sorted.
	pub fn back_references(&self) -> &[BackReferenceAssignment] {
		&self.back_references
	}

	/// Returns the number of reverse closure passes that ran.
	pub fn reverse_passes(&self) -> usize {
		self.reverse_passes
	}
}

/// Builds the universe of a resolution.
#[derive(Debug, Clone)]
pub struct DependencyCollector<'a> {
	store: &'a FixtureStore,
	index: &'a AssociationIndex,
	resolver: ReferenceResolver<'a>,
	reverse_closure: ReverseClosure,
	max_reverse_passes: Option<usize>,
	excluded: BTreeSet<FixtureLabel>,
}

impl<'a> DependencyCollector<'a> {
	/// Creates a collector with the default admission rule and no pass cap.
	pub fn new(store: &'a FixtureStore, index: &'a AssociationIndex) -> Self {
		Self {
			store,
			index,
			resolver: ReferenceResolver::new(store, index),
			reverse_closure: ReverseClosure::default(),
			max_reverse_passes: None,
			excluded: BTreeSet::new(),
		}
	}

	/// Applies the closure settings of a resolver configuration.
	pub fn with_config(mut self, config: &ResolverConfig) -> Self {
		self.reverse_closure = config.reverse_closure;
		self.max_reverse_passes = config.max_reverse_passes;
		self
	}

	/// Sets the reverse closure admission rule.
	pub fn with_reverse_closure(mut self, rule: ReverseClosure) -> Self {
		self.reverse_closure = rule;
		self
	}

	/// Caps the number of reverse closure passes.
	pub fn with_max_reverse_passes(mut self, passes: usize) -> Self {
		self.max_reverse_passes = Some(passes);
		self
	}

	/// Keeps these fixtures out of the universe, e.g. because they are
	/// already created elsewhere. References to them become literal keys.
	pub fn with_excluded<I>(mut self, labels: I) -> Self
	where
		I: IntoIterator<Item = FixtureLabel>,
	{
		self.excluded.extend(labels);
		self
	}

	/// Collects the universe of `seed`.
	pub fn collect(&self, seed: &SeedSet) -> CollectedUniverse {
		let mut universe = IndexSet::new();
		let mut queue = VecDeque::new();

		for label in seed.resolve(self.store) {
			if self.excluded.contains(&label) {
				continue;
			}
			if universe.insert(label.clone()) {
				queue.push_back(label);
			}
		}
		self.forward_closure(&mut universe, queue);

		let reverse_passes = match self.reverse_closure {
			ReverseClosure::Disabled => 0,
			_ => self.reverse_closure_fixed_point(&mut universe),
		};

		let back_references = self.back_references(&universe);

		tracing::debug!(
			"Collected {} fixtures ({} reverse passes, {} back-references)",
			universe.len(),
			reverse_passes,
			back_references.len()
		);

		CollectedUniverse {
			labels: universe,
			back_references,
			reverse_passes,
		}
	}

	fn forward_closure(
		&self,
		universe: &mut IndexSet<FixtureLabel>,
		mut queue: VecDeque<FixtureLabel>,
	) {
		while let Some(label) = queue.pop_front() {
			let Some(record) = self.store.get(&label) else {
				continue;
			};
			for (_, reference) in self.resolver.references(record) {
				if self.excluded.contains(&reference.target) {
					continue;
				}
				if universe.insert(reference.target.clone()) {
					queue.push_back(reference.target);
				}
			}
		}
	}

	/// Runs reverse passes until one admits nothing. Returns the pass count.
	fn reverse_closure_fixed_point(&self, universe: &mut IndexSet<FixtureLabel>) -> usize {
		let mut passes = 0;

		loop {
			if let Some(max) = self.max_reverse_passes
				&& passes >= max
			{
				tracing::warn!(
					"Reverse closure stopped after {} passes with {} fixtures collected",
					passes,
					universe.len()
				);
				break;
			}

			let admitted = self.reverse_pass(universe);
			passes += 1;
			if admitted.is_empty() {
				break;
			}

			tracing::debug!("Reverse pass {} admitted {} fixtures", passes, admitted.len());
			let mut queue = VecDeque::new();
			for label in admitted {
				if universe.insert(label.clone()) {
					queue.push_back(label);
				}
			}
			self.forward_closure(universe, queue);
		}

		passes
	}

	/// Scans the store against a fixed snapshot of the universe.
	fn reverse_pass(&self, snapshot: &IndexSet<FixtureLabel>) -> Vec<FixtureLabel> {
		self.store
			.records()
			.filter(|record| {
				let label = record.label();
				!snapshot.contains(&label) && !self.excluded.contains(&label)
			})
			.filter(|record| {
				self.resolver
					.references(record)
					.iter()
					.any(|(_, reference)| {
						snapshot.contains(&reference.target) && self.admits(record, &reference.target)
					})
			})
			.map(FixtureRecord::label)
			.collect()
	}

	fn admits(&self, candidate: &FixtureRecord, target: &FixtureLabel) -> bool {
		match self.reverse_closure {
			ReverseClosure::AnyReference => true,
			ReverseClosure::HasOneOnly => self.index.has_one_targeting(&target.table, &candidate.table),
			ReverseClosure::Disabled => false,
		}
	}

	fn back_references(&self, universe: &IndexSet<FixtureLabel>) -> Vec<BackReferenceAssignment> {
		let mut assignments = BTreeSet::new();

		for (owner, association, entry) in self.index.has_one_entries() {
			let owner_present = universe.iter().any(|label| label.table == owner);
			if !owner_present {
				continue;
			}

			let singular = singularize(owner);
			let fk_columns = [singular.clone(), format!("{}_id", singular)];

			let children = universe
				.iter()
				.filter(|label| label.table == entry.target_table)
				.filter_map(|label| self.store.get(label));

			for child in children {
				let parent = fk_columns.iter().find_map(|column| {
					let Some(Value::String(value)) = child.get(column) else {
						return None;
					};
					self.resolver
						.resolve_in_table(value, owner)
						.filter(|reference| universe.contains(&reference.target))
				});
				if let Some(parent) = parent {
					assignments.insert(BackReferenceAssignment {
						parent: parent.target,
						association: association.to_string(),
						child: child.label(),
					});
				}
			}
		}

		assignments.into_iter().collect()
	}
}
