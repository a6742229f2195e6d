//! Table ordering.
//!
//! Tables are ordered with Kahn's algorithm so that referenced tables are
//! created before the tables referencing them. The ready set is kept sorted,
//! which makes the order independent of how the universe was collected.
//!
//! Tables caught in a true cycle cannot be ordered. When ordering stalls, the
//! remaining graph is split into strongly connected components and the
//! smallest member of a cycle with no pending dependencies outside itself is
//! forced. Only members of such cycles are reported in
//! [`Sequence::cyclic_tables`]; tables that merely depend on a cycle are
//! ordered after it. Inserts into cyclic tables rely on deferred foreign-key
//! enforcement.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::collector::CollectedUniverse;
use crate::resolver::ReferenceResolver;

/// Table-level dependency graph of a universe.
///
/// # Examples
///
/// ```rust
/// use fixture_graph::sequencer::TableGraph;
///
/// let mut graph = TableGraph::new();
/// graph.add_table("accounts");
/// graph.add_dependency("cards", "accounts");
///
/// let sequence = graph.sequence();
/// assert_eq!(sequence.tables, vec!["accounts", "cards"]);
/// assert!(sequence.cyclic_tables.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableGraph {
	/// Table -> tables it depends on
	dependencies: BTreeMap<String, BTreeSet<String>>,
	/// Table -> tables that depend on it
	dependents: BTreeMap<String, BTreeSet<String>>,
}

/// Result of ordering the tables of a universe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
	/// Every table, dependencies first.
	pub tables: Vec<String>,
	/// Tables that could not be fully ordered, in name order.
	pub cyclic_tables: Vec<String>,
}

impl Sequence {
	/// Returns the position of a table in the sequence.
	pub fn position(&self, table: &str) -> Option<usize> {
		self.tables.iter().position(|t| t == table)
	}

	/// Returns true if some tables could not be ordered.
	pub fn has_cycle(&self) -> bool {
		!self.cyclic_tables.is_empty()
	}
}

impl TableGraph {
	/// Create an empty graph.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds the graph of a collected universe.
	///
	/// Table A depends on table B when a universe fixture of A references a
	/// universe fixture of B. References within one table are ignored.
	pub fn from_universe(universe: &CollectedUniverse, resolver: &ReferenceResolver<'_>) -> Self {
		let mut graph = Self::new();

		for label in universe.labels() {
			graph.add_table(&label.table);
			let Some(record) = resolver.store().get(label) else {
				continue;
			};
			for (_, reference) in resolver.references(record) {
				if universe.contains(&reference.target) {
					graph.add_dependency(&label.table, &reference.target.table);
				}
			}
		}

		graph
	}

	/// Adds a table without dependencies.
	pub fn add_table(&mut self, table: &str) {
		self.dependencies.entry(table.to_string()).or_default();
		self.dependents.entry(table.to_string()).or_default();
	}

	/// Records that `table` depends on `depends_on`. Self edges are dropped.
	pub fn add_dependency(&mut self, table: &str, depends_on: &str) {
		self.add_table(table);
		self.add_table(depends_on);
		if table == depends_on {
			return;
		}
		if let Some(deps) = self.dependencies.get_mut(table) {
			deps.insert(depends_on.to_string());
		}
		if let Some(deps) = self.dependents.get_mut(depends_on) {
			deps.insert(table.to_string());
		}
	}

	/// Returns the tables `table` depends on.
	pub fn dependencies(&self, table: &str) -> impl Iterator<Item = &str> {
		self.dependencies
			.get(table)
			.into_iter()
			.flat_map(|deps| deps.iter().map(String::as_str))
	}

	/// Returns the number of tables.
	pub fn table_count(&self) -> usize {
		self.dependencies.len()
	}

	/// Orders the tables, dependencies first.
	///
	/// When only blocked tables remain, the smallest member of a closed cycle
	/// is forced and ordering continues from it.
	pub fn sequence(&self) -> Sequence {
		let mut in_degree: BTreeMap<&str, usize> = self
			.dependencies
			.iter()
			.map(|(table, deps)| (table.as_str(), deps.len()))
			.collect();

		// Smallest name first keeps the order deterministic
		let mut ready: BTreeSet<&str> = in_degree
			.iter()
			.filter(|(_, degree)| **degree == 0)
			.map(|(table, _)| *table)
			.collect();

		let mut tables = Vec::with_capacity(in_degree.len());
		let mut cyclic_tables = BTreeSet::new();

		loop {
			while let Some(table) = ready.pop_first() {
				in_degree.remove(table);
				tables.push(table.to_string());

				for dependent in self.dependents.get(table).into_iter().flatten() {
					if let Some(degree) = in_degree.get_mut(dependent.as_str())
						&& *degree > 0
					{
						*degree -= 1;
						if *degree == 0 {
							ready.insert(dependent.as_str());
						}
					}
				}
			}

			if in_degree.is_empty() {
				break;
			}

			let cycle = self.closed_cycle(&in_degree);
			let Some(forced) = cycle
				.first()
				.or_else(|| in_degree.keys().next())
				.copied()
			else {
				break;
			};
			tracing::debug!(
				"Cyclic table dependencies among {}, breaking at {}",
				cycle.join(", "),
				forced
			);
			cyclic_tables.extend(cycle.into_iter().map(str::to_string));

			if let Some(degree) = in_degree.get_mut(forced) {
				*degree = 0;
			}
			ready.insert(forced);
		}

		Sequence {
			tables,
			cyclic_tables: cyclic_tables.into_iter().collect(),
		}
	}

	/// Returns the sorted members of the smallest cycle among `remaining`
	/// whose pending dependencies all lie within the cycle itself.
	///
	/// Every stalled table is on such a cycle or downstream of one, so the
	/// result is empty only when nothing remains.
	fn closed_cycle<'g>(&'g self, remaining: &BTreeMap<&'g str, usize>) -> Vec<&'g str> {
		let mut graph = DiGraph::<&str, ()>::new();
		let nodes: BTreeMap<&str, NodeIndex> = remaining
			.keys()
			.map(|table| (*table, graph.add_node(*table)))
			.collect();
		for (table, node) in &nodes {
			for dependency in self.dependencies(table) {
				if let Some(target) = nodes.get(dependency) {
					graph.add_edge(*node, *target, ());
				}
			}
		}

		tarjan_scc(&graph)
			.into_iter()
			.filter(|component| component.len() > 1)
			.map(|component| {
				let mut members: Vec<&str> = component.into_iter().map(|node| graph[node]).collect();
				members.sort_unstable();
				members
			})
			.filter(|members| {
				members.iter().all(|table| {
					self.dependencies(table)
						.all(|dependency| !remaining.contains_key(dependency) || members.contains(&dependency))
				})
			})
			.min()
			.unwrap_or_default()
	}
}
