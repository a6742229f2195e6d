//! Seed sets.
//!
//! A resolution starts either from every fixture in the store or from an
//! explicit list of labels. The explicit list is usually scraped from a test
//! file's accessor calls such as `accounts(:acme)` or `cards(:one, :two)`.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::fixtures::{FixtureLabel, FixtureStore};

/// `table(:a, :b)` or `table("a")` accessor calls.
static ACCESSOR_CALL: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"\b([a-z_][a-z0-9_]*)\(\s*((?::[A-Za-z0-9_]+|'[^']*'|\x22[^\x22]*\x22)(?:\s*,\s*(?::[A-Za-z0-9_]+|'[^']*'|\x22[^\x22]*\x22))*)\s*\)")
		.expect("accessor pattern is valid")
});

static ACCESSOR_ARG: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#":([A-Za-z0-9_]+)|'([^']*)'|"([^"]*)""#).expect("argument pattern is valid")
});

/// Starting point of a resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedSet {
	/// Every fixture in the store.
	#[default]
	All,
	/// Only these fixtures (and whatever they pull in).
	Labels(Vec<FixtureLabel>),
}

impl SeedSet {
	/// Seeds from explicit labels.
	pub fn labels<I>(labels: I) -> Self
	where
		I: IntoIterator<Item = FixtureLabel>,
	{
		Self::Labels(labels.into_iter().collect())
	}

	/// Seeds from the fixture accessor calls found in a test source.
	///
	/// A call counts only when its method name is a loaded table and the
	/// argument names an existing fixture of that table. Labels are returned
	/// in first-occurrence order without duplicates.
	///
	/// # Example
	///
	/// ```
	/// use fixture_graph::fixtures::{FieldMap, FixtureLabel, FixtureStore, FixtureTable};
	/// use fixture_graph::seed::SeedSet;
	///
	/// let mut cards = FixtureTable::new("cards");
	/// cards.insert("one", FieldMap::new());
	/// let store: FixtureStore = vec![cards].into_iter().collect();
	///
	/// let seed = SeedSet::from_test_source("card = cards(:one)", &store);
	/// assert_eq!(seed, SeedSet::Labels(vec![FixtureLabel::new("cards", "one")]));
	/// ```
	pub fn from_test_source(source: &str, store: &FixtureStore) -> Self {
		let mut seen = HashSet::new();
		let mut labels = Vec::new();

		for call in ACCESSOR_CALL.captures_iter(source) {
			let table_name = &call[1];
			let Some(table) = store.table(table_name) else {
				continue;
			};
			for arg in ACCESSOR_ARG.captures_iter(&call[2]) {
				let Some(name) = arg.get(1).or_else(|| arg.get(2)).or_else(|| arg.get(3)) else {
					continue;
				};
				if !table.contains(name.as_str()) {
					tracing::debug!("Ignoring unknown fixture {}:{}", table_name, name.as_str());
					continue;
				}
				let label = FixtureLabel::new(table_name, name.as_str());
				if seen.insert(label.clone()) {
					labels.push(label);
				}
			}
		}

		Self::Labels(labels)
	}

	/// Returns the labels to start from, keeping only those in the store.
	pub fn resolve(&self, store: &FixtureStore) -> Vec<FixtureLabel> {
		match self {
			Self::All => store.labels(),
			Self::Labels(labels) => labels
				.iter()
				.filter(|label| {
					let exists = store.contains(label);
					if !exists {
						tracing::debug!("Dropping unknown seed fixture {}", label);
					}
					exists
				})
				.cloned()
				.collect(),
		}
	}

	/// Returns true for the exhaustive seed.
	pub fn is_all(&self) -> bool {
		matches!(self, Self::All)
	}
}
