//! Shared store builders for integration tests.

#![allow(dead_code)]

use fixture_graph::fixtures::{FieldMap, FixtureLabel, FixtureStore, FixtureTable};
use serde_json::Value;

/// Builds a store from `{"table": {"fixture": {fields}}}`.
pub fn store_from_json(tables: Value) -> FixtureStore {
	let Value::Object(tables) = tables else {
		panic!("expected an object of tables");
	};
	tables
		.into_iter()
		.map(|(name, records)| {
			let mut table = FixtureTable::new(name);
			if let Value::Object(records) = records {
				for (fixture, fields) in records {
					let fields: FieldMap = serde_json::from_value(fields).unwrap();
					table.insert(fixture, fields);
				}
			}
			table
		})
		.collect()
}

/// Parses a `table:name` label.
pub fn label(s: &str) -> FixtureLabel {
	s.parse().unwrap()
}

/// Parses several labels.
pub fn labels(items: &[&str]) -> Vec<FixtureLabel> {
	items.iter().map(|s| label(s)).collect()
}
