//! Fixture data model.
//!
//! A fixture store holds one [`FixtureTable`] per table; each table maps a
//! fixture name to its [`FixtureRecord`]. Records are addressed across tables
//! by [`FixtureLabel`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{FixtureError, FixtureResult};

/// Ordered column to value map of a single fixture.
pub type FieldMap = IndexMap<String, Value>;

/// A `(table, name)` pair uniquely identifying a fixture.
///
/// Displayed and serialized as `table:name`. Ordering is by table, then name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FixtureLabel {
	/// Table the fixture belongs to.
	pub table: String,
	/// Fixture name within the table.
	pub name: String,
}

impl FixtureLabel {
	/// Creates a new label.
	pub fn new(table: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			table: table.into(),
			name: name.into(),
		}
	}

	/// Returns the flat identifier used in generated code.
	///
	/// # Example
	///
	/// ```
	/// # use fixture_graph::fixtures::FixtureLabel;
	/// let label = FixtureLabel::new("accounts", "acme");
	/// assert_eq!(label.identifier(), "accounts_acme");
	/// ```
	pub fn identifier(&self) -> String {
		format!("{}_{}", self.table, self.name)
	}
}

impl fmt::Display for FixtureLabel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.table, self.name)
	}
}

impl FromStr for FixtureLabel {
	type Err = FixtureError;

	fn from_str(s: &str) -> FixtureResult<Self> {
		match s.split_once(':') {
			Some((table, name)) if !table.is_empty() && !name.is_empty() => {
				Ok(Self::new(table, name))
			}
			_ => Err(FixtureError::InvalidLabel(s.to_string())),
		}
	}
}

impl Serialize for FixtureLabel {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for FixtureLabel {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let raw = String::deserialize(deserializer)?;
		raw.parse().map_err(serde::de::Error::custom)
	}
}

/// A single named fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureRecord {
	/// Table the fixture belongs to.
	pub table: String,
	/// Fixture name.
	pub name: String,
	/// Field values in file order.
	pub fields: FieldMap,
}

impl FixtureRecord {
	/// Creates a new fixture record.
	pub fn new(table: impl Into<String>, name: impl Into<String>, fields: FieldMap) -> Self {
		Self {
			table: table.into(),
			name: name.into(),
			fields,
		}
	}

	/// Returns the label of this record.
	pub fn label(&self) -> FixtureLabel {
		FixtureLabel::new(self.table.clone(), self.name.clone())
	}

	/// Returns a field value.
	pub fn get(&self, column: &str) -> Option<&Value> {
		self.fields.get(column)
	}
}

/// All fixtures of one table, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixtureTable {
	name: String,
	records: IndexMap<String, FixtureRecord>,
}

impl FixtureTable {
	/// Creates an empty table.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			records: IndexMap::new(),
		}
	}

	/// Returns the table name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Adds a fixture, replacing any fixture with the same name.
	pub fn insert(&mut self, name: impl Into<String>, fields: FieldMap) {
		let name = name.into();
		let record = FixtureRecord::new(self.name.clone(), name.clone(), fields);
		self.records.insert(name, record);
	}

	/// Returns a fixture by name.
	pub fn get(&self, name: &str) -> Option<&FixtureRecord> {
		self.records.get(name)
	}

	/// Returns true if a fixture with this name exists.
	pub fn contains(&self, name: &str) -> bool {
		self.records.contains_key(name)
	}

	/// Returns an iterator over the fixtures in file order.
	pub fn records(&self) -> impl Iterator<Item = &FixtureRecord> {
		self.records.values()
	}

	/// Returns the number of fixtures.
	pub fn len(&self) -> usize {
		self.records.len()
	}

	/// Returns true if the table has no fixtures.
	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	/// Moves every fixture of `other` into this table.
	fn absorb(&mut self, other: FixtureTable) {
		for (name, mut record) in other.records {
			record.table = self.name.clone();
			self.records.insert(name, record);
		}
	}
}

/// Every loaded fixture, keyed by table.
///
/// Tables iterate in name order so that anything derived from a store is
/// deterministic regardless of directory listing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixtureStore {
	tables: BTreeMap<String, FixtureTable>,
}

impl FixtureStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a table. Fixtures of a table that already exists are merged in,
	/// later definitions winning.
	pub fn insert_table(&mut self, table: FixtureTable) {
		match self.tables.get_mut(table.name()) {
			Some(existing) => {
				tracing::debug!("Merging additional fixtures into table {}", table.name());
				existing.absorb(table);
			}
			None => {
				self.tables.insert(table.name().to_string(), table);
			}
		}
	}

	/// Returns a table by name.
	pub fn table(&self, name: &str) -> Option<&FixtureTable> {
		self.tables.get(name)
	}

	/// Returns true if the table exists.
	pub fn has_table(&self, name: &str) -> bool {
		self.tables.contains_key(name)
	}

	/// Returns the record behind a label.
	pub fn get(&self, label: &FixtureLabel) -> Option<&FixtureRecord> {
		self.table(&label.table)?.get(&label.name)
	}

	/// Returns true if the label names an existing fixture.
	pub fn contains(&self, label: &FixtureLabel) -> bool {
		self.get(label).is_some()
	}

	/// Returns an iterator over all tables in name order.
	pub fn tables(&self) -> impl Iterator<Item = &FixtureTable> {
		self.tables.values()
	}

	/// Returns an iterator over all records in store order.
	pub fn records(&self) -> impl Iterator<Item = &FixtureRecord> {
		self.tables.values().flat_map(FixtureTable::records)
	}

	/// Returns every label in store order.
	pub fn labels(&self) -> Vec<FixtureLabel> {
		self.records().map(FixtureRecord::label).collect()
	}

	/// Returns the number of tables.
	pub fn table_count(&self) -> usize {
		self.tables.len()
	}

	/// Returns the total number of fixtures.
	pub fn fixture_count(&self) -> usize {
		self.tables.values().map(FixtureTable::len).sum()
	}

	/// Returns true if the store holds no fixtures.
	pub fn is_empty(&self) -> bool {
		self.fixture_count() == 0
	}
}

impl FromIterator<FixtureTable> for FixtureStore {
	fn from_iter<I: IntoIterator<Item = FixtureTable>>(iter: I) -> Self {
		let mut store = Self::new();
		for table in iter {
			store.insert_table(table);
		}
		store
	}
}

/// Supported fixture file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum FixtureFormat {
	/// YAML format (default, the Rails convention).
	#[default]
	Yaml,

	/// JSON format.
	Json,
}

impl FixtureFormat {
	/// Determines the fixture format from a file extension.
	///
	/// # Example
	///
	/// ```
	/// # use fixture_graph::fixtures::FixtureFormat;
	/// assert_eq!(FixtureFormat::from_extension("yml"), Some(FixtureFormat::Yaml));
	/// assert_eq!(FixtureFormat::from_extension("json"), Some(FixtureFormat::Json));
	/// assert_eq!(FixtureFormat::from_extension("xml"), None);
	/// ```
	pub fn from_extension(ext: &str) -> Option<Self> {
		match ext.to_lowercase().as_str() {
			"json" => Some(Self::Json),
			"yaml" | "yml" => Some(Self::Yaml),
			_ => None,
		}
	}

	/// Determines the fixture format from a file path.
	pub fn from_path(path: &Path) -> Option<Self> {
		path.extension()
			.and_then(|ext| ext.to_str())
			.and_then(Self::from_extension)
	}
}

impl fmt::Display for FixtureFormat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Json => write!(f, "JSON"),
			Self::Yaml => write!(f, "YAML"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	fn fields(value: Value) -> FieldMap {
		serde_json::from_value(value).unwrap()
	}

	#[rstest]
	fn test_label_display_and_identifier() {
		let label = FixtureLabel::new("cards", "card1");
		assert_eq!(label.to_string(), "cards:card1");
		assert_eq!(label.identifier(), "cards_card1");
	}

	#[rstest]
	#[case("cards:card1", Some(("cards", "card1")))]
	#[case("cards:with:colon", Some(("cards", "with:colon")))]
	#[case("cards", None)]
	#[case(":card1", None)]
	#[case("cards:", None)]
	fn test_label_from_str(#[case] input: &str, #[case] expected: Option<(&str, &str)>) {
		let parsed = input.parse::<FixtureLabel>();
		match expected {
			Some((table, name)) => assert_eq!(parsed.unwrap(), FixtureLabel::new(table, name)),
			None => assert!(matches!(parsed, Err(FixtureError::InvalidLabel(_)))),
		}
	}

	#[rstest]
	fn test_label_serializes_as_string() {
		let label = FixtureLabel::new("accounts", "acme");
		assert_eq!(serde_json::to_value(&label).unwrap(), json!("accounts:acme"));
		let parsed: FixtureLabel = serde_json::from_value(json!("accounts:acme")).unwrap();
		assert_eq!(parsed, label);
	}

	#[rstest]
	fn test_label_ordering() {
		let mut labels = vec![
			FixtureLabel::new("cards", "b"),
			FixtureLabel::new("accounts", "z"),
			FixtureLabel::new("cards", "a"),
		];
		labels.sort();
		assert_eq!(
			labels,
			vec![
				FixtureLabel::new("accounts", "z"),
				FixtureLabel::new("cards", "a"),
				FixtureLabel::new("cards", "b"),
			]
		);
	}

	#[rstest]
	fn test_table_preserves_file_order() {
		let mut table = FixtureTable::new("cards");
		table.insert("zeta", FieldMap::new());
		table.insert("alpha", FieldMap::new());

		let names: Vec<&str> = table.records().map(|r| r.name.as_str()).collect();
		assert_eq!(names, vec!["zeta", "alpha"]);
		assert_eq!(table.get("alpha").unwrap().table, "cards");
	}

	#[rstest]
	fn test_store_merges_tables_and_sorts() {
		let mut first = FixtureTable::new("cards");
		first.insert("card1", fields(json!({"title": "old"})));
		let mut second = FixtureTable::new("cards");
		second.insert("card1", fields(json!({"title": "new"})));
		second.insert("card2", FieldMap::new());
		let mut accounts = FixtureTable::new("accounts");
		accounts.insert("acme", FieldMap::new());

		let store: FixtureStore = vec![first, second, accounts].into_iter().collect();

		assert_eq!(store.table_count(), 2);
		assert_eq!(store.fixture_count(), 3);
		let label = FixtureLabel::new("cards", "card1");
		assert_eq!(store.get(&label).unwrap().get("title"), Some(&json!("new")));
		assert_eq!(
			store.labels(),
			vec![
				FixtureLabel::new("accounts", "acme"),
				FixtureLabel::new("cards", "card1"),
				FixtureLabel::new("cards", "card2"),
			]
		);
	}

	#[rstest]
	fn test_fixture_format_from_path() {
		use std::path::PathBuf;
		assert_eq!(
			FixtureFormat::from_path(&PathBuf::from("accounts.yml")),
			Some(FixtureFormat::Yaml)
		);
		assert_eq!(
			FixtureFormat::from_path(&PathBuf::from("accounts.JSON")),
			Some(FixtureFormat::Json)
		);
		assert_eq!(FixtureFormat::from_path(&PathBuf::from("README")), None);
	}
}
