//! Reference resolution.
//!
//! Fixture values are untyped, so whether `account: acme` names another
//! fixture is decided heuristically. [`ReferenceResolver::resolve`] runs a
//! fixed chain of checks and either returns the referenced fixture or `None`,
//! in which case the value is an ordinary literal.
//!
//! # Examples
//!
//! ```rust
//! use fixture_graph::associations::{AssociationIndex, AssociationKind};
//! use fixture_graph::fixtures::{FieldMap, FixtureLabel, FixtureStore, FixtureTable};
//! use fixture_graph::resolver::ReferenceResolver;
//! use serde_json::json;
//!
//! let mut accounts = FixtureTable::new("accounts");
//! accounts.insert("acme", FieldMap::new());
//! let store: FixtureStore = vec![accounts].into_iter().collect();
//! let index = AssociationIndex::new()
//!     .with("cards", "account", "accounts", AssociationKind::BelongsTo);
//!
//! let resolver = ReferenceResolver::new(&store, &index);
//! let reference = resolver.resolve(&json!("acme_uuid"), "account", "cards").unwrap();
//! assert_eq!(reference.target, FixtureLabel::new("accounts", "acme"));
//! assert!(reference.is_uuid_form);
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::associations::AssociationIndex;
use crate::fixtures::{FixtureLabel, FixtureRecord, FixtureStore};
use crate::identity::{identify_as_integer, identify_as_uuid};
use crate::inflection::{pluralize, table_name_for_model};

/// `"<ref> (<TypeName>)"`, the polymorphic reference form.
static POLYMORPHIC_REF: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^(.+?) \(([A-Za-z][A-Za-z0-9_]*(?:::[A-Za-z][A-Za-z0-9_]*)*)\)$")
		.expect("polymorphic reference pattern is valid")
});

const UUID_SUFFIX: &str = "_uuid";

/// A field value that names another fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedReference {
	/// The referenced fixture.
	pub target: FixtureLabel,
	/// The value named the fixture through the `_uuid` suffix.
	pub is_uuid_form: bool,
	/// Model name of a polymorphic reference.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub polymorphic_type: Option<String>,
}

/// A literal foreign key standing in for a fixture outside the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ForeignKey {
	/// Synthesized UUID identity.
	Uuid(String),
	/// Synthesized integer identity.
	Integer(u32),
}

impl ForeignKey {
	/// Returns the key as a JSON value.
	pub fn to_value(&self) -> Value {
		match self {
			Self::Uuid(uuid) => Value::String(uuid.clone()),
			Self::Integer(id) => Value::from(*id),
		}
	}
}

/// How a single field is materialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldResolution {
	/// Not a reference; the value is used as is.
	Literal(Value),
	/// Reference to a fixture created earlier in the same plan.
	SiblingRef(FixtureLabel),
	/// Reference to a fixture outside the plan, replaced by its identity.
	ForeignLiteral(ForeignKey),
}

/// Decides which field values reference other fixtures.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceResolver<'a> {
	store: &'a FixtureStore,
	index: &'a AssociationIndex,
}

impl<'a> ReferenceResolver<'a> {
	/// Creates a resolver over a store and its association index.
	pub fn new(store: &'a FixtureStore, index: &'a AssociationIndex) -> Self {
		Self { store, index }
	}

	/// Returns the fixture store.
	pub fn store(&self) -> &'a FixtureStore {
		self.store
	}

	/// Returns the association index.
	pub fn index(&self) -> &'a AssociationIndex {
		self.index
	}

	/// Resolves the value of `column` in a fixture of `owner_table`.
	///
	/// Returns `None` when the value is not a reference.
	pub fn resolve(
		&self,
		value: &Value,
		column: &str,
		owner_table: &str,
	) -> Option<ResolvedReference> {
		let value = value.as_str()?;

		if let Some(caps) = POLYMORPHIC_REF.captures(value) {
			let type_name = &caps[2];
			let table = table_name_for_model(type_name);
			let mut reference = self.resolve_in_table(&caps[1], &table)?;
			reference.polymorphic_type = Some(type_name.to_string());
			return Some(reference);
		}

		let table = self.candidate_table(column, owner_table)?;
		self.resolve_in_table(value, &table)
	}

	/// Resolves `value` as a fixture name of `table`, directly or through the
	/// `_uuid` suffix.
	pub fn resolve_in_table(&self, value: &str, table: &str) -> Option<ResolvedReference> {
		let fixtures = self.store.table(table)?;

		if fixtures.contains(value) {
			return Some(ResolvedReference {
				target: FixtureLabel::new(table, value),
				is_uuid_form: false,
				polymorphic_type: None,
			});
		}

		let name = value.strip_suffix(UUID_SUFFIX)?;
		fixtures.contains(name).then(|| ResolvedReference {
			target: FixtureLabel::new(table, name),
			is_uuid_form: true,
			polymorphic_type: None,
		})
	}

	fn candidate_table(&self, column: &str, owner_table: &str) -> Option<String> {
		if let Some(entry) = self.index.lookup(owner_table, column) {
			return Some(entry.target_table.clone());
		}

		if column == "id" || column.ends_with("_id") {
			return None;
		}

		let table = pluralize(column);
		self.store.has_table(&table).then_some(table)
	}

	/// Returns every reference made by a record, in field order.
	pub fn references(&self, record: &'a FixtureRecord) -> Vec<(&'a str, ResolvedReference)> {
		record
			.fields
			.iter()
			.filter_map(|(column, value)| {
				self.resolve(value, column, &record.table)
					.map(|reference| (column.as_str(), reference))
			})
			.collect()
	}

	/// Classifies a field for a plan whose members satisfy `in_plan`.
	pub fn classify(
		&self,
		value: &Value,
		column: &str,
		owner_table: &str,
		in_plan: impl Fn(&FixtureLabel) -> bool,
	) -> FieldResolution {
		let reference = self.resolve(value, column, owner_table);
		self.resolution_for(value, reference.as_ref(), in_plan)
	}

	/// Classifies a field whose reference has already been resolved.
	pub fn resolution_for(
		&self,
		value: &Value,
		reference: Option<&ResolvedReference>,
		in_plan: impl Fn(&FixtureLabel) -> bool,
	) -> FieldResolution {
		match reference {
			None => FieldResolution::Literal(value.clone()),
			Some(reference) if in_plan(&reference.target) => {
				FieldResolution::SiblingRef(reference.target.clone())
			}
			Some(reference) => FieldResolution::ForeignLiteral(self.foreign_key(reference)),
		}
	}

	/// Returns the literal key a reference is replaced with when its target
	/// is not created by the plan.
	///
	/// The identity is always synthesized from the target's name in the
	/// reference's form, even when the target declares its own `id`.
	pub fn foreign_key(&self, reference: &ResolvedReference) -> ForeignKey {
		if reference.is_uuid_form {
			ForeignKey::Uuid(identify_as_uuid(&reference.target.name))
		} else {
			ForeignKey::Integer(identify_as_integer(&reference.target.name))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::associations::AssociationKind;
	use crate::fixtures::{FieldMap, FixtureTable};
	use rstest::{fixture, rstest};
	use serde_json::json;

	fn table(name: &str, records: Value) -> FixtureTable {
		let mut table = FixtureTable::new(name);
		if let Value::Object(records) = records {
			for (fixture, fields) in records {
				let fields: FieldMap = serde_json::from_value(fields).unwrap();
				table.insert(fixture, fields);
			}
		}
		table
	}

	#[fixture]
	fn store() -> FixtureStore {
		vec![
			table("accounts", json!({"acme": {"name": "Acme"}, "globex": {"id": 42}})),
			table("cards", json!({"card1": {"account": "acme"}})),
			table("admin_users", json!({"root": {}})),
			table("users", json!({"david": {}})),
		]
		.into_iter()
		.collect()
	}

	#[fixture]
	fn index() -> AssociationIndex {
		AssociationIndex::new()
			.with("cards", "account", "accounts", AssociationKind::BelongsTo)
			.with("cards", "creator", "users", AssociationKind::BelongsTo)
	}

	#[rstest]
	#[case(json!("acme"), "account", Some(("accounts", "acme", false)))]
	#[case(json!("acme_uuid"), "account", Some(("accounts", "acme", true)))]
	#[case(json!("david"), "creator", Some(("users", "david", false)))]
	#[case(json!("nobody"), "account", None)]
	#[case(json!("nobody_uuid"), "account", None)]
	#[case(json!(1), "account", None)]
	#[case(json!(null), "account", None)]
	fn test_resolve_through_index(
		store: FixtureStore,
		index: AssociationIndex,
		#[case] value: Value,
		#[case] column: &str,
		#[case] expected: Option<(&str, &str, bool)>,
	) {
		let resolver = ReferenceResolver::new(&store, &index);

		let resolved = resolver.resolve(&value, column, "cards");

		let expected = expected.map(|(table, name, is_uuid_form)| ResolvedReference {
			target: FixtureLabel::new(table, name),
			is_uuid_form,
			polymorphic_type: None,
		});
		assert_eq!(resolved, expected);
	}

	#[rstest]
	#[case("account", json!("acme"), true)]
	#[case("user", json!("david"), true)]
	#[case("account_id", json!("acme"), false)]
	#[case("id", json!("acme"), false)]
	#[case("owner", json!("acme"), false)]
	#[case("name", json!("acme"), false)]
	fn test_resolve_by_column_convention(
		store: FixtureStore,
		#[case] column: &str,
		#[case] value: Value,
		#[case] resolves: bool,
	) {
		let index = AssociationIndex::new();
		let resolver = ReferenceResolver::new(&store, &index);

		assert_eq!(resolver.resolve(&value, column, "comments").is_some(), resolves);
	}

	#[rstest]
	fn test_index_entry_takes_precedence(store: FixtureStore) {
		// `account` would otherwise point at `accounts`
		let index =
			AssociationIndex::new().with("cards", "account", "users", AssociationKind::BelongsTo);
		let resolver = ReferenceResolver::new(&store, &index);

		assert_eq!(resolver.resolve(&json!("acme"), "account", "cards"), None);
		assert_eq!(
			resolver.resolve(&json!("david"), "account", "cards").unwrap().target,
			FixtureLabel::new("users", "david")
		);
	}

	#[rstest]
	fn test_resolve_polymorphic(store: FixtureStore, index: AssociationIndex) {
		let resolver = ReferenceResolver::new(&store, &index);

		let resolved = resolver
			.resolve(&json!("card1 (Card)"), "subject", "events")
			.unwrap();

		assert_eq!(resolved.target, FixtureLabel::new("cards", "card1"));
		assert!(!resolved.is_uuid_form);
		assert_eq!(resolved.polymorphic_type.as_deref(), Some("Card"));
	}

	#[rstest]
	#[case("root (Admin::User)", Some("admin_users"))]
	#[case("acme_uuid (Account)", Some("accounts"))]
	#[case("card9 (Card)", None)]
	#[case("card1 (Widget)", None)]
	fn test_resolve_polymorphic_variants(
		store: FixtureStore,
		index: AssociationIndex,
		#[case] value: &str,
		#[case] table: Option<&str>,
	) {
		let resolver = ReferenceResolver::new(&store, &index);

		let resolved = resolver.resolve(&json!(value), "subject", "events");

		assert_eq!(resolved.map(|r| r.target.table).as_deref(), table);
	}

	#[rstest]
	fn test_references_in_field_order(store: FixtureStore, index: AssociationIndex) {
		let resolver = ReferenceResolver::new(&store, &index);
		let mut fields = FieldMap::new();
		fields.insert("title".to_string(), json!("Hello"));
		fields.insert("creator".to_string(), json!("david"));
		fields.insert("account".to_string(), json!("acme_uuid"));
		let record = FixtureRecord::new("cards", "card2", fields);

		let references = resolver.references(&record);

		let columns: Vec<&str> = references.iter().map(|(column, _)| *column).collect();
		assert_eq!(columns, vec!["creator", "account"]);
	}

	#[rstest]
	fn test_classify(store: FixtureStore, index: AssociationIndex) {
		let resolver = ReferenceResolver::new(&store, &index);
		let acme = FixtureLabel::new("accounts", "acme");

		assert_eq!(
			resolver.classify(&json!("Hello"), "title", "cards", |_| true),
			FieldResolution::Literal(json!("Hello"))
		);
		assert_eq!(
			resolver.classify(&json!("acme"), "account", "cards", |label| *label == acme),
			FieldResolution::SiblingRef(acme.clone())
		);
		assert_eq!(
			resolver.classify(&json!("acme_uuid"), "account", "cards", |_| false),
			FieldResolution::ForeignLiteral(ForeignKey::Uuid(identify_as_uuid("acme")))
		);
		assert_eq!(
			resolver.classify(&json!("acme"), "account", "cards", |_| false),
			FieldResolution::ForeignLiteral(ForeignKey::Integer(identify_as_integer("acme")))
		);
	}

	#[rstest]
	#[case(json!("globex"), ForeignKey::Integer(identify_as_integer("globex")))]
	#[case(json!("globex_uuid"), ForeignKey::Uuid(identify_as_uuid("globex")))]
	fn test_foreign_key_ignores_declared_id(
		store: FixtureStore,
		index: AssociationIndex,
		#[case] value: Value,
		#[case] expected: ForeignKey,
	) {
		// globex declares `id: 42`
		let resolver = ReferenceResolver::new(&store, &index);

		let resolution = resolver.classify(&value, "account", "cards", |_| false);

		assert_eq!(resolution, FieldResolution::ForeignLiteral(expected));
	}

	#[rstest]
	fn test_field_resolution_serialization() {
		let resolution = FieldResolution::ForeignLiteral(ForeignKey::Integer(7));
		assert_eq!(
			serde_json::to_value(&resolution).unwrap(),
			json!({"kind": "foreign_literal", "value": {"kind": "integer", "value": 7}})
		);
		let sibling = FieldResolution::SiblingRef(FixtureLabel::new("accounts", "acme"));
		assert_eq!(
			serde_json::to_value(&sibling).unwrap(),
			json!({"kind": "sibling_ref", "value": "accounts:acme"})
		);
	}
}
