//! Fixture plans.
//!
//! A [`FixturePlan`] is the final product of a resolution: the fixtures to
//! create in order, each with its fields already resolved, followed by the
//! has-one pointers to assign once everything exists. Code generators walk
//! [`FixturePlan::steps`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collector::{BackReferenceAssignment, CollectedUniverse};
use crate::fixtures::{FixtureLabel, FixtureRecord};
use crate::resolver::{FieldResolution, ReferenceResolver};
use crate::sequencer::Sequence;

/// One field of a planned fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedField {
	/// Column the value is written to.
	pub column: String,
	/// How the value is produced.
	pub resolution: FieldResolution,
}

impl ResolvedField {
	/// Creates a resolved field.
	pub fn new(column: impl Into<String>, resolution: FieldResolution) -> Self {
		Self {
			column: column.into(),
			resolution,
		}
	}

	/// Creates a literal field.
	pub fn literal(column: impl Into<String>, value: Value) -> Self {
		Self::new(column, FieldResolution::Literal(value))
	}
}

/// A single instruction of a plan, in execution order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlanStep<'a> {
	/// Suspend foreign-key enforcement.
	DeferForeignKeys,
	/// Create a fixture.
	Insert {
		/// Fixture to create.
		label: &'a FixtureLabel,
		/// Its resolved fields.
		fields: &'a [ResolvedField],
	},
	/// Point a `has_one` owner at its child.
	AssignBackReference(&'a BackReferenceAssignment),
	/// Re-enable foreign-key enforcement.
	RestoreForeignKeys,
}

/// Ordered instructions for creating a set of fixtures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixturePlan {
	/// Every fixture to create, in creation order.
	pub order: Vec<FixtureLabel>,
	/// Resolved fields of each fixture.
	pub resolved_fields: BTreeMap<FixtureLabel, Vec<ResolvedField>>,
	/// Pointers assigned after all inserts.
	pub back_references: Vec<BackReferenceAssignment>,
	/// Table creation order.
	pub table_order: Vec<String>,
	/// Tables whose order could not be guaranteed.
	pub cyclic_tables: Vec<String>,
	/// Inserts must run with foreign-key enforcement deferred.
	pub defer_foreign_keys: bool,
}

impl FixturePlan {
	/// Returns true if there is nothing to create.
	///
	/// An empty plan is not an error; the test simply needs no setup.
	pub fn is_empty(&self) -> bool {
		self.order.is_empty()
	}

	/// Returns the number of fixtures to create.
	pub fn len(&self) -> usize {
		self.order.len()
	}

	/// Returns the position of a fixture in creation order.
	pub fn position(&self, label: &FixtureLabel) -> Option<usize> {
		self.order.iter().position(|l| l == label)
	}

	/// Returns the resolved fields of a fixture.
	pub fn fields(&self, label: &FixtureLabel) -> Option<&[ResolvedField]> {
		self.resolved_fields.get(label).map(Vec::as_slice)
	}

	/// Returns the resolution of one column of a fixture.
	pub fn field(&self, label: &FixtureLabel, column: &str) -> Option<&FieldResolution> {
		self.fields(label)?
			.iter()
			.find(|field| field.column == column)
			.map(|field| &field.resolution)
	}

	/// Returns the plan as execution steps.
	///
	/// Inserts and back-reference assignments are bracketed by
	/// [`PlanStep::DeferForeignKeys`] and [`PlanStep::RestoreForeignKeys`]
	/// when the plan defers foreign keys.
	pub fn steps(&self) -> Vec<PlanStep<'_>> {
		let mut steps = Vec::with_capacity(self.order.len() + self.back_references.len() + 2);
		if self.defer_foreign_keys {
			steps.push(PlanStep::DeferForeignKeys);
		}
		for label in &self.order {
			let fields = self.fields(label).unwrap_or_default();
			steps.push(PlanStep::Insert { label, fields });
		}
		steps.extend(self.back_references.iter().map(PlanStep::AssignBackReference));
		if self.defer_foreign_keys {
			steps.push(PlanStep::RestoreForeignKeys);
		}
		steps
	}

	/// Returns `"table:name" -> "table_name"` for every planned fixture.
	///
	/// Generated code refers to fixtures by the flat identifier; the map
	/// carries no ordering information.
	pub fn replacement_map(&self) -> BTreeMap<String, String> {
		self.order
			.iter()
			.map(|label| (label.to_string(), label.identifier()))
			.collect()
	}
}

/// Builds a [`FixturePlan`] from a collected universe and its sequence.
#[derive(Debug, Clone, Copy)]
pub struct PlanEmitter<'a> {
	resolver: ReferenceResolver<'a>,
}

impl<'a> PlanEmitter<'a> {
	/// Creates an emitter.
	pub fn new(resolver: ReferenceResolver<'a>) -> Self {
		Self { resolver }
	}

	/// Emits the plan. Tables are visited in sequence order and fixtures of
	/// a table in store order.
	pub fn emit(&self, universe: &CollectedUniverse, sequence: &Sequence) -> FixturePlan {
		let mut plan = FixturePlan {
			table_order: sequence.tables.clone(),
			cyclic_tables: sequence.cyclic_tables.clone(),
			back_references: universe.back_references().to_vec(),
			defer_foreign_keys: true,
			..FixturePlan::default()
		};

		for table in &sequence.tables {
			let Some(fixtures) = self.resolver.store().table(table) else {
				continue;
			};
			for record in fixtures.records() {
				let label = record.label();
				if !universe.contains(&label) {
					continue;
				}
				let fields = self.resolve_fields(record, universe);
				plan.order.push(label.clone());
				plan.resolved_fields.insert(label, fields);
			}
		}

		plan
	}

	fn resolve_fields(
		&self,
		record: &FixtureRecord,
		universe: &CollectedUniverse,
	) -> Vec<ResolvedField> {
		let mut fields = Vec::with_capacity(record.fields.len());

		for (column, value) in &record.fields {
			let reference = self.resolver.resolve(value, column, &record.table);
			let resolution =
				self.resolver
					.resolution_for(value, reference.as_ref(), |label| universe.contains(label));

			let target_column = match resolution {
				FieldResolution::ForeignLiteral(_) => foreign_key_column(column),
				_ => column.clone(),
			};
			fields.push(ResolvedField::new(target_column, resolution));

			if let Some(type_name) = reference.and_then(|r| r.polymorphic_type) {
				fields.push(ResolvedField::literal(
					format!("{}_type", column),
					Value::String(type_name),
				));
			}
		}

		fields
	}
}

/// `account` -> `account_id`; columns already ending in `_id` are kept.
pub fn foreign_key_column(column: &str) -> String {
	if column.ends_with("_id") {
		column.to_string()
	} else {
		format!("{}_id", column)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::resolver::ForeignKey;
	use pretty_assertions::assert_eq;
	use rstest::{fixture, rstest};
	use serde_json::json;

	fn label(s: &str) -> FixtureLabel {
		s.parse().unwrap()
	}

	#[fixture]
	fn plan() -> FixturePlan {
		let acme = label("accounts:acme");
		let card = label("cards:card1");
		let mut resolved_fields = BTreeMap::new();
		resolved_fields.insert(acme.clone(), vec![ResolvedField::literal("name", json!("Acme"))]);
		resolved_fields.insert(
			card.clone(),
			vec![ResolvedField::new(
				"account",
				FieldResolution::SiblingRef(acme.clone()),
			)],
		);
		FixturePlan {
			order: vec![acme.clone(), card.clone()],
			resolved_fields,
			back_references: vec![BackReferenceAssignment {
				parent: acme,
				association: "first_card".to_string(),
				child: card,
			}],
			table_order: vec!["accounts".to_string(), "cards".to_string()],
			cyclic_tables: Vec::new(),
			defer_foreign_keys: true,
		}
	}

	#[rstest]
	#[case("account", "account_id")]
	#[case("account_id", "account_id")]
	#[case("subject", "subject_id")]
	fn test_foreign_key_column(#[case] column: &str, #[case] expected: &str) {
		assert_eq!(foreign_key_column(column), expected);
	}

	#[rstest]
	fn test_steps_are_bracketed(plan: FixturePlan) {
		let steps = plan.steps();

		assert_eq!(steps.len(), 5);
		assert_eq!(steps[0], PlanStep::DeferForeignKeys);
		assert!(matches!(
			steps[1],
			PlanStep::Insert { label, .. } if label.table == "accounts"
		));
		assert!(matches!(
			steps[2],
			PlanStep::Insert { label, fields } if label.table == "cards" && fields.len() == 1
		));
		assert!(matches!(steps[3], PlanStep::AssignBackReference(_)));
		assert_eq!(steps[4], PlanStep::RestoreForeignKeys);
	}

	#[rstest]
	fn test_steps_without_deferral(mut plan: FixturePlan) {
		plan.defer_foreign_keys = false;

		let steps = plan.steps();

		assert_eq!(steps.len(), 3);
		assert!(matches!(steps[0], PlanStep::Insert { .. }));
	}

	#[rstest]
	fn test_replacement_map(plan: FixturePlan) {
		let map = plan.replacement_map();

		assert_eq!(
			map.into_iter().collect::<Vec<_>>(),
			vec![
				("accounts:acme".to_string(), "accounts_acme".to_string()),
				("cards:card1".to_string(), "cards_card1".to_string()),
			]
		);
	}

	#[rstest]
	fn test_field_lookup(plan: FixturePlan) {
		let card = label("cards:card1");

		assert_eq!(
			plan.field(&card, "account"),
			Some(&FieldResolution::SiblingRef(label("accounts:acme")))
		);
		assert_eq!(plan.field(&card, "title"), None);
		assert_eq!(plan.position(&card), Some(1));
		assert_eq!(plan.len(), 2);
	}

	#[rstest]
	fn test_empty_plan() {
		let plan = FixturePlan::default();

		assert!(plan.is_empty());
		assert!(plan.replacement_map().is_empty());
		assert!(plan.steps().is_empty());
	}

	#[rstest]
	fn test_plan_json_shape(plan: FixturePlan) {
		let value = serde_json::to_value(&plan).unwrap();

		assert_eq!(value["order"], json!(["accounts:acme", "cards:card1"]));
		assert_eq!(
			value["resolved_fields"]["cards:card1"],
			json!([{"column": "account", "resolution": {"kind": "sibling_ref", "value": "accounts:acme"}}])
		);
		assert_eq!(value["defer_foreign_keys"], json!(true));

		let parsed: FixturePlan = serde_json::from_value(value).unwrap();
		assert_eq!(parsed, plan);
	}

	#[rstest]
	fn test_foreign_literal_serialization() {
		let field = ResolvedField::new(
			"account_id",
			FieldResolution::ForeignLiteral(ForeignKey::Uuid("abc".to_string())),
		);

		assert_eq!(
			serde_json::to_value(&field).unwrap(),
			json!({"column": "account_id", "resolution": {"kind": "foreign_literal", "value": {"kind": "uuid", "value": "abc"}}})
		);
	}
}
