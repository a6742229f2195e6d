//! Association index.
//!
//! Maps each owner table to its declared associations. The metadata comes from
//! outside (the model sources are analysed elsewhere) in the form:
//!
//! ```json
//! {
//!   "Card": {
//!     "associations": [
//!       { "name": "account", "type": "belongs_to" },
//!       { "name": "creator", "type": "belongs_to", "targetHint": "User" }
//!     ]
//!   }
//! }
//! ```
//!
//! The index is advisory: a column without an entry still resolves through
//! naming conventions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FixtureError, FixtureResult};
use crate::inflection::{pluralize, table_name_for_model};

/// Kind of a model association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
	/// The owner holds the foreign key.
	BelongsTo,
	/// The target holds a foreign key to the owner, many targets per owner.
	HasMany,
	/// The target holds a foreign key to the owner, at most one target.
	HasOne,
}

impl AssociationKind {
	/// Parses an association macro name. Unsupported kinds return `None`.
	pub fn parse(kind: &str) -> Option<Self> {
		match kind {
			"belongs_to" => Some(Self::BelongsTo),
			"has_many" => Some(Self::HasMany),
			"has_one" => Some(Self::HasOne),
			_ => None,
		}
	}

	/// Returns the association macro name.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::BelongsTo => "belongs_to",
			Self::HasMany => "has_many",
			Self::HasOne => "has_one",
		}
	}
}

impl fmt::Display for AssociationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A single resolved association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationEntry {
	/// Table the association points at.
	pub target_table: String,
	/// Association kind.
	pub kind: AssociationKind,
}

impl AssociationEntry {
	/// Creates a new entry.
	pub fn new(target_table: impl Into<String>, kind: AssociationKind) -> Self {
		Self {
			target_table: target_table.into(),
			kind,
		}
	}
}

/// An association as declared in the metadata.
#[derive(Debug, Clone, Deserialize)]
struct AssociationDecl {
	name: String,
	#[serde(rename = "type")]
	kind: String,
	#[serde(default, rename = "targetHint", alias = "target_hint")]
	target_hint: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ModelDecl {
	#[serde(default)]
	associations: Vec<AssociationDecl>,
}

/// Owner table -> association name -> entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssociationIndex {
	tables: BTreeMap<String, BTreeMap<String, AssociationEntry>>,
}

impl AssociationIndex {
	/// Creates an empty index.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds the index from model metadata JSON.
	///
	/// # Errors
	///
	/// Returns an error if `content` is not a JSON object of model
	/// declarations.
	pub fn from_json_str(content: &str) -> FixtureResult<Self> {
		let models: BTreeMap<String, ModelDecl> = serde_json::from_str(content)?;
		Ok(Self::from_models(models))
	}

	/// Builds the index from model metadata YAML.
	pub fn from_yaml_str(content: &str) -> FixtureResult<Self> {
		let models: BTreeMap<String, ModelDecl> = serde_yaml::from_str(content)?;
		Ok(Self::from_models(models))
	}

	/// Reads model metadata from a file. `.yml`/`.yaml` files are read as
	/// YAML, anything else as JSON.
	pub fn from_file(path: &Path) -> FixtureResult<Self> {
		if !path.is_file() {
			return Err(FixtureError::FileNotFound(path.display().to_string()));
		}
		let content = std::fs::read_to_string(path)?;
		match path.extension().and_then(|ext| ext.to_str()) {
			Some("yml") | Some("yaml") => Self::from_yaml_str(&content),
			_ => Self::from_json_str(&content),
		}
	}

	fn from_models(models: BTreeMap<String, ModelDecl>) -> Self {
		let mut index = Self::new();
		for (model, decl) in models {
			let owner = table_name_for_model(&model);
			for assoc in decl.associations {
				let Some(kind) = AssociationKind::parse(&assoc.kind) else {
					tracing::debug!(
						"Skipping unsupported association {}.{} ({})",
						model,
						assoc.name,
						assoc.kind
					);
					continue;
				};
				let target = target_table(&assoc.name, kind, assoc.target_hint.as_deref());
				index.insert(&owner, &assoc.name, AssociationEntry::new(target, kind));
			}
		}
		index
	}

	/// Adds or replaces an association of `owner_table`.
	pub fn insert(&mut self, owner_table: &str, association: &str, entry: AssociationEntry) {
		self.tables
			.entry(owner_table.to_string())
			.or_default()
			.insert(association.to_string(), entry);
	}

	/// Adds an association and returns the index, for building in tests and
	/// fixtures of the caller.
	pub fn with(
		mut self,
		owner_table: &str,
		association: &str,
		target_table: &str,
		kind: AssociationKind,
	) -> Self {
		self.insert(owner_table, association, AssociationEntry::new(target_table, kind));
		self
	}

	/// Looks up one association.
	pub fn lookup(&self, owner_table: &str, association: &str) -> Option<&AssociationEntry> {
		self.tables.get(owner_table)?.get(association)
	}

	/// Returns every association of a table, by name.
	pub fn associations(
		&self,
		owner_table: &str,
	) -> impl Iterator<Item = (&str, &AssociationEntry)> {
		self.tables
			.get(owner_table)
			.into_iter()
			.flat_map(|assocs| assocs.iter().map(|(name, entry)| (name.as_str(), entry)))
	}

	/// Returns every `has_one` association as `(owner_table, name, entry)`,
	/// sorted by owner table then name.
	pub fn has_one_entries(&self) -> impl Iterator<Item = (&str, &str, &AssociationEntry)> {
		self.tables.iter().flat_map(|(owner, assocs)| {
			assocs
				.iter()
				.filter(|(_, entry)| entry.kind == AssociationKind::HasOne)
				.map(move |(name, entry)| (owner.as_str(), name.as_str(), entry))
		})
	}

	/// Returns true if `owner_table` declares a `has_one` targeting
	/// `target_table`.
	pub fn has_one_targeting(&self, owner_table: &str, target_table: &str) -> bool {
		self.associations(owner_table).any(|(_, entry)| {
			entry.kind == AssociationKind::HasOne && entry.target_table == target_table
		})
	}

	/// Returns the number of associations across all tables.
	pub fn len(&self) -> usize {
		self.tables.values().map(BTreeMap::len).sum()
	}

	/// Returns true if no associations are declared.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

fn target_table(name: &str, kind: AssociationKind, hint: Option<&str>) -> String {
	if let Some(hint) = hint.filter(|h| !h.is_empty()) {
		return table_name_for_model(hint);
	}
	match kind {
		AssociationKind::BelongsTo | AssociationKind::HasOne => pluralize(name),
		// Already plural by convention
		AssociationKind::HasMany => name.to_string(),
	}
}
