//! Fixture parsing functionality.
//!
//! This module turns the source of one fixture file into a [`FixtureTable`].
//! The file is a mapping from fixture name to a mapping of fields, in YAML
//! or JSON. Embedded expressions are evaluated before parsing.

use std::path::Path;

use serde_json::{Map, Value};

use super::{ExpressionEvaluator, FieldMap, FixtureFormat, FixtureTable};
use crate::error::SourceParseError;

/// Entry holding YAML anchors for other fixtures; never a fixture itself.
const DEFAULTS_KEY: &str = "DEFAULTS";

/// Entry holding per-file fixture metadata; never a fixture itself.
const META_KEY: &str = "_fixture";

/// Token replaced with the fixture's own name.
const LABEL_TOKEN: &str = "$LABEL";

/// Parser for fixture files.
#[derive(Debug, Clone, Default)]
pub struct FixtureParser {
	evaluator: ExpressionEvaluator,
}

impl FixtureParser {
	/// Creates a parser with the given expression evaluator.
	pub fn new(evaluator: ExpressionEvaluator) -> Self {
		Self { evaluator }
	}

	/// Parses a fixture file into the named table.
	///
	/// The format is detected from the file extension.
	///
	/// # Errors
	///
	/// Returns an error if the file cannot be read, has an unknown extension,
	/// or its content is not a valid fixture document.
	pub fn parse_file(&self, path: &Path, table: &str) -> Result<FixtureTable, SourceParseError> {
		let format = FixtureFormat::from_path(path).ok_or_else(|| {
			SourceParseError::new(table, "Unsupported file extension").with_path(path)
		})?;

		let content = std::fs::read_to_string(path).map_err(|e| {
			SourceParseError::new(table, format!("Failed to read file: {}", e)).with_path(path)
		})?;

		self.parse_str(table, &content, format)
			.map_err(|e| e.with_path(path))
	}

	/// Parses fixture source text into the named table.
	pub fn parse_str(
		&self,
		table: &str,
		content: &str,
		format: FixtureFormat,
	) -> Result<FixtureTable, SourceParseError> {
		let evaluated = self.evaluator.evaluate(content);
		let document = match format {
			FixtureFormat::Yaml => self.parse_yaml(table, &evaluated)?,
			FixtureFormat::Json => self.parse_json(table, &evaluated)?,
		};

		self.build_table(table, document)
	}

	fn parse_yaml(&self, table: &str, content: &str) -> Result<Map<String, Value>, SourceParseError> {
		let mut value: serde_yaml::Value = serde_yaml::from_str(content)
			.map_err(|e| SourceParseError::new(table, e.to_string()))?;
		value
			.apply_merge()
			.map_err(|e| SourceParseError::new(table, e.to_string()))?;

		match value {
			serde_yaml::Value::Null => Ok(Map::new()),
			serde_yaml::Value::Mapping(mapping) => yaml_mapping_to_json(table, mapping),
			_ => Err(SourceParseError::new(
				table,
				"Expected a mapping of fixture names",
			)),
		}
	}

	fn parse_json(&self, table: &str, content: &str) -> Result<Map<String, Value>, SourceParseError> {
		if content.trim().is_empty() {
			return Ok(Map::new());
		}
		match serde_json::from_str::<Value>(content) {
			Ok(Value::Object(map)) => Ok(map),
			Ok(_) => Err(SourceParseError::new(
				table,
				"Expected an object of fixture names",
			)),
			Err(e) => Err(SourceParseError::new(table, e.to_string())),
		}
	}

	fn build_table(
		&self,
		table: &str,
		document: Map<String, Value>,
	) -> Result<FixtureTable, SourceParseError> {
		let ignored = ignored_entries(&document);
		let mut fixtures = FixtureTable::new(table);

		for (name, body) in document {
			if name == DEFAULTS_KEY || name == META_KEY || ignored.contains(&name) {
				continue;
			}

			let fields = match body {
				Value::Null => FieldMap::new(),
				Value::Object(map) => map
					.into_iter()
					.map(|(column, value)| (column, interpolate_label(value, &name)))
					.collect(),
				_ => {
					return Err(SourceParseError::new(
						table,
						format!("Fixture '{}' is not a mapping of fields", name),
					));
				}
			};

			fixtures.insert(name, fields);
		}

		Ok(fixtures)
	}
}

/// Names listed under `_fixture: { ignore: [...] }`.
fn ignored_entries(document: &Map<String, Value>) -> Vec<String> {
	let Some(ignore) = document.get(META_KEY).and_then(|meta| meta.get("ignore")) else {
		return Vec::new();
	};
	match ignore {
		Value::String(name) => vec![name.clone()],
		Value::Array(names) => names
			.iter()
			.filter_map(|name| name.as_str().map(str::to_string))
			.collect(),
		_ => Vec::new(),
	}
}

fn interpolate_label(value: Value, name: &str) -> Value {
	match value {
		Value::String(s) if s.contains(LABEL_TOKEN) => Value::String(s.replace(LABEL_TOKEN, name)),
		Value::Array(items) => Value::Array(
			items
				.into_iter()
				.map(|item| interpolate_label(item, name))
				.collect(),
		),
		Value::Object(map) => Value::Object(
			map.into_iter()
				.map(|(k, v)| (k, interpolate_label(v, name)))
				.collect(),
		),
		other => other,
	}
}

/// Renders a YAML key as a string; fixture names like `1:` or `yes:` are
/// valid YAML keys of non-string type.
fn yaml_key(key: &serde_yaml::Value) -> Option<String> {
	match key {
		serde_yaml::Value::String(s) => Some(s.clone()),
		serde_yaml::Value::Number(n) => Some(n.to_string()),
		serde_yaml::Value::Bool(b) => Some(b.to_string()),
		_ => None,
	}
}

fn yaml_mapping_to_json(
	table: &str,
	mapping: serde_yaml::Mapping,
) -> Result<Map<String, Value>, SourceParseError> {
	let mut map = Map::new();
	for (key, value) in mapping {
		let key = yaml_key(&key)
			.ok_or_else(|| SourceParseError::new(table, format!("Unsupported key {:?}", key)))?;
		map.insert(key, yaml_to_json(table, value)?);
	}
	Ok(map)
}

fn yaml_to_json(table: &str, value: serde_yaml::Value) -> Result<Value, SourceParseError> {
	Ok(match value {
		serde_yaml::Value::Null => Value::Null,
		serde_yaml::Value::Bool(b) => Value::Bool(b),
		serde_yaml::Value::Number(n) => serde_json::to_value(&n)
			.map_err(|e| SourceParseError::new(table, e.to_string()))?,
		serde_yaml::Value::String(s) => Value::String(s),
		serde_yaml::Value::Sequence(items) => Value::Array(
			items
				.into_iter()
				.map(|item| yaml_to_json(table, item))
				.collect::<Result<_, _>>()?,
		),
		serde_yaml::Value::Mapping(mapping) => Value::Object(yaml_mapping_to_json(table, mapping)?),
		serde_yaml::Value::Tagged(tagged) => yaml_to_json(table, tagged.value)?,
	})
}
