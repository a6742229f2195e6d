//! Error types for fixture loading and resolution.
//!
//! Resolution itself never fails: unresolvable references become literals and
//! cyclic tables fall back to a deterministic order. The errors here cover the
//! edges of the system (reading files, parsing metadata, validating input).

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading fixtures or preparing a resolution.
#[derive(Debug, Error)]
pub enum FixtureError {
	/// Fixture directory or input file was not found.
	#[error("Fixture path not found: {0}")]
	FileNotFound(String),

	/// A label string was not in `table:name` form.
	#[error("Invalid fixture label '{0}': expected 'table:name'")]
	InvalidLabel(String),

	/// Validation failed for a specific argument.
	#[error("Validation error: {field}: {message}")]
	Validation {
		/// Argument that failed validation.
		field: String,
		/// Validation error message.
		message: String,
	},

	/// I/O operation failed.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	/// YAML deserialization error (association metadata in YAML form).
	#[error("YAML error: {0}")]
	Yaml(#[from] serde_yaml::Error),

	/// Configuration file could not be parsed.
	#[error("Config error: {0}")]
	Config(#[from] toml::de::Error),
}

/// Result type alias for fixture operations.
pub type FixtureResult<T> = Result<T, FixtureError>;

/// A fixture source file that failed to parse.
///
/// The loader skips the offending file and keeps going, so this is usually
/// reported as a warning rather than propagated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Failed to parse fixtures for table '{table}'{}: {message}", display_path(.path))]
pub struct SourceParseError {
	/// Table the file would have populated.
	pub table: String,
	/// Source file, when parsing from disk.
	pub path: Option<PathBuf>,
	/// Parser message.
	pub message: String,
}

impl SourceParseError {
	/// Creates a parse error for the given table.
	pub fn new(table: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			table: table.into(),
			path: None,
			message: message.into(),
		}
	}

	/// Attaches the source file path.
	pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.path = Some(path.into());
		self
	}
}

fn display_path(path: &Option<PathBuf>) -> String {
	path.as_ref()
		.map(|p| format!(" ({})", p.display()))
		.unwrap_or_default()
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_invalid_label_error() {
		let error = FixtureError::InvalidLabel("accounts".to_string());
		assert_eq!(
			error.to_string(),
			"Invalid fixture label 'accounts': expected 'table:name'"
		);
	}

	#[rstest]
	fn test_validation_error() {
		let error = FixtureError::Validation {
			field: "fixture_dir".to_string(),
			message: "must be a directory".to_string(),
		};
		assert_eq!(
			error.to_string(),
			"Validation error: fixture_dir: must be a directory"
		);
	}

	#[rstest]
	#[case(None, "Failed to parse fixtures for table 'cards': bad indent")]
	#[case(
		Some("fixtures/cards.yml"),
		"Failed to parse fixtures for table 'cards' (fixtures/cards.yml): bad indent"
	)]
	fn test_source_parse_error_display(#[case] path: Option<&str>, #[case] expected: &str) {
		let mut error = SourceParseError::new("cards", "bad indent");
		if let Some(path) = path {
			error = error.with_path(path);
		}
		assert_eq!(error.to_string(), expected);
	}

	#[rstest]
	fn test_io_error_from() {
		let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
		let fixture_error: FixtureError = io_error.into();
		assert!(matches!(fixture_error, FixtureError::Io(_)));
	}

	#[rstest]
	fn test_json_error_from() {
		let json_error: serde_json::Error =
			serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
		let fixture_error: FixtureError = json_error.into();
		assert!(matches!(fixture_error, FixtureError::Json(_)));
	}
}
