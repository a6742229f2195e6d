//! Fixture directory loader.
//!
//! This module provides the `FixtureLoader` for discovering fixture files
//! on disk and assembling them into a [`FixtureStore`].

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{ExpressionEvaluator, FixtureParser, FixtureStore};
use crate::config::LoaderOptions;
use crate::error::{FixtureError, FixtureResult, SourceParseError};
use crate::inflection::underscore;

/// Result of loading a fixture directory.
///
/// Files that failed to parse are left out of the store and listed in
/// `warnings`.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
	/// Every fixture that loaded successfully.
	pub store: FixtureStore,
	/// One entry per skipped file.
	pub warnings: Vec<SourceParseError>,
}

impl LoadReport {
	/// Returns true if every discovered file loaded.
	pub fn is_clean(&self) -> bool {
		self.warnings.is_empty()
	}
}

/// Loader for a directory of fixture files, one file per table.
#[derive(Debug, Clone)]
pub struct FixtureLoader {
	options: LoaderOptions,
	parser: FixtureParser,
}

impl FixtureLoader {
	/// Create a new loader.
	///
	/// Embedded time expressions use `options.now`, or the wall clock when
	/// unset.
	pub fn new(options: LoaderOptions) -> Self {
		let evaluator = match options.now {
			Some(now) => ExpressionEvaluator::new(now),
			None => ExpressionEvaluator::default(),
		};
		Self {
			options,
			parser: FixtureParser::new(evaluator),
		}
	}

	/// Get the loader options.
	pub fn options(&self) -> &LoaderOptions {
		&self.options
	}

	/// Load every fixture file under `dir`.
	///
	/// Files are visited recursively in sorted path order. A file that fails
	/// to parse is skipped with a warning; it never aborts the load.
	///
	/// # Errors
	///
	/// Returns an error if `dir` does not exist or cannot be walked.
	pub fn load_dir(&self, dir: &Path) -> FixtureResult<LoadReport> {
		if !dir.is_dir() {
			return Err(FixtureError::FileNotFound(dir.display().to_string()));
		}

		let mut report = LoadReport::default();

		for path in self.discover(dir)? {
			let Some(table) = table_name_for_path(dir, &path) else {
				tracing::debug!("Skipping file without a usable name: {}", path.display());
				continue;
			};

			match self.parser.parse_file(&path, &table) {
				Ok(fixtures) => {
					tracing::debug!(
						"Loaded {} fixtures for table {} from {}",
						fixtures.len(),
						table,
						path.display()
					);
					report.store.insert_table(fixtures);
				}
				Err(e) => {
					tracing::warn!("Skipping fixture file: {}", e);
					report.warnings.push(e);
				}
			}
		}

		tracing::info!(
			"Loaded {} fixtures in {} tables from {} ({} files skipped)",
			report.store.fixture_count(),
			report.store.table_count(),
			dir.display(),
			report.warnings.len()
		);
		Ok(report)
	}

	/// Returns fixture files under `dir`, sorted by path.
	fn discover(&self, dir: &Path) -> FixtureResult<Vec<PathBuf>> {
		let mut files = Vec::new();
		for entry in WalkDir::new(dir).sort_by_file_name() {
			let entry = entry.map_err(|e| {
				FixtureError::Io(std::io::Error::other(format!(
					"Failed to walk fixture directory: {}",
					e
				)))
			})?;
			if !entry.file_type().is_file() {
				continue;
			}
			let accepted = entry
				.path()
				.extension()
				.and_then(|ext| ext.to_str())
				.is_some_and(|ext| self.options.accepts_extension(ext));
			if accepted {
				files.push(entry.into_path());
			}
		}
		files.sort();
		Ok(files)
	}
}

impl Default for FixtureLoader {
	fn default() -> Self {
		Self::new(LoaderOptions::default())
	}
}

/// Derives the table name of a fixture file relative to the fixture root.
///
/// Directory segments are underscored and joined to the file stem with `_`,
/// so `admin/users.yml` populates `admin_users`.
///
/// # Example
///
/// ```
/// # use std::path::Path;
/// # use fixture_graph::fixtures::table_name_for_path;
/// let root = Path::new("test/fixtures");
/// assert_eq!(
///     table_name_for_path(root, Path::new("test/fixtures/admin/users.yml")).as_deref(),
///     Some("admin_users")
/// );
/// ```
pub fn table_name_for_path(root: &Path, path: &Path) -> Option<String> {
	let relative = path.strip_prefix(root).unwrap_or(path);
	let stem = relative.file_stem()?.to_str()?;
	if stem.is_empty() {
		return None;
	}

	let mut segments: Vec<String> = match relative.parent() {
		Some(parent) => parent
			.components()
			.filter_map(|c| c.as_os_str().to_str())
			.map(underscore)
			.collect(),
		None => Vec::new(),
	};
	segments.push(stem.to_string());
	Some(segments.join("_"))
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("fixtures/accounts.yml", Some("accounts"))]
	#[case("fixtures/admin/users.yml", Some("admin_users"))]
	#[case("fixtures/Billing/line_items.json", Some("billing_line_items"))]
	#[case("fixtures/a/b/c.yaml", Some("a_b_c"))]
	fn test_table_name_for_path(#[case] path: &str, #[case] expected: Option<&str>) {
		let table = table_name_for_path(Path::new("fixtures"), Path::new(path));
		assert_eq!(table.as_deref(), expected);
	}

	#[rstest]
	fn test_missing_directory_is_error() {
		let loader = FixtureLoader::default();
		let result = loader.load_dir(Path::new("/nonexistent/fixtures"));
		assert!(matches!(result, Err(FixtureError::FileNotFound(_))));
	}

	#[rstest]
	fn test_report_is_clean() {
		let report = LoadReport::default();
		assert!(report.is_clean());
		assert!(report.store.is_empty());
	}
}
