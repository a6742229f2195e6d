//! plan command implementation.
//!
//! This command loads a fixture directory and resolves it into a
//! [`FixturePlan`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::associations::AssociationIndex;
use crate::config::ResolverConfig;
use crate::error::{FixtureError, FixtureResult, SourceParseError};
use crate::fixtures::{FixtureLabel, FixtureLoader};
use crate::plan::FixturePlan;
use crate::resolution::FixtureResolver;
use crate::seed::SeedSet;

/// Arguments for the plan command.
#[derive(Debug, Clone, Default)]
pub struct PlanArgs {
	/// Directory holding one fixture file per table.
	pub fixture_dir: PathBuf,

	/// Association metadata file (JSON or YAML).
	pub associations: Option<PathBuf>,

	/// Test source whose fixture accessor calls seed the plan.
	pub test_source: Option<PathBuf>,

	/// Explicit seed labels (`table:name`).
	pub labels: Vec<String>,
}

/// Options for the plan command.
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
	/// Resolver configuration.
	pub config: ResolverConfig,

	/// Fixtures already created elsewhere (`table:name`).
	pub exclude: Vec<String>,

	/// Verbosity level.
	pub verbosity: u8,
}

impl PlanOptions {
	/// Creates new default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the resolver configuration.
	pub fn with_config(mut self, config: ResolverConfig) -> Self {
		self.config = config;
		self
	}

	/// Sets the fixtures to leave out of the plan.
	pub fn with_exclude(mut self, labels: Vec<String>) -> Self {
		self.exclude = labels;
		self
	}

	/// Sets verbosity level.
	pub fn with_verbosity(mut self, level: u8) -> Self {
		self.verbosity = level;
		self
	}
}

/// Output of the plan command.
#[derive(Debug, Clone, Serialize)]
pub struct PlanOutput {
	/// The resolved plan.
	pub plan: FixturePlan,
	/// `"table:name" -> "table_name"` for every planned fixture.
	pub replacement_map: BTreeMap<String, String>,
	/// Fixture files that were skipped.
	#[serde(serialize_with = "serialize_warnings")]
	pub warnings: Vec<SourceParseError>,
}

fn serialize_warnings<S: serde::Serializer>(
	warnings: &[SourceParseError],
	serializer: S,
) -> Result<S::Ok, S::Error> {
	serializer.collect_seq(warnings.iter().map(ToString::to_string))
}

/// The plan command for resolving fixtures into an insertion plan.
///
/// # Example
///
/// ```ignore
/// let command = PlanCommand::new();
/// let args = PlanArgs {
///     fixture_dir: PathBuf::from("test/fixtures"),
///     test_source: Some(PathBuf::from("test/models/card_test.rb")),
///     ..PlanArgs::default()
/// };
/// let output = command.execute(args, PlanOptions::new())?;
/// println!("{} fixtures", output.plan.len());
/// ```
#[derive(Debug, Default)]
pub struct PlanCommand;

impl PlanCommand {
	/// Creates a new plan command.
	pub fn new() -> Self {
		Self
	}

	/// Returns the command name.
	pub fn name(&self) -> &str {
		"plan"
	}

	/// Returns the command description.
	pub fn description(&self) -> &str {
		"Resolves fixtures into a dependency-ordered insertion plan"
	}

	/// Returns the command help text.
	pub fn help(&self) -> &str {
		r#"
Usage: plan [options] FIXTURE_DIR [LABEL ...]

Resolves fixtures into a dependency-ordered insertion plan.

Arguments:
  FIXTURE_DIR            Directory with one fixture file per table
  LABEL                  Seed fixtures as table:name (default: all fixtures)

Options:
  --associations FILE    Association metadata (JSON or YAML)
  --test-source FILE     Seed from the fixture accessors used by a test
  --exclude LABEL        Fixture created elsewhere (repeatable)
  --config FILE          Resolver configuration (TOML)
  --reverse-closure RULE any-reference, has-one-only or disabled
  --max-reverse-passes N Cap on reverse closure passes
  -v, --verbosity        Increase verbosity (repeatable)
"#
	}

	/// Executes the plan command.
	///
	/// Seeds come from explicit labels if any are given, else from the test
	/// source, else every fixture is planned.
	///
	/// # Errors
	///
	/// Returns an error if the fixture directory or an input file is
	/// missing, a label is malformed, or the association metadata is invalid.
	/// Unparsable fixture files are not errors; they are reported in
	/// [`PlanOutput::warnings`].
	pub fn execute(&self, args: PlanArgs, options: PlanOptions) -> FixtureResult<PlanOutput> {
		if args.fixture_dir.as_os_str().is_empty() {
			return Err(FixtureError::Validation {
				field: "fixture_dir".to_string(),
				message: "A fixture directory must be specified".to_string(),
			});
		}
		if !args.fixture_dir.exists() {
			return Err(FixtureError::FileNotFound(args.fixture_dir.display().to_string()));
		}
		if !args.fixture_dir.is_dir() {
			return Err(FixtureError::Validation {
				field: "fixture_dir".to_string(),
				message: format!("{} is not a directory", args.fixture_dir.display()),
			});
		}

		let labels = parse_labels(&args.labels)?;
		let exclude = parse_labels(&options.exclude)?;

		let index = match &args.associations {
			Some(path) => AssociationIndex::from_file(path)?,
			None => AssociationIndex::new(),
		};

		let loader = FixtureLoader::new(options.config.loader.clone());
		let report = loader.load_dir(&args.fixture_dir)?;

		let seed = if !labels.is_empty() {
			SeedSet::Labels(labels)
		} else if let Some(path) = &args.test_source {
			if !path.is_file() {
				return Err(FixtureError::FileNotFound(path.display().to_string()));
			}
			let source = std::fs::read_to_string(path)?;
			SeedSet::from_test_source(&source, &report.store)
		} else {
			SeedSet::All
		};

		let plan = FixtureResolver::new(&report.store, &index, &options.config)
			.with_excluded(exclude)
			.resolve(&seed);

		if plan.is_empty() {
			tracing::info!("No fixtures to plan");
		}
		if options.verbosity > 0 {
			self.log_summary(&plan, &report.warnings);
		}

		Ok(PlanOutput {
			replacement_map: plan.replacement_map(),
			plan,
			warnings: report.warnings,
		})
	}

	fn log_summary(&self, plan: &FixturePlan, warnings: &[SourceParseError]) {
		tracing::info!(
			"Planned {} fixture(s) in {} table(s)",
			plan.len(),
			plan.table_order.len()
		);
		if !plan.cyclic_tables.is_empty() {
			tracing::info!("Cyclic tables: {}", plan.cyclic_tables.join(", "));
		}
		for warning in warnings {
			tracing::info!("Skipped: {}", warning);
		}
	}
}

fn parse_labels(raw: &[String]) -> FixtureResult<Vec<FixtureLabel>> {
	raw.iter().map(|label| label.parse()).collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};
	use std::fs;
	use tempfile::TempDir;

	#[fixture]
	fn fixture_dir() -> TempDir {
		let dir = TempDir::new().unwrap();
		fs::write(dir.path().join("accounts.yml"), "acme:\n  name: Acme\nglobex:\n  name: Globex\n")
			.unwrap();
		fs::write(dir.path().join("cards.yml"), "card1:\n  account: acme\n").unwrap();
		fs::write(dir.path().join("broken.yml"), "oops: [\n").unwrap();
		dir
	}

	#[rstest]
	fn test_command_metadata() {
		let cmd = PlanCommand::new();
		assert_eq!(cmd.name(), "plan");
		assert!(!cmd.description().is_empty());
		assert!(!cmd.help().is_empty());
	}

	#[rstest]
	fn test_options_builder() {
		let options = PlanOptions::new()
			.with_exclude(vec!["accounts:acme".to_string()])
			.with_verbosity(2);

		assert_eq!(options.exclude, vec!["accounts:acme".to_string()]);
		assert_eq!(options.verbosity, 2);
	}

	#[rstest]
	fn test_execute_empty_dir_argument() {
		let result = PlanCommand::new().execute(PlanArgs::default(), PlanOptions::new());
		assert!(matches!(result, Err(FixtureError::Validation { .. })));
	}

	#[rstest]
	fn test_execute_nonexistent_dir() {
		let args = PlanArgs {
			fixture_dir: PathBuf::from("/nonexistent/fixtures"),
			..PlanArgs::default()
		};
		let result = PlanCommand::new().execute(args, PlanOptions::new());
		assert!(matches!(result, Err(FixtureError::FileNotFound(_))));
	}

	#[rstest]
	fn test_execute_invalid_label(fixture_dir: TempDir) {
		let args = PlanArgs {
			fixture_dir: fixture_dir.path().to_path_buf(),
			labels: vec!["acme".to_string()],
			..PlanArgs::default()
		};
		let result = PlanCommand::new().execute(args, PlanOptions::new());
		assert!(matches!(result, Err(FixtureError::InvalidLabel(_))));
	}

	#[rstest]
	fn test_execute_all(fixture_dir: TempDir) {
		let args = PlanArgs {
			fixture_dir: fixture_dir.path().to_path_buf(),
			..PlanArgs::default()
		};

		let output = PlanCommand::new().execute(args, PlanOptions::new()).unwrap();

		assert_eq!(output.plan.len(), 3);
		assert_eq!(output.plan.table_order, vec!["accounts", "cards"]);
		assert_eq!(output.warnings.len(), 1);
		assert_eq!(output.warnings[0].table, "broken");
		assert_eq!(
			output.replacement_map.get("cards:card1").map(String::as_str),
			Some("cards_card1")
		);
	}

	#[rstest]
	fn test_execute_with_labels(fixture_dir: TempDir) {
		let args = PlanArgs {
			fixture_dir: fixture_dir.path().to_path_buf(),
			labels: vec!["cards:card1".to_string()],
			..PlanArgs::default()
		};

		let output = PlanCommand::new().execute(args, PlanOptions::new()).unwrap();

		assert_eq!(
			output.plan.order,
			vec![
				FixtureLabel::new("accounts", "acme"),
				FixtureLabel::new("cards", "card1"),
			]
		);
	}

	#[rstest]
	fn test_execute_with_test_source(fixture_dir: TempDir) {
		let source = fixture_dir.path().join("card_test.rb");
		fs::write(&source, "test 'x' do\n  assert accounts(:globex)\nend\n").unwrap();
		let args = PlanArgs {
			fixture_dir: fixture_dir.path().to_path_buf(),
			test_source: Some(source),
			..PlanArgs::default()
		};

		let output = PlanCommand::new().execute(args, PlanOptions::new()).unwrap();

		assert_eq!(output.plan.order, vec![FixtureLabel::new("accounts", "globex")]);
	}

	#[rstest]
	fn test_execute_with_exclude(fixture_dir: TempDir) {
		let args = PlanArgs {
			fixture_dir: fixture_dir.path().to_path_buf(),
			labels: vec!["cards:card1".to_string()],
			..PlanArgs::default()
		};
		let options = PlanOptions::new().with_exclude(vec!["accounts:acme".to_string()]);

		let output = PlanCommand::new().execute(args, options).unwrap();

		assert_eq!(output.plan.order, vec![FixtureLabel::new("cards", "card1")]);
		let card = FixtureLabel::new("cards", "card1");
		assert!(output.plan.field(&card, "account").is_none());
		assert!(output.plan.field(&card, "account_id").is_some());
	}

	#[rstest]
	fn test_output_serializes_warnings_as_messages(fixture_dir: TempDir) {
		let args = PlanArgs {
			fixture_dir: fixture_dir.path().to_path_buf(),
			..PlanArgs::default()
		};

		let output = PlanCommand::new().execute(args, PlanOptions::new()).unwrap();
		let value = serde_json::to_value(&output).unwrap();

		let warning = value["warnings"][0].as_str().unwrap();
		assert!(warning.starts_with("Failed to parse fixtures for table 'broken'"));
		assert!(value["replacement_map"].is_object());
	}
}
