//! fixture-graph CLI
//!
//! Command-line driver for resolving Rails-style fixtures into an insertion
//! plan.
//!
//! ## Usage
//!
//! ```bash
//! fixture-graph plan test/fixtures --associations associations.json
//! fixture-graph plan test/fixtures cards:card1 accounts:acme
//! fixture-graph plan test/fixtures --test-source test/models/card_test.rb
//! fixture-graph identify acme
//! ```
//!
//! The plan is printed to stdout as JSON; logs go to stderr.

use std::path::PathBuf;
use std::process;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use fixture_graph::commands::{PlanArgs, PlanCommand, PlanOptions};
use fixture_graph::{ResolverConfig, ReverseClosure, identify_as_integer, identify_as_uuid};
use serde_json::json;

#[derive(Parser)]
#[command(name = "fixture-graph")]
#[command(about = "Fixture dependency resolution for Rails-style test fixtures", long_about = None)]
#[command(version)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// Verbosity level (can be repeated)
	#[arg(short, long, action = clap::ArgAction::Count, global = true)]
	verbosity: u8,
}

#[derive(Subcommand)]
enum Commands {
	/// Resolve fixtures into a dependency-ordered insertion plan
	Plan {
		/// Directory with one fixture file per table
		#[arg(value_name = "FIXTURE_DIR")]
		fixture_dir: PathBuf,

		/// Seed fixtures as table:name (defaults to every fixture)
		#[arg(value_name = "LABEL")]
		labels: Vec<String>,

		/// Association metadata file (JSON or YAML)
		#[arg(short, long, value_name = "FILE")]
		associations: Option<PathBuf>,

		/// Seed from the fixture accessors used in a test file
		#[arg(short, long, value_name = "FILE", conflicts_with = "labels")]
		test_source: Option<PathBuf>,

		/// Fixture created elsewhere, referenced by literal key (repeatable)
		#[arg(short, long, value_name = "LABEL")]
		exclude: Vec<String>,

		/// Resolver configuration file (TOML)
		#[arg(short, long, value_name = "FILE")]
		config: Option<PathBuf>,

		/// Reverse closure admission rule (overrides the config file)
		#[arg(long, value_name = "RULE")]
		reverse_closure: Option<ReverseClosureArg>,

		/// Maximum number of reverse closure passes (overrides the config file)
		#[arg(long, value_name = "N")]
		max_reverse_passes: Option<usize>,

		/// Print compact instead of pretty JSON
		#[arg(long)]
		compact: bool,
	},

	/// Print the synthesized identities of a fixture name
	Identify {
		/// Fixture name
		#[arg(value_name = "NAME")]
		name: String,
	},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReverseClosureArg {
	AnyReference,
	HasOneOnly,
	Disabled,
}

impl From<ReverseClosureArg> for ReverseClosure {
	fn from(arg: ReverseClosureArg) -> Self {
		match arg {
			ReverseClosureArg::AnyReference => ReverseClosure::AnyReference,
			ReverseClosureArg::HasOneOnly => ReverseClosure::HasOneOnly,
			ReverseClosureArg::Disabled => ReverseClosure::Disabled,
		}
	}
}

fn init_tracing(verbosity: u8) {
	let default_level = match verbosity {
		0 => "warn",
		1 => "info",
		2 => "debug",
		_ => "trace",
	};
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
		)
		.with_writer(std::io::stderr)
		.init();
}

fn main() {
	let cli = Cli::parse();
	init_tracing(cli.verbosity);

	if let Err(e) = run(cli) {
		eprintln!("Error: {:#}", e);
		process::exit(1);
	}
}

fn run(cli: Cli) -> anyhow::Result<()> {
	match cli.command {
		Commands::Plan {
			fixture_dir,
			labels,
			associations,
			test_source,
			exclude,
			config,
			reverse_closure,
			max_reverse_passes,
			compact,
		} => {
			let mut resolver_config = match &config {
				Some(path) => {
					tracing::debug!("Loading resolver config from {}", path.display());
					ResolverConfig::from_file(path)
						.with_context(|| format!("Failed to load config {}", path.display()))?
				}
				None => ResolverConfig::default(),
			};
			if let Some(rule) = reverse_closure {
				resolver_config = resolver_config.with_reverse_closure(rule.into());
			}
			if let Some(passes) = max_reverse_passes {
				resolver_config = resolver_config.with_max_reverse_passes(passes);
			}

			let args = PlanArgs {
				fixture_dir,
				associations,
				test_source,
				labels,
			};
			let options = PlanOptions::new()
				.with_config(resolver_config)
				.with_exclude(exclude)
				.with_verbosity(cli.verbosity);

			let output = PlanCommand::new().execute(args, options)?;
			let rendered = if compact {
				serde_json::to_string(&output)?
			} else {
				serde_json::to_string_pretty(&output)?
			};
			println!("{}", rendered);
		}
		Commands::Identify { name } => {
			let identities = json!({
				"name": name,
				"uuid": identify_as_uuid(&name),
				"integer": identify_as_integer(&name),
			});
			println!("{}", serde_json::to_string_pretty(&identities)?);
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::CommandFactory;
	use rstest::rstest;

	#[rstest]
	fn test_cli_definition() {
		Cli::command().debug_assert();
	}

	#[rstest]
	fn test_parse_plan() {
		let cli = Cli::try_parse_from([
			"fixture-graph",
			"-vv",
			"plan",
			"test/fixtures",
			"cards:card1",
			"--associations",
			"associations.json",
			"--exclude",
			"accounts:acme",
			"--reverse-closure",
			"has-one-only",
		])
		.unwrap();

		assert_eq!(cli.verbosity, 2);
		let Commands::Plan {
			fixture_dir,
			labels,
			associations,
			exclude,
			reverse_closure,
			compact,
			..
		} = cli.command
		else {
			panic!("expected the plan command");
		};
		assert_eq!(fixture_dir, PathBuf::from("test/fixtures"));
		assert_eq!(labels, vec!["cards:card1".to_string()]);
		assert_eq!(associations, Some(PathBuf::from("associations.json")));
		assert_eq!(exclude, vec!["accounts:acme".to_string()]);
		assert_eq!(reverse_closure, Some(ReverseClosureArg::HasOneOnly));
		assert!(!compact);
	}

	#[rstest]
	fn test_labels_conflict_with_test_source() {
		let result = Cli::try_parse_from([
			"fixture-graph",
			"plan",
			"test/fixtures",
			"cards:card1",
			"--test-source",
			"card_test.rb",
		]);
		assert!(result.is_err());
	}

	#[rstest]
	fn test_parse_identify() {
		let cli = Cli::try_parse_from(["fixture-graph", "identify", "37s"]).unwrap();

		assert_eq!(cli.verbosity, 0);
		assert!(matches!(cli.command, Commands::Identify { ref name } if name == "37s"));
	}

	#[rstest]
	#[case(ReverseClosureArg::AnyReference, ReverseClosure::AnyReference)]
	#[case(ReverseClosureArg::HasOneOnly, ReverseClosure::HasOneOnly)]
	#[case(ReverseClosureArg::Disabled, ReverseClosure::Disabled)]
	fn test_reverse_closure_arg(#[case] arg: ReverseClosureArg, #[case] expected: ReverseClosure) {
		assert_eq!(ReverseClosure::from(arg), expected);
	}
}
