//! Resolver and loader configuration.
//!
//! Every option has a default, so an empty configuration file is valid:
//!
//! ```toml
//! reverse_closure = "has_one_only"
//! max_reverse_passes = 50
//!
//! [loader]
//! extensions = ["yml", "yaml"]
//! ```

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FixtureError, FixtureResult};

/// Which fixtures the reverse closure admits into the universe.
///
/// The reverse closure pulls in fixtures that point *at* something already
/// in the universe (a child referencing its parent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReverseClosure {
	/// Admit any fixture with a reference to a universe member.
	#[default]
	AnyReference,
	/// Admit a fixture only if the referenced fixture's table declares a
	/// `has_one` association targeting the fixture's table.
	HasOneOnly,
	/// Never admit fixtures through reverse references.
	Disabled,
}

/// Options for reading a fixture directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderOptions {
	/// File extensions treated as fixture files.
	pub extensions: Vec<String>,

	/// Clock used for `Time.now`-style embedded expressions. Defaults to the
	/// wall clock at load time.
	#[serde(skip)]
	pub now: Option<DateTime<Utc>>,
}

impl Default for LoaderOptions {
	fn default() -> Self {
		Self {
			extensions: vec!["yml".to_string(), "yaml".to_string(), "json".to_string()],
			now: None,
		}
	}
}

impl LoaderOptions {
	/// Creates new default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the accepted file extensions.
	pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.extensions = extensions.into_iter().map(Into::into).collect();
		self
	}

	/// Pins the clock used for embedded expressions.
	pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
		self.now = Some(now);
		self
	}

	/// Returns true if files with this extension are loaded.
	pub fn accepts_extension(&self, ext: &str) -> bool {
		self.extensions
			.iter()
			.any(|accepted| accepted.eq_ignore_ascii_case(ext))
	}
}

/// Configuration of a resolution run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
	/// Reverse closure admission rule.
	pub reverse_closure: ReverseClosure,

	/// Upper bound on reverse closure passes. `None` runs to the fixed point.
	pub max_reverse_passes: Option<usize>,

	/// Fixture directory options.
	pub loader: LoaderOptions,
}

impl ResolverConfig {
	/// Creates new default configuration.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the reverse closure admission rule.
	pub fn with_reverse_closure(mut self, rule: ReverseClosure) -> Self {
		self.reverse_closure = rule;
		self
	}

	/// Caps the number of reverse closure passes.
	pub fn with_max_reverse_passes(mut self, passes: usize) -> Self {
		self.max_reverse_passes = Some(passes);
		self
	}

	/// Sets the loader options.
	pub fn with_loader(mut self, loader: LoaderOptions) -> Self {
		self.loader = loader;
		self
	}

	/// Parses configuration from TOML.
	pub fn from_toml_str(content: &str) -> FixtureResult<Self> {
		Ok(toml::from_str(content)?)
	}

	/// Reads configuration from a TOML file.
	pub fn from_file(path: &Path) -> FixtureResult<Self> {
		let content = std::fs::read_to_string(path).map_err(|e| {
			if e.kind() == std::io::ErrorKind::NotFound {
				FixtureError::FileNotFound(path.display().to_string())
			} else {
				FixtureError::Io(e)
			}
		})?;
		Self::from_toml_str(&content)
	}
}
