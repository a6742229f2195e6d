//! Embedded-expression pre-evaluation.
//!
//! Fixture files may embed template tags (`<%= ... %>`). Only a fixed set of
//! expressions with a known, side-effect free result is evaluated; every other
//! tag is replaced with an empty string. Evaluation is purely textual and runs
//! before the file is parsed.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::{Captures, Regex};

use crate::identity::{identify_as_integer, identify_as_uuid};

/// Any template tag, output (`<%=`), comment (`<%#`) or statement (`<%`).
static TEMPLATE_TAG: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?s)<%([=#-]?)(.*?)-?%>").expect("template tag pattern is valid")
});

/// `ActiveRecord::FixtureSet.identify(:label)` / `identify("label", :uuid)`.
static IDENTIFY_CALL: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r#"^(?:::)?ActiveRecord::FixtureSet\.identify\(\s*(?::([A-Za-z0-9_]+)|"([^"]*)"|'([^']*)')\s*(?:,\s*:([a-z_]+)\s*)?\)$"#,
	)
	.expect("identify pattern is valid")
});

const NOW_EXPRESSIONS: &[&str] = &[
	"Time.now",
	"Time.current",
	"Time.zone.now",
	"DateTime.now",
	"DateTime.current",
];

const TODAY_EXPRESSIONS: &[&str] = &["Date.today", "Date.current"];

/// Evaluates the recognized embedded expressions of a fixture source.
#[derive(Debug, Clone)]
pub struct ExpressionEvaluator {
	now: DateTime<Utc>,
}

impl ExpressionEvaluator {
	/// Creates an evaluator whose clock is pinned to `now`.
	pub fn new(now: DateTime<Utc>) -> Self {
		Self { now }
	}

	/// Returns the pinned clock.
	pub fn now(&self) -> DateTime<Utc> {
		self.now
	}

	/// Replaces every template tag in `source`.
	///
	/// # Example
	///
	/// ```
	/// # use fixture_graph::fixtures::ExpressionEvaluator;
	/// let evaluator = ExpressionEvaluator::default();
	/// let out = evaluator.evaluate("id: <%= ActiveRecord::FixtureSet.identify(:acme) %>");
	/// assert_eq!(out, "id: 96778814");
	/// ```
	pub fn evaluate(&self, source: &str) -> String {
		if !source.contains("<%") {
			return source.to_string();
		}

		TEMPLATE_TAG
			.replace_all(source, |caps: &Captures<'_>| {
				let expression = caps[2].trim();
				if &caps[1] != "=" {
					return String::new();
				}
				match self.evaluate_expression(expression) {
					Some(value) => value,
					None => {
						tracing::debug!("Blanking unsupported embedded expression: {}", expression);
						String::new()
					}
				}
			})
			.into_owned()
	}

	/// Evaluates a single output expression, `None` when unsupported.
	pub fn evaluate_expression(&self, expression: &str) -> Option<String> {
		if let Some(caps) = IDENTIFY_CALL.captures(expression) {
			let label = caps
				.get(1)
				.or_else(|| caps.get(2))
				.or_else(|| caps.get(3))
				.map(|m| m.as_str())?;
			return Some(match caps.get(4).map(|m| m.as_str()) {
				Some("uuid") => identify_as_uuid(label),
				_ => identify_as_integer(label).to_string(),
			});
		}

		if NOW_EXPRESSIONS.contains(&expression) {
			return Some(self.now.format("%Y-%m-%d %H:%M:%S").to_string());
		}

		if TODAY_EXPRESSIONS.contains(&expression) {
			return Some(self.now.format("%Y-%m-%d").to_string());
		}

		None
	}
}

impl Default for ExpressionEvaluator {
	fn default() -> Self {
		Self::new(Utc::now())
	}
}
