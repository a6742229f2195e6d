//! Naming conventions shared by the association index and the resolver.
//!
//! Table names follow the Rails conventions fixture files are written
//! against: `Card` lives in `cards`, `Admin::UserProfile` in
//! `admin_user_profiles`, and a `belongs_to :account` column points at
//! `accounts`. Only the English rules Rails ships by default are covered.

use std::sync::LazyLock;

use regex::Regex;

struct Rule {
	pattern: Regex,
	replacement: &'static str,
}

fn rules(table: &[(&str, &'static str)]) -> Vec<Rule> {
	table
		.iter()
		.map(|(pattern, replacement)| Rule {
			pattern: Regex::new(&format!("(?i){}", pattern)).expect("inflection rule is valid"),
			replacement,
		})
		.collect()
}

/// Plural rules in priority order (first match wins).
static PLURALS: LazyLock<Vec<Rule>> = LazyLock::new(|| {
	rules(&[
		("(quiz)$", "${1}zes"),
		("^(oxen)$", "${1}"),
		("^(ox)$", "${1}en"),
		("^(m|l)ice$", "${1}ice"),
		("^(m|l)ouse$", "${1}ice"),
		("(matr|vert|ind)(?:ix|ex)$", "${1}ices"),
		("(x|ch|ss|sh)$", "${1}es"),
		("([^aeiouy]|qu)y$", "${1}ies"),
		("(hive)$", "${1}s"),
		("(?:([^f])fe|([lr])f)$", "${1}${2}ves"),
		("sis$", "ses"),
		("([ti])a$", "${1}a"),
		("([ti])um$", "${1}a"),
		("(buffal|tomat)o$", "${1}oes"),
		("(bu)s$", "${1}ses"),
		("(alias|status)$", "${1}es"),
		("(octop|vir)i$", "${1}i"),
		("(octop|vir)us$", "${1}i"),
		("^(ax|test)is$", "${1}es"),
		("s$", "s"),
		("$", "s"),
	])
});

/// Singular rules in priority order (first match wins).
static SINGULARS: LazyLock<Vec<Rule>> = LazyLock::new(|| {
	rules(&[
		("(database)s$", "${1}"),
		("(quiz)zes$", "${1}"),
		("(matr)ices$", "${1}ix"),
		("(vert|ind)ices$", "${1}ex"),
		("^(ox)en", "${1}"),
		("(alias|status)(?:es)?$", "${1}"),
		("(octop|vir)(?:us|i)$", "${1}us"),
		("^(a)x[ie]s$", "${1}xis"),
		("(cris|test)(?:is|es)$", "${1}is"),
		("(shoe)s$", "${1}"),
		("(o)es$", "${1}"),
		("(bus)(?:es)?$", "${1}"),
		("^(m|l)ice$", "${1}ouse"),
		("(x|ch|ss|sh)es$", "${1}"),
		("(m)ovies$", "${1}ovie"),
		("(s)eries$", "${1}eries"),
		("([^aeiouy]|qu)ies$", "${1}y"),
		("([lr])ves$", "${1}f"),
		("(tive)s$", "${1}"),
		("(hive)s$", "${1}"),
		("([^f])ves$", "${1}fe"),
		("(^analy)(?:sis|ses)$", "${1}sis"),
		(
			"((a)naly|(b)a|(d)iagno|(p)arenthe|(p)rogno|(s)ynop|(t)he)(?:sis|ses)$",
			"${1}sis",
		),
		("([ti])a$", "${1}um"),
		("(n)ews$", "${1}ews"),
		("(ss)$", "${1}"),
		("s$", ""),
	])
});

/// Irregular singular/plural pairs, matched as word suffixes.
const IRREGULARS: &[(&str, &str)] = &[
	("person", "people"),
	("man", "men"),
	("child", "children"),
	("sex", "sexes"),
	("move", "moves"),
	("zombie", "zombies"),
];

const UNCOUNTABLE: &[&str] = &[
	"equipment",
	"information",
	"rice",
	"money",
	"species",
	"series",
	"fish",
	"sheep",
	"jeans",
	"police",
];

/// Converts a CamelCase or mixed name to snake_case.
///
/// # Examples
///
/// ```
/// use fixture_graph::inflection::underscore;
///
/// assert_eq!(underscore("Card"), "card");
/// assert_eq!(underscore("UserProfile"), "user_profile");
/// assert_eq!(underscore("HTTPRequest"), "http_request");
/// assert_eq!(underscore("user_profile"), "user_profile");
/// ```
pub fn underscore(name: &str) -> String {
	let mut result = String::with_capacity(name.len() + 4);
	let chars: Vec<char> = name.chars().collect();
	// Treat start as separator to avoid leading underscore
	let mut prev_was_separator = true;

	for (i, &ch) in chars.iter().enumerate() {
		if ch == '_' || ch == '-' || ch == ' ' || ch == '.' {
			if !prev_was_separator && !result.is_empty() {
				result.push('_');
			}
			prev_was_separator = true;
		} else if ch.is_ascii_uppercase() {
			if !prev_was_separator && i > 0 {
				let prev = chars[i - 1];
				let next = chars.get(i + 1);

				// camelCase boundary, or the last capital of an acronym (HTTPRequest)
				if prev.is_ascii_lowercase()
					|| prev.is_ascii_digit()
					|| (prev.is_ascii_uppercase() && next.is_some_and(|n| n.is_ascii_lowercase()))
				{
					result.push('_');
				}
			}
			result.push(ch.to_ascii_lowercase());
			prev_was_separator = false;
		} else {
			result.push(ch.to_ascii_lowercase());
			prev_was_separator = false;
		}
	}

	result
}

fn is_uncountable(lower: &str) -> bool {
	let last_word = lower.rsplit('_').next().unwrap_or(lower);
	UNCOUNTABLE.contains(&last_word)
}

/// Replaces a trailing `from` with `to`, keeping the case of the first
/// replaced letter. Irregulars share their first letter in both forms.
fn replace_suffix(word: &str, lower: &str, from: &str, to: &str) -> Option<String> {
	let stem = lower.strip_suffix(from)?;
	let keep = stem.len() + 1;
	Some(format!("{}{}", &word[..keep], &to[1..]))
}

fn apply(word: &str, rules: &[Rule]) -> String {
	rules
		.iter()
		.find(|rule| rule.pattern.is_match(word))
		.map(|rule| rule.pattern.replace(word, rule.replacement).into_owned())
		.unwrap_or_else(|| word.to_string())
}

/// Returns the plural form of a (snake_case) word.
///
/// # Examples
///
/// ```
/// use fixture_graph::inflection::pluralize;
///
/// assert_eq!(pluralize("account"), "accounts");
/// assert_eq!(pluralize("company"), "companies");
/// assert_eq!(pluralize("person"), "people");
/// assert_eq!(pluralize("accounts"), "accounts");
/// ```
pub fn pluralize(word: &str) -> String {
	let lower = word.to_ascii_lowercase();
	if word.is_empty() || is_uncountable(&lower) {
		return word.to_string();
	}

	for (singular, plural) in IRREGULARS {
		if lower.ends_with(plural) {
			return word.to_string();
		}
		if let Some(replaced) = replace_suffix(word, &lower, singular, plural) {
			return replaced;
		}
	}

	apply(word, &PLURALS)
}

/// Returns the singular form of a (snake_case) word.
///
/// # Examples
///
/// ```
/// use fixture_graph::inflection::singularize;
///
/// assert_eq!(singularize("accounts"), "account");
/// assert_eq!(singularize("companies"), "company");
/// assert_eq!(singularize("people"), "person");
/// ```
pub fn singularize(word: &str) -> String {
	let lower = word.to_ascii_lowercase();
	if word.is_empty() || is_uncountable(&lower) {
		return word.to_string();
	}

	for (singular, plural) in IRREGULARS {
		if let Some(replaced) = replace_suffix(word, &lower, plural, singular) {
			return replaced;
		}
		if lower.ends_with(singular) {
			return word.to_string();
		}
	}

	apply(word, &SINGULARS)
}

/// Returns the table name backing a model class name.
///
/// Namespace segments are underscored and joined with `_`; only the last
/// segment is pluralized.
///
/// # Examples
///
/// ```
/// use fixture_graph::inflection::table_name_for_model;
///
/// assert_eq!(table_name_for_model("Card"), "cards");
/// assert_eq!(table_name_for_model("UserProfile"), "user_profiles");
/// assert_eq!(table_name_for_model("Admin::User"), "admin_users");
/// ```
pub fn table_name_for_model(model: &str) -> String {
	let segments: Vec<String> = model
		.split("::")
		.filter(|segment| !segment.is_empty())
		.map(underscore)
		.collect();

	match segments.split_last() {
		Some((last, namespace)) => {
			let mut parts: Vec<String> = namespace.to_vec();
			parts.push(pluralize(last));
			parts.join("_")
		}
		None => String::new(),
	}
}
