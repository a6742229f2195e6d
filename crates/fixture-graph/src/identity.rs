//! Reproducible fixture identities.
//!
//! Fixture primary keys are never stored in fixture files; they are derived
//! from the fixture label so that every run (and every hand-written test that
//! hard-codes an id) agrees on them. Both functions match the identity scheme
//! used by Rails' `ActiveRecord::FixtureSet.identify`.

use uuid::Uuid;

/// Upper bound (exclusive) for integer identities: `2^30 - 1`.
pub const MAX_INTEGER_ID: u32 = (1 << 30) - 1;

/// Returns the UUID identity of a label.
///
/// SHA-1 over the OID namespace followed by the label bytes, with the RFC 4122
/// version (5) and variant bits applied.
///
/// # Example
///
/// ```
/// use fixture_graph::identity::identify_as_uuid;
///
/// assert_eq!(identify_as_uuid("37s"), "8e3c2561-4b81-5d33-b477-6039452aafc0");
/// ```
pub fn identify_as_uuid(label: &str) -> String {
	Uuid::new_v5(&Uuid::NAMESPACE_OID, label.as_bytes())
		.hyphenated()
		.to_string()
}

/// Returns the integer identity of a label.
///
/// CRC-32 (zlib polynomial) of the label bytes modulo [`MAX_INTEGER_ID`].
///
/// # Example
///
/// ```
/// use fixture_graph::identity::identify_as_integer;
///
/// assert_eq!(identify_as_integer("37s"), 6750827);
/// ```
pub fn identify_as_integer(label: &str) -> u32 {
	let mut crc = flate2::Crc::new();
	crc.update(label.as_bytes());
	crc.sum() % MAX_INTEGER_ID
}
