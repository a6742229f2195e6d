//! Fixture loading.
//!
//! Fixture files are read from a directory (one file per table), embedded
//! expressions are pre-evaluated, and the result is collected into a
//! [`FixtureStore`].

pub mod expression;
pub mod format;
pub mod loader;
pub mod parser;

pub use expression::ExpressionEvaluator;
pub use format::{FieldMap, FixtureFormat, FixtureLabel, FixtureRecord, FixtureStore, FixtureTable};
pub use loader::{FixtureLoader, LoadReport, table_name_for_path};
pub use parser::FixtureParser;
