//! Random SQL generation.
//!
//! A [`Dialect`] describes what one engine accepts (types, operators,
//! functions, aggregates, joins, quoting, expected errors). The
//! [`ExpressionGenerator`] synthesizes well-typed expressions from that
//! description and a [`sqlmorph_types::RandomSource`]; [`query`] assembles
//! them into from-lists, joins and whole SELECT statements.

pub mod dialect;
pub mod explain;
pub mod generator;
pub mod query;

pub use dialect::{CockroachDb, Dialect, DuckDb, Postgres, Sqlite, TiDb, dialect_by_name};
pub use explain::explain;
pub use generator::ExpressionGenerator;
pub use query::{FromClause, build_from, random_select};
