//! Dialect capability descriptors.
//!
//! One generic generator and one set of oracles serve every engine; what
//! differs between engines is captured by the [`Dialect`] trait.

mod cockroach;
mod duckdb;
mod postgres;
mod sqlite;
mod tidb;

use std::fmt;
use std::sync::Arc;

use sqlmorph_ast::{
    AggregateFunction, BlobStyle, Expr, FunctionSpec, JoinKind, OperatorSpec, Printer, QuoteStyle,
};
use sqlmorph_types::{CompositeDataType, DataType};

pub use cockroach::CockroachDb;
pub use duckdb::DuckDb;
pub use postgres::Postgres;
pub use sqlite::Sqlite;
pub use tidb::TiDb;

/// What one database engine accepts.
///
/// Catalog methods return static tables; the generator only ever filters
/// them.
pub trait Dialect: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::None
    }

    fn blob_style(&self) -> BlobStyle {
        BlobStyle::HexPrefix
    }

    fn printer(&self) -> Printer {
        Printer::new(self.quote_style(), self.blob_style())
    }

    /// Canonical types the generator may target.
    fn data_types(&self) -> &'static [DataType];

    /// Native spelling of `ty` as used in column declarations.
    fn type_name(&self, ty: CompositeDataType) -> String;

    /// Native spelling of `ty` as a CAST target.
    fn cast_type_name(&self, ty: DataType) -> String {
        self.type_name(CompositeDataType::new(ty))
    }

    /// Map a native type name reported by the engine onto a canonical type.
    fn parse_type_name(&self, native: &str) -> Option<CompositeDataType>;

    /// Whether `CAST(<from> AS <to>)` is accepted for every value of `from`
    /// (modulo value errors on the allow-list).
    fn can_cast(&self, from: DataType, to: DataType) -> bool {
        from.is_primitive() && to.is_primitive()
    }

    fn operators(&self) -> &'static [OperatorSpec];

    fn functions(&self) -> &'static [FunctionSpec];

    fn aggregates(&self) -> &'static [AggregateFunction];

    /// Aggregates whose partitioned form the aggregate partitioning oracle
    /// may check.
    fn partition_aggregates(&self) -> &'static [AggregateFunction];

    fn join_kinds(&self) -> &'static [JoinKind];

    fn supports_index_hints(&self) -> bool {
        false
    }

    /// Benign failures any generated expression may raise.
    fn expression_errors(&self) -> &'static [&'static str];

    /// Benign failures of fetching or converting result values.
    fn fetch_errors(&self) -> &'static [&'static str] {
        &[]
    }

    /// Benign failures specific to grouped queries.
    fn group_by_errors(&self) -> &'static [&'static str] {
        &[]
    }

    /// An integer-typed expression that is 1 exactly when `predicate`
    /// would keep a row in a WHERE clause, and 0 otherwise.
    fn truth_count_expr(&self, predicate: Expr) -> Expr {
        Expr::cast(predicate, self.cast_type_name(DataType::Int), DataType::Int)
    }

    /// Statement prefixes that request a query plan. Empty when the engine
    /// has no EXPLAIN.
    fn explain_prefixes(&self) -> &'static [&'static str] {
        &["EXPLAIN"]
    }
}

/// Every built-in dialect name, in lookup order.
pub const DIALECT_NAMES: &[&str] = &["sqlite", "postgres", "tidb", "duckdb", "cockroachdb"];

/// Look up a built-in dialect by (case-insensitive) name.
pub fn dialect_by_name(name: &str) -> Option<Arc<dyn Dialect>> {
    match name.to_ascii_lowercase().as_str() {
        "sqlite" | "sqlite3" => Some(Arc::new(Sqlite)),
        "postgres" | "postgresql" => Some(Arc::new(Postgres)),
        "tidb" => Some(Arc::new(TiDb)),
        "duckdb" => Some(Arc::new(DuckDb)),
        "cockroachdb" | "cockroach" => Some(Arc::new(CockroachDb)),
        _ => None,
    }
}

/// Strict-typing cast rules shared by the PostgreSQL-family engines.
pub(crate) fn strict_can_cast(from: DataType, to: DataType) -> bool {
    if from == to {
        return true;
    }
    let textual = |t: DataType| matches!(t, DataType::Text | DataType::Char);
    match (from, to) {
        (DataType::Blob | DataType::Json, other) | (other, DataType::Blob | DataType::Json) => {
            textual(other)
        }
        (DataType::Bool, other) | (other, DataType::Bool) => {
            other == DataType::Int || textual(other)
        }
        _ => true,
    }
}
