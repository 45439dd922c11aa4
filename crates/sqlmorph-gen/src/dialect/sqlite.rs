use sqlmorph_ast::ops::standard;
use sqlmorph_ast::{AggregateFunction, Expr, FunctionSpec, JoinKind, OperatorSpec};
use sqlmorph_types::{CompositeDataType, DataType};

use super::Dialect;

/// SQLite 3.
///
/// Types follow column affinity: any declared name maps onto a canonical
/// type, so introspected schemas never fail to parse.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

const DATA_TYPES: &[DataType] = &[
    DataType::Int,
    DataType::Float,
    DataType::Text,
    DataType::Bool,
    DataType::Blob,
];

const OPERATORS: &[OperatorSpec] = &[
    standard::NOT,
    standard::NEGATE,
    standard::PLUS,
    standard::AND,
    standard::OR,
    standard::EQ,
    standard::NE,
    standard::LT,
    standard::LE,
    standard::GT,
    standard::GE,
    standard::IS,
    standard::IS_NOT,
    standard::LIKE,
    standard::ADD,
    standard::SUB,
    standard::MUL,
    standard::DIV,
    standard::MOD,
    standard::BIT_AND,
    standard::BIT_OR,
    standard::CONCAT,
    standard::IS_NULL,
    standard::IS_NOT_NULL,
    standard::IS_TRUE,
    standard::IS_FALSE,
    standard::IS_NOT_TRUE,
    standard::IS_NOT_FALSE,
];

const FUNCTIONS: &[FunctionSpec] = &[
    standard::ABS,
    standard::LENGTH,
    standard::UPPER,
    standard::LOWER,
    standard::TRIM,
    standard::COALESCE,
    standard::NULLIF,
    standard::INSTR,
    standard::TYPEOF,
];

const AGGREGATES: &[AggregateFunction] = &[
    AggregateFunction::Avg,
    AggregateFunction::Count,
    AggregateFunction::Max,
    AggregateFunction::Min,
    AggregateFunction::Sum,
    AggregateFunction::Total,
];

const PARTITION_AGGREGATES: &[AggregateFunction] = &[
    AggregateFunction::Max,
    AggregateFunction::Min,
    AggregateFunction::Sum,
    AggregateFunction::Total,
];

const EXPRESSION_ERRORS: &[&str] = &[
    "integer overflow",
    "interrupted",
    "parser stack overflow",
    "Expression tree is too large",
    "LIKE or GLOB pattern too complex",
];

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn data_types(&self) -> &'static [DataType] {
        DATA_TYPES
    }

    fn type_name(&self, ty: CompositeDataType) -> String {
        match ty.data_type {
            DataType::Int => "INT",
            DataType::Float => "REAL",
            DataType::Decimal => "NUMERIC",
            DataType::Text | DataType::Json => "TEXT",
            DataType::Char => "CHAR",
            DataType::Bool => "BOOLEAN",
            DataType::Blob => "BLOB",
        }
        .to_owned()
    }

    fn parse_type_name(&self, native: &str) -> Option<CompositeDataType> {
        let upper = native.trim().to_ascii_uppercase();
        let ty = if upper.is_empty() || upper.contains("BLOB") {
            DataType::Blob
        } else if upper.starts_with("BOOL") {
            DataType::Bool
        } else if upper.contains("INT") {
            DataType::Int
        } else if upper == "CHAR" || upper.starts_with("CHAR(") {
            DataType::Char
        } else if ["CHAR", "CLOB", "TEXT"].iter().any(|s| upper.contains(s)) {
            DataType::Text
        } else if ["REAL", "FLOA", "DOUB"].iter().any(|s| upper.contains(s)) {
            DataType::Float
        } else {
            DataType::Decimal
        };
        Some(CompositeDataType::new(ty))
    }

    fn operators(&self) -> &'static [OperatorSpec] {
        OPERATORS
    }

    fn functions(&self) -> &'static [FunctionSpec] {
        FUNCTIONS
    }

    fn aggregates(&self) -> &'static [AggregateFunction] {
        AGGREGATES
    }

    fn partition_aggregates(&self) -> &'static [AggregateFunction] {
        PARTITION_AGGREGATES
    }

    fn join_kinds(&self) -> &'static [JoinKind] {
        &[JoinKind::Inner, JoinKind::Left, JoinKind::Cross]
    }

    fn expression_errors(&self) -> &'static [&'static str] {
        EXPRESSION_ERRORS
    }

    fn group_by_errors(&self) -> &'static [&'static str] {
        &["misuse of aggregate", "aggregate functions are not allowed in the GROUP BY clause"]
    }

    /// `P IS TRUE` follows WHERE truthiness for every storage class, which a
    /// cast to INTEGER does not (`CAST(0.5 AS INT)` is 0).
    fn truth_count_expr(&self, predicate: Expr) -> Expr {
        Expr::postfix(&standard::IS_TRUE, predicate, DataType::Int)
    }

    fn explain_prefixes(&self) -> &'static [&'static str] {
        &["EXPLAIN", "EXPLAIN QUERY PLAN"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affinity_rules() {
        let parse = |s: &str| Sqlite.parse_type_name(s).unwrap().data_type;
        assert_eq!(parse("BIGINT"), DataType::Int);
        assert_eq!(parse("VARCHAR(20)"), DataType::Text);
        assert_eq!(parse("double precision"), DataType::Float);
        assert_eq!(parse(""), DataType::Blob);
        assert_eq!(parse("BOOLEAN"), DataType::Bool);
        assert_eq!(parse("DECIMAL(10,5)"), DataType::Decimal);
    }

    #[test]
    fn truth_count_uses_is_true() {
        let p = Expr::literal(sqlmorph_ast::Literal::Bool(true));
        let rendered = sqlmorph_ast::render(&Sqlite.truth_count_expr(p));
        assert_eq!(rendered, "TRUE IS TRUE");
    }
}
