use sqlmorph_ast::ops::standard;
use sqlmorph_ast::{AggregateFunction, BlobStyle, FunctionSpec, JoinKind, OperatorSpec, QuoteStyle};
use sqlmorph_types::{CompositeDataType, DataType};

use super::postgres::base_type_name;
use super::{Dialect, strict_can_cast};

/// DuckDB.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuckDb;

const DATA_TYPES: &[DataType] = &[
    DataType::Int,
    DataType::Float,
    DataType::Decimal,
    DataType::Text,
    DataType::Bool,
    DataType::Blob,
];

const OPERATORS: &[OperatorSpec] = &[
    standard::NOT,
    standard::NEGATE,
    standard::AND,
    standard::OR,
    standard::EQ,
    standard::NE,
    standard::LT,
    standard::LE,
    standard::GT,
    standard::GE,
    standard::IS_DISTINCT_FROM,
    standard::IS_NOT_DISTINCT_FROM,
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
    standard::STRPOS,
];

const AGGREGATES: &[AggregateFunction] = &[
    AggregateFunction::Avg,
    AggregateFunction::BitAnd,
    AggregateFunction::BitOr,
    AggregateFunction::BoolAnd,
    AggregateFunction::BoolOr,
    AggregateFunction::Count,
    AggregateFunction::Max,
    AggregateFunction::Min,
    AggregateFunction::Sum,
];

const PARTITION_AGGREGATES: &[AggregateFunction] = &[
    AggregateFunction::BoolAnd,
    AggregateFunction::BoolOr,
    AggregateFunction::Count,
    AggregateFunction::Max,
    AggregateFunction::Min,
    AggregateFunction::Sum,
];

const EXPRESSION_ERRORS: &[&str] = &[
    "Out of Range",
    "Conversion Error",
    "Could not convert",
    "overflow",
    "Division by zero",
    "Invalid Input Error",
    "INTERRUPT",
];

impl Dialect for DuckDb {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::DoubleQuote
    }

    fn blob_style(&self) -> BlobStyle {
        BlobStyle::ByteaEscape
    }

    fn data_types(&self) -> &'static [DataType] {
        DATA_TYPES
    }

    fn type_name(&self, ty: CompositeDataType) -> String {
        match (ty.data_type, ty.size) {
            (DataType::Int, Some(1)) => "TINYINT",
            (DataType::Int, Some(2)) => "SMALLINT",
            (DataType::Int, Some(8)) => "BIGINT",
            (DataType::Int, _) => "INTEGER",
            (DataType::Float, Some(4)) => "FLOAT",
            (DataType::Float, _) => "DOUBLE",
            (DataType::Decimal, _) => "DECIMAL",
            (DataType::Text | DataType::Char, _) => "VARCHAR",
            (DataType::Bool, _) => "BOOLEAN",
            (DataType::Blob, _) => "BLOB",
            (DataType::Json, _) => "JSON",
        }
        .to_owned()
    }

    fn parse_type_name(&self, native: &str) -> Option<CompositeDataType> {
        Some(match base_type_name(native).as_str() {
            "tinyint" | "int1" => CompositeDataType::int(1),
            "smallint" | "int2" => CompositeDataType::int(2),
            "integer" | "int" | "int4" => CompositeDataType::int(4),
            "bigint" | "int8" | "hugeint" => CompositeDataType::int(8),
            "float" | "real" | "float4" => CompositeDataType::sized(DataType::Float, 4),
            "double" | "float8" => CompositeDataType::sized(DataType::Float, 8),
            "decimal" | "numeric" => CompositeDataType::new(DataType::Decimal),
            "varchar" | "text" | "string" | "char" | "bpchar" => {
                CompositeDataType::new(DataType::Text)
            }
            "boolean" | "bool" => CompositeDataType::new(DataType::Bool),
            "blob" | "bytea" => CompositeDataType::new(DataType::Blob),
            "json" => CompositeDataType::new(DataType::Json),
            _ => return None,
        })
    }

    fn can_cast(&self, from: DataType, to: DataType) -> bool {
        strict_can_cast(from, to)
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
        &[
            JoinKind::Inner,
            JoinKind::Left,
            JoinKind::Right,
            JoinKind::Full,
            JoinKind::Cross,
        ]
    }

    fn expression_errors(&self) -> &'static [&'static str] {
        EXPRESSION_ERRORS
    }

    fn group_by_errors(&self) -> &'static [&'static str] {
        &[
            "must appear in the GROUP BY clause",
            "GROUP BY clause cannot contain aggregates",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varchar_family_is_text() {
        for name in ["VARCHAR", "VARCHAR(10)", "TEXT", "BPCHAR"] {
            assert_eq!(
                DuckDb.parse_type_name(name).map(|t| t.data_type),
                Some(DataType::Text),
                "{name}"
            );
        }
        assert_eq!(DuckDb.parse_type_name("HUGEINT"), Some(CompositeDataType::int(8)));
        assert_eq!(DuckDb.parse_type_name("UNION(a INT)"), None);
    }
}
