use sqlmorph_ast::ops::standard;
use sqlmorph_ast::{AggregateFunction, BlobStyle, FunctionSpec, JoinKind, OperatorSpec, QuoteStyle};
use sqlmorph_types::{CompositeDataType, DataType};

use super::{Dialect, strict_can_cast};

/// PostgreSQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

const DATA_TYPES: &[DataType] = &[
    DataType::Int,
    DataType::Float,
    DataType::Decimal,
    DataType::Text,
    DataType::Char,
    DataType::Bool,
    DataType::Blob,
    DataType::Json,
];

pub(super) const OPERATORS: &[OperatorSpec] = &[
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
    standard::STRPOS,
];

pub(super) const AGGREGATES: &[AggregateFunction] = &[
    AggregateFunction::Avg,
    AggregateFunction::BitAnd,
    AggregateFunction::BitOr,
    AggregateFunction::BoolAnd,
    AggregateFunction::BoolOr,
    AggregateFunction::Count,
    AggregateFunction::Every,
    AggregateFunction::Max,
    AggregateFunction::Min,
    AggregateFunction::Sum,
];

const PARTITION_AGGREGATES: &[AggregateFunction] = &[
    AggregateFunction::BitAnd,
    AggregateFunction::BitOr,
    AggregateFunction::BoolAnd,
    AggregateFunction::BoolOr,
    AggregateFunction::Count,
    AggregateFunction::Max,
    AggregateFunction::Min,
    AggregateFunction::Sum,
];

const EXPRESSION_ERRORS: &[&str] = &[
    "division by zero",
    "out of range",
    "numeric field overflow",
    "is not unique",
    "invalid input syntax",
    "value too long",
    "LIKE pattern must not end with escape character",
    "canceling statement due to statement timeout",
];

const GROUP_BY_ERRORS: &[&str] = &[
    "must appear in the GROUP BY clause or be used in an aggregate function",
    "aggregate functions are not allowed in GROUP BY",
];

/// Strip a trailing `(precision[, scale])` from a native type name.
pub(super) fn base_type_name(native: &str) -> String {
    let trimmed = native.trim();
    let base = trimmed.split_once('(').map_or(trimmed, |(head, _)| head);
    base.trim().to_ascii_lowercase()
}

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
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
            (DataType::Int, Some(1 | 2)) => "SMALLINT",
            (DataType::Int, Some(8)) => "BIGINT",
            (DataType::Int, _) => "INT",
            (DataType::Float, Some(4)) => "REAL",
            (DataType::Float, _) => "DOUBLE PRECISION",
            (DataType::Decimal, _) => "NUMERIC",
            (DataType::Text, _) => "TEXT",
            (DataType::Char, _) => "CHAR",
            (DataType::Bool, _) => "BOOLEAN",
            (DataType::Blob, _) => "BYTEA",
            (DataType::Json, _) => "JSONB",
        }
        .to_owned()
    }

    fn parse_type_name(&self, native: &str) -> Option<CompositeDataType> {
        Some(match base_type_name(native).as_str() {
            "smallint" | "int2" => CompositeDataType::int(2),
            "integer" | "int" | "int4" => CompositeDataType::int(4),
            "bigint" | "int8" => CompositeDataType::int(8),
            "real" | "float4" => CompositeDataType::sized(DataType::Float, 4),
            "double precision" | "float8" => CompositeDataType::sized(DataType::Float, 8),
            "numeric" | "decimal" => CompositeDataType::new(DataType::Decimal),
            "text" | "character varying" | "varchar" => CompositeDataType::new(DataType::Text),
            "character" | "char" | "bpchar" => CompositeDataType::new(DataType::Char),
            "boolean" | "bool" => CompositeDataType::new(DataType::Bool),
            "bytea" => CompositeDataType::new(DataType::Blob),
            "json" | "jsonb" => CompositeDataType::new(DataType::Json),
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
        GROUP_BY_ERRORS
    }

    fn explain_prefixes(&self) -> &'static [&'static str] {
        &["EXPLAIN", "EXPLAIN VERBOSE"]
    }
}
