use sqlmorph_ast::ops::standard;
use sqlmorph_ast::{AggregateFunction, BlobStyle, FunctionSpec, JoinKind, OperatorSpec, QuoteStyle};
use sqlmorph_types::{CompositeDataType, DataType};

use super::postgres::{AGGREGATES, OPERATORS, base_type_name};
use super::{Dialect, strict_can_cast};

/// CockroachDB. Shares PostgreSQL's operator and aggregate tables and adds
/// index-forcing hints on table references.
#[derive(Debug, Clone, Copy, Default)]
pub struct CockroachDb;

const DATA_TYPES: &[DataType] = &[
    DataType::Int,
    DataType::Float,
    DataType::Decimal,
    DataType::Text,
    DataType::Bool,
    DataType::Blob,
    DataType::Json,
];

const FUNCTIONS: &[FunctionSpec] = &[
    standard::ABS,
    standard::LENGTH,
    standard::UPPER,
    standard::LOWER,
    standard::COALESCE,
    standard::NULLIF,
    standard::STRPOS,
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
    "division by zero",
    "out of range",
    "overflow",
    "could not parse",
    "unsupported binary operator",
    "ambiguous binary operator",
    "unsupported comparison operator",
    "ambiguous call",
    "unknown signature",
    "query execution canceled due to statement timeout",
];

impl Dialect for CockroachDb {
    fn name(&self) -> &'static str {
        "cockroachdb"
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
            (DataType::Int, Some(1 | 2)) => "INT2",
            (DataType::Int, Some(4)) => "INT4",
            (DataType::Int, _) => "INT8",
            (DataType::Float, Some(4)) => "FLOAT4",
            (DataType::Float, _) => "FLOAT8",
            (DataType::Decimal, _) => "DECIMAL",
            (DataType::Text, _) => "STRING",
            (DataType::Char, _) => "CHAR",
            (DataType::Bool, _) => "BOOL",
            (DataType::Blob, _) => "BYTES",
            (DataType::Json, _) => "JSONB",
        }
        .to_owned()
    }

    fn parse_type_name(&self, native: &str) -> Option<CompositeDataType> {
        Some(match base_type_name(native).as_str() {
            "int2" | "smallint" => CompositeDataType::int(2),
            "int4" | "integer" => CompositeDataType::int(4),
            "int8" | "int" | "bigint" => CompositeDataType::int(8),
            "float4" | "real" => CompositeDataType::sized(DataType::Float, 4),
            "float8" | "float" | "double precision" => CompositeDataType::sized(DataType::Float, 8),
            "decimal" | "numeric" => CompositeDataType::new(DataType::Decimal),
            "string" | "text" | "varchar" | "character varying" => {
                CompositeDataType::new(DataType::Text)
            }
            "char" | "character" => CompositeDataType::new(DataType::Char),
            "bool" | "boolean" => CompositeDataType::new(DataType::Bool),
            "bytes" | "bytea" => CompositeDataType::new(DataType::Blob),
            "jsonb" | "json" => CompositeDataType::new(DataType::Json),
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

    fn supports_index_hints(&self) -> bool {
        true
    }

    fn expression_errors(&self) -> &'static [&'static str] {
        EXPRESSION_ERRORS
    }

    fn group_by_errors(&self) -> &'static [&'static str] {
        &["must appear in the GROUP BY clause or be used in an aggregate function"]
    }

    fn explain_prefixes(&self) -> &'static [&'static str] {
        &["EXPLAIN", "EXPLAIN (VERBOSE)"]
    }
}
