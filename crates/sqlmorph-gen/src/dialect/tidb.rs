use sqlmorph_ast::ops::{precedence, standard};
use sqlmorph_ast::{AggregateFunction, FunctionSpec, JoinKind, OperatorSpec, QuoteStyle};
use sqlmorph_types::{CompositeDataType, DataType};

use super::Dialect;

/// TiDB (MySQL protocol).
///
/// `||` means OR under the default SQL mode, so string concatenation is not
/// offered. `&` binds tighter than `|`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TiDb;

const DATA_TYPES: &[DataType] = &[
    DataType::Int,
    DataType::Float,
    DataType::Decimal,
    DataType::Text,
    DataType::Char,
    DataType::Bool,
    DataType::Blob,
];

const BIT_AND: OperatorSpec = OperatorSpec {
    precedence: precedence::BITWISE + 1,
    ..standard::BIT_AND
};

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
    standard::LIKE,
    standard::ADD,
    standard::SUB,
    standard::MUL,
    standard::DIV,
    standard::MOD,
    BIT_AND,
    standard::BIT_OR,
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
];

const AGGREGATES: &[AggregateFunction] = &[
    AggregateFunction::Avg,
    AggregateFunction::BitAnd,
    AggregateFunction::BitOr,
    AggregateFunction::Count,
    AggregateFunction::Max,
    AggregateFunction::Min,
    AggregateFunction::Sum,
];

const PARTITION_AGGREGATES: &[AggregateFunction] = &[
    AggregateFunction::Count,
    AggregateFunction::Max,
    AggregateFunction::Min,
    AggregateFunction::Sum,
];

const EXPRESSION_ERRORS: &[&str] = &[
    "value is out of range",
    "Data Truncated",
    "Truncated incorrect",
    "overflows",
    "Division by 0",
    "Bad Number",
    "Maximum execution time exceeded",
];

impl Dialect for TiDb {
    fn name(&self) -> &'static str {
        "tidb"
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::Backtick
    }

    fn data_types(&self) -> &'static [DataType] {
        DATA_TYPES
    }

    fn type_name(&self, ty: CompositeDataType) -> String {
        match (ty.data_type, ty.size) {
            (DataType::Int, Some(1)) => "TINYINT",
            (DataType::Int, Some(2)) => "SMALLINT",
            (DataType::Int, Some(8)) => "BIGINT",
            (DataType::Int, _) => "INT",
            (DataType::Float, Some(4)) => "FLOAT",
            (DataType::Float, _) => "DOUBLE",
            (DataType::Decimal, _) => "DECIMAL",
            (DataType::Text, _) => "TEXT",
            (DataType::Char, _) => "CHAR",
            (DataType::Bool, _) => "BOOL",
            (DataType::Blob, _) => "BLOB",
            (DataType::Json, _) => "JSON",
        }
        .to_owned()
    }

    fn cast_type_name(&self, ty: DataType) -> String {
        match ty {
            DataType::Int | DataType::Bool => "SIGNED",
            DataType::Float => "DOUBLE",
            DataType::Decimal => "DECIMAL",
            DataType::Text | DataType::Char => "CHAR",
            DataType::Blob => "BINARY",
            DataType::Json => "JSON",
        }
        .to_owned()
    }

    /// Names as reported by `SHOW COLUMNS`.
    fn parse_type_name(&self, native: &str) -> Option<CompositeDataType> {
        let name = native
            .trim()
            .to_ascii_lowercase()
            .replace(" zerofill", "")
            .replace(" unsigned", "");
        if name.contains("decimal") {
            return Some(CompositeDataType::new(DataType::Decimal));
        }
        if name.starts_with("var_string") || name.starts_with("varchar") || name.contains("binary") {
            return Some(CompositeDataType::new(DataType::Text));
        }
        if name.starts_with("char") {
            return Some(CompositeDataType::new(DataType::Char));
        }
        if name.starts_with("bigint") {
            return Some(CompositeDataType::int(8));
        }
        Some(match name.as_str() {
            "text" | "longtext" => CompositeDataType::new(DataType::Text),
            "float" => CompositeDataType::sized(DataType::Float, 4),
            "double" => CompositeDataType::sized(DataType::Float, 8),
            "tinyint(1)" | "bool" | "boolean" => CompositeDataType::new(DataType::Bool),
            "null" => CompositeDataType::new(DataType::Int),
            "tinyint(4)" | "tinyint" => CompositeDataType::int(1),
            "smallint(6)" | "smallint" => CompositeDataType::int(2),
            "int(11)" | "int" | "integer" => CompositeDataType::int(4),
            "blob" | "longblob" => CompositeDataType::new(DataType::Blob),
            "json" => CompositeDataType::new(DataType::Json),
            _ => return None,
        })
    }

    fn can_cast(&self, from: DataType, to: DataType) -> bool {
        from.is_primitive() && to.is_primitive() && to != DataType::Bool
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
        &[JoinKind::Inner, JoinKind::Left, JoinKind::Right, JoinKind::Cross]
    }

    fn expression_errors(&self) -> &'static [&'static str] {
        EXPRESSION_ERRORS
    }

    fn group_by_errors(&self) -> &'static [&'static str] {
        &["only_full_group_by", "Invalid use of group function"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_names() {
        let parse = |s: &str| TiDb.parse_type_name(s).unwrap();
        assert_eq!(parse("tinyint(1)").data_type, DataType::Bool);
        assert_eq!(parse("tinyint(4)"), CompositeDataType::int(1));
        assert_eq!(parse("smallint(6)"), CompositeDataType::int(2));
        assert_eq!(parse("int(11)"), CompositeDataType::int(4));
        assert_eq!(parse("bigint(20) unsigned"), CompositeDataType::int(8));
        assert_eq!(parse("decimal(10,0)").data_type, DataType::Decimal);
        assert_eq!(parse("varbinary(10)").data_type, DataType::Text);
        assert_eq!(parse("longblob").data_type, DataType::Blob);
        assert!(TiDb.parse_type_name("geometry").is_none());
    }

    #[test]
    fn sized_type_names() {
        assert_eq!(TiDb.type_name(CompositeDataType::int(1)), "TINYINT");
        assert_eq!(TiDb.type_name(CompositeDataType::sized(DataType::Float, 8)), "DOUBLE");
        assert_eq!(TiDb.cast_type_name(DataType::Int), "SIGNED");
    }

    #[test]
    fn no_concat_operator() {
        assert!(TiDb.operators().iter().all(|op| op.text != "||"));
    }
}
