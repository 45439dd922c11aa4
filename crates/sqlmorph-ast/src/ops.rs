//! Operator, function and aggregate catalogs.
//!
//! Operators and functions are data, not types: a dialect enables a slice of
//! [`OperatorSpec`] / [`FunctionSpec`] values and the generator picks from
//! it. Adding an operator is an edit to one of these tables.

use sqlmorph_types::{DataType, supports_return_type};

use crate::expr::{Associativity, OperatorKind};

/// Every primitive canonical type.
pub const PRIMITIVE: &[DataType] = &[
    DataType::Int,
    DataType::Float,
    DataType::Decimal,
    DataType::Text,
    DataType::Char,
    DataType::Bool,
    DataType::Blob,
];

/// Arithmetic result types.
pub const ARITHMETIC: &[DataType] = &[DataType::Int, DataType::Float, DataType::Decimal];

const BOOL: &[DataType] = &[DataType::Bool];
const INT: &[DataType] = &[DataType::Int];
const TEXT: &[DataType] = &[DataType::Text];

/// How the operand types of an operator, function or aggregate relate to its
/// result type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgTypes {
    /// Every operand has the result type.
    SameAsResult,
    /// All operands share one comparable type, chosen freely.
    AnyComparable,
    /// All operands share one type, chosen freely.
    Any,
    /// All operands share one type drawn from the list.
    Fixed(&'static [DataType]),
}

impl ArgTypes {
    /// Operand types usable for a node returning `result`, restricted to the
    /// dialect's `enabled` set. Empty when no operand type is available.
    pub fn candidates(self, result: DataType, enabled: &[DataType]) -> Vec<DataType> {
        match self {
            Self::SameAsResult => {
                if enabled.contains(&result) {
                    vec![result]
                } else {
                    Vec::new()
                }
            }
            Self::AnyComparable => enabled.iter().copied().filter(|t| t.is_comparable()).collect(),
            Self::Any => enabled.to_vec(),
            Self::Fixed(types) => enabled.iter().copied().filter(|t| types.contains(t)).collect(),
        }
    }
}

/// A catalog entry for an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorSpec {
    pub name: &'static str,
    pub text: &'static str,
    pub kind: OperatorKind,
    pub precedence: u8,
    pub associativity: Associativity,
    /// Result types this operator can produce; empty means any.
    pub returns: &'static [DataType],
    pub args: ArgTypes,
}

impl OperatorSpec {
    pub const fn arity(&self) -> usize {
        match self.kind {
            OperatorKind::Infix => 2,
            OperatorKind::Prefix | OperatorKind::Postfix => 1,
        }
    }

    pub fn supports_return_type(&self, ty: DataType) -> bool {
        supports_return_type(self.returns, ty)
    }
}

/// A catalog entry for a scalar function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub arity: usize,
    pub returns: &'static [DataType],
    pub args: ArgTypes,
}

impl FunctionSpec {
    pub fn supports_return_type(&self, ty: DataType) -> bool {
        supports_return_type(self.returns, ty)
    }
}

/// Binding strengths shared by every dialect catalog. Higher binds tighter.
pub mod precedence {
    pub const OR: u8 = 1;
    pub const AND: u8 = 2;
    pub const NOT: u8 = 3;
    pub const COMPARISON: u8 = 4;
    pub const BITWISE: u8 = 5;
    pub const ADDITIVE: u8 = 7;
    pub const MULTIPLICATIVE: u8 = 8;
    pub const CONCAT: u8 = 9;
    pub const UNARY: u8 = 10;
}

/// Operators and functions common to most SQL engines.
pub mod standard {
    use super::{ARITHMETIC, ArgTypes, BOOL, FunctionSpec, INT, OperatorSpec, PRIMITIVE, TEXT, precedence};
    use crate::expr::{Associativity, OperatorKind};

    const fn infix(
        name: &'static str,
        text: &'static str,
        precedence: u8,
        associativity: Associativity,
        returns: &'static [sqlmorph_types::DataType],
        args: ArgTypes,
    ) -> OperatorSpec {
        OperatorSpec {
            name,
            text,
            kind: OperatorKind::Infix,
            precedence,
            associativity,
            returns,
            args,
        }
    }

    const fn comparison(name: &'static str, text: &'static str) -> OperatorSpec {
        infix(
            name,
            text,
            precedence::COMPARISON,
            Associativity::NonAssoc,
            BOOL,
            ArgTypes::AnyComparable,
        )
    }

    const fn postfix_test(name: &'static str, text: &'static str, args: ArgTypes) -> OperatorSpec {
        OperatorSpec {
            name,
            text,
            kind: OperatorKind::Postfix,
            precedence: precedence::COMPARISON,
            associativity: Associativity::NonAssoc,
            returns: BOOL,
            args,
        }
    }

    // --- prefix ---

    pub const NOT: OperatorSpec = OperatorSpec {
        name: "not",
        text: "NOT",
        kind: OperatorKind::Prefix,
        precedence: precedence::NOT,
        associativity: Associativity::Left,
        returns: BOOL,
        args: ArgTypes::SameAsResult,
    };

    pub const NEGATE: OperatorSpec = OperatorSpec {
        name: "negate",
        text: "-",
        kind: OperatorKind::Prefix,
        precedence: precedence::UNARY,
        associativity: Associativity::Left,
        returns: ARITHMETIC,
        args: ArgTypes::SameAsResult,
    };

    pub const PLUS: OperatorSpec = OperatorSpec {
        name: "plus",
        text: "+",
        kind: OperatorKind::Prefix,
        precedence: precedence::UNARY,
        associativity: Associativity::Left,
        returns: ARITHMETIC,
        args: ArgTypes::SameAsResult,
    };

    // --- logical ---

    pub const AND: OperatorSpec = infix("and", "AND", precedence::AND, Associativity::Left, BOOL, ArgTypes::SameAsResult);
    pub const OR: OperatorSpec = infix("or", "OR", precedence::OR, Associativity::Left, BOOL, ArgTypes::SameAsResult);

    // --- comparison ---

    pub const EQ: OperatorSpec = comparison("eq", "=");
    pub const NE: OperatorSpec = comparison("ne", "<>");
    pub const LT: OperatorSpec = comparison("lt", "<");
    pub const LE: OperatorSpec = comparison("le", "<=");
    pub const GT: OperatorSpec = comparison("gt", ">");
    pub const GE: OperatorSpec = comparison("ge", ">=");
    pub const IS_DISTINCT_FROM: OperatorSpec = comparison("is_distinct_from", "IS DISTINCT FROM");
    pub const IS_NOT_DISTINCT_FROM: OperatorSpec =
        comparison("is_not_distinct_from", "IS NOT DISTINCT FROM");
    /// SQLite's null-safe equality.
    pub const IS: OperatorSpec = comparison("is", "IS");
    pub const IS_NOT: OperatorSpec = comparison("is_not", "IS NOT");
    pub const LIKE: OperatorSpec = infix(
        "like",
        "LIKE",
        precedence::COMPARISON,
        Associativity::NonAssoc,
        BOOL,
        ArgTypes::Fixed(TEXT),
    );

    // --- arithmetic ---

    pub const ADD: OperatorSpec = infix("add", "+", precedence::ADDITIVE, Associativity::Left, ARITHMETIC, ArgTypes::SameAsResult);
    pub const SUB: OperatorSpec = infix("sub", "-", precedence::ADDITIVE, Associativity::Left, ARITHMETIC, ArgTypes::SameAsResult);
    pub const MUL: OperatorSpec = infix("mul", "*", precedence::MULTIPLICATIVE, Associativity::Left, ARITHMETIC, ArgTypes::SameAsResult);
    pub const DIV: OperatorSpec = infix("div", "/", precedence::MULTIPLICATIVE, Associativity::Left, ARITHMETIC, ArgTypes::SameAsResult);
    pub const MOD: OperatorSpec = infix("mod", "%", precedence::MULTIPLICATIVE, Associativity::Left, INT, ArgTypes::SameAsResult);
    pub const BIT_AND: OperatorSpec = infix("bit_and", "&", precedence::BITWISE, Associativity::Left, INT, ArgTypes::SameAsResult);
    pub const BIT_OR: OperatorSpec = infix("bit_or", "|", precedence::BITWISE, Associativity::Left, INT, ArgTypes::SameAsResult);
    pub const CONCAT: OperatorSpec = infix("concat", "||", precedence::CONCAT, Associativity::Left, TEXT, ArgTypes::Fixed(TEXT));

    // --- postfix ---

    pub const IS_NULL: OperatorSpec = postfix_test("is_null", "IS NULL", ArgTypes::Any);
    pub const IS_NOT_NULL: OperatorSpec = postfix_test("is_not_null", "IS NOT NULL", ArgTypes::Any);
    pub const IS_TRUE: OperatorSpec = postfix_test("is_true", "IS TRUE", ArgTypes::Fixed(BOOL));
    pub const IS_FALSE: OperatorSpec = postfix_test("is_false", "IS FALSE", ArgTypes::Fixed(BOOL));
    pub const IS_NOT_TRUE: OperatorSpec = postfix_test("is_not_true", "IS NOT TRUE", ArgTypes::Fixed(BOOL));
    pub const IS_NOT_FALSE: OperatorSpec = postfix_test("is_not_false", "IS NOT FALSE", ArgTypes::Fixed(BOOL));

    // --- functions ---

    pub const ABS: FunctionSpec = FunctionSpec { name: "ABS", arity: 1, returns: ARITHMETIC, args: ArgTypes::SameAsResult };
    pub const LENGTH: FunctionSpec = FunctionSpec { name: "LENGTH", arity: 1, returns: INT, args: ArgTypes::Fixed(TEXT) };
    pub const UPPER: FunctionSpec = FunctionSpec { name: "UPPER", arity: 1, returns: TEXT, args: ArgTypes::Fixed(TEXT) };
    pub const LOWER: FunctionSpec = FunctionSpec { name: "LOWER", arity: 1, returns: TEXT, args: ArgTypes::Fixed(TEXT) };
    pub const TRIM: FunctionSpec = FunctionSpec { name: "TRIM", arity: 1, returns: TEXT, args: ArgTypes::Fixed(TEXT) };
    pub const COALESCE: FunctionSpec = FunctionSpec { name: "COALESCE", arity: 2, returns: PRIMITIVE, args: ArgTypes::SameAsResult };
    pub const NULLIF: FunctionSpec = FunctionSpec { name: "NULLIF", arity: 2, returns: PRIMITIVE, args: ArgTypes::SameAsResult };
    pub const INSTR: FunctionSpec = FunctionSpec { name: "INSTR", arity: 2, returns: INT, args: ArgTypes::Fixed(TEXT) };
    pub const TYPEOF: FunctionSpec = FunctionSpec { name: "TYPEOF", arity: 1, returns: TEXT, args: ArgTypes::Any };
    pub const STRPOS: FunctionSpec = FunctionSpec { name: "STRPOS", arity: 2, returns: INT, args: ArgTypes::Fixed(TEXT) };
}

/// Aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    Avg,
    BitAnd,
    BitOr,
    BoolAnd,
    BoolOr,
    Count,
    Every,
    Max,
    Min,
    Sum,
    /// SQLite's never-NULL floating sum.
    Total,
}

impl AggregateFunction {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Avg => "AVG",
            Self::BitAnd => "BIT_AND",
            Self::BitOr => "BIT_OR",
            Self::BoolAnd => "BOOL_AND",
            Self::BoolOr => "BOOL_OR",
            Self::Count => "COUNT",
            Self::Every => "EVERY",
            Self::Max => "MAX",
            Self::Min => "MIN",
            Self::Sum => "SUM",
            Self::Total => "TOTAL",
        }
    }

    /// Result types the aggregate can produce. Empty means unconstrained.
    pub const fn supported_return_types(self) -> &'static [DataType] {
        match self {
            Self::Avg => &[DataType::Float, DataType::Decimal],
            Self::BitAnd | Self::BitOr | Self::Count => INT,
            Self::BoolAnd | Self::BoolOr | Self::Every => BOOL,
            Self::Max | Self::Min => PRIMITIVE,
            Self::Sum => ARITHMETIC,
            Self::Total => &[DataType::Float],
        }
    }

    pub fn supports_return_type(self, ty: DataType) -> bool {
        supports_return_type(self.supported_return_types(), ty)
    }

    pub const fn arg_types(self) -> ArgTypes {
        match self {
            Self::Avg | Self::Total => ArgTypes::Fixed(ARITHMETIC),
            Self::Count => ArgTypes::Any,
            Self::BitAnd
            | Self::BitOr
            | Self::BoolAnd
            | Self::BoolOr
            | Self::Every
            | Self::Max
            | Self::Min
            | Self::Sum => ArgTypes::SameAsResult,
        }
    }

    /// The aggregate that recombines per-partition results of `self` into
    /// the result over the whole input. `None` when partial results cannot
    /// be recombined (AVG).
    pub const fn combinator(self) -> Option<Self> {
        match self {
            Self::Avg => None,
            Self::Count => Some(Self::Sum),
            Self::BitAnd
            | Self::BitOr
            | Self::BoolAnd
            | Self::BoolOr
            | Self::Every
            | Self::Max
            | Self::Min
            | Self::Sum
            | Self::Total => Some(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_follows_fixity() {
        assert_eq!(standard::NOT.arity(), 1);
        assert_eq!(standard::IS_NULL.arity(), 1);
        assert_eq!(standard::AND.arity(), 2);
        assert_eq!(standard::LIKE.arity(), 2);
    }

    #[test]
    fn comparison_operands_are_comparable() {
        let enabled = [DataType::Int, DataType::Text, DataType::Json];
        let picks = standard::LT.args.candidates(DataType::Bool, &enabled);
        assert_eq!(picks, vec![DataType::Int, DataType::Text]);
    }

    #[test]
    fn same_as_result_needs_enabled_result() {
        assert!(ArgTypes::SameAsResult.candidates(DataType::Decimal, &[DataType::Int]).is_empty());
        assert_eq!(
            ArgTypes::SameAsResult.candidates(DataType::Int, &[DataType::Int]),
            vec![DataType::Int]
        );
    }

    #[test]
    fn composite_type_has_no_function_producers() {
        let catalog = [standard::COALESCE, standard::NULLIF, standard::ABS, standard::UPPER];
        assert!(catalog.iter().all(|f| !f.supports_return_type(DataType::Json)));
    }

    #[test]
    fn combinators() {
        assert_eq!(AggregateFunction::Count.combinator(), Some(AggregateFunction::Sum));
        assert_eq!(AggregateFunction::Min.combinator(), Some(AggregateFunction::Min));
        assert_eq!(AggregateFunction::Avg.combinator(), None);
        assert!(AggregateFunction::Sum.supports_return_type(DataType::Float));
        assert!(!AggregateFunction::Sum.supports_return_type(DataType::Text));
        assert!(AggregateFunction::Max.supports_return_type(DataType::Text));
    }
}
