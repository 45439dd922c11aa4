//! SQL abstract syntax tree node types and their rendering.
//!
//! The AST is a closed set of variants ([`Expr`]); every operator-bearing
//! node carries a frozen [`Operator`] with its fixity, precedence and
//! bracket-omission flag. The [`Printer`] turns nodes into SQL text and is
//! the only place placement and parenthesization rules live.

pub mod expr;
pub mod ops;
pub mod printer;
pub mod select;

pub use expr::{
    Associativity, ColumnRef, Expr, Join, JoinKind, Literal, Operator, OperatorKind,
    ATOMIC_PRECEDENCE,
};
pub use ops::{AggregateFunction, ArgTypes, FunctionSpec, OperatorSpec};
pub use printer::{BlobStyle, Printer, QuoteStyle, render};
pub use select::{OrderingTerm, Select, SelectType, SortDirection};
