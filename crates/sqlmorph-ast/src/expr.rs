//! Expression nodes.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use sqlmorph_types::{Column, DataType, RandomSource};

use crate::ops::{AggregateFunction, FunctionSpec, OperatorSpec};

/// Precedence reported by nodes that can never need brackets (literals,
/// column references, calls, casts).
pub const ATOMIC_PRECEDENCE: u8 = u8::MAX;

/// Where an operator token sits relative to its operand(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorKind {
    Prefix,
    Infix,
    Postfix,
}

/// Grouping of equal-precedence infix chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Associativity {
    Left,
    /// `a = b = c` is rejected or ambiguous across engines; both operands of
    /// equal precedence are bracketed.
    NonAssoc,
}

/// The operator attached to a prefix, infix or postfix node.
///
/// The text is fixed when the node is built and never re-chosen, so a node
/// renders identically every time it is printed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Operator {
    text: Cow<'static, str>,
    kind: OperatorKind,
    precedence: u8,
    associativity: Associativity,
    omit_brackets: bool,
}

impl Operator {
    #[must_use]
    pub fn from_spec(spec: &OperatorSpec) -> Self {
        Self {
            text: Cow::Borrowed(spec.text),
            kind: spec.kind,
            precedence: spec.precedence,
            associativity: spec.associativity,
            omit_brackets: false,
        }
    }

    /// An operator whose text was computed at construction time.
    pub fn frozen(
        text: impl Into<String>,
        kind: OperatorKind,
        precedence: u8,
        omit_brackets: bool,
    ) -> Self {
        Self {
            text: Cow::Owned(text.into()),
            kind,
            precedence,
            associativity: Associativity::NonAssoc,
            omit_brackets,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub const fn kind(&self) -> OperatorKind {
        self.kind
    }

    pub const fn precedence(&self) -> u8 {
        self.precedence
    }

    pub const fn associativity(&self) -> Associativity {
        self.associativity
    }

    pub const fn omit_brackets(&self) -> bool {
        self.omit_brackets
    }
}

/// Literal values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Int(i64),
    Float(f64),
    /// Decimal digits, kept as text so no precision is lost.
    Decimal(String),
    Text(String),
    Bool(bool),
    Blob(Vec<u8>),
    Json(String),
}

impl Literal {
    /// Type of the literal; `None` for NULL, which fits every position.
    pub const fn data_type(&self) -> Option<DataType> {
        match self {
            Self::Null => None,
            Self::Int(_) => Some(DataType::Int),
            Self::Float(_) => Some(DataType::Float),
            Self::Decimal(_) => Some(DataType::Decimal),
            Self::Text(_) => Some(DataType::Text),
            Self::Bool(_) => Some(DataType::Bool),
            Self::Blob(_) => Some(DataType::Blob),
            Self::Json(_) => Some(DataType::Json),
        }
    }
}

/// A (possibly table-qualified) column reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub column: String,
    pub data_type: DataType,
}

impl ColumnRef {
    pub fn qualified(column: &Column) -> Self {
        Self {
            table: Some(column.table_name().to_owned()),
            column: column.name().to_owned(),
            data_type: column.data_type(),
        }
    }

    /// An unqualified reference, e.g. to a derived-table alias.
    pub fn bare(column: impl Into<String>, data_type: DataType) -> Self {
        Self {
            table: None,
            column: column.into(),
            data_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinKind {
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Full => "FULL JOIN",
            Self::Cross => "CROSS JOIN",
        }
    }
}

/// A join clause. `on` is `None` only for CROSS joins.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: Expr,
    pub on: Option<Expr>,
}

/// Expression AST.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Column(ColumnRef),
    /// A table in a from-list or join.
    Table { name: String },
    Prefix {
        op: Operator,
        operand: Box<Expr>,
        data_type: DataType,
    },
    Infix {
        op: Operator,
        left: Box<Expr>,
        right: Box<Expr>,
        data_type: DataType,
    },
    Postfix {
        op: Operator,
        operand: Box<Expr>,
        data_type: Option<DataType>,
    },
    FunctionCall {
        name: Cow<'static, str>,
        args: Vec<Expr>,
        data_type: DataType,
    },
    Aggregate {
        func: AggregateFunction,
        args: Vec<Expr>,
        data_type: DataType,
    },
    Cast {
        expr: Box<Expr>,
        /// Native type spelling, fixed at construction.
        type_name: String,
        target: DataType,
    },
    Alias {
        expr: Box<Expr>,
        alias: String,
    },
    /// Verbatim text appended after an expression.
    PostfixText {
        expr: Box<Expr>,
        text: String,
        omit_brackets: bool,
    },
    Join(Box<Join>),
}

impl Expr {
    pub fn literal(value: Literal) -> Self {
        Self::Literal(value)
    }

    pub fn column(column: &Column) -> Self {
        Self::Column(ColumnRef::qualified(column))
    }

    pub fn table(name: impl Into<String>) -> Self {
        Self::Table { name: name.into() }
    }

    pub fn prefix(spec: &OperatorSpec, operand: Self, data_type: DataType) -> Self {
        debug_assert_eq!(spec.kind, OperatorKind::Prefix, "{} must be prefix", spec.name);
        Self::Prefix {
            op: Operator::from_spec(spec),
            operand: Box::new(operand),
            data_type,
        }
    }

    pub fn infix(spec: &OperatorSpec, left: Self, right: Self, data_type: DataType) -> Self {
        debug_assert_eq!(spec.kind, OperatorKind::Infix, "{} must be infix", spec.name);
        Self::Infix {
            op: Operator::from_spec(spec),
            left: Box::new(left),
            right: Box::new(right),
            data_type,
        }
    }

    pub fn postfix(spec: &OperatorSpec, operand: Self, data_type: DataType) -> Self {
        debug_assert_eq!(spec.kind, OperatorKind::Postfix, "{} must be postfix", spec.name);
        Self::Postfix {
            op: Operator::from_spec(spec),
            operand: Box::new(operand),
            data_type: Some(data_type),
        }
    }

    /// Build a node from a spec of any fixity. `operands` must match the
    /// spec's arity; `None` otherwise.
    pub fn operation(spec: &OperatorSpec, mut operands: Vec<Self>, data_type: DataType) -> Option<Self> {
        if operands.len() != spec.arity() {
            return None;
        }
        let first = operands.remove(0);
        Some(match spec.kind {
            OperatorKind::Prefix => Self::prefix(spec, first, data_type),
            OperatorKind::Postfix => Self::postfix(spec, first, data_type),
            OperatorKind::Infix => {
                let second = operands.pop()?;
                Self::infix(spec, first, second, data_type)
            }
        })
    }

    pub fn function(spec: &FunctionSpec, args: Vec<Self>, data_type: DataType) -> Self {
        Self::FunctionCall {
            name: Cow::Borrowed(spec.name),
            args,
            data_type,
        }
    }

    /// Aggregate node. Returns `None` when `func` cannot return `data_type`.
    pub fn aggregate(func: AggregateFunction, args: Vec<Self>, data_type: DataType) -> Option<Self> {
        func.supports_return_type(data_type).then_some(Self::Aggregate {
            func,
            args,
            data_type,
        })
    }

    pub fn cast(expr: Self, type_name: impl Into<String>, target: DataType) -> Self {
        Self::Cast {
            expr: Box::new(expr),
            type_name: type_name.into(),
            target,
        }
    }

    pub fn alias(expr: Self, alias: impl Into<String>) -> Self {
        Self::Alias {
            expr: Box::new(expr),
            alias: alias.into(),
        }
    }

    pub fn postfix_text(expr: Self, text: impl Into<String>, omit_brackets: bool) -> Self {
        Self::PostfixText {
            expr: Box::new(expr),
            text: text.into(),
            omit_brackets,
        }
    }

    /// A table reference decorated with an index-forcing hint, e.g.
    /// `t0@{FORCE_INDEX=i0,DESC}`. The hint spelling is drawn here, once.
    pub fn index_hint(table: Self, index: &str, random: &mut RandomSource) -> Self {
        let text = if random.boolean() {
            format!("@{{FORCE_INDEX={index}}}")
        } else {
            let order = if random.boolean() { "ASC" } else { "DESC" };
            format!("@{{FORCE_INDEX={index},{order}}}")
        };
        Self::Postfix {
            op: Operator::frozen(text, OperatorKind::Postfix, ATOMIC_PRECEDENCE, true),
            operand: Box::new(table),
            data_type: None,
        }
    }

    /// Type of the value this node produces, when it has one.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Self::Literal(lit) => lit.data_type(),
            Self::Column(col) => Some(col.data_type),
            Self::Prefix { data_type, .. }
            | Self::Infix { data_type, .. }
            | Self::FunctionCall { data_type, .. }
            | Self::Aggregate { data_type, .. } => Some(*data_type),
            Self::Postfix { data_type, .. } => *data_type,
            Self::Cast { target, .. } => Some(*target),
            Self::Alias { expr, .. } | Self::PostfixText { expr, .. } => expr.data_type(),
            Self::Table { .. } | Self::Join(_) => None,
        }
    }

    /// Binding strength used by the printer.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Prefix { op, .. } | Self::Infix { op, .. } | Self::Postfix { op, .. } => {
                op.precedence()
            }
            Self::Alias { .. } | Self::PostfixText { .. } => 0,
            Self::Literal(_)
            | Self::Column(_)
            | Self::Table { .. }
            | Self::FunctionCall { .. }
            | Self::Aggregate { .. }
            | Self::Cast { .. }
            | Self::Join(_) => ATOMIC_PRECEDENCE,
        }
    }

    /// The node's own declaration that it never needs enclosing brackets.
    pub fn omits_brackets(&self) -> bool {
        match self {
            Self::Prefix { op, .. } | Self::Infix { op, .. } | Self::Postfix { op, .. } => {
                op.omit_brackets()
            }
            Self::Alias { .. } => true,
            Self::PostfixText { omit_brackets, .. } => *omit_brackets,
            _ => false,
        }
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        1 + self.children().map(Self::node_count).sum::<usize>()
    }

    /// Longest root-to-leaf path; a leaf has depth 0.
    pub fn depth(&self) -> usize {
        self.children().map(|c| c.depth() + 1).max().unwrap_or(0)
    }

    /// Whether any aggregate appears in the tree.
    pub fn contains_aggregate(&self) -> bool {
        matches!(self, Self::Aggregate { .. }) || self.children().any(Self::contains_aggregate)
    }

    /// Whether any column reference appears in the tree.
    pub fn references_column(&self) -> bool {
        matches!(self, Self::Column(_)) || self.children().any(Self::references_column)
    }

    fn children(&self) -> Box<dyn Iterator<Item = &Self> + '_> {
        match self {
            Self::Literal(_) | Self::Column(_) | Self::Table { .. } => Box::new(std::iter::empty()),
            Self::Prefix { operand, .. } | Self::Postfix { operand, .. } => {
                Box::new(std::iter::once(operand.as_ref()))
            }
            Self::Infix { left, right, .. } => {
                Box::new([left.as_ref(), right.as_ref()].into_iter())
            }
            Self::FunctionCall { args, .. } | Self::Aggregate { args, .. } => Box::new(args.iter()),
            Self::Cast { expr, .. } | Self::Alias { expr, .. } | Self::PostfixText { expr, .. } => {
                Box::new(std::iter::once(expr.as_ref()))
            }
            Self::Join(join) => Box::new(std::iter::once(&join.table).chain(join.on.iter())),
        }
    }
}

impl From<Literal> for Expr {
    fn from(value: Literal) -> Self {
        Self::Literal(value)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::printer::render(self))
    }
}
