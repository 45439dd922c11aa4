//! AST to SQL text.
//!
//! Rendering is pure: the only state consulted is the node itself (including
//! any operator text frozen at construction) and the dialect's quoting and
//! blob-literal styles.

use std::fmt::Write as _;

use crate::expr::{ATOMIC_PRECEDENCE, Associativity, ColumnRef, Expr, Join, Literal, OperatorKind};
use crate::select::{OrderingTerm, Select, SelectType};

/// How identifiers are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuoteStyle {
    #[default]
    None,
    DoubleQuote,
    Backtick,
}

/// How blob literals are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlobStyle {
    /// `X'00ff'`
    #[default]
    HexPrefix,
    /// `'\x00ff'::BYTEA`
    ByteaEscape,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Printer {
    pub quote: QuoteStyle,
    pub blob: BlobStyle,
}

/// Render with the default (unquoted, `X''` blobs) printer.
pub fn render(expr: &Expr) -> String {
    Printer::default().render(expr)
}

impl Printer {
    pub const fn new(quote: QuoteStyle, blob: BlobStyle) -> Self {
        Self { quote, blob }
    }

    pub fn render(&self, expr: &Expr) -> String {
        let mut out = String::new();
        self.write_expr(&mut out, expr);
        out
    }

    pub fn quote_identifier(&self, name: &str) -> String {
        match self.quote {
            QuoteStyle::None => name.to_owned(),
            QuoteStyle::DoubleQuote => format!("\"{}\"", name.replace('"', "\"\"")),
            QuoteStyle::Backtick => format!("`{}`", name.replace('`', "``")),
        }
    }

    pub fn render_literal(&self, literal: &Literal) -> String {
        match literal {
            Literal::Null => "NULL".to_owned(),
            Literal::Int(v) => v.to_string(),
            Literal::Float(v) if v.is_finite() => format!("{v:?}"),
            Literal::Float(v) => quote_text(&v.to_string()),
            Literal::Decimal(digits) => digits.clone(),
            Literal::Text(s) | Literal::Json(s) => quote_text(s),
            Literal::Bool(true) => "TRUE".to_owned(),
            Literal::Bool(false) => "FALSE".to_owned(),
            Literal::Blob(bytes) => {
                let mut hex = String::with_capacity(bytes.len() * 2);
                for b in bytes {
                    let _ = write!(hex, "{b:02x}");
                }
                match self.blob {
                    BlobStyle::HexPrefix => format!("X'{hex}'"),
                    BlobStyle::ByteaEscape => format!("'\\x{hex}'::BYTEA"),
                }
            }
        }
    }

    pub fn render_select(&self, select: &Select) -> String {
        let mut out = String::from("SELECT ");
        if select.select_type == SelectType::Distinct {
            out.push_str("DISTINCT ");
        }
        if select.fetch_columns.is_empty() {
            out.push('*');
        } else {
            self.write_list(&mut out, &select.fetch_columns);
        }
        if !select.from.is_empty() {
            out.push_str(" FROM ");
            self.write_list(&mut out, &select.from);
        }
        for join in &select.joins {
            out.push(' ');
            self.write_join(&mut out, join);
        }
        if let Some(predicate) = &select.where_clause {
            out.push_str(" WHERE ");
            self.write_expr(&mut out, predicate);
        }
        if !select.group_by.is_empty() {
            out.push_str(" GROUP BY ");
            self.write_list(&mut out, &select.group_by);
        }
        if !select.order_by.is_empty() {
            out.push_str(" ORDER BY ");
            for (i, term) in select.order_by.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                self.write_ordering_term(&mut out, term);
            }
        }
        out
    }

    fn write_ordering_term(&self, out: &mut String, term: &OrderingTerm) {
        self.write_expr(out, &term.expr);
        if let Some(direction) = term.direction {
            out.push(' ');
            out.push_str(direction.keyword());
        }
    }

    fn write_list(&self, out: &mut String, items: &[Expr]) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.write_expr(out, item);
        }
    }

    fn write_join(&self, out: &mut String, join: &Join) {
        out.push_str(join.kind.keyword());
        out.push(' ');
        self.write_expr(out, &join.table);
        if let Some(on) = &join.on {
            out.push_str(" ON ");
            self.write_expr(out, on);
        }
    }

    fn write_column(&self, out: &mut String, column: &ColumnRef) {
        if let Some(table) = &column.table {
            out.push_str(&self.quote_identifier(table));
            out.push('.');
        }
        out.push_str(&self.quote_identifier(&column.column));
    }

    /// Write `child`, bracketed when its binding is weaker than `parent`
    /// (or equally strong and `wrap_equal`), unless it omits brackets.
    fn write_operand(&self, out: &mut String, child: &Expr, parent: u8, wrap_equal: bool) {
        let child_prec = child.precedence();
        let wrap = !child.omits_brackets()
            && child_prec != ATOMIC_PRECEDENCE
            && (child_prec < parent || (wrap_equal && child_prec == parent));
        if wrap {
            out.push('(');
            self.write_expr(out, child);
            out.push(')');
        } else {
            self.write_expr(out, child);
        }
    }

    fn write_expr(&self, out: &mut String, expr: &Expr) {
        match expr {
            Expr::Literal(literal) => out.push_str(&self.render_literal(literal)),
            Expr::Column(column) => self.write_column(out, column),
            Expr::Table { name } => out.push_str(&self.quote_identifier(name)),
            Expr::Prefix { op, operand, .. } => {
                debug_assert_eq!(op.kind(), OperatorKind::Prefix);
                out.push_str(op.text());
                out.push(' ');
                self.write_operand(out, operand, op.precedence(), false);
            }
            Expr::Infix {
                op, left, right, ..
            } => {
                debug_assert_eq!(op.kind(), OperatorKind::Infix);
                let non_assoc = op.associativity() == Associativity::NonAssoc;
                self.write_operand(out, left, op.precedence(), non_assoc);
                out.push(' ');
                out.push_str(op.text());
                out.push(' ');
                self.write_operand(out, right, op.precedence(), true);
            }
            Expr::Postfix { op, operand, .. } => {
                debug_assert_eq!(op.kind(), OperatorKind::Postfix);
                self.write_operand(out, operand, op.precedence(), true);
                // Decorative postfixes (index hints) attach without a space.
                if !op.omit_brackets() {
                    out.push(' ');
                }
                out.push_str(op.text());
            }
            Expr::FunctionCall { name, args, .. } => {
                out.push_str(name);
                out.push('(');
                self.write_list(out, args);
                out.push(')');
            }
            Expr::Aggregate { func, args, .. } => {
                out.push_str(func.name());
                out.push('(');
                self.write_list(out, args);
                out.push(')');
            }
            Expr::Cast {
                expr, type_name, ..
            } => {
                out.push_str("CAST(");
                self.write_expr(out, expr);
                out.push_str(" AS ");
                out.push_str(type_name);
                out.push(')');
            }
            Expr::Alias { expr, alias } => {
                self.write_expr(out, expr);
                out.push_str(" AS ");
                out.push_str(&self.quote_identifier(alias));
            }
            Expr::PostfixText { expr, text, .. } => {
                self.write_operand(out, expr, ATOMIC_PRECEDENCE, false);
                out.push_str(text);
            }
            Expr::Join(join) => self.write_join(out, join),
        }
    }
}

fn quote_text(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
