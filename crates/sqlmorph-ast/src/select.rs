//! SELECT statement model.

use serde::{Deserialize, Serialize};

use crate::expr::{Expr, Join};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectType {
    #[default]
    All,
    Distinct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One ORDER BY item. `direction == None` leaves the engine default.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderingTerm {
    pub expr: Expr,
    pub direction: Option<SortDirection>,
}

/// A single SELECT. Built fresh for each check and cloned to derive the
/// rewritten forms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
    pub select_type: SelectType,
    /// Empty renders as `*`.
    pub fetch_columns: Vec<Expr>,
    pub from: Vec<Expr>,
    pub joins: Vec<Join>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub order_by: Vec<OrderingTerm>,
}

impl Select {
    pub fn new(from: Vec<Expr>) -> Self {
        Self {
            from,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_fetch_columns(mut self, columns: Vec<Expr>) -> Self {
        self.fetch_columns = columns;
        self
    }

    #[must_use]
    pub fn with_joins(mut self, joins: Vec<Join>) -> Self {
        self.joins = joins;
        self
    }

    #[must_use]
    pub fn with_where(mut self, predicate: Expr) -> Self {
        self.where_clause = Some(predicate);
        self
    }

    #[must_use]
    pub fn without_where(mut self) -> Self {
        self.where_clause = None;
        self
    }

    #[must_use]
    pub fn with_group_by(mut self, group_by: Vec<Expr>) -> Self {
        self.group_by = group_by;
        self
    }

    #[must_use]
    pub fn with_order_by(mut self, order_by: Vec<OrderingTerm>) -> Self {
        self.order_by = order_by;
        self
    }

    #[must_use]
    pub const fn with_select_type(mut self, select_type: SelectType) -> Self {
        self.select_type = select_type;
        self
    }

    pub fn is_distinct(&self) -> bool {
        self.select_type == SelectType::Distinct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_replaces_clauses() {
        let base = Select::new(vec![Expr::table("t0")])
            .with_where(Expr::literal(crate::Literal::Bool(true)))
            .with_select_type(SelectType::Distinct);
        assert!(base.is_distinct());
        let stripped = base.clone().without_where();
        assert!(stripped.where_clause.is_none());
        assert_eq!(stripped.from, base.from);
    }
}
