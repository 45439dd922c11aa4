//! Non-optimizing reference engine construction (NoREC).
//!
//! The same predicate is evaluated twice: once in a WHERE clause, where the
//! optimizer is free to rewrite it, with the matching rows counted on the
//! client; and once as a projected truth value summed on the server, which
//! forces per-row evaluation. The two counts must agree.

use sqlmorph_ast::{Expr, OrderingTerm, Select};
use sqlmorph_error::Result;
use sqlmorph_gen::{ExpressionGenerator, FromClause, build_from};
use tracing::debug;

use crate::compare::counts_equal;
use crate::exec::Cell;
use crate::outcome::{DefectReport, Outcome};
use crate::state::{GlobalState, TestOracle};

#[derive(Debug, Clone, Default)]
pub struct NoRecOracle;

impl NoRecOracle {
    pub const fn new() -> Self {
        Self
    }

    /// Compare the two counts for a fixed predicate, from-clause and fetch
    /// column. `order_by` is attached to the row-counting query only.
    pub fn check_predicate(
        &self,
        state: &mut GlobalState,
        clause: &FromClause,
        fetch: Expr,
        predicate: Expr,
        order_by: Vec<OrderingTerm>,
    ) -> Result<Outcome> {
        let errors = state.expression_errors();
        let printer = state.printer();

        let optimized = Select::new(clause.from.clone())
            .with_joins(clause.joins.clone())
            .with_fetch_columns(vec![fetch])
            .with_where(predicate.clone())
            .with_order_by(order_by);
        let optimized_sql = printer.render_select(&optimized);

        let counted = Select::new(clause.from.clone())
            .with_joins(clause.joins.clone())
            .with_fetch_columns(vec![Expr::alias(state.dialect.truth_count_expr(predicate), "count")]);
        let count_column = printer.quote_identifier("count");
        let unoptimized_sql = format!(
            "SELECT SUM({count_column}) FROM ({}) AS res",
            printer.render_select(&counted)
        );

        let Some(first) = state.execute_query(&optimized_sql, &errors)? else {
            return Ok(Outcome::inconclusive("optimized query raised an expected error"));
        };
        let Some(second) = state.execute_query(&unoptimized_sql, &errors)? else {
            return Ok(Outcome::inconclusive("unoptimized query raised an expected error"));
        };

        let optimized_count = Some(first.len() as u64);
        // SUM over zero rows is NULL.
        let unoptimized_count = match second.single_value(&unoptimized_sql)? {
            Cell::Null => Some(0),
            cell => cell.as_count(),
        };
        debug!(?optimized_count, ?unoptimized_count, "norec counts");
        let Some(sum) = unoptimized_count else {
            return Ok(Outcome::inconclusive("count could not be determined"));
        };
        if counts_equal(optimized_count, unoptimized_count) {
            return Ok(Outcome::Equivalent);
        }
        let rows = first.len();
        Ok(Outcome::Defect(DefectReport {
            oracle: self.name().to_owned(),
            first_query: optimized_sql,
            second_query: unoptimized_sql,
            first_result: vec![vec![Cell::Integer(rows as i64)]],
            second_result: vec![vec![Cell::Integer(sum as i64)]],
            description: format!("WHERE query returned {rows} rows but the summed predicate counted {sum}"),
        }))
    }
}

impl TestOracle for NoRecOracle {
    fn name(&self) -> &'static str {
        "norec"
    }

    fn check(&mut self, state: &mut GlobalState) -> Result<Outcome> {
        let depth = state.options.max_depth;
        let tables = state.schema.random_non_empty_subset(&mut state.random, None)?;
        let clause = build_from(state.dialect.as_ref(), &tables, depth, &mut state.random)?;
        let generator = ExpressionGenerator::new(state.dialect.as_ref(), tables.columns());
        let predicate = generator.generate_boolean_predicate(depth, &mut state.random)?;
        let fetch = generator.random_column_ref(&mut state.random)?;
        let order_by = if state.random.small_probability() {
            generator.generate_order_by_list(depth, &mut state.random)?
        } else {
            Vec::new()
        };
        self.check_predicate(state, &clause, fetch, predicate, order_by)
    }
}
