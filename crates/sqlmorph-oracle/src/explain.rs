//! EXPLAIN smoke checks.
//!
//! Planning a random query must not fail with an unexpected error. There is
//! no second query to compare against; a successful EXPLAIN is
//! [`Outcome::Equivalent`].

use sqlmorph_error::Result;
use sqlmorph_gen::{explain, random_select};
use tracing::debug;

use crate::outcome::Outcome;
use crate::state::{GlobalState, TestOracle};

#[derive(Debug, Clone, Default)]
pub struct ExplainOracle;

impl ExplainOracle {
    pub const fn new() -> Self {
        Self
    }
}

impl TestOracle for ExplainOracle {
    fn name(&self) -> &'static str {
        "explain"
    }

    fn check(&mut self, state: &mut GlobalState) -> Result<Outcome> {
        let depth = state.options.max_depth;
        let tables = state.schema.random_non_empty_subset(&mut state.random, None)?;
        let select = random_select(state.dialect.as_ref(), &tables, depth, &mut state.random)?;
        let statement = state.printer().render_select(&select);
        let Some(sql) = explain(state.dialect.as_ref(), &statement, &mut state.random) else {
            return Ok(Outcome::inconclusive("dialect has no EXPLAIN"));
        };
        let mut errors = state.expression_errors();
        errors.add_all(state.dialect.group_by_errors());
        match state.execute_query(&sql, &errors)? {
            Some(plan) => {
                debug!(lines = plan.len(), "explain succeeded");
                Ok(Outcome::Equivalent)
            }
            None => Ok(Outcome::inconclusive("EXPLAIN raised an expected error")),
        }
    }
}
