//! Ternary logic partitioning (TLP).
//!
//! Every row satisfies exactly one of `P`, `NOT P` and `P IS NULL`. Running
//! a query once per partition and combining the results must reproduce the
//! unpartitioned query: as a multiset for plain queries, as a set for
//! grouped or DISTINCT queries, and through the aggregate's combinator for
//! aggregate queries.

use sqlmorph_ast::ops::standard;
use sqlmorph_ast::{AggregateFunction, Expr, Printer, Select, SelectType};
use sqlmorph_error::{MorphError, Result};
use sqlmorph_gen::{ExpressionGenerator, FromClause, build_from};
use sqlmorph_types::{Column, DataType, supports_return_type};
use tracing::debug;

use crate::compare::{multiset_eq, set_eq, sorted_rows, values_equal_approx};
use crate::errors::ExpectedErrors;
use crate::exec::{Cell, Row};
use crate::outcome::{DefectReport, Outcome};
use crate::state::{GlobalState, TestOracle};

/// `P`, `NOT P` and `P IS NULL`.
pub fn partition_predicates(predicate: &Expr) -> [Expr; 3] {
    [
        predicate.clone(),
        Expr::prefix(&standard::NOT, predicate.clone(), DataType::Bool),
        Expr::postfix(&standard::IS_NULL, predicate.clone(), DataType::Bool),
    ]
}

/// `base` rendered once per partition predicate.
pub fn partition_queries(printer: &Printer, base: &Select, predicate: &Expr) -> [String; 3] {
    partition_predicates(predicate).map(|p| printer.render_select(&base.clone().with_where(p)))
}

/// Owned inputs of one partitioning check.
struct Prepared {
    columns: Vec<Column>,
    clause: FromClause,
    predicate: Expr,
}

fn prepare(state: &mut GlobalState) -> Result<Prepared> {
    let depth = state.options.max_depth;
    let tables = state.schema.random_non_empty_subset(&mut state.random, None)?;
    let clause = build_from(state.dialect.as_ref(), &tables, depth, &mut state.random)?;
    let columns = tables.columns();
    let predicate = ExpressionGenerator::new(state.dialect.as_ref(), columns.clone())
        .generate_boolean_predicate(depth, &mut state.random)?;
    Ok(Prepared {
        columns,
        clause,
        predicate,
    })
}

/// How partition results are combined before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Semantics {
    Multiset,
    Set,
}

/// Run the unpartitioned query and the three partitions of `base`, then
/// compare. Shared by the plain and GROUP BY variants.
fn compare_partitions(
    oracle: &'static str,
    state: &mut GlobalState,
    base: &Select,
    predicate: &Expr,
    errors: &ExpectedErrors,
    semantics: Semantics,
) -> Result<Outcome> {
    let printer = state.printer();
    let original_sql = printer.render_select(&base.clone().without_where());
    let parts = partition_queries(&printer, base, predicate);
    let server_side = state.options.server_side_union && state.random.boolean();

    let Some(original) = state.execute_query(&original_sql, errors)? else {
        return Ok(Outcome::inconclusive("unpartitioned query raised an expected error"));
    };

    let (combined_sql, combined): (String, Vec<Row>) = if server_side {
        let sql = parts.join(" UNION ALL ");
        let Some(result) = state.execute_query(&sql, errors)? else {
            return Ok(Outcome::inconclusive("partition union raised an expected error"));
        };
        (sql, result.rows)
    } else {
        let mut rows = Vec::new();
        for part in &parts {
            let Some(result) = state.execute_query(part, errors)? else {
                return Ok(Outcome::inconclusive("partition query raised an expected error"));
            };
            rows.extend(result.rows);
        }
        (parts.join(";\n"), rows)
    };

    let equal = match semantics {
        Semantics::Multiset => multiset_eq(&original.rows, &combined),
        Semantics::Set => set_eq(&original.rows, &combined),
    };
    debug!(
        oracle,
        original = original.len(),
        combined = combined.len(),
        equal,
        "partition comparison"
    );
    if equal {
        return Ok(Outcome::Equivalent);
    }
    let kind = match semantics {
        Semantics::Multiset => "multiset",
        Semantics::Set => "set",
    };
    Ok(Outcome::Defect(DefectReport {
        oracle: oracle.to_owned(),
        description: format!(
            "unpartitioned query returned {} rows, partitions returned {} rows; {kind}s differ",
            original.len(),
            combined.len()
        ),
        first_query: original_sql,
        second_query: combined_sql,
        first_result: sorted_rows(&original.rows),
        second_result: sorted_rows(&combined),
    }))
}

// ---------------------------------------------------------------------------
// WHERE
// ---------------------------------------------------------------------------

/// Partitions a plain SELECT by its WHERE clause.
#[derive(Debug, Clone, Default)]
pub struct TlpWhereOracle;

impl TlpWhereOracle {
    pub const fn new() -> Self {
        Self
    }

    /// Check a fixed base query and predicate. DISTINCT bases compare as
    /// sets, others as multisets.
    pub fn check_partitions(&self, state: &mut GlobalState, base: &Select, predicate: &Expr) -> Result<Outcome> {
        let errors = state.expression_errors();
        let semantics = if base.select_type == SelectType::Distinct {
            Semantics::Set
        } else {
            Semantics::Multiset
        };
        compare_partitions(self.name(), state, base, predicate, &errors, semantics)
    }
}

impl TestOracle for TlpWhereOracle {
    fn name(&self) -> &'static str {
        "tlp_where"
    }

    fn check(&mut self, state: &mut GlobalState) -> Result<Outcome> {
        let prepared = prepare(state)?;
        let fetch = if state.random.boolean() {
            Vec::new()
        } else {
            state
                .random
                .non_empty_subset(&prepared.columns)
                .iter()
                .map(Expr::column)
                .collect()
        };
        let mut base = Select::new(prepared.clause.from)
            .with_joins(prepared.clause.joins)
            .with_fetch_columns(fetch);
        if state.random.rather_low_probability() {
            base = base.with_select_type(SelectType::Distinct);
        }
        self.check_partitions(state, &base, &prepared.predicate)
    }
}

// ---------------------------------------------------------------------------
// GROUP BY
// ---------------------------------------------------------------------------

/// Partitions before grouping; the grouped keys of the three partitions,
/// de-duplicated, must equal the grouped keys of the whole input.
#[derive(Debug, Clone, Default)]
pub struct TlpGroupByOracle;

impl TlpGroupByOracle {
    pub const fn new() -> Self {
        Self
    }

    pub fn check_partitions(&self, state: &mut GlobalState, base: &Select, predicate: &Expr) -> Result<Outcome> {
        let mut errors = state.expression_errors();
        errors.add_all(state.dialect.group_by_errors());
        compare_partitions(self.name(), state, base, predicate, &errors, Semantics::Set)
    }
}

impl TestOracle for TlpGroupByOracle {
    fn name(&self) -> &'static str {
        "tlp_group_by"
    }

    fn check(&mut self, state: &mut GlobalState) -> Result<Outcome> {
        let prepared = prepare(state)?;
        let keys: Vec<Expr> = state
            .random
            .non_empty_subset(&prepared.columns)
            .iter()
            .map(Expr::column)
            .collect();
        if keys.is_empty() {
            return Ok(Outcome::inconclusive("no columns to group by"));
        }
        let base = Select::new(prepared.clause.from)
            .with_joins(prepared.clause.joins)
            .with_fetch_columns(keys.clone())
            .with_group_by(keys);
        self.check_partitions(state, &base, &prepared.predicate)
    }
}

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

/// Applies an aggregate per partition and recombines the partial results
/// with the aggregate's combinator (SUM of SUMs, MIN of MINs, SUM of
/// COUNTs).
#[derive(Debug, Clone, Default)]
pub struct TlpAggregateOracle;

impl TlpAggregateOracle {
    pub const fn new() -> Self {
        Self
    }

    /// Check `aggregate` (an [`Expr::Aggregate`]) over `clause`, optionally
    /// grouping each partition by `group_by` before recombining.
    pub fn check_aggregate(
        &self,
        state: &mut GlobalState,
        clause: &FromClause,
        aggregate: Expr,
        predicate: &Expr,
        group_by: Vec<Expr>,
    ) -> Result<Outcome> {
        let Expr::Aggregate { func, .. } = &aggregate else {
            return Err(MorphError::internal("aggregate partitioning needs an aggregate expression"));
        };
        let func = *func;
        let Some(combinator) = func.combinator() else {
            return Ok(Outcome::inconclusive(format!("{} has no combinator", func.name())));
        };
        let mut errors = state.expression_errors();
        errors.add_all(state.dialect.group_by_errors());
        let printer = state.printer();

        let original = Select::new(clause.from.clone())
            .with_joins(clause.joins.clone())
            .with_fetch_columns(vec![aggregate.clone()]);
        let original_sql = printer.render_select(&original);

        let partition_base = original
            .with_fetch_columns(vec![Expr::alias(aggregate, "aggr")])
            .with_group_by(group_by);
        let parts = partition_queries(&printer, &partition_base, predicate);
        let combined_sql = format!(
            "SELECT {}({}) FROM ({}) AS res",
            combinator.name(),
            printer.quote_identifier("aggr"),
            parts.join(" UNION ALL ")
        );

        let Some(first) = state.execute_query(&original_sql, &errors)? else {
            return Ok(Outcome::inconclusive("unpartitioned aggregate raised an expected error"));
        };
        let Some(second) = state.execute_query(&combined_sql, &errors)? else {
            return Ok(Outcome::inconclusive("partitioned aggregate raised an expected error"));
        };
        let expected = first.single_value(&original_sql)?.clone();
        let mut actual = second.single_value(&combined_sql)?.clone();
        // SUM over no partial counts is NULL where COUNT over no rows is 0.
        if func == AggregateFunction::Count && actual.is_null() {
            actual = Cell::Integer(0);
        }
        debug!(aggregate = func.name(), %expected, %actual, "aggregate partition comparison");
        if values_equal_approx(&expected, &actual) {
            return Ok(Outcome::Equivalent);
        }
        Ok(Outcome::Defect(DefectReport {
            oracle: self.name().to_owned(),
            description: format!(
                "{} over the whole input is {expected}, recombined partitions give {actual}",
                func.name()
            ),
            first_query: original_sql,
            second_query: combined_sql,
            first_result: vec![vec![expected]],
            second_result: vec![vec![actual]],
        }))
    }
}

impl TestOracle for TlpAggregateOracle {
    fn name(&self) -> &'static str {
        "tlp_aggregate"
    }

    fn check(&mut self, state: &mut GlobalState) -> Result<Outcome> {
        let Some(&func) = state.random.pick(state.dialect.partition_aggregates()) else {
            return Ok(Outcome::inconclusive("dialect has no partitionable aggregate"));
        };
        let prepared = prepare(state)?;
        let depth = state.options.max_depth;
        let enabled = state.dialect.data_types();
        let targets: Vec<DataType> = enabled
            .iter()
            .copied()
            .filter(|t| supports_return_type(func.supported_return_types(), *t))
            .filter(|t| !func.arg_types().candidates(*t, enabled).is_empty())
            .collect();
        let Some(&target) = state.random.pick(&targets) else {
            return Ok(Outcome::inconclusive(format!("no enabled result type for {}", func.name())));
        };
        let arg_types = func.arg_types().candidates(target, enabled);
        let arg_type = DataType::random(&mut state.random, &arg_types)
            .ok_or_else(|| MorphError::generation(format!("no argument type for {}", func.name())))?;
        let generator = ExpressionGenerator::new(state.dialect.as_ref(), prepared.columns);
        let argument = generator.generate(arg_type, depth, &mut state.random)?;
        let group_by = if state.random.rather_low_probability() {
            generator.generate_group_by_list(&mut state.random)
        } else {
            Vec::new()
        };
        let aggregate = Expr::aggregate(func, vec![argument], target)
            .ok_or_else(|| MorphError::generation(format!("{} cannot return {target}", func.name())))?;
        self.check_aggregate(state, &prepared.clause, aggregate, &prepared.predicate, group_by)
    }
}
