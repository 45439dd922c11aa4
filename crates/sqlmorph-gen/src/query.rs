//! From-lists, joins and whole SELECT statements.

use sqlmorph_ast::{Expr, Join, JoinKind, Select, SelectType};
use sqlmorph_error::Result;
use sqlmorph_types::{Column, RandomSource, Table, Tables};
use tracing::debug;

use crate::dialect::Dialect;
use crate::generator::ExpressionGenerator;

/// The FROM part of a query: plain table references plus join clauses.
///
/// Every table of the selection appears exactly once, either in `from` or
/// as the right side of a join.
#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub from: Vec<Expr>,
    pub joins: Vec<Join>,
}

fn table_ref(dialect: &dyn Dialect, table: &Table, random: &mut RandomSource) -> Expr {
    let base = Expr::table(table.name());
    if dialect.supports_index_hints() && random.boolean() {
        if let Some(index) = random.pick(table.indexes()) {
            return Expr::index_hint(base, index, random);
        }
    }
    base
}

/// Split `tables` into a from-list and join clauses.
///
/// A random number of trailing tables become joins. An ON predicate only
/// references the last from-list table, tables joined before it, and the
/// joined table itself, which keeps it valid on engines that scope ON
/// clauses to the join tree.
pub fn build_from(
    dialect: &dyn Dialect,
    tables: &Tables,
    max_depth: usize,
    random: &mut RandomSource,
) -> Result<FromClause> {
    let all = tables.tables();
    let join_count = if all.len() > 1 && !dialect.join_kinds().is_empty() {
        random.below(all.len())
    } else {
        0
    };
    let split = all.len() - join_count;
    let (plain, joined) = all.split_at(split);

    let from = plain
        .iter()
        .map(|t| table_ref(dialect, t, random))
        .collect::<Vec<_>>();

    let mut scope: Vec<Column> = plain.last().map(|t| t.columns().to_vec()).unwrap_or_default();
    let mut joins = Vec::with_capacity(joined.len());
    for table in joined {
        scope.extend(table.columns().iter().cloned());
        let kind = random
            .pick(dialect.join_kinds())
            .copied()
            .unwrap_or(JoinKind::Inner);
        let on = if kind == JoinKind::Cross {
            None
        } else {
            let generator = ExpressionGenerator::new(dialect, scope.clone());
            Some(generator.generate_boolean_predicate(max_depth, random)?)
        };
        joins.push(Join {
            kind,
            table: table_ref(dialect, table, random),
            on,
        });
    }
    debug!(from = from.len(), joins = joins.len(), "built from clause");
    Ok(FromClause { from, joins })
}

/// A random SELECT over `tables`: a few fetch expressions (possibly
/// aggregates), an optional WHERE, and with low probability GROUP BY and
/// ORDER BY clauses.
pub fn random_select(
    dialect: &dyn Dialect,
    tables: &Tables,
    max_depth: usize,
    random: &mut RandomSource,
) -> Result<Select> {
    let clause = build_from(dialect, tables, max_depth, random)?;
    let generator = ExpressionGenerator::new(dialect, tables.columns());
    let fetch_generator = generator.clone().with_aggregates(random.boolean());
    let mut fetch = Vec::new();
    for _ in 0..=random.small_number() {
        let ty = *random.pick(dialect.data_types()).unwrap_or(&sqlmorph_types::DataType::Int);
        fetch.push(fetch_generator.generate(ty, max_depth, random)?);
    }
    let mut select = Select::new(clause.from)
        .with_joins(clause.joins)
        .with_fetch_columns(fetch);
    if random.boolean() {
        select = select.with_where(generator.generate_boolean_predicate(max_depth, random)?);
    }
    if random.rather_low_probability() {
        select = select.with_group_by(generator.generate_group_by_list(random));
    }
    if random.rather_low_probability() {
        select = select.with_order_by(generator.generate_order_by_list(max_depth, random)?);
    } else if random.rather_low_probability() {
        select = select.with_select_type(SelectType::Distinct);
    }
    Ok(select)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use sqlmorph_types::{ColumnDef, DataType, Schema};

    use super::*;
    use crate::dialect::dialect_by_name;

    fn schema() -> Schema {
        Schema::new(
            (0..4)
                .map(|i| {
                    Table::new(
                        format!("t{i}"),
                        vec![
                            ColumnDef::new("c0", DataType::Int),
                            ColumnDef::new("c1", DataType::Bool),
                        ],
                        vec![format!("i{i}")],
                        false,
                    )
                })
                .collect(),
        )
    }

    fn referenced_tables(expr: &Expr, out: &mut HashSet<String>) {
        match expr {
            Expr::Column(c) => {
                out.extend(c.table.clone());
            }
            Expr::Prefix { operand, .. } | Expr::Postfix { operand, .. } => referenced_tables(operand, out),
            Expr::Infix { left, right, .. } => {
                referenced_tables(left, out);
                referenced_tables(right, out);
            }
            Expr::FunctionCall { args, .. } | Expr::Aggregate { args, .. } => {
                args.iter().for_each(|a| referenced_tables(a, out));
            }
            Expr::Cast { expr, .. } => referenced_tables(expr, out),
            _ => {}
        }
    }

    fn table_name(expr: &Expr) -> String {
        match expr {
            Expr::Table { name } => name.clone(),
            Expr::Postfix { operand, .. } => table_name(operand),
            other => panic!("not a table reference: {other:?}"),
        }
    }

    #[test]
    fn every_table_appears_once() {
        let dialect = dialect_by_name("postgres").unwrap();
        let schema = schema();
        let mut random = RandomSource::from_seed(4);
        for _ in 0..100 {
            let tables = schema.random_non_empty_subset(&mut random, None).unwrap();
            let clause = build_from(dialect.as_ref(), &tables, 2, &mut random).unwrap();
            assert!(!clause.from.is_empty());
            let mut names: Vec<String> = clause.from.iter().map(table_name).collect();
            names.extend(clause.joins.iter().map(|j| table_name(&j.table)));
            names.sort();
            let mut expected: Vec<String> = tables.tables().iter().map(|t| t.name().to_owned()).collect();
            expected.sort();
            assert_eq!(names, expected);
        }
    }

    #[test]
    fn on_clauses_stay_in_scope() {
        let dialect = dialect_by_name("duckdb").unwrap();
        let schema = schema();
        let mut random = RandomSource::from_seed(99);
        for _ in 0..200 {
            let tables = schema.random_non_empty_subset(&mut random, None).unwrap();
            let clause = build_from(dialect.as_ref(), &tables, 3, &mut random).unwrap();
            let mut allowed: HashSet<String> = clause.from.last().map(table_name).into_iter().collect();
            for join in &clause.joins {
                allowed.insert(table_name(&join.table));
                let mut used = HashSet::new();
                if let Some(on) = &join.on {
                    referenced_tables(on, &mut used);
                } else {
                    assert_eq!(join.kind, JoinKind::Cross);
                }
                assert!(used.is_subset(&allowed), "{used:?} not within {allowed:?}");
            }
        }
    }

    #[test]
    fn index_hints_only_where_supported() {
        let schema = schema();
        let mut random = RandomSource::from_seed(12);
        let mut hinted = 0;
        for name in ["cockroachdb", "sqlite"] {
            let dialect = dialect_by_name(name).unwrap();
            for _ in 0..100 {
                let tables = schema.random_non_empty_subset(&mut random, None).unwrap();
                let clause = build_from(dialect.as_ref(), &tables, 1, &mut random).unwrap();
                let text: Vec<String> = clause.from.iter().map(|e| dialect.printer().render(e)).collect();
                let count = text.iter().filter(|t| t.contains("FORCE_INDEX")).count();
                if name == "sqlite" {
                    assert_eq!(count, 0);
                }
                hinted += count;
            }
        }
        assert!(hinted > 0);
    }

    #[test]
    fn random_select_renders() {
        let schema = schema();
        let mut random = RandomSource::from_seed(31);
        for name in crate::dialect::DIALECT_NAMES {
            let dialect = dialect_by_name(name).unwrap();
            for _ in 0..20 {
                let tables = schema.random_non_empty_subset(&mut random, None).unwrap();
                let select = random_select(dialect.as_ref(), &tables, 2, &mut random).unwrap();
                let sql = dialect.printer().render_select(&select);
                assert!(sql.starts_with("SELECT "), "{sql}");
                assert!(sql.contains(" FROM "), "{sql}");
            }
        }
    }
}
