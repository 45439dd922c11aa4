//! Type-directed random expression generation.
//!
//! Every expression is generated for a target type. Leaves are literals or
//! columns of that type; composites are drawn from the dialect's operator,
//! function and aggregate tables filtered by return type, and their operands
//! are generated recursively one level shallower. Depth 0 always yields a
//! leaf, and an empty candidate set falls back to a leaf, so generation
//! terminates for every target type.

use sqlmorph_ast::{
    AggregateFunction, Expr, FunctionSpec, Literal, OperatorSpec, OrderingTerm, SortDirection,
};
use sqlmorph_error::{MorphError, Result};
use sqlmorph_types::{Column, DataType, RandomSource};
use tracing::trace;

use crate::dialect::Dialect;

const TEXT_ALPHABET: &[char] = &['a', 'B', '0', ' ', '%', '_', '\'', 'é'];

const JSON_DOCUMENTS: &[&str] = &["{}", "[]", "null", "{\"a\": 1}", "[1, \"x\"]", "1.5"];

#[derive(Debug, Clone, Copy)]
enum Candidate<'d> {
    Operator(&'d OperatorSpec),
    Function(&'d FunctionSpec),
    Aggregate(AggregateFunction),
    Cast,
}

/// Generates expressions over a fixed set of in-scope columns.
#[derive(Debug, Clone)]
pub struct ExpressionGenerator<'d> {
    dialect: &'d dyn Dialect,
    columns: Vec<Column>,
    allow_aggregates: bool,
}

impl<'d> ExpressionGenerator<'d> {
    pub fn new(dialect: &'d dyn Dialect, columns: Vec<Column>) -> Self {
        Self {
            dialect,
            columns,
            allow_aggregates: false,
        }
    }

    /// Allow aggregate calls (never nested) in generated expressions.
    #[must_use]
    pub const fn with_aggregates(mut self, allow: bool) -> Self {
        self.allow_aggregates = allow;
        self
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn dialect(&self) -> &'d dyn Dialect {
        self.dialect
    }

    /// A random expression of type `target`, at most `depth` levels deep.
    pub fn generate(&self, target: DataType, depth: usize, random: &mut RandomSource) -> Result<Expr> {
        self.generate_inner(target, depth, false, random)
    }

    pub fn generate_boolean_predicate(&self, depth: usize, random: &mut RandomSource) -> Result<Expr> {
        self.generate(DataType::Bool, depth, random)
    }

    /// A non-empty list of distinct in-scope columns. Empty only when no
    /// columns are in scope.
    pub fn generate_group_by_list(&self, random: &mut RandomSource) -> Vec<Expr> {
        random
            .non_empty_subset(&self.columns)
            .iter()
            .map(Expr::column)
            .collect()
    }

    /// One to three ORDER BY terms, each independently ASC, DESC or left to
    /// the engine default.
    pub fn generate_order_by_list(
        &self,
        depth: usize,
        random: &mut RandomSource,
    ) -> Result<Vec<OrderingTerm>> {
        let comparable: Vec<DataType> = self
            .dialect
            .data_types()
            .iter()
            .copied()
            .filter(|t| t.is_comparable())
            .collect();
        let count = 1 + random.below(3);
        let mut terms = Vec::with_capacity(count);
        for _ in 0..count {
            let ty = DataType::random(random, &comparable)
                .ok_or_else(|| MorphError::generation(format!("{} enables no comparable type", self.dialect.name())))?;
            let mut expr = self.generate(ty, depth, random)?;
            // Constant integers (`3`, `-3`) are read as result-column positions.
            if !expr.references_column() {
                expr = self.random_column_ref(random)?;
            }
            let direction = match random.below(3) {
                0 => None,
                1 => Some(SortDirection::Asc),
                _ => Some(SortDirection::Desc),
            };
            terms.push(OrderingTerm { expr, direction });
        }
        Ok(terms)
    }

    /// A reference to a random in-scope column.
    pub fn random_column_ref(&self, random: &mut RandomSource) -> Result<Expr> {
        random
            .pick(&self.columns)
            .map(Expr::column)
            .ok_or_else(|| MorphError::generation("no columns in scope"))
    }

    /// A literal of `target` (never NULL).
    pub fn generate_literal(&self, target: DataType, random: &mut RandomSource) -> Result<Literal> {
        if !self.dialect.data_types().contains(&target) {
            return Err(MorphError::generation(format!(
                "{} has no literal representation for {target}",
                self.dialect.name()
            )));
        }
        Ok(match target {
            DataType::Int => {
                if random.small_probability() {
                    Literal::Int(*random.pick(&[i64::MIN, i64::MAX, 0, -1]).unwrap_or(&0))
                } else if random.rather_low_probability() {
                    Literal::Int(random.int_in(-2_147_483_648, 2_147_483_647))
                } else {
                    Literal::Int(random.int_in(-100, 100))
                }
            }
            DataType::Float => Literal::Float((random.float_in(-1000.0, 1000.0) * 100.0).round() / 100.0),
            DataType::Decimal => {
                let whole = random.int_in(-1000, 1000);
                let frac = random.int_in(0, 99);
                Literal::Decimal(format!("{whole}.{frac:02}"))
            }
            DataType::Text => Literal::Text(random_text(random, 4)),
            DataType::Char => Literal::Text(random_text(random, 1)),
            DataType::Bool => Literal::Bool(random.boolean()),
            DataType::Blob => {
                let len = random.below(5);
                Literal::Blob(random.bytes(len))
            }
            DataType::Json => Literal::Json(
                (*random.pick(JSON_DOCUMENTS).unwrap_or(&"{}")).to_owned(),
            ),
        })
    }

    /// A literal or a column of `target`, chosen uniformly when both exist.
    /// NULL with small probability.
    pub fn generate_leaf(&self, target: DataType, random: &mut RandomSource) -> Result<Expr> {
        if random.small_probability() {
            return Ok(Expr::literal(Literal::Null));
        }
        let matching: Vec<&Column> = self.columns.iter().filter(|c| c.data_type() == target).collect();
        if !matching.is_empty() && (random.boolean() || !self.dialect.data_types().contains(&target)) {
            if let Some(column) = random.pick(&matching) {
                return Ok(Expr::column(column));
            }
        }
        Ok(Expr::literal(self.generate_literal(target, random)?))
    }

    fn generate_inner(
        &self,
        target: DataType,
        depth: usize,
        in_aggregate: bool,
        random: &mut RandomSource,
    ) -> Result<Expr> {
        if depth == 0 || random.boolean() {
            return self.generate_leaf(target, random);
        }
        let candidates = self.candidates(target, in_aggregate);
        let Some(&candidate) = random.pick(&candidates) else {
            return self.generate_leaf(target, random);
        };
        trace!(?target, depth, ?candidate, "composite");
        let enabled = self.dialect.data_types();
        match candidate {
            Candidate::Operator(spec) => {
                let arg = pick_type(random, &spec.args.candidates(target, enabled))?;
                let operands = (0..spec.arity())
                    .map(|_| self.generate_inner(arg, depth - 1, in_aggregate, random))
                    .collect::<Result<Vec<_>>>()?;
                Expr::operation(spec, operands, target)
                    .ok_or_else(|| MorphError::generation(format!("arity mismatch for {}", spec.name)))
            }
            Candidate::Function(spec) => {
                let arg = pick_type(random, &spec.args.candidates(target, enabled))?;
                let args = (0..spec.arity)
                    .map(|_| self.generate_inner(arg, depth - 1, in_aggregate, random))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Expr::function(spec, args, target))
            }
            Candidate::Aggregate(func) => {
                let arg = pick_type(random, &func.arg_types().candidates(target, enabled))?;
                let operand = self.generate_inner(arg, depth - 1, true, random)?;
                Expr::aggregate(func, vec![operand], target).ok_or_else(|| {
                    MorphError::generation(format!("{} cannot return {target}", func.name()))
                })
            }
            Candidate::Cast => {
                let sources = self.cast_sources(target);
                let from = pick_type(random, &sources)?;
                let operand = self.generate_inner(from, depth - 1, in_aggregate, random)?;
                Ok(Expr::cast(operand, self.dialect.cast_type_name(target), target))
            }
        }
    }

    fn candidates(&self, target: DataType, in_aggregate: bool) -> Vec<Candidate<'d>> {
        let enabled = self.dialect.data_types();
        let mut out: Vec<Candidate<'d>> = self
            .dialect
            .operators()
            .iter()
            .filter(|op| op.supports_return_type(target) && !op.args.candidates(target, enabled).is_empty())
            .map(Candidate::Operator)
            .collect();
        out.extend(
            self.dialect
                .functions()
                .iter()
                .filter(|f| f.supports_return_type(target) && !f.args.candidates(target, enabled).is_empty())
                .map(Candidate::Function),
        );
        if self.allow_aggregates && !in_aggregate {
            out.extend(
                self.dialect
                    .aggregates()
                    .iter()
                    .copied()
                    .filter(|a| a.supports_return_type(target) && !a.arg_types().candidates(target, enabled).is_empty())
                    .map(Candidate::Aggregate),
            );
        }
        if enabled.contains(&target) && !self.cast_sources(target).is_empty() {
            out.push(Candidate::Cast);
        }
        out
    }

    fn cast_sources(&self, target: DataType) -> Vec<DataType> {
        self.dialect
            .data_types()
            .iter()
            .copied()
            .filter(|&from| from != target && self.dialect.can_cast(from, target))
            .collect()
    }
}

fn pick_type(random: &mut RandomSource, types: &[DataType]) -> Result<DataType> {
    DataType::random(random, types).ok_or_else(|| MorphError::generation("no operand type available"))
}

fn random_text(random: &mut RandomSource, max_len: usize) -> String {
    let len = random.below(max_len + 1);
    (0..len)
        .map(|_| *random.pick(TEXT_ALPHABET).unwrap_or(&'a'))
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use sqlmorph_types::{ColumnDef, Table};

    use super::*;
    use crate::dialect::{DIALECT_NAMES, dialect_by_name};

    fn columns() -> Vec<Column> {
        let table = Table::new(
            "t0",
            vec![
                ColumnDef::new("c0", DataType::Int),
                ColumnDef::new("c1", DataType::Text),
                ColumnDef::new("c2", DataType::Bool),
            ],
            vec![],
            false,
        );
        table.columns().to_vec()
    }

    fn type_of(expr: &Expr) -> Option<DataType> {
        expr.data_type()
    }

    #[test]
    fn depth_zero_is_always_a_leaf() {
        for name in DIALECT_NAMES {
            let dialect = dialect_by_name(name).unwrap();
            let generator = ExpressionGenerator::new(dialect.as_ref(), columns());
            let mut random = RandomSource::from_seed(17);
            for &ty in dialect.data_types() {
                for _ in 0..50 {
                    let expr = generator.generate(ty, 0, &mut random).unwrap();
                    assert_eq!(expr.depth(), 0, "{name}: {expr:?}");
                }
            }
        }
    }

    #[test]
    fn type_without_producers_falls_back_to_leaf() {
        let dialect = dialect_by_name("postgres").unwrap();
        let generator = ExpressionGenerator::new(dialect.as_ref(), vec![]);
        let mut random = RandomSource::from_seed(5);
        for _ in 0..200 {
            let expr = generator.generate(DataType::Json, 6, &mut random).unwrap();
            assert!(matches!(expr, Expr::Literal(_) | Expr::Cast { .. }), "{expr:?}");
        }
    }

    #[test]
    fn disabled_type_literal_is_generation_error() {
        let dialect = dialect_by_name("sqlite").unwrap();
        let generator = ExpressionGenerator::new(dialect.as_ref(), vec![]);
        let mut random = RandomSource::from_seed(1);
        let err = generator.generate_literal(DataType::Json, &mut random).unwrap_err();
        assert!(err.is_generator_fault());
    }

    #[test]
    fn aggregates_only_when_enabled_and_never_nested() {
        let dialect = dialect_by_name("postgres").unwrap();
        let mut random = RandomSource::from_seed(23);
        let plain = ExpressionGenerator::new(dialect.as_ref(), columns());
        let with_aggs = plain.clone().with_aggregates(true);
        let mut saw_aggregate = false;
        for _ in 0..300 {
            let expr = plain.generate(DataType::Int, 4, &mut random).unwrap();
            assert!(!expr.contains_aggregate());
            let expr = with_aggs.generate(DataType::Int, 4, &mut random).unwrap();
            saw_aggregate |= expr.contains_aggregate();
            assert!(!nested_aggregate(&expr, false), "{expr:?}");
        }
        assert!(saw_aggregate);
    }

    fn nested_aggregate(expr: &Expr, inside: bool) -> bool {
        match expr {
            Expr::Aggregate { args, .. } => inside || args.iter().any(|a| nested_aggregate(a, true)),
            Expr::Prefix { operand, .. } | Expr::Postfix { operand, .. } => nested_aggregate(operand, inside),
            Expr::Infix { left, right, .. } => {
                nested_aggregate(left, inside) || nested_aggregate(right, inside)
            }
            Expr::FunctionCall { args, .. } => args.iter().any(|a| nested_aggregate(a, inside)),
            Expr::Cast { expr, .. } => nested_aggregate(expr, inside),
            _ => false,
        }
    }

    #[test]
    fn order_by_terms_always_reference_a_column() {
        let dialect = dialect_by_name("postgres").unwrap();
        let generator = ExpressionGenerator::new(dialect.as_ref(), columns());
        let mut random = RandomSource::from_seed(8);
        for _ in 0..100 {
            let terms = generator.generate_order_by_list(2, &mut random).unwrap();
            assert!((1..=3).contains(&terms.len()));
            assert!(terms.iter().all(|t| t.expr.references_column()));
        }
    }

    #[test]
    fn group_by_list_uses_distinct_columns() {
        let dialect = dialect_by_name("sqlite").unwrap();
        let generator = ExpressionGenerator::new(dialect.as_ref(), columns());
        let mut random = RandomSource::from_seed(2);
        let list = generator.generate_group_by_list(&mut random);
        assert!(!list.is_empty() && list.len() <= 3);
        assert!(list.iter().all(|e| matches!(e, Expr::Column(_))));
    }

    proptest! {
        #[test]
        fn generated_type_matches_target(seed in any::<u64>(), depth in 0usize..5, dialect_idx in 0usize..5) {
            let dialect = dialect_by_name(DIALECT_NAMES[dialect_idx]).unwrap();
            let generator = ExpressionGenerator::new(dialect.as_ref(), columns());
            let mut random = RandomSource::from_seed(seed);
            for &ty in dialect.data_types() {
                let expr = generator.generate(ty, depth, &mut random).unwrap();
                prop_assert!(expr.depth() <= depth);
                let actual = type_of(&expr);
                prop_assert!(actual.is_none() || actual == Some(ty), "{:?} for {}", expr, ty);
            }
        }

        #[test]
        fn same_seed_same_text(seed in any::<u64>()) {
            let dialect = dialect_by_name("cockroachdb").unwrap();
            let generator = ExpressionGenerator::new(dialect.as_ref(), columns());
            let printer = dialect.printer();
            let mut a = RandomSource::from_seed(seed);
            let mut b = RandomSource::from_seed(seed);
            let left = generator.generate_boolean_predicate(4, &mut a).unwrap();
            let right = generator.generate_boolean_predicate(4, &mut b).unwrap();
            prop_assert_eq!(printer.render(&left), printer.render(&right));
        }
    }
}
