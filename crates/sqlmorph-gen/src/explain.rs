use sqlmorph_types::RandomSource;

use crate::dialect::Dialect;

/// Wrap `statement` in one of the dialect's EXPLAIN prefixes.
///
/// Returns `None` when the dialect has no EXPLAIN.
pub fn explain(dialect: &dyn Dialect, statement: &str, random: &mut RandomSource) -> Option<String> {
    let prefix = random.pick(dialect.explain_prefixes())?;
    Some(format!("{prefix} {statement}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Sqlite;

    #[test]
    fn sqlite_uses_both_forms() {
        let mut random = RandomSource::from_seed(0);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..64 {
            let sql = explain(&Sqlite, "SELECT 1", &mut random).unwrap();
            assert!(sql.ends_with(" SELECT 1"));
            seen.insert(sql);
        }
        assert_eq!(
            seen.into_iter().collect::<Vec<_>>(),
            vec!["EXPLAIN QUERY PLAN SELECT 1".to_owned(), "EXPLAIN SELECT 1".to_owned()]
        );
    }
}
