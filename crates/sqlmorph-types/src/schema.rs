//! Schema snapshot model.
//!
//! A [`Schema`] is an immutable list of tables captured by the external
//! introspection collaborator. It is shared across workers behind an `Arc`
//! and never mutated by the core; a fresh snapshot replaces it between
//! checks when the database changes.

use std::fmt;
use std::sync::{Arc, Weak};

use sqlmorph_error::{MorphError, Result};
use tracing::debug;

use crate::data_type::{CompositeDataType, DataType};
use crate::random::RandomSource;

/// Column declaration used to build a [`Table`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: CompositeDataType,
    pub nullable: bool,
    pub primary_key: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: impl Into<CompositeDataType>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            primary_key: false,
        }
    }

    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// A column of a table in the snapshot.
///
/// The back-reference to the owning table is fixed when the table is built
/// and is only ever used for lookup.
#[derive(Clone)]
pub struct Column {
    name: String,
    data_type: CompositeDataType,
    nullable: bool,
    primary_key: bool,
    table_name: String,
    table: Weak<Table>,
}

impl Column {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn data_type(&self) -> DataType {
        self.data_type.data_type
    }

    pub const fn composite_type(&self) -> CompositeDataType {
        self.data_type
    }

    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub const fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// The owning table, while the snapshot is alive.
    pub fn table(&self) -> Option<Arc<Table>> {
        self.table.upgrade()
    }
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.table_name == other.table_name
            && self.data_type == other.data_type
            && self.nullable == other.nullable
            && self.primary_key == other.primary_key
    }
}

impl Eq for Column {}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("table", &self.table_name)
            .field("name", &self.name)
            .field("data_type", &self.data_type)
            .field("nullable", &self.nullable)
            .field("primary_key", &self.primary_key)
            .finish()
    }
}

/// A table (or view) in the snapshot. Owns its columns.
#[derive(Debug, PartialEq, Eq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    indexes: Vec<String>,
    is_view: bool,
}

impl Table {
    pub fn new(
        name: impl Into<String>,
        columns: Vec<ColumnDef>,
        indexes: Vec<String>,
        is_view: bool,
    ) -> Arc<Self> {
        let name = name.into();
        Arc::new_cyclic(|weak| Self {
            columns: columns
                .into_iter()
                .map(|def| Column {
                    name: def.name,
                    data_type: def.data_type,
                    nullable: def.nullable,
                    primary_key: def.primary_key,
                    table_name: name.clone(),
                    table: weak.clone(),
                })
                .collect(),
            name,
            indexes,
            is_view,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn indexes(&self) -> &[String] {
        &self.indexes
    }

    pub const fn is_view(&self) -> bool {
        self.is_view
    }

    pub fn has_primary_key(&self) -> bool {
        self.columns.iter().any(Column::is_primary_key)
    }
}

/// A selection of tables drawn from a schema for one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tables {
    tables: Vec<Arc<Table>>,
}

impl Tables {
    #[must_use]
    pub fn new(tables: Vec<Arc<Table>>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &[Arc<Table>] {
        &self.tables
    }

    /// Every column of every selected table, in table order.
    pub fn columns(&self) -> Vec<Column> {
        self.tables
            .iter()
            .flat_map(|t| t.columns().iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Immutable schema snapshot for one test run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    tables: Vec<Arc<Table>>,
}

impl Schema {
    #[must_use]
    pub fn new(tables: Vec<Arc<Table>>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &[Arc<Table>] {
        &self.tables
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table(&self, name: &str) -> Result<&Arc<Table>> {
        self.tables
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| MorphError::SchemaLookup {
                kind: "table",
                name: name.to_owned(),
            })
    }

    /// A non-empty random subset of the tables, without replacement.
    ///
    /// With `n`, exactly `min(n, table count)` tables are chosen (at least
    /// one); otherwise the size is uniform in `1..=table count`.
    pub fn random_non_empty_subset(
        &self,
        random: &mut RandomSource,
        n: Option<usize>,
    ) -> Result<Tables> {
        if self.tables.is_empty() {
            return Err(MorphError::SchemaEmpty);
        }
        let chosen = match n {
            Some(n) => random.subset_of_size(&self.tables, n.max(1)),
            None => random.non_empty_subset(&self.tables),
        };
        debug!(
            tables = ?chosen.iter().map(|t| t.name()).collect::<Vec<_>>(),
            "selected table subset"
        );
        Ok(Tables::new(chosen))
    }

    /// One-line-per-table description used in reproduction metadata.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for table in &self.tables {
            let columns: Vec<String> = table
                .columns()
                .iter()
                .map(|c| {
                    let mut decl = format!("{} {}", c.name(), c.composite_type());
                    if c.is_primary_key() {
                        decl.push_str(" PRIMARY KEY");
                    } else if !c.is_nullable() {
                        decl.push_str(" NOT NULL");
                    }
                    decl
                })
                .collect();
            let kind = if table.is_view() { "VIEW" } else { "TABLE" };
            out.push_str(&format!("{kind} {}({})", table.name(), columns.join(", ")));
            if !table.indexes().is_empty() {
                out.push_str(&format!(" INDEXES({})", table.indexes().join(", ")));
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> Schema {
        Schema::new(vec![
            Table::new(
                "t0",
                vec![
                    ColumnDef::new("c0", CompositeDataType::int(4)).primary_key(),
                    ColumnDef::new("c1", DataType::Text),
                ],
                vec!["i0".to_owned()],
                false,
            ),
            Table::new("t1", vec![ColumnDef::new("c0", DataType::Bool)], vec![], false),
            Table::new("v0", vec![ColumnDef::new("c0", DataType::Float)], vec![], true),
        ])
    }

    #[test]
    fn columns_point_back_to_their_table() {
        let schema = sample_schema();
        for table in schema.tables() {
            for column in table.columns() {
                let owner = column.table().expect("snapshot alive");
                assert_eq!(owner.name(), table.name());
                assert_eq!(column.table_name(), table.name());
            }
        }
    }

    #[test]
    fn empty_schema_fails_subset() {
        let mut random = RandomSource::from_seed(0);
        let err = Schema::default()
            .random_non_empty_subset(&mut random, None)
            .unwrap_err();
        assert!(matches!(err, MorphError::SchemaEmpty));
    }

    #[test]
    fn subset_respects_requested_size() {
        let schema = sample_schema();
        let mut random = RandomSource::from_seed(11);
        for _ in 0..50 {
            let picked = schema.random_non_empty_subset(&mut random, None).unwrap();
            assert!((1..=3).contains(&picked.len()));
        }
        assert_eq!(
            schema
                .random_non_empty_subset(&mut random, Some(2))
                .unwrap()
                .len(),
            2
        );
        assert_eq!(
            schema
                .random_non_empty_subset(&mut random, Some(0))
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            schema
                .random_non_empty_subset(&mut random, Some(10))
                .unwrap()
                .len(),
            3
        );
    }

    #[test]
    fn table_helpers() {
        let schema = sample_schema();
        let t0 = schema.table("t0").unwrap();
        assert!(t0.has_primary_key());
        assert!(!t0.column("c0").unwrap().is_nullable());
        assert!(!schema.table("t1").unwrap().has_primary_key());
        assert!(schema.table("v0").unwrap().is_view());
        assert!(schema.table("missing").is_err());
    }

    proptest::proptest! {
        #[test]
        fn subset_never_empty_and_never_repeats(seed in proptest::prelude::any::<u64>(), n in proptest::option::of(0usize..6)) {
            let schema = sample_schema();
            let mut random = RandomSource::from_seed(seed);
            let picked = schema.random_non_empty_subset(&mut random, n).unwrap();
            proptest::prop_assert!(!picked.is_empty());
            let mut names: Vec<&str> = picked.tables().iter().map(|t| t.name()).collect();
            names.sort_unstable();
            names.dedup();
            proptest::prop_assert_eq!(names.len(), picked.len());
        }
    }

    #[test]
    fn describe_lists_every_table() {
        let text = sample_schema().describe();
        assert!(text.contains("TABLE t0(c0 INT(4) PRIMARY KEY, c1 TEXT) INDEXES(i0)"));
        assert!(text.contains("VIEW v0(c0 FLOAT)"));
        assert_eq!(text.lines().count(), 3);
    }
}
