//! Per-worker state shared by every oracle check, and the oracle contract.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlmorph_ast::Printer;
use sqlmorph_error::{MorphError, Result};
use sqlmorph_gen::Dialect;
use sqlmorph_types::{RandomSource, Schema};
use tracing::{debug, warn};

use crate::errors::{ErrorClass, ExpectedErrors};
use crate::exec::{Executor, ResultSet};
use crate::outcome::Outcome;

/// Tunables common to every oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleOptions {
    /// Maximum expression depth for generated predicates and operands.
    pub max_depth: usize,
    /// Let the plain partitioning oracle combine partitions with a single
    /// server-side `UNION ALL` query.
    pub server_side_union: bool,
}

impl Default for OracleOptions {
    fn default() -> Self {
        Self {
            max_depth: 3,
            server_side_union: true,
        }
    }
}

/// Everything one worker needs to run checks: the schema snapshot, the
/// dialect, its own session and its own random source.
pub struct GlobalState {
    pub schema: Arc<Schema>,
    pub dialect: Arc<dyn Dialect>,
    pub executor: Box<dyn Executor>,
    pub random: RandomSource,
    pub options: OracleOptions,
}

impl fmt::Debug for GlobalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalState")
            .field("schema_tables", &self.schema.tables().len())
            .field("dialect", &self.dialect.name())
            .field("seed", &self.random.seed())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl GlobalState {
    pub fn new(
        schema: Arc<Schema>,
        dialect: Arc<dyn Dialect>,
        executor: Box<dyn Executor>,
        random: RandomSource,
        options: OracleOptions,
    ) -> Self {
        Self {
            schema,
            dialect,
            executor,
            random,
            options,
        }
    }

    pub fn printer(&self) -> Printer {
        self.dialect.printer()
    }

    /// Allow-list of the dialect's expression and fetch errors.
    pub fn expression_errors(&self) -> ExpectedErrors {
        ExpectedErrors::from_slices(&[self.dialect.expression_errors(), self.dialect.fetch_errors()])
    }

    /// Execute `sql`, classifying any failure against `errors`.
    ///
    /// `Ok(None)` means the failure was expected and the check should be
    /// abandoned; an unexpected failure becomes
    /// [`MorphError::UnexpectedExecution`] carrying the query.
    pub fn execute_query(&mut self, sql: &str, errors: &ExpectedErrors) -> Result<Option<ResultSet>> {
        debug!(sql, "execute");
        match self.executor.execute(sql) {
            Ok(result) => Ok(Some(result)),
            Err(err) => match errors.classify(&err.message) {
                ErrorClass::Inconclusive => {
                    debug!(sql, message = %err.message, "expected execution error");
                    Ok(None)
                }
                ErrorClass::Fatal => {
                    warn!(sql, message = %err.message, "unexpected execution error");
                    Err(MorphError::unexpected_execution(sql, err.message))
                }
            },
        }
    }
}

/// A metamorphic testing strategy.
pub trait TestOracle: Send {
    fn name(&self) -> &'static str;

    /// Run one randomized check.
    fn check(&mut self, state: &mut GlobalState) -> Result<Outcome>;
}

/// The built-in oracles, by configuration name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleKind {
    Norec,
    TlpWhere,
    TlpGroupBy,
    TlpAggregate,
    Explain,
}

impl OracleKind {
    pub const ALL: [Self; 5] = [
        Self::Norec,
        Self::TlpWhere,
        Self::TlpGroupBy,
        Self::TlpAggregate,
        Self::Explain,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Norec => "norec",
            Self::TlpWhere => "tlp_where",
            Self::TlpGroupBy => "tlp_group_by",
            Self::TlpAggregate => "tlp_aggregate",
            Self::Explain => "explain",
        }
    }
}

impl fmt::Display for OracleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OracleKind {
    type Err = MorphError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| MorphError::config(format!("unknown oracle: {s}")))
    }
}

/// A fresh oracle of the given kind.
pub fn oracle_for(kind: OracleKind) -> Box<dyn TestOracle> {
    match kind {
        OracleKind::Norec => Box::new(crate::norec::NoRecOracle::new()),
        OracleKind::TlpWhere => Box::new(crate::tlp::TlpWhereOracle::new()),
        OracleKind::TlpGroupBy => Box::new(crate::tlp::TlpGroupByOracle::new()),
        OracleKind::TlpAggregate => Box::new(crate::tlp::TlpAggregateOracle::new()),
        OracleKind::Explain => Box::new(crate::explain::ExplainOracle::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oracle_names_round_trip() {
        for kind in OracleKind::ALL {
            assert_eq!(kind.as_str().parse::<OracleKind>().unwrap(), kind);
            assert_eq!(oracle_for(kind).name(), kind.as_str());
        }
        assert!("pqs".parse::<OracleKind>().is_err());
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: OracleOptions = serde_json::from_str(r#"{"max_depth": 5}"#).unwrap();
        assert_eq!(opts.max_depth, 5);
        assert!(opts.server_side_union);
    }
}
