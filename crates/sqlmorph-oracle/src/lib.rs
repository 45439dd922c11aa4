//! Metamorphic test oracles.
//!
//! An oracle takes a random query, derives one or more rewritten queries
//! that must produce the same result on a correct engine, executes them
//! through an [`Executor`], and reports an [`Outcome`]. Execution failures
//! are classified against the oracle's [`ExpectedErrors`] before any
//! comparison happens.

pub mod compare;
pub mod errors;
pub mod exec;
pub mod explain;
pub mod norec;
pub mod outcome;
pub mod state;
pub mod tlp;

pub use errors::{ErrorClass, ExpectedErrors, classify};
pub use exec::{Cell, ExecutionError, Executor, ResultSet, Row};
pub use explain::ExplainOracle;
pub use norec::NoRecOracle;
pub use outcome::{DefectReport, DefectSink, MemorySink, Outcome};
pub use state::{GlobalState, OracleKind, OracleOptions, TestOracle, oracle_for};
pub use tlp::{TlpAggregateOracle, TlpGroupByOracle, TlpWhereOracle};
