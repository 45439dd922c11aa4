//! Execution interface to the engine under test.

use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};
use sqlmorph_error::{MorphError, Result as MorphResult};

/// One result value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Cell {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Textual form used for comparison; `None` for NULL.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Integer(v) => Some(v.to_string()),
            Self::Real(v) => Some(format!("{v:?}")),
            Self::Text(s) => Some(s.clone()),
            Self::Blob(bytes) => {
                let mut hex = String::with_capacity(3 + bytes.len() * 2);
                hex.push_str("x'");
                for b in bytes {
                    let _ = write!(hex, "{b:02x}");
                }
                hex.push('\'');
                Some(hex)
            }
        }
    }

    /// The value as an exact non-negative count, if it is one.
    pub fn as_count(&self) -> Option<u64> {
        match self {
            Self::Integer(v) => u64::try_from(*v).ok(),
            Self::Real(v) if v.fract() == 0.0 && *v >= 0.0 && *v < 1.8e19 => Some(*v as u64),
            Self::Text(s) => {
                let trimmed = s.trim();
                trimmed.parse::<u64>().ok().or_else(|| {
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .and_then(|f| Self::Real(f).as_count())
                })
            }
            Self::Real(_) | Self::Blob(_) | Self::Null => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => f.write_str(&text),
            None => f.write_str("NULL"),
        }
    }
}

pub type Row = Vec<Cell>;

/// Rows returned by one statement, in engine order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub const fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// A one-row, one-column result.
    pub fn scalar(cell: Cell) -> Self {
        Self {
            rows: vec![vec![cell]],
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The value of a query that must yield exactly one row (an ungrouped
    /// aggregate). Any other shape is a [`MorphError::MalformedResult`].
    pub fn single_value(&self, sql: &str) -> MorphResult<&Cell> {
        match self.rows.as_slice() {
            [row] => row.first().ok_or_else(|| MorphError::MalformedResult {
                sql: sql.to_owned(),
                detail: "row has no columns".to_owned(),
            }),
            rows => Err(MorphError::MalformedResult {
                sql: sql.to_owned(),
                detail: format!("expected one row, got {}", rows.len()),
            }),
        }
    }
}

/// Failure reported by the engine; only the message is inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionError {
    pub message: String,
}

impl ExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ExecutionError {}

/// A session on the engine under test. One per worker; never shared.
pub trait Executor {
    fn execute(&mut self, sql: &str) -> Result<ResultSet, ExecutionError>;
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn execute(&mut self, sql: &str) -> Result<ResultSet, ExecutionError> {
        (**self).execute(sql)
    }
}
