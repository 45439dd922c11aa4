//! Check outcomes and defect reporting.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sqlmorph_error::{MorphError, Result};

use crate::exec::Row;

/// Everything needed to reproduce and understand a disagreement.
///
/// Query texts are the exact strings that were executed; they are never
/// re-rendered after the fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefectReport {
    pub oracle: String,
    pub first_query: String,
    pub second_query: String,
    pub first_result: Vec<Row>,
    pub second_result: Vec<Row>,
    pub description: String,
}

/// Result of one oracle check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The rewritten forms agreed.
    Equivalent,
    /// The check was abandoned (allow-listed error or undetermined value).
    Inconclusive { reason: String },
    /// The rewritten forms disagreed.
    Defect(DefectReport),
}

impl Outcome {
    pub fn inconclusive(reason: impl Into<String>) -> Self {
        Self::Inconclusive {
            reason: reason.into(),
        }
    }

    pub const fn is_defect(&self) -> bool {
        matches!(self, Self::Defect(_))
    }

    pub const fn is_inconclusive(&self) -> bool {
        matches!(self, Self::Inconclusive { .. })
    }

    pub const fn defect(&self) -> Option<&DefectReport> {
        match self {
            Self::Defect(report) => Some(report),
            _ => None,
        }
    }
}

/// Receives defect reports as they are found.
pub trait DefectSink: Send + Sync {
    fn record(&self, report: &DefectReport) -> Result<()>;

    /// Told about checks that failed outright (unexpected execution errors).
    fn record_error(&self, _error: &MorphError) -> Result<()> {
        Ok(())
    }
}

/// Keeps reports in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: Mutex<Vec<DefectReport>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<DefectReport> {
        self.reports.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }
}

impl DefectSink for MemorySink {
    fn record(&self, report: &DefectReport) -> Result<()> {
        self.reports.lock().push(report.clone());
        Ok(())
    }
}
