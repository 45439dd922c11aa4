//! Fuzzing campaigns: many workers, each with its own session and seeds,
//! running oracle checks against one schema snapshot.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use serde::{Deserialize, Serialize};
use sqlmorph_error::{MorphError, Result};
use sqlmorph_oracle::{
    DefectReport, DefectSink, Executor, GlobalState, MemorySink, Outcome, TestOracle, oracle_for,
};
use sqlmorph_types::{RandomSource, Schema};
use tracing::{debug, error, info, warn};

use crate::config::CampaignConfig;
use crate::repro::{BundleMeta, CampaignStatus, REPRO_SCHEMA_VERSION, ReproBundle, init_repro_bundle};
use crate::seed::WorkerSeeds;

/// Source of schema snapshots.
pub trait SchemaProvider: Sync {
    fn snapshot(&self) -> Result<Schema>;
}

impl SchemaProvider for Schema {
    fn snapshot(&self) -> Result<Schema> {
        Ok(self.clone())
    }
}

/// Opens one session per worker.
pub trait ExecutorFactory: Sync {
    fn connect(&self, worker: usize) -> Result<Box<dyn Executor>>;
}

impl<F> ExecutorFactory for F
where
    F: Fn(usize) -> Result<Box<dyn Executor>> + Sync,
{
    fn connect(&self, worker: usize) -> Result<Box<dyn Executor>> {
        self(worker)
    }
}

/// Per-outcome check counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub checks: u64,
    pub equivalent: u64,
    pub inconclusive: u64,
    pub defects: u64,
    /// Checks that hit an execution error outside the allow-list, or a
    /// result of impossible shape.
    pub unexpected_errors: u64,
    /// Checks abandoned because generation failed.
    pub generation_errors: u64,
}

impl CampaignSummary {
    fn merge(&mut self, other: &Self) {
        self.checks += other.checks;
        self.equivalent += other.equivalent;
        self.inconclusive += other.inconclusive;
        self.defects += other.defects;
        self.unexpected_errors += other.unexpected_errors;
        self.generation_errors += other.generation_errors;
    }
}

/// What a finished campaign produced.
#[derive(Debug)]
pub struct CampaignReport {
    pub summary: CampaignSummary,
    pub defects: Vec<DefectReport>,
    pub stopped_early: bool,
    pub bundle: Option<std::path::PathBuf>,
}

/// Forwards to the in-memory record and, when configured, the bundle.
struct Sinks<'a> {
    memory: &'a MemorySink,
    bundle: Option<&'a ReproBundle>,
}

impl DefectSink for Sinks<'_> {
    fn record(&self, report: &DefectReport) -> Result<()> {
        self.memory.record(report)?;
        match self.bundle {
            Some(bundle) => bundle.record(report),
            None => Ok(()),
        }
    }

    fn record_error(&self, err: &MorphError) -> Result<()> {
        match self.bundle {
            Some(bundle) => bundle.record_error(err),
            None => Ok(()),
        }
    }
}

#[derive(Debug)]
pub struct Campaign {
    config: CampaignConfig,
    stop: Arc<AtomicBool>,
}

impl Campaign {
    pub fn new(config: CampaignConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    pub const fn config(&self) -> &CampaignConfig {
        &self.config
    }

    /// Setting the returned flag stops every worker before its next check.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn run(&self, schemas: &dyn SchemaProvider, sessions: &dyn ExecutorFactory) -> Result<CampaignReport> {
        let schema = Arc::new(schemas.snapshot()?);
        if schema.is_empty() {
            return Err(MorphError::SchemaEmpty);
        }
        let dialect_name = self.config.dialect()?.name();
        info!(
            seed = self.config.seed,
            workers = self.config.workers,
            checks_per_worker = self.config.checks_per_worker,
            dialect = dialect_name,
            tables = schema.tables().len(),
            "campaign start"
        );

        let bundle = match &self.config.repro_dir {
            Some(dir) => Some(init_repro_bundle(
                dir,
                &BundleMeta {
                    schema_version: REPRO_SCHEMA_VERSION,
                    campaign: format!("{dialect_name}-campaign"),
                    seed: self.config.seed,
                    dialect: dialect_name.to_owned(),
                    oracles: self.config.oracles.iter().map(ToString::to_string).collect(),
                    schema: schema.describe(),
                    harness_version: env!("CARGO_PKG_VERSION").to_owned(),
                },
            )?),
            None => None,
        };
        let memory = MemorySink::new();
        let sinks = Sinks {
            memory: &memory,
            bundle: bundle.as_ref(),
        };

        let outcome = self.run_workers(&schema, sessions, &sinks);

        let bundle_path = match bundle {
            Some(bundle) => {
                let status = match &outcome {
                    Err(_) => CampaignStatus::Aborted,
                    Ok(summary) if summary.defects > 0 => CampaignStatus::DefectsFound,
                    Ok(_) => CampaignStatus::Clean,
                };
                Some(bundle.finish(status)?)
            }
            None => None,
        };
        let summary = outcome?;
        let scheduled = self.config.workers as u64 * self.config.checks_per_worker;
        let stopped_early = summary.checks < scheduled;
        info!(
            checks = summary.checks,
            equivalent = summary.equivalent,
            inconclusive = summary.inconclusive,
            defects = summary.defects,
            unexpected_errors = summary.unexpected_errors,
            generation_errors = summary.generation_errors,
            stopped_early,
            "campaign end"
        );
        Ok(CampaignReport {
            summary,
            defects: memory.reports(),
            stopped_early,
            bundle: bundle_path,
        })
    }

    fn run_workers(
        &self,
        schema: &Arc<Schema>,
        sessions: &dyn ExecutorFactory,
        sink: &dyn DefectSink,
    ) -> Result<CampaignSummary> {
        let results: Vec<Result<CampaignSummary>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..self.config.workers)
                .map(|worker| {
                    let schema = Arc::clone(schema);
                    scope.spawn(move || self.run_worker(worker, schema, sessions, sink))
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(MorphError::internal("campaign worker panicked")))
                })
                .collect()
        });

        let mut total = CampaignSummary::default();
        for result in results {
            total.merge(&result?);
        }
        Ok(total)
    }

    fn run_worker(
        &self,
        worker: usize,
        schema: Arc<Schema>,
        sessions: &dyn ExecutorFactory,
        sink: &dyn DefectSink,
    ) -> Result<CampaignSummary> {
        let seeds = WorkerSeeds::derive(self.config.seed, worker);
        let mut state = GlobalState::new(
            schema,
            self.config.dialect()?,
            sessions.connect(worker)?,
            RandomSource::from_seed(seeds.generation),
            self.config.oracle_options(),
        );
        let mut selection = RandomSource::from_seed(seeds.selection);
        let mut oracles: Vec<Box<dyn TestOracle>> =
            self.config.oracles.iter().map(|kind| oracle_for(*kind)).collect();
        let mut summary = CampaignSummary::default();
        debug!(worker, seed = seeds.generation, "worker start");

        for _ in 0..self.config.checks_per_worker {
            if self.stop.load(Ordering::SeqCst) {
                break;
            }
            let index = selection.below(oracles.len());
            let oracle = &mut oracles[index];
            summary.checks += 1;
            match oracle.check(&mut state) {
                Ok(Outcome::Equivalent) => summary.equivalent += 1,
                Ok(Outcome::Inconclusive { reason }) => {
                    debug!(worker, oracle = oracle.name(), %reason, "inconclusive");
                    summary.inconclusive += 1;
                }
                Ok(Outcome::Defect(report)) => {
                    error!(
                        worker,
                        oracle = %report.oracle,
                        first_query = %report.first_query,
                        second_query = %report.second_query,
                        description = %report.description,
                        "defect found"
                    );
                    summary.defects += 1;
                    sink.record(&report)?;
                    if self.config.stop_on_defect {
                        self.stop.store(true, Ordering::SeqCst);
                    }
                }
                Err(err @ (MorphError::UnexpectedExecution { .. } | MorphError::MalformedResult { .. })) => {
                    warn!(worker, oracle = oracle.name(), %err, "check failed");
                    summary.unexpected_errors += 1;
                    sink.record_error(&err)?;
                }
                Err(err) if err.is_generator_fault() => {
                    warn!(worker, oracle = oracle.name(), %err, "generation failed");
                    summary.generation_errors += 1;
                }
                Err(err) => return Err(err),
            }
        }
        debug!(worker, checks = summary.checks, "worker end");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use sqlmorph_oracle::{Cell, ExecutionError, OracleKind, ResultSet};
    use sqlmorph_types::{ColumnDef, DataType, Table};

    use super::*;

    fn schema() -> Schema {
        Schema::new(vec![Table::new(
            "t",
            vec![ColumnDef::new("a", DataType::Int), ColumnDef::new("b", DataType::Int)],
            Vec::new(),
            false,
        )])
    }

    /// Answers every query with one fixed response.
    struct Constant(std::result::Result<ResultSet, ExecutionError>);

    impl Executor for Constant {
        fn execute(&mut self, _sql: &str) -> std::result::Result<ResultSet, ExecutionError> {
            self.0.clone()
        }
    }

    fn config(workers: usize, checks: u64) -> CampaignConfig {
        CampaignConfig {
            workers,
            checks_per_worker: checks,
            oracles: vec![OracleKind::Norec],
            ..CampaignConfig::default()
        }
    }

    #[test]
    fn every_check_is_counted_once() {
        let campaign = Campaign::new(config(3, 20)).unwrap();
        let sessions = |_worker: usize| -> Result<Box<dyn Executor>> {
            Ok(Box::new(Constant(Err(ExecutionError::new("integer overflow")))))
        };
        let report = campaign.run(&schema(), &sessions).unwrap();
        assert_eq!(report.summary.checks, 60);
        assert_eq!(report.summary.inconclusive, 60);
        assert!(!report.stopped_early);
    }

    #[test]
    fn stop_on_defect_halts_workers() {
        let mut cfg = config(1, 50);
        cfg.stop_on_defect = true;
        let campaign = Campaign::new(cfg).unwrap();
        // One row from the WHERE query, a SUM of 7: always a count mismatch.
        let sessions = |_worker: usize| -> Result<Box<dyn Executor>> {
            Ok(Box::new(Constant(Ok(ResultSet::scalar(Cell::Integer(7))))))
        };
        let report = campaign.run(&schema(), &sessions).unwrap();
        assert_eq!(report.summary.defects, 1);
        assert_eq!(report.summary.checks, 1);
        assert!(report.stopped_early);
        assert_eq!(report.defects.len(), 1);
        assert_eq!(report.defects[0].oracle, "norec");
    }

    #[test]
    fn defect_on_the_last_check_is_not_an_early_stop() {
        let mut cfg = config(1, 1);
        cfg.stop_on_defect = true;
        let campaign = Campaign::new(cfg).unwrap();
        let sessions = |_worker: usize| -> Result<Box<dyn Executor>> {
            Ok(Box::new(Constant(Ok(ResultSet::scalar(Cell::Integer(7))))))
        };
        let report = campaign.run(&schema(), &sessions).unwrap();
        assert_eq!(report.summary.defects, 1);
        assert_eq!(report.summary.checks, 1);
        assert!(!report.stopped_early);
    }

    #[test]
    fn malformed_aggregate_results_are_counted_not_fatal() {
        let campaign = Campaign::new(config(1, 4)).unwrap();
        // The WHERE query returns no rows and so does the SUM query, which
        // must always return one.
        let sessions = |_worker: usize| -> Result<Box<dyn Executor>> {
            Ok(Box::new(Constant(Ok(ResultSet::default()))))
        };
        let report = campaign.run(&schema(), &sessions).unwrap();
        assert_eq!(report.summary.unexpected_errors, 4);
        assert_eq!(report.summary.defects, 0);
    }

    #[test]
    fn unexpected_errors_are_counted_not_fatal() {
        let campaign = Campaign::new(config(2, 5)).unwrap();
        let sessions = |_worker: usize| -> Result<Box<dyn Executor>> {
            Ok(Box::new(Constant(Err(ExecutionError::new("database disk image is malformed")))))
        };
        let report = campaign.run(&schema(), &sessions).unwrap();
        assert_eq!(report.summary.unexpected_errors, 10);
    }

    #[test]
    fn session_failure_aborts_the_campaign() {
        let campaign = Campaign::new(config(2, 5)).unwrap();
        let sessions = |worker: usize| -> Result<Box<dyn Executor>> {
            if worker == 1 {
                Err(MorphError::internal("connection refused"))
            } else {
                Ok(Box::new(Constant(Ok(ResultSet::default()))))
            }
        };
        assert!(campaign.run(&schema(), &sessions).is_err());
    }

    #[test]
    fn empty_schema_is_rejected() {
        let campaign = Campaign::new(config(1, 1)).unwrap();
        let sessions = |_worker: usize| -> Result<Box<dyn Executor>> {
            Ok(Box::new(Constant(Ok(ResultSet::default()))))
        };
        let err = campaign.run(&Schema::default(), &sessions).unwrap_err();
        assert!(matches!(err, MorphError::SchemaEmpty));
    }

    #[test]
    fn external_stop_prevents_checks() {
        let campaign = Campaign::new(config(2, 100)).unwrap();
        campaign.stop_handle().store(true, Ordering::SeqCst);
        let sessions = |_worker: usize| -> Result<Box<dyn Executor>> {
            Ok(Box::new(Constant(Ok(ResultSet::default()))))
        };
        let report = campaign.run(&schema(), &sessions).unwrap();
        assert_eq!(report.summary.checks, 0);
        assert!(report.stopped_early);
    }
}
