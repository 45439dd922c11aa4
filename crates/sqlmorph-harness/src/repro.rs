//! Repro bundles.
//!
//! One directory per campaign:
//! - `meta.json` for the campaign seed, dialect, oracles and schema
//! - `events.jsonl` for structured lifecycle events
//! - `defects/<n>.json` for each distinct defect, with both queries verbatim
//!
//! Defects are de-duplicated by a SHA-256 fingerprint of the oracle name and
//! the query pair.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlmorph_error::{MorphError, Result};
use sqlmorph_oracle::{DefectReport, DefectSink};
use tracing::{error, info, warn};

/// Version of the bundle layout.
pub const REPRO_SCHEMA_VERSION: u32 = 1;

/// Files that must be present in every bundle.
pub const REQUIRED_BUNDLE_FILES: [&str; 2] = ["meta.json", "events.jsonl"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    CampaignStart,
    Defect,
    UnexpectedError,
    CampaignEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Clean,
    DefectsFound,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleMeta {
    pub schema_version: u32,
    pub campaign: String,
    pub seed: u64,
    pub dialect: String,
    pub oracles: Vec<String>,
    /// Human-readable schema snapshot the campaign ran against.
    pub schema: String,
    pub harness_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleEvent {
    pub kind: EventKind,
    pub status: Option<CampaignStatus>,
    pub step: u64,
    pub message: String,
    pub payload: BTreeMap<String, Value>,
}

/// A defect as written to `defects/<n>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefectRecord {
    pub fingerprint: String,
    pub report: DefectReport,
}

#[derive(Debug, Default)]
struct BundleState {
    next_step: u64,
    defects_written: u64,
    fingerprints: BTreeSet<String>,
}

/// An open bundle. Shared by all workers as their [`DefectSink`].
#[derive(Debug)]
pub struct ReproBundle {
    root: PathBuf,
    events_path: PathBuf,
    state: Mutex<BundleState>,
}

impl ReproBundle {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of distinct defects written so far.
    pub fn defects_written(&self) -> u64 {
        self.state.lock().defects_written
    }

    pub fn emit_event(
        &self,
        kind: EventKind,
        message: impl Into<String>,
        payload: BTreeMap<String, Value>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let event = BundleEvent {
            kind,
            status: None,
            step: state.next_step,
            message: message.into(),
            payload,
        };
        state.next_step = state.next_step.saturating_add(1);
        append_line(&self.events_path, &serde_json::to_string(&event)?)
    }

    /// Write `report` unless an identical one was already recorded. Returns
    /// the artifact path for new defects.
    pub fn write_defect(&self, report: &DefectReport) -> Result<Option<PathBuf>> {
        let fingerprint = defect_fingerprint(report);
        let index = {
            let mut state = self.state.lock();
            if !state.fingerprints.insert(fingerprint.clone()) {
                return Ok(None);
            }
            state.defects_written += 1;
            state.defects_written
        };
        let path = self.root.join("defects").join(format!("{index}.json"));
        let record = DefectRecord {
            fingerprint: fingerprint.clone(),
            report: report.clone(),
        };
        write_json_file(&path, &record)?;

        let mut payload = BTreeMap::new();
        payload.insert("oracle".to_owned(), Value::String(report.oracle.clone()));
        payload.insert("fingerprint".to_owned(), Value::String(fingerprint));
        payload.insert("first_query".to_owned(), Value::String(report.first_query.clone()));
        payload.insert("second_query".to_owned(), Value::String(report.second_query.clone()));
        payload.insert("description".to_owned(), Value::String(report.description.clone()));
        self.emit_event(EventKind::Defect, "defect", payload)?;
        Ok(Some(path))
    }

    pub fn finish(self, status: CampaignStatus) -> Result<PathBuf> {
        let state = self.state.into_inner();
        let event = BundleEvent {
            kind: EventKind::CampaignEnd,
            status: Some(status),
            step: state.next_step,
            message: "campaign_end".to_owned(),
            payload: BTreeMap::from([(
                "defects".to_owned(),
                Value::from(state.defects_written),
            )]),
        };
        append_line(&self.events_path, &serde_json::to_string(&event)?)?;
        info!(
            bundle = %self.root.display(),
            status = ?status,
            defects = state.defects_written,
            "repro bundle finalized"
        );
        Ok(self.root)
    }
}

impl DefectSink for ReproBundle {
    fn record(&self, report: &DefectReport) -> Result<()> {
        self.write_defect(report).map(|_| ())
    }

    fn record_error(&self, err: &MorphError) -> Result<()> {
        let mut payload = BTreeMap::new();
        payload.insert("error".to_owned(), Value::String(err.to_string()));
        if let Some(sql) = err.offending_sql() {
            payload.insert("sql".to_owned(), Value::String(sql.to_owned()));
        }
        self.emit_event(EventKind::UnexpectedError, "unexpected_error", payload)
    }
}

/// Create `<base_dir>/<campaign>-seed-<seed>/` with `meta.json` and an
/// `events.jsonl` opened by a `campaign_start` event.
pub fn init_repro_bundle(base_dir: &Path, meta: &BundleMeta) -> Result<ReproBundle> {
    if meta.campaign.is_empty() {
        return Err(MorphError::config("campaign name must be non-empty"));
    }
    let root = base_dir.join(bundle_dir_name(&meta.campaign, meta.seed));
    fs::create_dir_all(root.join("defects"))?;
    write_json_file(&root.join("meta.json"), meta)?;

    let events_path = root.join("events.jsonl");
    fs::File::create(&events_path)?;

    let bundle = ReproBundle {
        root,
        events_path,
        state: Mutex::new(BundleState::default()),
    };
    bundle.emit_event(EventKind::CampaignStart, "campaign_start", BTreeMap::new())?;

    info!(
        campaign = %meta.campaign,
        seed = meta.seed,
        dialect = %meta.dialect,
        root = %bundle.root.display(),
        "repro bundle initialized"
    );
    Ok(bundle)
}

pub fn validate_required_files(bundle_root: &Path) -> Result<()> {
    let missing: Vec<&str> = REQUIRED_BUNDLE_FILES
        .iter()
        .copied()
        .filter(|name| !bundle_root.join(name).is_file())
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    error!(
        bundle = %bundle_root.display(),
        missing_count = missing.len(),
        "missing required repro bundle files"
    );
    Err(MorphError::internal(format!(
        "missing required bundle files: {}",
        missing.join(", ")
    )))
}

pub fn validate_bundle_meta(bundle_root: &Path) -> Result<BundleMeta> {
    let bytes = fs::read(bundle_root.join("meta.json"))?;
    let meta: BundleMeta = serde_json::from_slice(&bytes)?;
    if meta.schema_version != REPRO_SCHEMA_VERSION {
        warn!(
            expected = REPRO_SCHEMA_VERSION,
            found = meta.schema_version,
            "bundle schema version mismatch"
        );
        return Err(MorphError::internal(format!(
            "unsupported schema version: expected {REPRO_SCHEMA_VERSION}, got {}",
            meta.schema_version
        )));
    }
    if meta.campaign.is_empty() || meta.dialect.is_empty() {
        return Err(MorphError::internal(
            "meta.json must include non-empty campaign and dialect",
        ));
    }
    Ok(meta)
}

pub fn validate_events_jsonl(bundle_root: &Path) -> Result<Vec<BundleEvent>> {
    let contents = fs::read_to_string(bundle_root.join("events.jsonl"))?;
    let mut events = Vec::new();
    for (line_no, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            return Err(MorphError::internal(format!(
                "events.jsonl has empty line at {}",
                line_no + 1
            )));
        }
        let event: BundleEvent = serde_json::from_str(line).map_err(|err| {
            MorphError::internal(format!("events.jsonl parse failure at line {}: {err}", line_no + 1))
        })?;
        events.push(event);
    }
    if events.is_empty() {
        return Err(MorphError::internal("events.jsonl must contain at least one event"));
    }
    Ok(events)
}

/// Every defect record in the bundle, in write order.
pub fn load_defects(bundle_root: &Path) -> Result<Vec<DefectRecord>> {
    let mut indexed = Vec::new();
    for entry in fs::read_dir(bundle_root.join("defects"))? {
        let path = entry?.path();
        let Some(index) = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.parse::<u64>().ok())
        else {
            continue;
        };
        let record: DefectRecord = serde_json::from_slice(&fs::read(&path)?)?;
        indexed.push((index, record));
    }
    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, record)| record).collect())
}

pub fn validate_bundle(bundle_root: &Path) -> Result<()> {
    validate_required_files(bundle_root)?;
    validate_bundle_meta(bundle_root)?;
    let events = validate_events_jsonl(bundle_root)?;
    if events.first().map(|event| event.kind) != Some(EventKind::CampaignStart) {
        return Err(MorphError::internal("events.jsonl must start with a campaign_start event"));
    }
    if events.last().map(|event| event.kind) != Some(EventKind::CampaignEnd) {
        return Err(MorphError::internal("events.jsonl must end with a campaign_end event"));
    }
    let logged = events.iter().filter(|e| e.kind == EventKind::Defect).count();
    let written = load_defects(bundle_root)?.len();
    if logged != written {
        return Err(MorphError::internal(format!(
            "{logged} defect events but {written} defect files"
        )));
    }
    Ok(())
}

/// Hex SHA-256 over the oracle name and both queries.
pub fn defect_fingerprint(report: &DefectReport) -> String {
    let mut hasher = Sha256::new();
    hasher.update(report.oracle.as_bytes());
    hasher.update([0u8]);
    hasher.update(report.first_query.as_bytes());
    hasher.update([0u8]);
    hasher.update(report.second_query.as_bytes());
    hex(&hasher.finalize())
}

fn hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0F)]));
    }
    out
}

fn append_line(path: &Path, text: &str) -> Result<()> {
    let mut file = OpenOptions::new().append(true).create(true).open(path)?;
    writeln!(file, "{text}")?;
    Ok(())
}

fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_vec_pretty(value)?)?;
    Ok(())
}

fn bundle_dir_name(campaign: &str, seed: u64) -> String {
    format!("{}-seed-{seed}", sanitize_segment(campaign))
}

fn sanitize_segment(value: &str) -> String {
    value
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}
