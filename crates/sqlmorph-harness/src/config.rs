//! Campaign configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlmorph_error::{MorphError, Result};
use sqlmorph_gen::{Dialect, dialect_by_name};
use sqlmorph_oracle::{OracleKind, OracleOptions};

/// One fuzzing campaign, usually read from TOML.
///
/// ```toml
/// seed = 7
/// workers = 4
/// checks_per_worker = 500
/// dialect = "sqlite"
/// oracles = ["norec", "tlp_where", "tlp_aggregate"]
/// repro_dir = "target/sqlmorph"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CampaignConfig {
    /// Root seed; every worker seed derives from it.
    pub seed: u64,
    pub workers: usize,
    pub checks_per_worker: u64,
    pub max_depth: usize,
    /// Oracles to rotate through. EXPLAIN smoke checks are enabled by
    /// listing `explain`.
    pub oracles: Vec<OracleKind>,
    pub dialect: String,
    /// Stop every worker after the first defect.
    pub stop_on_defect: bool,
    pub server_side_union: bool,
    /// Where to write the repro bundle; no bundle when unset.
    pub repro_dir: Option<PathBuf>,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        let oracle = OracleOptions::default();
        Self {
            seed: 0,
            workers: 1,
            checks_per_worker: 100,
            max_depth: oracle.max_depth,
            oracles: vec![OracleKind::Norec, OracleKind::TlpWhere],
            dialect: "sqlite".to_owned(),
            stop_on_defect: false,
            server_side_union: oracle.server_side_union,
            repro_dir: None,
        }
    }
}

impl CampaignConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|err| MorphError::config(format!("TOML parse failure: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(MorphError::config("workers must be at least 1"));
        }
        if self.oracles.is_empty() {
            return Err(MorphError::config("at least one oracle must be enabled"));
        }
        if self.max_depth == 0 {
            return Err(MorphError::config("max_depth must be at least 1"));
        }
        self.dialect().map(|_| ())
    }

    pub fn dialect(&self) -> Result<Arc<dyn Dialect>> {
        dialect_by_name(&self.dialect)
            .ok_or_else(|| MorphError::config(format!("unknown dialect: {}", self.dialect)))
    }

    pub const fn oracle_options(&self) -> OracleOptions {
        OracleOptions {
            max_depth: self.max_depth,
            server_side_union: self.server_side_union,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = CampaignConfig::from_toml_str("").unwrap();
        assert_eq!(config, CampaignConfig::default());
    }

    #[test]
    fn full_document_parses() {
        let config = CampaignConfig::from_toml_str(
            r#"
            seed = 7
            workers = 4
            checks_per_worker = 500
            max_depth = 2
            dialect = "postgres"
            oracles = ["norec", "tlp_group_by", "explain"]
            stop_on_defect = true
            repro_dir = "out"
            "#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.workers, 4);
        assert_eq!(
            config.oracles,
            vec![OracleKind::Norec, OracleKind::TlpGroupBy, OracleKind::Explain]
        );
        assert_eq!(config.dialect().unwrap().name(), "postgres");
        assert_eq!(config.repro_dir.as_deref(), Some(Path::new("out")));
        assert_eq!(config.oracle_options().max_depth, 2);
    }

    #[test]
    fn invalid_documents_are_config_errors() {
        for text in [
            "workers = 0",
            "oracles = []",
            "max_depth = 0",
            r#"dialect = "oracle""#,
            r#"oracles = ["pqs"]"#,
            "unknown_key = 1",
            "seed = \"seven\"",
        ] {
            let err = CampaignConfig::from_toml_str(text).unwrap_err();
            assert!(matches!(err, MorphError::Config(_)), "{text}: {err}");
        }
    }
}
