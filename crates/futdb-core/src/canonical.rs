//! Canonical series mapping: the versioned per-root declaration of which
//! contract series is official, and its reconciliation against the copy
//! mirrored in the database.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::series::normalize_root;
use crate::{parse_series_rank, ConfigError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalMapping {
    pub root: String,
    pub contract_series: String,
    pub description: String,
    pub optional: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct RootEntry {
    contract_series: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    optional: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    ohlc_exempt_roots: Vec<String>,
    #[serde(default)]
    roots: BTreeMap<String, RootEntry>,
}

/// Parsed and validated mapping config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalConfig {
    mappings: Vec<CanonicalMapping>,
    ohlc_exempt_roots: BTreeSet<String>,
}

impl CanonicalConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text)?;

        let mut mappings = Vec::with_capacity(raw.roots.len());
        let mut seen = BTreeSet::new();
        for (key, entry) in raw.roots {
            let root = normalize_root(&key).map_err(|error| ConfigError::InvalidRoot {
                root: key.clone(),
                reason: error.to_string(),
            })?;
            if !seen.insert(root.clone()) {
                return Err(ConfigError::InvalidRoot {
                    root,
                    reason: String::from("declared more than once"),
                });
            }
            let contract_series = entry.contract_series.trim().to_owned();
            if contract_series.is_empty() {
                return Err(ConfigError::InvalidRoot {
                    root,
                    reason: String::from("contract_series cannot be empty"),
                });
            }
            if parse_series_rank(&contract_series).is_none() {
                return Err(ConfigError::InvalidRoot {
                    root,
                    reason: format!("contract_series '{contract_series}' has no FRONT or RANK_N token"),
                });
            }
            mappings.push(CanonicalMapping {
                root,
                contract_series,
                description: entry.description.trim().to_owned(),
                optional: entry.optional,
            });
        }
        mappings.sort_by(|left, right| left.root.cmp(&right.root));

        let ohlc_exempt_roots = raw
            .ohlc_exempt_roots
            .iter()
            .map(|root| root.trim().to_ascii_uppercase())
            .filter(|root| !root.is_empty())
            .collect();

        Ok(Self {
            mappings,
            ohlc_exempt_roots,
        })
    }

    pub fn from_mappings(mappings: Vec<CanonicalMapping>) -> Self {
        let mut mappings = mappings;
        mappings.sort_by(|left, right| left.root.cmp(&right.root));
        Self {
            mappings,
            ohlc_exempt_roots: BTreeSet::new(),
        }
    }

    pub fn with_ohlc_exempt_roots<I, S>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ohlc_exempt_roots = roots
            .into_iter()
            .map(|root| root.as_ref().trim().to_ascii_uppercase())
            .collect();
        self
    }

    /// Mappings sorted by root.
    pub fn mappings(&self) -> &[CanonicalMapping] {
        &self.mappings
    }

    pub fn ohlc_exempt_roots(&self) -> &BTreeSet<String> {
        &self.ohlc_exempt_roots
    }

    pub fn is_ohlc_exempt(&self, root: &str) -> bool {
        self.ohlc_exempt_roots.contains(root)
    }

    /// Roots that must show up every trading day.
    pub fn required_root_count(&self) -> usize {
        self.mappings.iter().filter(|mapping| !mapping.optional).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMismatch {
    pub root: String,
    pub field: String,
    pub expected: String,
    pub actual: String,
}

/// Row-for-row comparison between config and the database mirror.
///
/// `contract_series` and `optional` differences are drift. Description
/// changes are reported separately and do not make the diff dirty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MappingDiff {
    pub missing_in_db: Vec<String>,
    pub extra_in_db: Vec<String>,
    pub mismatches: Vec<FieldMismatch>,
    pub description_drift: Vec<FieldMismatch>,
}

impl MappingDiff {
    pub fn is_clean(&self) -> bool {
        self.drift_count() == 0
    }

    pub fn drift_count(&self) -> usize {
        self.missing_in_db.len() + self.extra_in_db.len() + self.mismatches.len()
    }
}

pub fn reconcile(expected: &[CanonicalMapping], actual: &[CanonicalMapping]) -> MappingDiff {
    let expected_by_root: BTreeMap<&str, &CanonicalMapping> = expected
        .iter()
        .map(|mapping| (mapping.root.as_str(), mapping))
        .collect();
    let actual_by_root: BTreeMap<&str, &CanonicalMapping> = actual
        .iter()
        .map(|mapping| (mapping.root.as_str(), mapping))
        .collect();

    let mut diff = MappingDiff::default();
    for (root, want) in &expected_by_root {
        let Some(have) = actual_by_root.get(root) else {
            diff.missing_in_db.push((*root).to_owned());
            continue;
        };
        if want.contract_series != have.contract_series {
            diff.mismatches.push(FieldMismatch {
                root: (*root).to_owned(),
                field: String::from("contract_series"),
                expected: want.contract_series.clone(),
                actual: have.contract_series.clone(),
            });
        }
        if want.optional != have.optional {
            diff.mismatches.push(FieldMismatch {
                root: (*root).to_owned(),
                field: String::from("optional"),
                expected: want.optional.to_string(),
                actual: have.optional.to_string(),
            });
        }
        if want.description != have.description {
            diff.description_drift.push(FieldMismatch {
                root: (*root).to_owned(),
                field: String::from("description"),
                expected: want.description.clone(),
                actual: have.description.clone(),
            });
        }
    }
    diff.extra_in_db = actual_by_root
        .keys()
        .filter(|root| !expected_by_root.contains_key(*root))
        .map(|root| (*root).to_owned())
        .collect();

    diff
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
ohlc_exempt_roots = ["vx"]

[roots.ES]
contract_series = "ES_FRONT_CALENDAR_2D"
description = "E-mini S&P 500"

[roots.SR3]
contract_series = "SR3_FRONT_CALENDAR_2D"
optional = true
"#;

    #[test]
    fn parses_roots_sorted_with_defaults() {
        let config = CanonicalConfig::from_toml_str(SAMPLE).expect("config");
        let roots: Vec<&str> = config.mappings().iter().map(|m| m.root.as_str()).collect();
        assert_eq!(roots, ["ES", "SR3"]);
        assert!(!config.mappings()[0].optional);
        assert_eq!(config.mappings()[1].description, "");
        assert_eq!(config.required_root_count(), 1);
        assert!(config.is_ohlc_exempt("VX"));
    }

    #[test]
    fn rejects_series_without_rank_token() {
        let err = CanonicalConfig::from_toml_str(
            "[roots.ES]\ncontract_series = \"ES_CONTINUOUS\"\n",
        )
        .expect_err("must fail");
        assert!(matches!(err, ConfigError::InvalidRoot { .. }));
    }

    #[test]
    fn identical_sides_reconcile_clean() {
        let config = CanonicalConfig::from_toml_str(SAMPLE).expect("config");
        let diff = reconcile(config.mappings(), config.mappings());
        assert!(diff.is_clean());
        assert_eq!(diff, MappingDiff::default());
    }

    #[test]
    fn single_field_changes_are_detected() {
        let config = CanonicalConfig::from_toml_str(SAMPLE).expect("config");
        let mut db = config.mappings().to_vec();
        db[0].contract_series = String::from("ES_FRONT_VOLUME");
        let diff = reconcile(config.mappings(), &db);
        assert_eq!(diff.mismatches.len(), 1);
        assert_eq!(diff.mismatches[0].field, "contract_series");

        let mut db = config.mappings().to_vec();
        db[1].optional = false;
        let diff = reconcile(config.mappings(), &db);
        assert_eq!(diff.drift_count(), 1);
        assert_eq!(diff.mismatches[0].field, "optional");
    }

    #[test]
    fn missing_and_extra_roots_are_listed() {
        let config = CanonicalConfig::from_toml_str(SAMPLE).expect("config");
        let mut db = vec![config.mappings()[0].clone()];
        db.push(CanonicalMapping {
            root: String::from("ZN"),
            contract_series: String::from("ZN_FRONT_VOLUME"),
            description: String::new(),
            optional: false,
        });
        let diff = reconcile(config.mappings(), &db);
        assert_eq!(diff.missing_in_db, ["SR3"]);
        assert_eq!(diff.extra_in_db, ["ZN"]);
        assert_eq!(diff.drift_count(), 2);
    }

    #[test]
    fn description_change_is_informational() {
        let config = CanonicalConfig::from_toml_str(SAMPLE).expect("config");
        let mut db = config.mappings().to_vec();
        db[0].description = String::from("renamed");
        let diff = reconcile(config.mappings(), &db);
        assert!(diff.is_clean());
        assert_eq!(diff.description_drift.len(), 1);
    }

    #[test]
    fn load_reads_file_and_reports_missing_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("canonical_series.toml");
        std::fs::write(&path, SAMPLE).expect("write");

        let config = CanonicalConfig::load(&path).expect("load");
        assert_eq!(config, CanonicalConfig::from_toml_str(SAMPLE).expect("config"));

        let err = CanonicalConfig::load(&dir.path().join("absent.toml")).expect_err("missing");
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
