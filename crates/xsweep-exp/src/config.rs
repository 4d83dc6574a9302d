use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use xsweep_core::{Combination, ErrorInfo, SweepError, DEFAULT_SEED_KEY};

use crate::serde_io::from_yaml_str;

/// Name of the configuration section read by the explicit sweeper.
pub const SWEEPER_SECTION: &str = "sweeper";

/// Seeds to replicate each combination across.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeedSpec {
    /// `seeds: N` runs seeds `0..N`.
    Count(u64),
    /// `seeds: [42, 43]` runs exactly those seeds, in order.
    List(Vec<Value>),
}

impl SeedSpec {
    /// Ordered seed values.
    pub fn resolve(&self) -> Vec<Value> {
        match self {
            SeedSpec::Count(count) => (0..*count).map(Value::from).collect(),
            SeedSpec::List(values) => values.clone(),
        }
    }
}

/// YAML-configurable settings of the explicit sweeper.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Registry name of the sweeper implementation.
    #[serde(rename = "_target_", default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Parameter mappings, one job (per seed) each.
    #[serde(default)]
    pub combinations: Vec<Combination>,
    /// Optional seed replication.
    #[serde(default)]
    pub seeds: Option<SeedSpec>,
    /// Parameter name the seed is written to; empty or absent means `seed`.
    #[serde(default)]
    pub seed_key: Option<String>,
    /// Accepted for compatibility with grid sweeper configs; ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_batch_size: Option<usize>,
    /// Accepted for compatibility with grid sweeper configs; ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<IndexMap<String, Value>>,
}

impl SweeperConfig {
    /// Parses a standalone sweeper YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, SweepError> {
        from_yaml_str(text)
    }

    /// Reads the sweeper settings from an already composed section.
    pub fn from_section(section: &Value) -> Result<Self, SweepError> {
        serde_json::from_value(section.clone()).map_err(|err| {
            SweepError::Serde(
                ErrorInfo::new("xsweep.config.sweeper_section", err.to_string())
                    .with_context("section", SWEEPER_SECTION),
            )
        })
    }

    /// Effective seed key.
    pub fn seed_key(&self) -> &str {
        match self.seed_key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => DEFAULT_SEED_KEY,
        }
    }

    /// Seeds to expand over; `None` when no seed expansion applies.
    pub fn resolved_seeds(&self) -> Option<Vec<Value>> {
        self.seeds
            .as_ref()
            .map(SeedSpec::resolve)
            .filter(|seeds| !seeds.is_empty())
    }

    /// Fails when no combination is defined.
    pub fn validate(&self) -> Result<(), SweepError> {
        if self.combinations.is_empty() {
            return Err(empty_combinations());
        }
        Ok(())
    }
}

pub(crate) fn empty_combinations() -> SweepError {
    SweepError::Config(
        ErrorInfo::new(
            "xsweep.config.empty_combinations",
            "no combinations defined, nothing to run",
        )
        .with_context("section", SWEEPER_SECTION)
        .with_hint("list at least one mapping under sweeper.combinations"),
    )
}
