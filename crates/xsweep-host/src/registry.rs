use std::collections::BTreeMap;

use serde_json::Value;
use xsweep_core::{ErrorInfo, SweepError, Sweeper};
use xsweep_exp::{ExplicitSweeper, SWEEPER_SECTION};

use crate::compose::DEFAULT_SWEEPER;

/// Constructor for a sweeper implementation.
pub type SweeperFactory = fn() -> Box<dyn Sweeper>;

const TARGET_KEY: &str = "_target_";

fn explicit_sweeper() -> Box<dyn Sweeper> {
    Box::new(ExplicitSweeper::default())
}

/// Sweeper implementations registered by direct reference, keyed by the
/// `_target_` name used in configs.
#[derive(Debug, Clone, Default)]
pub struct SweeperRegistry {
    factories: BTreeMap<String, SweeperFactory>,
}

impl SweeperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the sweepers shipped with this workspace.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry
            .factories
            .insert(DEFAULT_SWEEPER.to_string(), explicit_sweeper);
        registry
            .factories
            .insert("xsweep_exp.ExplicitSweeper".to_string(), explicit_sweeper);
        registry
    }

    pub fn register(&mut self, name: &str, factory: SweeperFactory) -> Result<(), SweepError> {
        if self.factories.contains_key(name) {
            return Err(SweepError::Registry(
                ErrorInfo::new(
                    "xsweep.registry.duplicate",
                    format!("sweeper {name} already registered"),
                )
                .with_context("name", name),
            ));
        }
        self.factories.insert(name.to_string(), factory);
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn instantiate(&self, target: &str) -> Result<Box<dyn Sweeper>, SweepError> {
        let factory = self.factories.get(target).ok_or_else(|| {
            SweepError::Registry(
                ErrorInfo::new(
                    "xsweep.registry.unknown_sweeper",
                    format!("no sweeper registered as {target}"),
                )
                .with_context("target", target)
                .with_hint(format!(
                    "registered sweepers: {}",
                    self.names().collect::<Vec<_>>().join(", ")
                )),
            )
        })?;
        Ok(factory())
    }

    /// Instantiates the sweeper named by `sweeper._target_` in a composed
    /// config, falling back to the explicit sweeper.
    pub fn instantiate_from_config(&self, config: &Value) -> Result<Box<dyn Sweeper>, SweepError> {
        let target = config
            .get(SWEEPER_SECTION)
            .and_then(|section| section.get(TARGET_KEY))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_SWEEPER);
        self.instantiate(target)
    }
}
