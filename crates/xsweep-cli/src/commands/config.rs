use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use indexmap::IndexMap;
use serde_json::{json, Value};
use xsweep_exp::{SweeperConfig, SWEEPER_SECTION};
use xsweep_host::{
    build_search_path, compose, load_primary, ConfigSearchPath, ExplicitSweeperSearchPathPlugin,
};

/// Options shared by every command that composes a configuration.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Primary YAML configuration.
    #[arg(long)]
    pub config: PathBuf,
    /// Extra config directories, searched before the bundled configs.
    #[arg(long = "config-dir", value_name = "DIR")]
    pub config_dirs: Vec<PathBuf>,
    /// Sweeper option to compose instead of the one chosen by `defaults`.
    #[arg(long)]
    pub sweeper: Option<String>,
}

pub fn search_path(config_dirs: &[PathBuf]) -> ConfigSearchPath {
    build_search_path(config_dirs, &[&ExplicitSweeperSearchPathPlugin])
}

pub fn compose_config(args: &ConfigArgs) -> Result<Value, Box<dyn Error>> {
    let search_path = search_path(&args.config_dirs);
    let mut choices = IndexMap::new();
    if let Some(sweeper) = &args.sweeper {
        choices.insert(SWEEPER_SECTION.to_string(), sweeper.clone());
    }
    let primary = load_primary(&args.config)?;
    Ok(compose(primary, &search_path, &choices)?)
}

pub fn sweeper_config(config: &Value) -> Result<SweeperConfig, Box<dyn Error>> {
    let section = config.get(SWEEPER_SECTION).cloned().unwrap_or_else(|| json!({}));
    Ok(SweeperConfig::from_section(&section)?)
}

/// Task name recorded in reports: the primary config's file stem.
pub fn task_name(args: &ConfigArgs) -> String {
    args.config
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("task")
        .to_string()
}
