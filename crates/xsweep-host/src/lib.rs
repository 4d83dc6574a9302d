//! Host side of the explicit sweeper: config discovery and composition,
//! sweeper registration and job launchers.

mod compose;
mod launcher;
mod registry;
mod search_path;

pub use compose::{
    compose, deep_merge, load_primary, merge_layers, parse_defaults, DEFAULTS_KEY,
    DEFAULT_SWEEPER,
};
pub use launcher::{BasicLauncher, DryRunLauncher, LauncherConfig, LAUNCHER_SECTION, OVERRIDES_FILE};
pub use registry::{SweeperFactory, SweeperRegistry};
pub use search_path::{
    build_search_path, ConfigSearchPath, ExplicitSweeperSearchPathPlugin, SearchPathEntry,
    SearchPathPlugin, BUNDLED_PACKAGE, BUNDLED_PROVIDER,
};
