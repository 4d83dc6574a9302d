//! Explicit-combination sweeping: one job per configured mapping, optionally
//! replicated across seeds, instead of a Cartesian product of value lists.

mod config;
mod expand;
mod formatter;
mod hash;
mod serde_io;
mod sweep;

pub use config::{SeedSpec, SweeperConfig, SWEEPER_SECTION};
pub use expand::expand;
pub use formatter::{format_job, format_override};
pub use hash::stable_hash_string;
pub use serde_io::{from_json_slice, from_yaml_str, to_canonical_json_bytes, to_yaml_string};
pub use sweep::{run_sweep, ExplicitSweeper, SweepReport};
