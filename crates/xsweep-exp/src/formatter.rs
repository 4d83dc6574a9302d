use serde_json::Value;
use xsweep_core::{render_override, JobSpec, OverrideBatch};

/// Formats a single `key=value` override.
pub fn format_override(key: &str, value: &Value) -> String {
    render_override(key, value)
}

/// Converts a job specification into its override batch, in key order.
pub fn format_job(job: &JobSpec) -> OverrideBatch {
    job.params
        .iter()
        .map(|(key, value)| format_override(key, value))
        .collect()
}
