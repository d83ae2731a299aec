//! Benchmark run orchestration
//!
//! A run invokes the load generator once, loads the result cache, prints one
//! report per benchmark name and optionally records the new result.

use httpbench_common::MetricsRecord;
use serde::{Deserialize, Serialize};

pub mod runner;

pub use runner::BenchmarkRunner;

/// Per-invocation options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOptions {
    /// Benchmark name the new result belongs to
    pub active_name: String,
    /// Record the new result in the cache after reporting
    pub persist: bool,
}

impl RunOptions {
    pub fn new(active_name: impl Into<String>, persist: bool) -> Self {
        Self {
            active_name: active_name.into(),
            persist,
        }
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Metrics collected by this run
    pub current: MetricsRecord,
    /// Number of report sections written, including error sections
    pub reports_rendered: usize,
    /// Entries that could not be reported, with the reason
    pub entry_errors: Vec<String>,
    /// Why writing the report stopped early, if it did
    pub output_error: Option<String>,
    /// Whether the cache was written
    pub saved: bool,
    /// Why the cache could not be written, if persistence was requested and failed
    pub save_error: Option<String>,
}

impl RunSummary {
    /// True when nothing went wrong after the load test itself
    pub fn is_clean(&self) -> bool {
        self.entry_errors.is_empty() && self.output_error.is_none() && self.save_error.is_none()
    }
}
