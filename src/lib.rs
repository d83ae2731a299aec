//! httpbench - benchmark comparison harness for HTTP servers
//!
//! This is the main crate: it runs a load generator against a server that is
//! already listening, and compares the result with every previously recorded
//! benchmark.

pub use httpbench_benchmarks as benchmarks;
pub use httpbench_common as common;

pub mod benchmark;

/// Re-export common types and utilities
pub mod prelude {
    pub use crate::benchmark::{BenchmarkRunner, RunOptions, RunSummary};
    pub use crate::benchmarks::*;
    pub use crate::common::{HarnessError, MetricsRecord};
}
