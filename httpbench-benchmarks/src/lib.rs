//! httpbench benchmarking framework
//!
//! This crate provides the pieces of the HTTP server benchmark harness:
//! - Driving an external load generator (`generator`)
//! - Normalizing its report into a `MetricsRecord` (`metrics`)
//! - A durable per-benchmark result cache (`cache`)
//! - Markdown comparison reports (`report`, `utils`)

pub mod cache;
pub mod config;
pub mod generator;
pub mod metrics;
pub mod report;
pub mod utils;

pub use cache::{CacheContents, CachedRecord, ResultCache};
pub use config::{GeneratorConfig, HarnessConfig, LoadProfile};
pub use generator::{CommandLoadGenerator, LoadGenerator};
pub use report::{ComparisonRow, ReportMode, Sign};
pub use httpbench_common::{HarnessError, MetricsRecord};
