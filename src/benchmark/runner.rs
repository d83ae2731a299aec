//! Benchmark Runner
//!
//! Drives a single harness invocation: load test, normalization, cache load,
//! reporting and the optional cache update, strictly in that order.

use super::{RunOptions, RunSummary};
use httpbench_benchmarks::cache::{self, CacheContents, ResultCache};
use httpbench_benchmarks::report::{render_entry_error, render_report, ReportMode};
use httpbench_benchmarks::{metrics, HarnessConfig, LoadGenerator};
use httpbench_common::{HarnessError, MetricsRecord, Result};
use std::collections::BTreeSet;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Main benchmark runner that coordinates a harness invocation
pub struct BenchmarkRunner {
    config: HarnessConfig,
    generator: Arc<dyn LoadGenerator>,
    cache: ResultCache,
}

impl BenchmarkRunner {
    pub fn new(config: HarnessConfig, generator: Arc<dyn LoadGenerator>) -> Self {
        let cache = ResultCache::new(config.cache_path.clone());
        Self {
            config,
            generator,
            cache,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Run the load test and write one report per benchmark name to `out`.
    ///
    /// Generator, normalization and cache load failures abort before anything
    /// is written. Failures to write the report or to save the cache are
    /// returned in the summary instead; a broken output does not cancel the
    /// save.
    pub async fn run(&self, options: &RunOptions, out: &mut dyn Write) -> Result<RunSummary> {
        if options.active_name.trim().is_empty() {
            return Err(HarnessError::Config("benchmark name must not be empty".to_string()));
        }
        self.config.validate()?;

        let start = Instant::now();
        info!("Starting benchmark '{}' with {}", options.active_name, self.generator.name());
        let raw = self.generator.run(&self.config.load).await?;
        let current = metrics::normalize(&raw)?;
        info!(
            "Load test finished in {:.2}s: {}",
            start.elapsed().as_secs_f64(),
            current
        );

        let mut contents = self.cache.load().await?;
        debug!("Cache holds {} entries", contents.len());

        let rendered = render_all(&contents, Some((options.active_name.as_str(), &current)), out);

        let mut summary = RunSummary {
            current: current.clone(),
            reports_rendered: rendered.count,
            entry_errors: rendered.entry_errors,
            output_error: rendered.write_error.map(|e| e.to_string()),
            saved: false,
            save_error: None,
        };

        if options.persist {
            cache::upsert(&mut contents, &options.active_name, current);
            match self.cache.save(&contents).await {
                Ok(()) => summary.saved = true,
                Err(e) => {
                    error!("Failed to save results to {}: {}", self.cache.path().display(), e);
                    summary.save_error = Some(e.to_string());
                }
            }
        } else {
            debug!("Persistence not requested, cache left unchanged");
        }

        Ok(summary)
    }

    /// Write a report for every cached entry without running a load test
    pub async fn show_cached(&self, out: &mut dyn Write) -> Result<(usize, Vec<String>)> {
        let contents = self.cache.load().await?;
        if contents.is_empty() {
            info!("No cached results in {}", self.cache.path().display());
        }
        let rendered = render_all(&contents, None, out);
        match rendered.write_error {
            Some(e) => Err(HarnessError::Io(e)),
            None => Ok((rendered.count, rendered.entry_errors)),
        }
    }
}

struct Rendered {
    count: usize,
    entry_errors: Vec<String>,
    write_error: Option<std::io::Error>,
}

/// Render reports for every cached name plus the active one, in name order.
///
/// Entries that cannot be decoded get an inline error section and do not stop
/// the remaining reports. Writing stops at the first output error.
fn render_all(
    contents: &CacheContents,
    active: Option<(&str, &MetricsRecord)>,
    out: &mut dyn Write,
) -> Rendered {
    let mut names: BTreeSet<&str> = contents.keys().map(String::as_str).collect();
    if let Some((active_name, _)) = active {
        names.insert(active_name);
    }

    let mut rendered = 0;
    let mut entry_errors = Vec::new();

    for name in names {
        let section = match active {
            Some((active_name, current)) if active_name == name => {
                let previous = match contents.get(name).map(|entry| entry.record(name)) {
                    Some(Ok(record)) => Some(record),
                    Some(Err(e)) => {
                        warn!("Ignoring previous result for '{}': {}", name, e);
                        entry_errors.push(e.to_string());
                        None
                    }
                    None => None,
                };
                render_report(name, ReportMode::Active, previous, current)
            }
            _ => match contents[name].record(name) {
                Ok(record) => render_report(name, ReportMode::Historical, None, record),
                Err(e) => {
                    warn!("Skipping cache entry '{}': {}", name, e);
                    entry_errors.push(e.to_string());
                    render_entry_error(name, &e)
                }
            },
        };

        if let Err(e) = writeln!(out, "{}", section) {
            error!("Failed to write report for '{}': {}", name, e);
            return Rendered { count: rendered, entry_errors, write_error: Some(e) };
        }
        rendered += 1;
    }

    let write_error = out.flush().err();
    if let Some(e) = &write_error {
        error!("Failed to flush reports: {}", e);
    }
    Rendered { count: rendered, entry_errors, write_error }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use httpbench_benchmarks::LoadProfile;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct FixedGenerator {
        output: String,
        calls: AtomicUsize,
    }

    impl FixedGenerator {
        fn new(output: &str) -> Arc<Self> {
            Arc::new(Self { output: output.to_string(), calls: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl LoadGenerator for FixedGenerator {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn run(&self, _profile: &LoadProfile) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.output.clone())
        }
    }

    const REPORT: &str = r#"{"transfer": {"total": 1048576, "rate": 1048576},
        "requests": {"total": 1000, "avg": 33.3},
        "latencies": {"min": 1, "max": 50, "avg": 10, "stdev": 5}}"#;

    fn runner(dir: &std::path::Path, generator: Arc<dyn LoadGenerator>) -> BenchmarkRunner {
        let config = HarnessConfig {
            cache_path: dir.join("cache.json"),
            ..Default::default()
        };
        BenchmarkRunner::new(config, generator)
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let dir = tempdir().unwrap();
        let generator = FixedGenerator::new(REPORT);
        let runner = runner(dir.path(), generator.clone());

        let mut out = Vec::new();
        let err = runner.run(&RunOptions::new(" ", true), &mut out).await.unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_without_persist_leaves_cache_alone() {
        let dir = tempdir().unwrap();
        let runner = runner(dir.path(), FixedGenerator::new(REPORT));

        let mut out = Vec::new();
        let summary = runner.run(&RunOptions::new("hyper", false), &mut out).await.unwrap();
        assert_eq!(summary.reports_rendered, 1);
        assert!(!summary.saved);
        assert!(!dir.path().join("cache.json").exists());
    }

    #[tokio::test]
    async fn test_parse_failure_aborts() {
        let dir = tempdir().unwrap();
        let runner = runner(dir.path(), FixedGenerator::new("not json"));

        let mut out = Vec::new();
        let err = runner.run(&RunOptions::new("hyper", true), &mut out).await.unwrap_err();
        assert!(matches!(err, HarnessError::Parse(_)));
        assert!(out.is_empty());
        assert!(!dir.path().join("cache.json").exists());
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_output_failure_still_saves() {
        let dir = tempdir().unwrap();
        let runner = runner(dir.path(), FixedGenerator::new(REPORT));

        let summary = runner.run(&RunOptions::new("hyper", true), &mut ClosedPipe).await.unwrap();
        assert_eq!(summary.reports_rendered, 0);
        assert!(summary.output_error.is_some());
        assert!(summary.saved);
        assert!(!summary.is_clean());

        let contents = runner.cache().load().await.unwrap();
        assert!(contents["hyper"].record("hyper").is_ok());
    }

    #[tokio::test]
    async fn test_show_cached_output_failure_is_error() {
        let dir = tempdir().unwrap();
        let runner = runner(dir.path(), FixedGenerator::new(REPORT));
        runner.run(&RunOptions::new("hyper", true), &mut Vec::new()).await.unwrap();

        let err = runner.show_cached(&mut ClosedPipe).await.unwrap_err();
        assert!(matches!(err, HarnessError::Io(_)));
    }

    #[tokio::test]
    async fn test_show_cached_lists_entries() {
        let dir = tempdir().unwrap();
        let runner = runner(dir.path(), FixedGenerator::new(REPORT));

        let mut out = Vec::new();
        runner.run(&RunOptions::new("hyper", true), &mut out).await.unwrap();

        let mut shown = Vec::new();
        let (rendered, errors) = runner.show_cached(&mut shown).await.unwrap();
        assert_eq!(rendered, 1);
        assert!(errors.is_empty());
        let text = String::from_utf8(shown).unwrap();
        assert!(text.starts_with("### hyper\n"));
        assert!(text.contains("Value"));
    }
}
