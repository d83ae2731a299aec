//! Configuration management for httpbench runs

use httpbench_common::{HarnessError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variables consulted by [`HarnessConfig::apply_env_overrides`]
pub const ENV_THREADS: &str = "HTTPBENCH_THREADS";
pub const ENV_CONNECTIONS: &str = "HTTPBENCH_CONNECTIONS";
pub const ENV_DURATION: &str = "HTTPBENCH_DURATION";
pub const ENV_URL: &str = "HTTPBENCH_URL";
pub const ENV_CACHE: &str = "HTTPBENCH_CACHE";
pub const ENV_GENERATOR: &str = "HTTPBENCH_GENERATOR";

/// Shape of the load applied to the server under test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadProfile {
    /// Load generator worker threads
    pub threads: u32,
    /// Concurrent connections held open
    pub connections: u32,
    /// Length of the run in seconds
    pub duration_seconds: u64,
    /// Endpoint the server under test listens on
    pub target_url: String,
}

impl Default for LoadProfile {
    fn default() -> Self {
        Self {
            threads: 4,
            connections: 64,
            duration_seconds: 30,
            target_url: "http://127.0.0.1:3000".to_string(),
        }
    }
}

/// External load generator command line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Program to execute, looked up on `PATH`
    pub program: String,
    /// Argument template; `{threads}`, `{connections}`, `{duration}` and `{url}` are substituted
    pub args: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            program: "rewrk".to_string(),
            args: ["-t", "{threads}", "-c", "{connections}", "-d", "{duration}s", "-h", "{url}", "--json"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Complete harness configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// JSON file holding the latest result per benchmark name
    pub cache_path: PathBuf,
    pub load: LoadProfile,
    pub generator: GeneratorConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from("benchmark-cache.json"),
            load: LoadProfile::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HarnessError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            HarnessError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content = self.to_toml()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| HarnessError::Config(format!("Failed to serialize configuration: {}", e)))
    }

    /// Override settings from `HTTPBENCH_*` process environment variables
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Override settings from an arbitrary variable lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_THREADS) {
            self.load.threads = parse_var(ENV_THREADS, &value)?;
        }
        if let Some(value) = lookup(ENV_CONNECTIONS) {
            self.load.connections = parse_var(ENV_CONNECTIONS, &value)?;
        }
        if let Some(value) = lookup(ENV_DURATION) {
            self.load.duration_seconds = parse_var(ENV_DURATION, &value)?;
        }
        if let Some(value) = lookup(ENV_URL) {
            self.load.target_url = value;
        }
        if let Some(value) = lookup(ENV_CACHE) {
            self.cache_path = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_GENERATOR) {
            self.generator.program = value;
        }
        Ok(())
    }

    /// Reject profiles the load generator cannot run
    pub fn validate(&self) -> Result<()> {
        let load = &self.load;
        if load.threads == 0 {
            return Err(HarnessError::Config("threads must be at least 1".to_string()));
        }
        if load.connections == 0 {
            return Err(HarnessError::Config("connections must be at least 1".to_string()));
        }
        if load.connections < load.threads {
            return Err(HarnessError::Config(format!(
                "connections ({}) must not be fewer than threads ({})",
                load.connections, load.threads
            )));
        }
        if load.duration_seconds == 0 {
            return Err(HarnessError::Config("duration must be at least 1 second".to_string()));
        }
        if load.target_url.trim().is_empty() {
            return Err(HarnessError::Config("target url must not be empty".to_string()));
        }
        if self.generator.program.trim().is_empty() {
            return Err(HarnessError::Config("generator program must not be empty".to_string()));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| HarnessError::Config(format!("{} has an invalid value: {:?}", key, value)))
}
