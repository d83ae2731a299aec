//! Durable result cache
//!
//! The cache is a single JSON object mapping a benchmark name to the latest
//! [`MetricsRecord`] recorded for it. Every save rewrites the whole file via a
//! temporary sibling and a rename, so an interrupted write never leaves a
//! truncated cache behind.
//!
//! Concurrent invocations against the same file are not supported; there is
//! no locking and the last writer wins.

use httpbench_common::{HarnessError, MetricsRecord, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// One cache entry as found on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CachedRecord {
    Valid(MetricsRecord),
    /// Entry that does not decode as a metrics record; kept verbatim
    Malformed(Value),
}

impl CachedRecord {
    /// The decoded record, or the reason it could not be decoded
    pub fn record(&self, name: &str) -> Result<&MetricsRecord> {
        match self {
            CachedRecord::Valid(record) => record.validate().map(|_| record).map_err(|reason| {
                HarnessError::MalformedEntry { name: name.to_string(), reason }
            }),
            CachedRecord::Malformed(raw) => Err(HarnessError::MalformedEntry {
                name: name.to_string(),
                reason: malformed_reason(raw),
            }),
        }
    }
}

impl From<MetricsRecord> for CachedRecord {
    fn from(record: MetricsRecord) -> Self {
        CachedRecord::Valid(record)
    }
}

/// Cache contents keyed by benchmark name
pub type CacheContents = BTreeMap<String, CachedRecord>;

/// File-backed cache of benchmark results
#[derive(Debug, Clone)]
pub struct ResultCache {
    path: PathBuf,
}

impl ResultCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cache file.
    ///
    /// A missing file is an empty cache. A file that exists but is not a JSON
    /// object is reported as corrupt rather than treated as empty.
    pub async fn load(&self) -> Result<CacheContents> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No cache at {}, starting empty", self.path.display());
                return Ok(CacheContents::new());
            }
            Err(e) => return Err(HarnessError::Io(e)),
        };

        let value: Value = serde_json::from_str(&content).map_err(|e| HarnessError::CacheCorrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        let Value::Object(entries) = value else {
            return Err(HarnessError::CacheCorrupt {
                path: self.path.clone(),
                reason: "top level is not a JSON object".to_string(),
            });
        };

        let mut contents = CacheContents::new();
        for (name, raw) in entries {
            let entry = match serde_json::from_value::<MetricsRecord>(raw.clone()) {
                Ok(record) => CachedRecord::Valid(record),
                Err(e) => {
                    warn!("Cache entry '{}' is not a metrics record: {}", name, e);
                    CachedRecord::Malformed(raw)
                }
            };
            contents.insert(name, entry);
        }

        debug!("Loaded {} cache entries from {}", contents.len(), self.path.display());
        Ok(contents)
    }

    /// Write the whole mapping back, replacing the file atomically
    pub async fn save(&self, contents: &CacheContents) -> Result<()> {
        let mut serialized = serde_json::to_string_pretty(contents).map_err(|e| {
            HarnessError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        serialized.push('\n');

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let temp_path = self.temp_path();
        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp_path)
            .await?;
        file.write_all(serialized.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        if let Err(e) = fs::rename(&temp_path, &self.path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(HarnessError::Io(e));
        }

        info!("Saved {} cache entries to {}", contents.len(), self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "cache".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Insert or overwrite a single entry
pub fn upsert(contents: &mut CacheContents, name: &str, record: MetricsRecord) -> Option<CachedRecord> {
    contents.insert(name.to_string(), CachedRecord::Valid(record))
}

fn malformed_reason(raw: &Value) -> String {
    match serde_json::from_value::<MetricsRecord>(raw.clone()) {
        Err(e) => e.to_string(),
        Ok(_) => "entry is not a metrics record".to_string(),
    }
}
