use std::path::PathBuf;
use thiserror::Error;

/// Main error type for httpbench
#[derive(Error, Debug)]
pub enum HarnessError {
    /// The load generator could not be started, exited non-zero, or wrote to stderr
    #[error("Load generator invocation failed: {0}")]
    Invocation(String),

    /// The load generator output was not a usable report
    #[error("Failed to parse load generator output: {0}")]
    Parse(String),

    /// The cache file exists but cannot be read as a mapping
    #[error("Cache file {} is corrupt: {reason}", .path.display())]
    CacheCorrupt { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A single cache entry could not be decoded as a metrics record
    #[error("Malformed cache entry '{name}': {reason}")]
    MalformedEntry { name: String, reason: String },
}

impl HarnessError {
    /// Whether the error must stop the whole run
    pub fn is_fatal(&self) -> bool {
        !matches!(self, HarnessError::MalformedEntry { .. })
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_corrupt_names_path() {
        let err = HarnessError::CacheCorrupt {
            path: PathBuf::from("/tmp/cache.json"),
            reason: "expected value at line 1 column 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cache file /tmp/cache.json is corrupt: expected value at line 1 column 1"
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_malformed_entry_is_not_fatal() {
        let err = HarnessError::MalformedEntry {
            name: "node".to_string(),
            reason: "invalid type".to_string(),
        };
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: HarnessError = io.into();
        assert!(matches!(err, HarnessError::Io(_)));
        assert_eq!(err.to_string(), "IO error: denied");
    }
}
