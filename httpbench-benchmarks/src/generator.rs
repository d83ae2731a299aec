//! Driving the external load generator

use crate::config::{GeneratorConfig, LoadProfile};
use async_trait::async_trait;
use httpbench_common::{HarnessError, Result};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Something that can put load on a server and report on it
#[async_trait]
pub trait LoadGenerator: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Run one load test and return the raw report printed by the tool.
    ///
    /// Blocks for the whole duration of the profile.
    async fn run(&self, profile: &LoadProfile) -> Result<String>;
}

/// Load generator spawned as a child process
pub struct CommandLoadGenerator {
    config: GeneratorConfig,
}

impl CommandLoadGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Expand the argument template for a profile
    pub fn build_args(&self, profile: &LoadProfile) -> Vec<String> {
        self.config
            .args
            .iter()
            .map(|arg| {
                arg.replace("{threads}", &profile.threads.to_string())
                    .replace("{connections}", &profile.connections.to_string())
                    .replace("{duration}", &profile.duration_seconds.to_string())
                    .replace("{url}", &profile.target_url)
            })
            .collect()
    }
}

#[async_trait]
impl LoadGenerator for CommandLoadGenerator {
    fn name(&self) -> &str {
        &self.config.program
    }

    async fn run(&self, profile: &LoadProfile) -> Result<String> {
        let args = self.build_args(profile);
        info!(
            "Running {} against {} ({} threads, {} connections, {}s)",
            self.config.program,
            profile.target_url,
            profile.threads,
            profile.connections,
            profile.duration_seconds
        );
        debug!("{} {}", self.config.program, args.join(" "));

        let output = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                HarnessError::Invocation(format!("failed to start {}: {}", self.config.program, e))
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(HarnessError::Invocation(format!(
                "{} exited with {}: {}",
                self.config.program,
                output.status,
                stderr.trim()
            )));
        }
        if !stderr.trim().is_empty() {
            return Err(HarnessError::Invocation(format!(
                "{} wrote to stderr: {}",
                self.config.program,
                stderr.trim()
            )));
        }

        String::from_utf8(output.stdout).map_err(|e| {
            HarnessError::Parse(format!("{} output is not valid UTF-8: {}", self.config.program, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str) -> CommandLoadGenerator {
        CommandLoadGenerator::new(GeneratorConfig {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
        })
    }

    #[test]
    fn test_build_args_default_template() {
        let generator = CommandLoadGenerator::new(GeneratorConfig::default());
        let profile = LoadProfile {
            threads: 2,
            connections: 32,
            duration_seconds: 15,
            target_url: "http://127.0.0.1:8080".to_string(),
        };
        assert_eq!(
            generator.build_args(&profile),
            vec!["-t", "2", "-c", "32", "-d", "15s", "-h", "http://127.0.0.1:8080", "--json"]
        );
    }

    #[tokio::test]
    async fn test_stdout_is_returned() {
        let output = shell("echo '{\"ok\": true}'").run(&LoadProfile::default()).await.unwrap();
        assert_eq!(output.trim(), "{\"ok\": true}");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_invocation_error() {
        let err = shell("exit 3").run(&LoadProfile::default()).await.unwrap_err();
        assert!(matches!(err, HarnessError::Invocation(_)));
    }

    #[tokio::test]
    async fn test_stderr_output_is_invocation_error() {
        let err = shell("echo '{}'; echo 'connection refused' >&2")
            .run(&LoadProfile::default())
            .await
            .unwrap_err();
        match err {
            HarnessError::Invocation(message) => assert!(message.contains("connection refused")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_invocation_error() {
        let generator = CommandLoadGenerator::new(GeneratorConfig {
            program: "httpbench-no-such-generator".to_string(),
            args: vec![],
        });
        let err = generator.run(&LoadProfile::default()).await.unwrap_err();
        assert!(matches!(err, HarnessError::Invocation(_)));
    }
}
