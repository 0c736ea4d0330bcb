//! Controller configuration
//!
//! Settings are read from a TOML file, by default `~/.jbs/config.toml`
//! (`%LOCALAPPDATA%\jbs\config.toml` on Windows). A missing file means all
//! defaults; unknown keys are rejected so typos do not silently fall back to
//! a default.
//!
//! ```toml
//! namespace = "builds"
//! reconcile_timeout_secs = 300
//! missing_task_requeue_secs = 60
//! discovery_task_name = "lookup-artifact-location"
//! discovery_task_kind = "ClusterTask"
//! max_parallel = 10
//! max_rounds = 25
//! conflict_retries = 5
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::constants::{
    DEFAULT_CONFLICT_RETRIES, DEFAULT_DISCOVERY_TASK_KIND, DEFAULT_DISCOVERY_TASK_NAME,
    DEFAULT_MAX_PARALLEL, DEFAULT_MAX_ROUNDS, DEFAULT_NAMESPACE, default_missing_task_requeue,
    default_reconcile_timeout,
};
use crate::core::JbsError;

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_reconcile_timeout_secs() -> u64 {
    default_reconcile_timeout().as_secs()
}

fn default_missing_task_requeue_secs() -> u64 {
    default_missing_task_requeue().as_secs()
}

fn default_discovery_task_name() -> String {
    DEFAULT_DISCOVERY_TASK_NAME.to_string()
}

fn default_discovery_task_kind() -> String {
    DEFAULT_DISCOVERY_TASK_KIND.to_string()
}

const fn default_max_parallel() -> usize {
    DEFAULT_MAX_PARALLEL
}

const fn default_max_rounds() -> usize {
    DEFAULT_MAX_ROUNDS
}

const fn default_conflict_retries() -> usize {
    DEFAULT_CONFLICT_RETRIES
}

/// Settings for the reconciler and the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerConfig {
    /// Namespace used by CLI commands that are not given `--namespace`.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Budget for a single reconcile.
    #[serde(default = "default_reconcile_timeout_secs")]
    pub reconcile_timeout_secs: u64,

    /// Requeue delay for a `Discovering` build whose discovery task is not visible.
    #[serde(default = "default_missing_task_requeue_secs")]
    pub missing_task_requeue_secs: u64,

    /// Task definition run by discovery tasks.
    #[serde(default = "default_discovery_task_name")]
    pub discovery_task_name: String,

    /// Kind of the discovery task definition.
    #[serde(default = "default_discovery_task_kind")]
    pub discovery_task_kind: String,

    /// Reconciles running at once within one driver round.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// Driver rounds before giving up on convergence.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// Retries of a reconcile that failed with a retryable error.
    #[serde(default = "default_conflict_retries")]
    pub conflict_retries: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            reconcile_timeout_secs: default_reconcile_timeout_secs(),
            missing_task_requeue_secs: default_missing_task_requeue_secs(),
            discovery_task_name: default_discovery_task_name(),
            discovery_task_kind: default_discovery_task_kind(),
            max_parallel: default_max_parallel(),
            max_rounds: default_max_rounds(),
            conflict_retries: default_conflict_retries(),
        }
    }
}

impl ControllerConfig {
    /// Load from the default location, or defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined or the
    /// file exists but cannot be read, parsed or validated.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path` if given, otherwise from the default location.
    ///
    /// A file that does not exist yields the defaults; an explicit `path`
    /// that does not exist is an error.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from(&path).await;
        }
        let path = Self::default_path()?;
        if fs::try_exists(&path).await.unwrap_or(false) {
            Self::load_from(&path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load and validate a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read controller config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse controller config from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Write as TOML, creating parent directories.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize controller config")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write controller config to {}", path.display()))?;
        Ok(())
    }

    /// `~/.jbs/config.toml`, or `%LOCALAPPDATA%\jbs\config.toml` on Windows.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("jbs")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".jbs")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Check value ranges.
    pub fn validate(&self) -> std::result::Result<(), JbsError> {
        let invalid = |message: &str| -> std::result::Result<(), JbsError> {
            Err(JbsError::ConfigError {
                message: message.to_string(),
            })
        };
        if self.namespace.is_empty() {
            return invalid("namespace must not be empty");
        }
        if self.reconcile_timeout_secs == 0 {
            return invalid("reconcile_timeout_secs must be at least 1");
        }
        if self.discovery_task_name.is_empty() || self.discovery_task_kind.is_empty() {
            return invalid("discovery_task_name and discovery_task_kind must not be empty");
        }
        if self.max_parallel == 0 {
            return invalid("max_parallel must be at least 1");
        }
        if self.max_rounds == 0 {
            return invalid("max_rounds must be at least 1");
        }
        Ok(())
    }

    #[must_use]
    pub const fn reconcile_timeout(&self) -> Duration {
        Duration::from_secs(self.reconcile_timeout_secs)
    }

    #[must_use]
    pub const fn missing_task_requeue(&self) -> Duration {
        Duration::from_secs(self.missing_task_requeue_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.namespace, "default");
        assert_eq!(config.reconcile_timeout(), Duration::from_secs(300));
        assert_eq!(config.missing_task_requeue(), Duration::from_secs(60));
        assert_eq!(config.discovery_task_name, "lookup-artifact-location");
        assert_eq!(config.discovery_task_kind, "ClusterTask");
        assert_eq!(config.max_parallel, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: ControllerConfig = toml::from_str("namespace = \"builds\"\nmax_parallel = 2").unwrap();
        assert_eq!(config.namespace, "builds");
        assert_eq!(config.max_parallel, 2);
        assert_eq!(config.max_rounds, 25);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result: std::result::Result<ControllerConfig, _> = toml::from_str("namspace = \"typo\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_parallelism() {
        let config = ControllerConfig {
            max_parallel: 0,
            ..ControllerConfig::default()
        };
        assert!(matches!(config.validate(), Err(JbsError::ConfigError { .. })));
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = ControllerConfig {
            namespace: "builds".into(),
            conflict_retries: 1,
            ..ControllerConfig::default()
        };
        config.save_to(&path).await.unwrap();
        let loaded = ControllerConfig::load_from(&path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_load_from_rejects_invalid_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "max_rounds = 0\n").await.unwrap();
        let err = ControllerConfig::load_from(&path).await.unwrap_err();
        assert!(err.downcast_ref::<JbsError>().is_some());
    }

    #[tokio::test]
    async fn test_explicit_missing_path_is_an_error() {
        let dir = tempdir().unwrap();
        let result = ControllerConfig::load_with_optional(Some(dir.path().join("absent.toml"))).await;
        assert!(result.is_err());
    }
}
