//! Unit tests for user-facing error rendering of configuration and file errors.

use anyhow::Result;
use tempfile::TempDir;

use jbs_controller::config::ControllerConfig;
use jbs_controller::core::{JbsError, user_friendly_error};
use jbs_controller::store::StoreSnapshot;

#[tokio::test]
async fn test_config_typo_gets_toml_suggestion() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("config.toml");
    tokio::fs::write(&path, "max_paralel = 4\n").await?;

    let err = ControllerConfig::load_from(&path).await.unwrap_err();
    let ctx = user_friendly_error(err);
    assert!(matches!(ctx.error, JbsError::ConfigError { .. }));
    assert!(ctx.suggestion.as_deref().unwrap_or_default().contains("TOML"));
    Ok(())
}

#[tokio::test]
async fn test_invalid_config_value_points_at_config_flag() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("config.toml");
    tokio::fs::write(&path, "max_parallel = 0\n").await?;

    let ctx = user_friendly_error(ControllerConfig::load_from(&path).await.unwrap_err());
    assert!(ctx.to_string().contains("max_parallel must be at least 1"));
    assert!(ctx.suggestion.as_deref().unwrap_or_default().contains("--config"));
    Ok(())
}

#[tokio::test]
async fn test_broken_state_file_rendering_names_file() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("state.yaml");
    tokio::fs::write(&path, "dependencyBuilds: 7\n").await?;

    let err = StoreSnapshot::load(&path).await.unwrap_err();
    let ctx = user_friendly_error(anyhow::Error::from(err));
    assert!(ctx.details.as_deref().unwrap_or_default().contains("state.yaml"));
    Ok(())
}

#[test]
fn test_missing_file_gets_path_suggestion() {
    let err = anyhow::Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))
        .context("Failed to read controller config from /nowhere/config.toml");
    let ctx = user_friendly_error(err);
    let rendered = ctx.to_string();
    assert!(rendered.contains("/nowhere/config.toml"));
    assert!(rendered.contains("gone"));
    assert!(ctx.suggestion.is_some());
}
