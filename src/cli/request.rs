//! Add artifact build requests to a state file.
//!
//! Each GAV becomes an `ArtifactBuild` in state `New`, named with
//! `generate_resource_name`. Requesting a GAV that already has an artifact
//! build leaves the existing one untouched, so the command can be re-run.

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use tracing::debug;

use super::CliConfig;
use crate::core::JbsError;
use crate::models::{ArtifactBuild, Resource};
use crate::store::{InMemoryStore, ObjectStore, StoreSnapshot};

#[derive(Debug, Args)]
pub struct RequestCommand {
    /// State file, created if it does not exist.
    #[arg(value_name = "STATE")]
    pub state: PathBuf,

    /// GAV coordinates to request.
    #[arg(value_name = "GAV", required = true)]
    pub gavs: Vec<String>,

    /// Namespace for the requests (defaults to the configured namespace).
    #[arg(short, long)]
    pub namespace: Option<String>,
}

impl RequestCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        if self.gavs.iter().any(|gav| gav.trim().is_empty()) {
            bail!("GAV coordinates must not be empty");
        }
        let namespace = config.namespace(self.namespace).await?;

        let snapshot = StoreSnapshot::load_or_default(&self.state)
            .await
            .with_context(|| format!("Failed to load state file {}", self.state.display()))?;
        let store = InMemoryStore::from_snapshot(&snapshot)?;

        for gav in &self.gavs {
            match store.create(&ArtifactBuild::new(namespace.as_str(), gav.as_str())).await {
                Ok(created) => {
                    println!("{} {} ({})", "Requested".green(), created.name().bold(), gav);
                }
                Err(JbsError::AlreadyExists {
                    name,
                    ..
                }) => {
                    debug!(gav = %gav, name = %name, "request already present");
                    println!("{} {} ({})", "Exists".yellow(), name.bold(), gav);
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to request {gav}"));
                }
            }
        }

        store
            .snapshot()?
            .save(&self.state)
            .await
            .with_context(|| format!("Failed to write state file {}", self.state.display()))?;
        Ok(())
    }
}
