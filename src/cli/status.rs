//! Show the artifact builds in a state file.
//!
//! ```text
//! NAME                          GAV                   STATE        SCM
//! bar.1.2.3-1a2b3c4d            org.foo:bar:1.2.3     Building     https://example/repo@v1
//! ```

use anyhow::{Context, Result};
use clap::Args;
use colored::{ColoredString, Colorize};
use serde::Serialize;
use std::path::PathBuf;

use super::CliConfig;
use crate::models::{ArtifactBuild, ArtifactBuildState, Resource};
use crate::store::{InMemoryStore, LabelSelector, ObjectStore, StoreSnapshot};

#[derive(Debug, Args)]
pub struct StatusCommand {
    /// State file to read.
    #[arg(value_name = "STATE")]
    pub state: PathBuf,

    /// Namespace to show (defaults to the configured namespace).
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct StatusRow {
    name: String,
    gav: String,
    state: String,
    scm: Option<String>,
    message: Option<String>,
}

impl StatusRow {
    fn from_artifact_build(abr: &ArtifactBuild) -> Self {
        let scm_info = &abr.status.scm_info;
        let scm = if scm_info.is_empty() {
            None
        } else if scm_info.path.is_empty() {
            Some(format!("{}@{}", scm_info.scm_url, scm_info.tag))
        } else {
            Some(format!("{}@{} ({})", scm_info.scm_url, scm_info.tag, scm_info.path))
        };
        Self {
            name: abr.name().to_string(),
            gav: abr.gav().to_string(),
            state: abr.state().to_string(),
            scm,
            message: abr.status.message.clone(),
        }
    }
}

impl StatusCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let namespace = config.namespace(self.namespace).await?;
        let snapshot = StoreSnapshot::load(&self.state)
            .await
            .with_context(|| format!("Failed to load state file {}", self.state.display()))?;
        let store = InMemoryStore::from_snapshot(&snapshot)?;
        let builds: Vec<ArtifactBuild> =
            store.list(&namespace, &LabelSelector::everything()).await?;

        if self.json {
            let rows: Vec<StatusRow> = builds.iter().map(StatusRow::from_artifact_build).collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
            return Ok(());
        }

        if builds.is_empty() {
            println!("No artifact builds in namespace '{namespace}'");
            return Ok(());
        }

        // Pad before colouring; escape codes would count towards the width.
        println!(
            "{} {} {} {}",
            format!("{:<40}", "NAME").bold(),
            format!("{:<40}", "GAV").bold(),
            format!("{:<12}", "STATE").bold(),
            "SCM".bold()
        );
        for abr in &builds {
            let row = StatusRow::from_artifact_build(abr);
            println!(
                "{:<40} {:<40} {} {}",
                row.name,
                row.gav,
                colored_state(abr.state(), &format!("{:<12}", row.state)),
                row.scm.as_deref().unwrap_or("-")
            );
        }
        Ok(())
    }
}

fn colored_state(state: &ArtifactBuildState, padded: &str) -> ColoredString {
    match state {
        ArtifactBuildState::Complete => padded.green(),
        ArtifactBuildState::Failed | ArtifactBuildState::Missing => padded.red(),
        ArtifactBuildState::Unknown(_) => padded.yellow(),
        _ => padded.normal(),
    }
}
