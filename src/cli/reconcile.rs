//! Reconcile a state file until it settles.
//!
//! Loads the state file into an in-memory store, runs the controller until a
//! round changes nothing (or the round limit is hit) and writes the result
//! back. Events recorded along the way are printed after the summary.
//!
//! Discovery tasks are not executed: their results have to be filled in by
//! hand (or by a test) between runs, just as a task runner would.

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

use super::CliConfig;
use crate::controller::{Controller, RunSummary};
use crate::store::{Event, EventType, InMemoryStore, RecordingRecorder, StoreSnapshot};

#[derive(Debug, Args)]
pub struct ReconcileCommand {
    /// State file to reconcile.
    #[arg(value_name = "STATE")]
    pub state: PathBuf,

    /// Namespace to reconcile (defaults to the configured namespace).
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Round limit (defaults to the configured `max_rounds`).
    #[arg(long, value_name = "NUMBER")]
    pub max_rounds: Option<usize>,

    /// Write the result here instead of back to STATE.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl ReconcileCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let mut controller_config = config.load_controller_config().await?;
        if let Some(namespace) = self.namespace {
            controller_config.namespace = namespace;
        }
        if let Some(max_rounds) = self.max_rounds {
            controller_config.max_rounds = max_rounds;
        }
        controller_config.validate()?;

        let snapshot = StoreSnapshot::load(&self.state)
            .await
            .with_context(|| format!("Failed to load state file {}", self.state.display()))?;
        let store = Arc::new(InMemoryStore::from_snapshot(&snapshot)?);
        let recorder = Arc::new(RecordingRecorder::new());

        let controller = Controller::new(store.clone(), recorder.clone(), &controller_config);
        let summary = controller.run_until_settled(&controller_config.namespace).await?;

        print_summary(&controller_config.namespace, &summary);
        print_events(&recorder.events());

        let output = self.output.as_ref().unwrap_or(&self.state);
        store
            .snapshot()?
            .save(output)
            .await
            .with_context(|| format!("Failed to write state file {}", output.display()))?;

        if !summary.failures.is_empty() {
            bail!("{} artifact build(s) failed to reconcile", summary.failures.len());
        }
        Ok(())
    }
}

fn print_summary(namespace: &str, summary: &RunSummary) {
    let outcome = if summary.settled {
        "settled".green()
    } else {
        "not settled".yellow()
    };
    println!(
        "Reconciled namespace '{}': {} after {} round(s), {} reconcile(s)",
        namespace.bold(),
        outcome,
        summary.rounds,
        summary.reconciles
    );

    for requeue in &summary.requeues {
        println!("  {} {} after {}s", "Requeue".yellow(), requeue.key, requeue.after.as_secs());
    }
    for failure in &summary.failures {
        println!("  {} {}: {}", "Failed".red(), failure.key, failure.error);
    }
}

fn print_events(events: &[Event]) {
    if events.is_empty() {
        return;
    }
    println!("\nEvents:");
    for event in events {
        let event_type = match event.event_type {
            EventType::Normal => event.event_type.to_string().normal(),
            EventType::Warning => event.event_type.to_string().yellow(),
        };
        println!(
            "  {} {} {}/{}: {}",
            event_type,
            event.reason.bold(),
            event.namespace,
            event.name,
            event.message
        );
    }
}
