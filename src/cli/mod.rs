//! Command-line interface for the build controller.
//!
//! The `jbs` binary runs the reconciler offline against a YAML state file,
//! which makes it possible to drive and inspect the whole request lifecycle
//! without a cluster.
//!
//! # Available Commands
//!
//! ## Naming
//! - `name` - Show the object name and coordinate key derived from a GAV
//! - `source-id` - Show the source identity of an SCM location
//!
//! ## State files
//! - `request` - Add artifact build requests to a state file
//! - `reconcile` - Run the controller over a state file until it settles
//! - `status` - Show the artifact builds in a state file
//!
//! # Basic Workflow
//!
//! ```bash
//! jbs request state.yaml org.foo:bar:1.2.3
//! jbs reconcile state.yaml      # creates the discovery task
//! # ...fill in the discovery task results...
//! jbs reconcile state.yaml      # creates or joins a dependency build
//! jbs status state.yaml
//! ```
//!
//! # Global Options
//!
//! - `--verbose` - Debug logging
//! - `--quiet` - Errors only
//! - `--config` - Path to the controller config file (also `JBS_CONFIG`)

mod name;
mod reconcile;
mod request;
mod source_id;
mod status;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::ControllerConfig;

/// Runtime configuration for CLI execution.
///
/// Built from the global flags by [`Cli::build_config`]; tests can construct
/// one directly and pass it to [`Cli::execute_with_config`].
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter directive. `None` means `RUST_LOG`, falling back to `info`.
    pub log_level: Option<String>,

    /// Controller config file overriding `~/.jbs/config.toml`.
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the stderr `tracing` subscriber.
    ///
    /// A subscriber that is already installed is left in place.
    pub fn init_logging(&self) {
        let filter = match &self.log_level {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// Load the controller config this invocation points at.
    pub async fn load_controller_config(&self) -> Result<ControllerConfig> {
        ControllerConfig::load_with_optional(self.config_path.clone()).await
    }

    /// `explicit` if given, otherwise the configured namespace.
    pub async fn namespace(&self, explicit: Option<String>) -> Result<String> {
        match explicit {
            Some(namespace) => Ok(namespace),
            None => Ok(self.load_controller_config().await?.namespace),
        }
    }
}

/// Main CLI structure for `jbs`.
#[derive(Parser)]
#[command(
    name = "jbs",
    about = "JVM build service controller - reconcile artifact build requests",
    version,
    author,
    long_about = "jbs resolves artifact build requests to source repositories, shares one dependency build per source location, and tracks contamination between builds."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    ///
    /// Equivalent to `RUST_LOG=debug`. Mutually exclusive with `--quiet`.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the controller config file.
    ///
    /// Defaults to `~/.jbs/config.toml`; a missing default file means all
    /// defaults, a missing explicit file is an error.
    #[arg(short, long, global = true, env = "JBS_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the object name and coordinate key derived from GAVs.
    Name(name::NameCommand),

    /// Show the source identity hash of an SCM location.
    SourceId(source_id::SourceIdCommand),

    /// Add artifact build requests to a state file.
    Request(request::RequestCommand),

    /// Reconcile a state file until it stops changing.
    Reconcile(reconcile::ReconcileCommand),

    /// Show the artifact builds in a state file.
    Status(status::StatusCommand),
}

impl Cli {
    /// Execute the CLI with configuration built from the global flags.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Translate the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            config_path: self.config.clone(),
        }
    }

    /// Execute the CLI with an explicit configuration.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();

        match self.command {
            Commands::Name(cmd) => cmd.execute(),
            Commands::SourceId(cmd) => cmd.execute(),
            Commands::Request(cmd) => cmd.execute(&config).await,
            Commands::Reconcile(cmd) => cmd.execute(&config).await,
            Commands::Status(cmd) => cmd.execute(&config).await,
        }
    }
}
