//! Show the source identity of an SCM location.

use anyhow::{Result, bail};
use clap::Args;

use crate::naming::source_identity;

#[derive(Debug, Args)]
pub struct SourceIdCommand {
    /// Repository URL.
    #[arg(long)]
    pub url: String,

    /// Tag or commit.
    #[arg(long)]
    pub tag: String,

    /// Build context path inside the repository.
    #[arg(long, default_value = "")]
    pub path: String,
}

impl SourceIdCommand {
    pub fn execute(self) -> Result<()> {
        if self.url.is_empty() {
            bail!("--url must not be empty");
        }
        println!("{}", source_identity(&self.url, &self.tag, &self.path));
        Ok(())
    }
}
