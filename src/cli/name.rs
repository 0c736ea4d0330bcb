//! Show the names derived from GAV coordinates.
//!
//! ```bash
//! $ jbs name org.foo:bar:1.2.3
//! org.foo:bar:1.2.3
//!   name:           bar.1.2.3-<sha1 prefix>
//!   coordinate key: <md5>
//! ```

use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use crate::naming::{coordinate_key, generate_resource_name};

#[derive(Debug, Args)]
pub struct NameCommand {
    /// GAV coordinates (`group:artifact:version`).
    #[arg(value_name = "GAV", required = true)]
    pub gavs: Vec<String>,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct NameInfo<'a> {
    gav: &'a str,
    name: String,
    coordinate_key: String,
}

impl NameCommand {
    pub fn execute(self) -> Result<()> {
        if self.gavs.iter().any(|gav| gav.trim().is_empty()) {
            bail!("GAV coordinates must not be empty");
        }

        let infos: Vec<NameInfo<'_>> = self
            .gavs
            .iter()
            .map(|gav| NameInfo {
                gav,
                name: generate_resource_name(gav),
                coordinate_key: coordinate_key(gav),
            })
            .collect();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&infos)?);
            return Ok(());
        }

        for info in &infos {
            println!("{}", info.gav.bold());
            println!("  name:           {}", info.name.green());
            println!("  coordinate key: {}", info.coordinate_key);
        }
        Ok(())
    }
}
