//! `jbs` - operator CLI for the JVM build service controller
//!
//! ```bash
//! jbs request state.yaml org.foo:bar:1.2.3
//! jbs reconcile state.yaml
//! jbs status state.yaml
//! ```

use anyhow::Result;
use clap::Parser;
use jbs_controller::cli;
use jbs_controller::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            user_friendly_error(e).display();
            std::process::exit(1);
        }
    }
}
