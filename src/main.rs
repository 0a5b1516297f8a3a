#![allow(dead_code, unused_imports)]

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::time::Duration;

mod browser;
mod cli;
mod engine;
mod error;
mod orchestrator;
mod report;
mod rest;
mod store;

#[derive(Parser)]
#[command(
    name = "a11y-audit",
    about = "Accessibility audit service — run axe-core against live pages via headless Chromium",
    version
)]
struct Cli {
    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the audit HTTP service
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "3000")]
        port: u16,
        /// Report retention window in seconds
        #[arg(long, default_value = "3600")]
        retention_secs: u64,
        /// Page navigation timeout in milliseconds
        #[arg(long, default_value = "30000")]
        nav_timeout_ms: u64,
        /// Override the axe-core script URL (offline mirrors)
        #[arg(long)]
        axe_source: Option<String>,
    },
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!("a11y_audit={default_level}"))
            }),
        )
        .init();

    match cli.command {
        Commands::Serve {
            port,
            retention_secs,
            nav_timeout_ms,
            axe_source,
        } => {
            cli::serve::run(cli::serve::ServeOptions {
                port,
                retention: Duration::from_secs(retention_secs),
                nav_timeout: Duration::from_millis(nav_timeout_ms),
                axe_source,
            })
            .await
        }
        Commands::Doctor => cli::doctor::run().await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "a11y-audit", &mut std::io::stdout());
            Ok(())
        }
    }
}
