//! CLI for the netqueue request engine.

mod commands;
mod output;
mod progress;

use anyhow::Result;
use clap::{Parser, Subcommand};
use netqueue_core::config;
use std::path::PathBuf;

use commands::{run_bundle, run_config, run_fetch, run_upload};

/// Top-level CLI for the netqueue request engine.
#[derive(Debug, Parser)]
#[command(name = "netqueue")]
#[command(about = "netqueue: bounded-concurrency HTTP fetch, upload and bundle cache", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download one or more URLs, at most N at a time.
    Fetch {
        /// HTTP/HTTPS URLs to download.
        #[arg(required = true)]
        urls: Vec<String>,
        /// Run up to N downloads at once (default: max_concurrent from config).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
        /// Directory for downloaded files (default: current directory).
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },

    /// POST a multipart form, reporting upload and then download progress.
    Upload {
        /// HTTP/HTTPS URL to post to.
        url: String,
        /// Text field (repeatable).
        #[arg(long = "field", value_name = "NAME=VALUE", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
        /// File part read from PATH (repeatable).
        #[arg(long = "file", value_name = "NAME=PATH", value_parser = parse_key_value)]
        files: Vec<(String, String)>,
    },

    /// Load a versioned bundle from the local cache, downloading it on a miss.
    Bundle {
        /// HTTP/HTTPS URL of the bundle.
        url: String,
        /// Bundle version; a different version replaces the cached one.
        #[arg(long)]
        version: u32,
        /// Also write the bundle bytes to FILE.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Print the config file path and the effective configuration.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Fetch { urls, jobs, out } => {
                let out_dir = match out {
                    Some(dir) => dir,
                    None => std::env::current_dir()?,
                };
                run_fetch(&cfg, &urls, jobs, &out_dir).await?;
            }
            CliCommand::Upload { url, fields, files } => {
                run_upload(&cfg, &url, &fields, &files).await?
            }
            CliCommand::Bundle { url, version, out } => {
                run_bundle(&cfg, &url, version, out.as_deref()).await?
            }
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

/// Parse `NAME=VALUE`. The value may be empty or contain further `=`.
fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{}`", s))?;
    if name.is_empty() {
        return Err(format!("empty name in `{}`", s));
    }
    Ok((name.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests;
