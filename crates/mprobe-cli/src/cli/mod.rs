//! CLI for mprobe.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mprobe_core::config::{self, MprobeConfig};
use std::path::PathBuf;

use commands::{run_analyze, run_info, run_proxy_link, run_serve};

/// Top-level CLI for mprobe.
#[derive(Debug, Parser)]
#[command(name = "mprobe")]
#[command(about = "mprobe: remote media analysis and range proxy", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/mprobe/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log to stderr instead of the state-directory log file.
    #[arg(long, global = true)]
    pub stderr: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the HTTP service.
    Serve {
        /// Listen address (overrides `bind` from the config).
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Print filename, size and type of a remote file.
    Info {
        /// Direct HTTP/HTTPS URL.
        url: String,
    },

    /// Analyze a remote media file with ranged reads.
    Analyze {
        /// Direct HTTP/HTTPS URL.
        url: String,

        /// Report format: object, JSON, XML, HTML or text.
        #[arg(long, default_value = "object")]
        format: String,

        /// Include embedded cover art as base64.
        #[arg(long)]
        cover: bool,

        /// Report every known field.
        #[arg(long)]
        full: bool,
    },

    /// Print a proxy link for a remote file.
    ProxyLink {
        /// Public base URL of the service, e.g. https://probe.example.com.
        base: String,

        /// Direct HTTP/HTTPS URL.
        url: String,

        /// Filename for the link; resolved from the origin if omitted.
        filename: Option<String>,
    },
}

impl Cli {
    fn load_config(&self) -> Result<MprobeConfig> {
        let cfg = match &self.config {
            Some(path) => config::load_from(path)?,
            None => config::load_or_init()?,
        };
        tracing::debug!("loaded config: {:?}", cfg);
        Ok(cfg)
    }

    pub async fn run(self) -> Result<()> {
        let cfg = self.load_config()?;

        match self.command {
            CliCommand::Serve { bind } => run_serve(cfg, bind).await?,
            CliCommand::Info { url } => run_info(&cfg, &url).await?,
            CliCommand::Analyze {
                url,
                format,
                cover,
                full,
            } => run_analyze(&cfg, &url, &format, cover, full).await?,
            CliCommand::ProxyLink {
                base,
                url,
                filename,
            } => run_proxy_link(&cfg, &base, &url, filename).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
