//! LoRaWAN OTA uploader entry point.

mod config;
mod dry_run;
mod keys;
mod render;
mod upload;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about = "Firmware updates over LoRaWAN downlinks")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send a firmware image through the ChirpStack device queue.
    Upload(upload::UploadArgs),
    /// Write OTAA keys from a keys file into an Arduino sketch.
    Keys(keys::KeysArgs),
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Logs and the progress bar go to stderr; stdout carries summary and report.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Keys(args) => keys::run(args),
        Command::Upload(args) => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(upload::run(args))
        }
    }
}
