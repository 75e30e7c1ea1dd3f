//! `loraota upload`: sends a firmware image to one device.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Args;
use loraota_chirpstack::Client;
use loraota_transfer::{DownlinkSender, FirmwareImage, TransferEngine, TransferPlan};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::dry_run::DryRunSender;
use crate::render::{self, ProgressPrinter};

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Firmware binary to send.
    pub firmware: PathBuf,

    /// Configuration file (JSON, or TOML by extension).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Skip the confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,

    /// Log frames instead of queueing them. Pacing still applies.
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with status 2 when some chunks failed.
    #[arg(long)]
    pub strict: bool,

    /// ChirpStack API token, overrides the config file.
    #[arg(long, env = "CHIRPSTACK_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,
}

pub async fn run(args: UploadArgs) -> anyhow::Result<ExitCode> {
    let config = Config::load(&args.config)?;
    let image = FirmwareImage::load(&args.firmware).await?;
    let plan = TransferPlan::new(&image, config.plan_settings())?;

    // Build the sender first so credential problems surface before the prompt.
    let sender: Box<dyn DownlinkSender> = if args.dry_run {
        Box::new(DryRunSender::new())
    } else {
        let client = Client::new(config.client_config(args.api_token.as_deref())?)?;
        info!(api_url = client.base_url(), "ChirpStack client ready");
        Box::new(client)
    };

    render::write_summary(
        &mut io::stdout().lock(),
        &args.firmware,
        &image,
        &plan,
        args.dry_run,
    )?;

    if !args.yes {
        let confirmed = tokio::task::spawn_blocking(|| {
            render::confirm(&mut io::stdin().lock(), &mut io::stdout())
        })
        .await??;
        if !confirmed {
            println!("Upload cancelled.");
            return Ok(ExitCode::from(1));
        }
    }

    let cancel = CancellationToken::new();
    let engine =
        TransferEngine::new(sender, cancel.clone()).with_send_timeout(config.send_timeout());
    let interrupt = tokio::spawn(watch_interrupt(cancel));

    let (events_tx, mut events_rx) = mpsc::channel(64);
    let mut printer = ProgressPrinter::new(plan.total_chunks());
    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            printer.handle(&event);
        }
    });

    let started = Instant::now();
    let outcome = engine.run(&image, &plan, &events_tx).await;
    let elapsed = started.elapsed();
    drop(events_tx);
    let _ = printer.await;
    interrupt.abort();

    render::write_report(
        &mut io::stdout().lock(),
        &outcome,
        plan.total_chunks(),
        elapsed,
    )?;
    Ok(ExitCode::from(render::exit_status(&outcome, args.strict)))
}

/// Cancels the transfer on Ctrl-C.
async fn watch_interrupt(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("interrupt received, aborting transfer");
        cancel.cancel();
    }
}
