//! Human-readable output: summary, confirmation prompt, progress bar and report.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Duration;

use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use loraota_transfer::{
    AbortDelivery, AbortReason, EngineState, FirmwareImage, TransferEvent, TransferOutcome,
    TransferPlan,
};
use tracing::warn;

const BAR_TEMPLATE: &str =
    "  [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) eta {eta} {msg}";

/// Writes the pre-transfer summary.
pub fn write_summary(
    out: &mut impl Write,
    firmware: &Path,
    image: &FirmwareImage,
    plan: &TransferPlan,
    dry_run: bool,
) -> io::Result<()> {
    writeln!(out, "OTA firmware upload{}", if dry_run { " (dry run)" } else { "" })?;
    writeln!(out, "  Device:         {}", plan.device_id())?;
    writeln!(out, "  Port:           {}", plan.port())?;
    writeln!(out, "  Firmware:       {}", firmware.display())?;
    writeln!(
        out,
        "  Size:           {} bytes ({:.2} KiB)",
        image.len(),
        image.len() as f64 / 1024.0
    )?;
    writeln!(out, "  SHA-256:        {}", image.checksum())?;
    writeln!(out, "  Chunk size:     {} bytes", plan.chunk_size())?;
    writeln!(out, "  Total chunks:   {}", plan.total_chunks())?;
    writeln!(out, "  Delay:          {}s per chunk", plan.delay().as_secs())?;
    writeln!(
        out,
        "  Estimated time: ~{}",
        HumanDuration(plan.estimated_duration())
    )?;
    Ok(())
}

/// Asks `Continue? (yes/no)`; only `y` or `yes` confirms.
pub fn confirm(input: &mut impl BufRead, out: &mut impl Write) -> io::Result<bool> {
    write!(out, "\nContinue? (yes/no): ")?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let answer = line.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Drives a progress bar over the chunks of one transfer.
///
/// Elapsed time counts from START; the ETA only from the first DATA frame
/// so the initial pacing wait does not skew the rate.
pub struct ProgressPrinter {
    bar: ProgressBar,
}

impl ProgressPrinter {
    pub fn new(total_chunks: u16) -> Self {
        let bar = ProgressBar::new(u64::from(total_chunks));
        match ProgressStyle::with_template(BAR_TEMPLATE) {
            Ok(style) => bar.set_style(style.progress_chars("#>-")),
            Err(e) => warn!(error = %e, "invalid progress template, using default"),
        }
        bar.enable_steady_tick(Duration::from_secs(1));
        Self { bar }
    }

    pub fn handle(&mut self, event: &TransferEvent) {
        match event {
            TransferEvent::StateChanged(EngineState::Starting) => {
                self.bar.reset_elapsed();
                self.bar.set_message("sending START");
            }
            TransferEvent::StateChanged(EngineState::Sending) => {
                self.bar.reset_eta();
                self.bar.set_message("");
            }
            TransferEvent::StateChanged(EngineState::Ending) => {
                self.bar.set_message("sending END");
            }
            TransferEvent::StateChanged(_) => {}
            TransferEvent::ChunkSent { .. } => self.bar.inc(1),
            TransferEvent::ChunkFailed {
                seq,
                total_chunks,
                failures,
                error,
            } => {
                self.bar.println(format!(
                    "  chunk {}/{total_chunks} failed ({failures} failures so far): {error}",
                    seq + 1
                ));
                self.bar.inc(1);
            }
            TransferEvent::AbortAttempted { reason, delivery } => {
                let status = match delivery {
                    AbortDelivery::Accepted => "accepted",
                    AbortDelivery::Rejected => "rejected",
                    AbortDelivery::NotAttempted => "not attempted",
                };
                self.bar.println(format!("ABORT sent ({reason}): {status}"));
            }
            TransferEvent::Finished(TransferOutcome::Completed { .. }) => {
                self.bar.finish_with_message("done");
            }
            TransferEvent::Finished(_) => self.bar.abandon(),
        }
    }
}

/// Writes the final report for `outcome`.
///
/// `elapsed` is the wall time of the run; an interrupted run reports it as
/// time elapsed rather than total time.
pub fn write_report(
    out: &mut impl Write,
    outcome: &TransferOutcome,
    total_chunks: u16,
    elapsed: Duration,
) -> io::Result<()> {
    let time_label = match outcome {
        TransferOutcome::Aborted {
            reason: AbortReason::UserInterrupt,
            ..
        } => "Time elapsed: ",
        _ => "Total time:   ",
    };

    writeln!(out)?;
    writeln!(out, "Result:        {outcome}")?;
    writeln!(out, "{time_label} {}", HumanDuration(elapsed))?;
    writeln!(out, "Total chunks:  {total_chunks}")?;
    writeln!(out, "Failed chunks: {}", outcome.failed_count())?;
    match outcome {
        TransferOutcome::Completed { failed_chunks, .. } if !failed_chunks.is_empty() => {
            let list: Vec<String> = failed_chunks.iter().map(u16::to_string).collect();
            writeln!(out, "  failed seqs: {}", list.join(", "))?;
            writeln!(out, "  Device-side recovery depends on the firmware.")?;
        }
        _ => {}
    }
    let abort = match outcome {
        TransferOutcome::Aborted { abort, .. } => match abort {
            AbortDelivery::Accepted => "yes (accepted)",
            AbortDelivery::Rejected => "yes (rejected)",
            AbortDelivery::NotAttempted => "no",
        },
        _ => "no",
    };
    writeln!(out, "ABORT sent:    {abort}")?;
    Ok(())
}

/// Process exit status for `outcome`.
///
/// Completed with failed chunks succeeds unless `strict` is set.
pub fn exit_status(outcome: &TransferOutcome, strict: bool) -> u8 {
    match outcome {
        TransferOutcome::Completed { failed_chunks, .. } if failed_chunks.is_empty() => 0,
        TransferOutcome::Completed { .. } if strict => 2,
        TransferOutcome::Completed { .. } => 0,
        TransferOutcome::Aborted { .. } | TransferOutcome::Failed { .. } => 1,
    }
}
