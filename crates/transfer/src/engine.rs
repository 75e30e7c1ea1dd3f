//! OTA transfer state machine.
//!
//! Drives `Starting → Sending → Ending` and ends in exactly one of
//! `Completed`, `Aborted` or `Failed`. Messages go out strictly one at a
//! time with a mandatory delay between them; the delays and in-flight sends
//! are the only places where cancellation is observed.

use std::path::Path;
use std::time::Duration;

use loraota_protocol::Frame;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::plan::{PlanSettings, TransferPlan};
use crate::sender::{DownlinkSender, SendError};
use crate::tracker::FailureTracker;
use crate::types::{
    AbortDelivery, AbortReason, EngineState, FailureStage, TransferEvent, TransferOutcome,
};
use crate::{ABORT_THRESHOLD, DEFAULT_SEND_TIMEOUT, FirmwareImage};

/// Result of one enqueue attempt as seen by the state machine.
enum Delivery {
    Accepted,
    Failed(SendError),
    Interrupted,
}

/// Runs OTA transfers through a [`DownlinkSender`].
///
/// The engine keeps no per-run state: every call to [`run`](Self::run)
/// starts with a fresh failure tracker, so one engine can be reused and
/// separate engines can serve different devices independently.
pub struct TransferEngine<S> {
    sender: S,
    cancel: CancellationToken,
    send_timeout: Duration,
}

impl<S: DownlinkSender> TransferEngine<S> {
    /// Creates an engine that stops when `cancel` is triggered.
    pub fn new(sender: S, cancel: CancellationToken) -> Self {
        Self {
            sender,
            cancel,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    /// Overrides the per-send timeout (default [`DEFAULT_SEND_TIMEOUT`]).
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    /// Loads the image at `path`, plans it and runs the transfer.
    ///
    /// Load and planning errors become `Failed(Validation)`.
    pub async fn transfer_file(
        &self,
        path: &Path,
        settings: PlanSettings,
        events_tx: &mpsc::Sender<TransferEvent>,
    ) -> TransferOutcome {
        let prepared = match FirmwareImage::load(path).await {
            Ok(image) => TransferPlan::new(&image, settings).map(|plan| (image, plan)),
            Err(e) => Err(e),
        };

        match prepared {
            Ok((image, plan)) => self.run(&image, &plan, events_tx).await,
            Err(e) => {
                let outcome = TransferOutcome::Failed {
                    stage: FailureStage::Validation,
                    reason: e.to_string(),
                };
                self.finish(outcome, events_tx)
            }
        }
    }

    /// Runs one transfer of `image` according to `plan`.
    ///
    /// Always returns a terminal outcome, which is also emitted as the last
    /// event on `events_tx`. Events are delivered with `try_send`: a slow,
    /// full or closed receiver loses events but never stalls the run or
    /// delays cancellation.
    pub async fn run(
        &self,
        image: &FirmwareImage,
        plan: &TransferPlan,
        events_tx: &mpsc::Sender<TransferEvent>,
    ) -> TransferOutcome {
        let outcome = self.drive(image, plan, events_tx).await;
        self.finish(outcome, events_tx)
    }

    async fn drive(
        &self,
        image: &FirmwareImage,
        plan: &TransferPlan,
        events_tx: &mpsc::Sender<TransferEvent>,
    ) -> TransferOutcome {
        if let Err(e) = plan.check_image(image) {
            return TransferOutcome::Failed {
                stage: FailureStage::Validation,
                reason: e.to_string(),
            };
        }
        if self.cancel.is_cancelled() {
            return TransferOutcome::Aborted {
                reason: AbortReason::UserInterrupt,
                chunks_sent: 0,
                abort: AbortDelivery::NotAttempted,
            };
        }

        let total = plan.total_chunks();
        info!(
            device = %plan.device_id(),
            port = plan.port(),
            firmware_size = plan.firmware_size(),
            chunk_size = plan.chunk_size().get(),
            total_chunks = total,
            delay = ?plan.delay(),
            sha256 = %image.checksum(),
            "starting OTA transfer"
        );

        // -- Starting --
        self.emit(events_tx, TransferEvent::StateChanged(EngineState::Starting));
        let start = Frame::Start {
            firmware_size: plan.firmware_size(),
            total_chunks: total,
        }
        .encode();
        match self.send(plan, &start).await {
            Delivery::Accepted => debug!("START queued"),
            Delivery::Failed(e) => {
                return TransferOutcome::Failed {
                    stage: FailureStage::StartRejected,
                    reason: e.to_string(),
                };
            }
            Delivery::Interrupted => {
                return self
                    .abort(plan, AbortReason::UserInterrupt, 0, events_tx)
                    .await;
            }
        }
        if !self.pace(plan.delay()).await {
            return self
                .abort(plan, AbortReason::UserInterrupt, 0, events_tx)
                .await;
        }

        // -- Sending --
        self.emit(events_tx, TransferEvent::StateChanged(EngineState::Sending));
        let mut tracker = FailureTracker::new(ABORT_THRESHOLD);
        let mut chunks_sent: u16 = 0;

        for chunk in image.chunks(plan.chunk_size()) {
            let frame = Frame::Data {
                seq: chunk.seq,
                payload: chunk.payload,
            }
            .encode();

            match self.send(plan, &frame).await {
                Delivery::Accepted => {
                    chunks_sent += 1;
                    debug!(seq = chunk.seq, bytes = chunk.payload.len(), "chunk queued");
                    self.emit(
                        events_tx,
                        TransferEvent::ChunkSent {
                            seq: chunk.seq,
                            total_chunks: total,
                        },
                    );
                }
                Delivery::Failed(e) => {
                    let exceeded = tracker.record(chunk.seq);
                    warn!(
                        seq = chunk.seq,
                        failures = tracker.count(),
                        error = %e,
                        "chunk send failed"
                    );
                    self.emit(
                        events_tx,
                        TransferEvent::ChunkFailed {
                            seq: chunk.seq,
                            total_chunks: total,
                            failures: tracker.count(),
                            error: e.to_string(),
                        },
                    );
                    if exceeded {
                        error!(
                            failures = tracker.count(),
                            threshold = ABORT_THRESHOLD,
                            "too many failed chunks, aborting"
                        );
                        return self
                            .abort(plan, AbortReason::TooManyFailures, chunks_sent, events_tx)
                            .await;
                    }
                }
                Delivery::Interrupted => {
                    return self
                        .abort(plan, AbortReason::UserInterrupt, chunks_sent, events_tx)
                        .await;
                }
            }

            let is_last = chunk.seq + 1 >= total;
            if !is_last && !self.pace(plan.delay()).await {
                return self
                    .abort(plan, AbortReason::UserInterrupt, chunks_sent, events_tx)
                    .await;
            }
        }

        if !tracker.is_empty() {
            warn!(
                failed = tracker.count(),
                chunks = ?tracker.failed(),
                "continuing with failed chunks; the device must detect the gaps"
            );
        }

        // -- Ending --
        self.emit(events_tx, TransferEvent::StateChanged(EngineState::Ending));
        if !self.pace(plan.delay()).await {
            return self
                .abort(plan, AbortReason::UserInterrupt, chunks_sent, events_tx)
                .await;
        }
        match self.send(plan, &Frame::End.encode()).await {
            Delivery::Accepted => {
                debug!("END queued");
                TransferOutcome::Completed {
                    successful_chunks: total - tracker.count() as u16,
                    failed_chunks: tracker.into_failed(),
                }
            }
            Delivery::Failed(e) => TransferOutcome::Failed {
                stage: FailureStage::EndRejected,
                reason: e.to_string(),
            },
            Delivery::Interrupted => {
                self.abort(plan, AbortReason::UserInterrupt, chunks_sent, events_tx)
                    .await
            }
        }
    }

    /// Enqueues one frame, bounded by the send timeout and raced against
    /// cancellation.
    async fn send(&self, plan: &TransferPlan, frame: &[u8]) -> Delivery {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Delivery::Interrupted,
            result = tokio::time::timeout(
                self.send_timeout,
                self.sender.enqueue(plan.device_id(), plan.port(), frame),
            ) => match result {
                Ok(Ok(())) => Delivery::Accepted,
                Ok(Err(e)) => Delivery::Failed(e),
                Err(_) => Delivery::Failed(SendError::Timeout(self.send_timeout)),
            },
        }
    }

    /// Waits one pacing interval. Returns `false` if cancelled meanwhile.
    async fn pace(&self, delay: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    /// Sends a best-effort ABORT and builds the aborted outcome.
    ///
    /// The ABORT is not raced against cancellation and never retried.
    async fn abort(
        &self,
        plan: &TransferPlan,
        reason: AbortReason,
        chunks_sent: u16,
        events_tx: &mpsc::Sender<TransferEvent>,
    ) -> TransferOutcome {
        info!(%reason, chunks_sent, "sending ABORT");
        let frame = Frame::Abort.encode();
        let result = tokio::time::timeout(
            self.send_timeout,
            self.sender.enqueue(plan.device_id(), plan.port(), &frame),
        )
        .await;

        let delivery = match result {
            Ok(Ok(())) => AbortDelivery::Accepted,
            Ok(Err(e)) => {
                warn!(error = %e, "ABORT was not accepted");
                AbortDelivery::Rejected
            }
            Err(_) => {
                warn!(timeout = ?self.send_timeout, "ABORT timed out");
                AbortDelivery::Rejected
            }
        };

        self.emit(events_tx, TransferEvent::AbortAttempted { reason, delivery });

        TransferOutcome::Aborted {
            reason,
            chunks_sent,
            abort: delivery,
        }
    }

    fn finish(
        &self,
        outcome: TransferOutcome,
        events_tx: &mpsc::Sender<TransferEvent>,
    ) -> TransferOutcome {
        match &outcome {
            TransferOutcome::Completed { .. } => info!(%outcome, "OTA transfer finished"),
            TransferOutcome::Aborted { .. } => warn!(%outcome, "OTA transfer aborted"),
            TransferOutcome::Failed { .. } => error!(%outcome, "OTA transfer failed"),
        }
        self.emit(events_tx, TransferEvent::StateChanged(outcome.state()));
        self.emit(events_tx, TransferEvent::Finished(outcome.clone()));
        outcome
    }

    /// Never waits: a full channel drops the event and a closed one is ignored.
    fn emit(&self, events_tx: &mpsc::Sender<TransferEvent>, event: TransferEvent) {
        match events_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => debug!(?event, "event channel full, dropping event"),
            Err(TrySendError::Closed(_)) => {}
        }
    }
}
