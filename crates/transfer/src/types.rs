use std::fmt;

/// Phase of the transfer state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    Starting,
    Sending,
    Ending,
    Completed,
    Aborted,
    Failed,
}

impl EngineState {
    /// Returns `true` for states that end a run.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted | Self::Failed)
    }
}

/// Why a transfer was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbortReason {
    /// More chunks failed than the abort threshold allows.
    TooManyFailures,
    /// The caller cancelled the transfer.
    UserInterrupt,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyFailures => f.write_str("too many failed chunks"),
            Self::UserInterrupt => f.write_str("interrupted by user"),
        }
    }
}

/// Stage at which a transfer failed hard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureStage {
    /// Bad image or plan; nothing was sent.
    Validation,
    /// The queue rejected the START command.
    StartRejected,
    /// The queue rejected the END command.
    EndRejected,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => f.write_str("validation"),
            Self::StartRejected => f.write_str("START rejected"),
            Self::EndRejected => f.write_str("END rejected"),
        }
    }
}

/// What happened to the ABORT command of an aborted run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbortDelivery {
    /// ABORT was accepted by the queue.
    Accepted,
    /// ABORT was attempted but rejected or timed out.
    Rejected,
    /// Nothing had been sent yet, so no ABORT was needed.
    NotAttempted,
}

/// Terminal result of one transfer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// START, every DATA frame and END were processed.
    ///
    /// `failed_chunks` lists sequence numbers the queue did not accept; the
    /// device is expected to detect those gaps itself.
    Completed {
        successful_chunks: u16,
        failed_chunks: Vec<u16>,
    },
    /// The DATA phase was cut short and an ABORT was attempted.
    Aborted {
        reason: AbortReason,
        /// DATA chunks accepted by the queue before the abort.
        chunks_sent: u16,
        abort: AbortDelivery,
    },
    /// The run failed before or at a control message.
    Failed { stage: FailureStage, reason: String },
}

impl TransferOutcome {
    /// Terminal engine state matching this outcome.
    pub fn state(&self) -> EngineState {
        match self {
            Self::Completed { .. } => EngineState::Completed,
            Self::Aborted { .. } => EngineState::Aborted,
            Self::Failed { .. } => EngineState::Failed,
        }
    }

    /// Completed with every chunk accepted.
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Completed { failed_chunks, .. } if failed_chunks.is_empty())
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Number of DATA chunks the queue did not accept.
    pub fn failed_count(&self) -> usize {
        match self {
            Self::Completed { failed_chunks, .. } => failed_chunks.len(),
            _ => 0,
        }
    }

    /// Whether an ABORT command was sent to the queue during this run.
    pub fn abort_attempted(&self) -> bool {
        matches!(
            self,
            Self::Aborted {
                abort: AbortDelivery::Accepted | AbortDelivery::Rejected,
                ..
            }
        )
    }
}

impl fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed {
                successful_chunks,
                failed_chunks,
            } if failed_chunks.is_empty() => {
                write!(f, "completed ({successful_chunks} chunks)")
            }
            Self::Completed {
                successful_chunks,
                failed_chunks,
            } => write!(
                f,
                "completed with {} failed chunks ({successful_chunks} accepted)",
                failed_chunks.len()
            ),
            Self::Aborted {
                reason,
                chunks_sent,
                ..
            } => write!(f, "aborted: {reason} after {chunks_sent} chunks"),
            Self::Failed { stage, reason } => write!(f, "failed ({stage}): {reason}"),
        }
    }
}

/// Progress notifications emitted while a transfer runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// The engine entered a new state.
    StateChanged(EngineState),
    /// A DATA frame was accepted by the queue.
    ChunkSent { seq: u16, total_chunks: u16 },
    /// A DATA frame was not accepted; `failures` is the running count.
    ChunkFailed {
        seq: u16,
        total_chunks: u16,
        failures: usize,
        error: String,
    },
    /// An ABORT command was sent.
    AbortAttempted {
        reason: AbortReason,
        delivery: AbortDelivery,
    },
    /// The run ended. Always the last event.
    Finished(TransferOutcome),
}
