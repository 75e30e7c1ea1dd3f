//! Chunked OTA firmware transfer over a paced, unacknowledged downlink queue.
//!
//! A [`FirmwareImage`] is split into fixed-size chunks described by a
//! [`TransferPlan`]. The [`TransferEngine`] then drives the
//! START → DATA* → END sequence through a [`DownlinkSender`], waiting one
//! delay interval between messages and aborting once too many chunks fail.

mod engine;
mod image;
mod plan;
mod sender;
mod tracker;
mod types;

use std::path::PathBuf;
use std::time::Duration;

pub use engine::TransferEngine;
pub use image::{Chunk, Chunks, FirmwareImage, checksum_bytes};
pub use plan::{MAX_APP_PORT, MIN_APP_PORT, PlanSettings, TransferPlan, total_chunks};
pub use sender::{DownlinkSender, SendError, SendFuture};
pub use tracker::FailureTracker;
pub use types::{
    AbortDelivery, AbortReason, EngineState, FailureStage, TransferEvent, TransferOutcome,
};

/// Default chunk size in bytes.
///
/// Keeps a DATA frame (3-byte header + payload) inside the 51-byte
/// application payload limit of the slowest EU868 data rates.
pub const DEFAULT_CHUNK_SIZE: usize = 48;

/// Number of failed chunks tolerated before the transfer is aborted.
///
/// The abort fires when the failure count *exceeds* this value.
pub const ABORT_THRESHOLD: usize = 10;

/// Upper bound for a single enqueue call.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors produced while loading an image or building a plan.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("failed to read firmware {path}: {source}")]
    ReadImage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("firmware image is empty")]
    EmptyImage,

    #[error("firmware image too large: {0} bytes (max {max})", max = u32::MAX)]
    ImageTooLarge(usize),

    #[error("invalid transfer plan: {0}")]
    InvalidPlan(String),
}
