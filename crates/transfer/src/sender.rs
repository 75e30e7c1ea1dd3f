//! Downlink sender contract.
//!
//! The network-server client implements [`DownlinkSender`]. Keeping the
//! engine behind a trait decouples it from HTTP and lets tests use mocks.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Future returned by [`DownlinkSender::enqueue`].
pub type SendFuture<'a> = Pin<Box<dyn Future<Output = Result<(), SendError>> + Send + 'a>>;

/// Why a downlink was not accepted by the queue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("queue rejected downlink (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("send timed out after {0:?}")]
    Timeout(Duration),
}

/// Queues one downlink message for a device.
///
/// `Ok(())` means the network server accepted the message into its queue.
/// It says nothing about whether the device received it; each call may
/// produce a real transmission, so calls are not assumed idempotent.
pub trait DownlinkSender: Send + Sync {
    fn enqueue<'a>(&'a self, device_id: &'a str, port: u8, payload: &'a [u8]) -> SendFuture<'a>;
}

impl<T: DownlinkSender + ?Sized> DownlinkSender for &T {
    fn enqueue<'a>(&'a self, device_id: &'a str, port: u8, payload: &'a [u8]) -> SendFuture<'a> {
        (**self).enqueue(device_id, port, payload)
    }
}

impl<T: DownlinkSender + ?Sized> DownlinkSender for Box<T> {
    fn enqueue<'a>(&'a self, device_id: &'a str, port: u8, payload: &'a [u8]) -> SendFuture<'a> {
        (**self).enqueue(device_id, port, payload)
    }
}
