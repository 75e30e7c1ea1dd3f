//! Sender used by `--dry-run`: logs frames instead of queueing them.

use std::sync::atomic::{AtomicUsize, Ordering};

use loraota_protocol::Frame;
use loraota_transfer::{DownlinkSender, SendError, SendFuture};
use tracing::info;

#[derive(Debug, Default)]
pub struct DryRunSender {
    frames: AtomicUsize,
}

impl DryRunSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames accepted so far.
    #[cfg(test)]
    pub fn frames(&self) -> usize {
        self.frames.load(Ordering::Relaxed)
    }
}

impl DownlinkSender for DryRunSender {
    fn enqueue<'a>(&'a self, device_id: &'a str, port: u8, payload: &'a [u8]) -> SendFuture<'a> {
        Box::pin(async move {
            let frame = Frame::decode(payload)
                .map_err(|e| SendError::Transport(format!("undecodable frame: {e}")))?;
            self.frames.fetch_add(1, Ordering::Relaxed);

            match frame {
                Frame::Start {
                    firmware_size,
                    total_chunks,
                } => info!(device = device_id, port, firmware_size, total_chunks, "dry run: START"),
                Frame::Data { seq, payload } => {
                    info!(device = device_id, port, seq, len = payload.len(), "dry run: DATA")
                }
                Frame::End => info!(device = device_id, port, "dry run: END"),
                Frame::Abort => info!(device = device_id, port, "dry run: ABORT"),
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accepts_valid_frames() {
        let sender = DryRunSender::new();
        sender
            .enqueue("dev", 10, &Frame::Start { firmware_size: 5, total_chunks: 1 }.encode())
            .await
            .unwrap();
        sender
            .enqueue("dev", 10, &Frame::Data { seq: 0, payload: b"hello" }.encode())
            .await
            .unwrap();
        sender.enqueue("dev", 10, &Frame::End.encode()).await.unwrap();
        assert_eq!(sender.frames(), 3);
    }

    #[tokio::test]
    async fn rejects_garbage() {
        let sender = DryRunSender::new();
        let err = sender.enqueue("dev", 10, &[0x7F]).await.unwrap_err();
        assert!(matches!(err, SendError::Transport(_)));
        assert_eq!(sender.frames(), 0);
    }
}
