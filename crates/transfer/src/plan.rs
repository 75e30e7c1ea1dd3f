use std::num::NonZeroUsize;
use std::time::Duration;

use loraota_protocol::constants::{DATA_HEADER_LEN, MAX_LORAWAN_PAYLOAD};
use tracing::warn;

use crate::{FirmwareImage, TransferError};

/// Lowest application port usable for OTA (port 0 carries MAC commands).
pub const MIN_APP_PORT: u8 = 1;

/// Highest application port; 224 and above are reserved by LoRaWAN.
pub const MAX_APP_PORT: u8 = 223;

/// Number of chunks needed to carry `len` bytes.
pub fn total_chunks(len: usize, chunk_size: usize) -> usize {
    len.div_ceil(chunk_size)
}

/// Caller-supplied transfer parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanSettings {
    /// Target device identifier (DevEUI).
    pub device_id: String,
    /// Application port the device listens on for OTA commands.
    pub port: u8,
    /// Payload bytes per DATA frame.
    pub chunk_size: usize,
    /// Mandatory wait between consecutive downlinks.
    pub delay: Duration,
}

/// A validated description of one transfer, derived from an image and settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferPlan {
    firmware_size: u32,
    chunk_size: NonZeroUsize,
    total_chunks: u16,
    delay: Duration,
    device_id: String,
    port: u8,
}

impl TransferPlan {
    /// Builds a plan for `image`.
    ///
    /// Rejects an empty device id, ports outside
    /// [`MIN_APP_PORT`]..=[`MAX_APP_PORT`], a zero chunk size and images
    /// needing more than `u16::MAX` chunks.
    pub fn new(image: &FirmwareImage, settings: PlanSettings) -> Result<Self, TransferError> {
        let PlanSettings {
            device_id,
            port,
            chunk_size,
            delay,
        } = settings;

        let device_id = device_id.trim().to_string();
        if device_id.is_empty() {
            return Err(TransferError::InvalidPlan("device id is empty".into()));
        }
        if !(MIN_APP_PORT..=MAX_APP_PORT).contains(&port) {
            return Err(TransferError::InvalidPlan(format!(
                "application port {port} outside {MIN_APP_PORT}..={MAX_APP_PORT}"
            )));
        }
        let Some(chunk_size) = NonZeroUsize::new(chunk_size) else {
            return Err(TransferError::InvalidPlan("chunk size must be at least 1".into()));
        };

        let firmware_size = u32::try_from(image.len())
            .map_err(|_| TransferError::ImageTooLarge(image.len()))?;
        let chunks = total_chunks(image.len(), chunk_size.get());
        let total_chunks = u16::try_from(chunks).map_err(|_| {
            TransferError::InvalidPlan(format!(
                "{chunks} chunks needed, at most {} fit the sequence field; increase the chunk size",
                u16::MAX
            ))
        })?;

        let frame_len = DATA_HEADER_LEN + chunk_size.get();
        if frame_len > MAX_LORAWAN_PAYLOAD {
            warn!(
                chunk_size = chunk_size.get(),
                frame_len,
                max = MAX_LORAWAN_PAYLOAD,
                "DATA frames exceed the largest LoRaWAN payload; the network server may reject them"
            );
        }

        Ok(Self {
            firmware_size,
            chunk_size,
            total_chunks,
            delay,
            device_id,
            port,
        })
    }

    /// Checks that `image` is the one this plan was built for.
    pub fn check_image(&self, image: &FirmwareImage) -> Result<(), TransferError> {
        if image.is_empty() {
            return Err(TransferError::EmptyImage);
        }
        if image.len() != self.firmware_size as usize {
            return Err(TransferError::InvalidPlan(format!(
                "plan expects {} bytes, image has {}",
                self.firmware_size,
                image.len()
            )));
        }
        Ok(())
    }

    pub fn firmware_size(&self) -> u32 {
        self.firmware_size
    }

    pub fn chunk_size(&self) -> NonZeroUsize {
        self.chunk_size
    }

    pub fn total_chunks(&self) -> u16 {
        self.total_chunks
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn port(&self) -> u8 {
        self.port
    }

    /// Payload length of the last chunk, between 1 and the chunk size.
    pub fn last_chunk_len(&self) -> usize {
        self.firmware_size as usize - (usize::from(self.total_chunks) - 1) * self.chunk_size.get()
    }

    /// Lower bound on the run time imposed by pacing alone.
    ///
    /// One delay after START, one between each pair of chunks and one before
    /// END: `(total_chunks + 1) * delay`.
    pub fn estimated_duration(&self) -> Duration {
        self.delay * (u32::from(self.total_chunks) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn settings(chunk_size: usize) -> PlanSettings {
        PlanSettings {
            device_id: "0807060504030201".into(),
            port: 10,
            chunk_size,
            delay: Duration::from_secs(30),
        }
    }

    fn image(len: usize) -> FirmwareImage {
        FirmwareImage::from_bytes(vec![0xAB; len]).unwrap()
    }

    #[test]
    fn total_chunks_is_ceiling() {
        assert_eq!(total_chunks(1, 1), 1);
        assert_eq!(total_chunks(10, 4), 3);
        assert_eq!(total_chunks(2048, 2048), 1);
        assert_eq!(total_chunks(2049, 2048), 2);
    }

    #[test]
    fn plan_invariants_hold() {
        for (len, chunk_size) in [(1, 1), (1, 48), (47, 48), (48, 48), (49, 48), (10_000, 48)] {
            let plan = TransferPlan::new(&image(len), settings(chunk_size)).unwrap();
            let total = usize::from(plan.total_chunks());
            assert!(total >= 1);
            assert!(total * chunk_size >= len);
            assert!((total - 1) * chunk_size < len);
            assert!((1..=chunk_size).contains(&plan.last_chunk_len()));
        }
    }

    #[test]
    fn single_chunk_image() {
        let plan = TransferPlan::new(&image(2048), settings(2048)).unwrap();
        assert_eq!(plan.total_chunks(), 1);
        assert_eq!(plan.last_chunk_len(), 2048);
    }

    #[test]
    fn one_byte_remainder() {
        let plan = TransferPlan::new(&image(2049), settings(2048)).unwrap();
        assert_eq!(plan.total_chunks(), 2);
        assert_eq!(plan.last_chunk_len(), 1);
        assert_eq!(plan.firmware_size(), 2049);
    }

    #[test]
    fn estimated_duration_counts_every_wait() {
        let plan = TransferPlan::new(&image(100), settings(48)).unwrap();
        // 3 chunks: after START, 2 between chunks, before END.
        assert_eq!(plan.estimated_duration(), Duration::from_secs(4 * 30));
    }

    #[test]
    fn empty_device_id_rejected() {
        let mut s = settings(48);
        s.device_id = "   ".into();
        let err = TransferPlan::new(&image(10), s).unwrap_err();
        assert!(matches!(err, TransferError::InvalidPlan(_)));
    }

    #[test]
    fn device_id_is_trimmed() {
        let mut s = settings(48);
        s.device_id = " 0807060504030201\n".into();
        let plan = TransferPlan::new(&image(10), s).unwrap();
        assert_eq!(plan.device_id(), "0807060504030201");
    }

    #[test]
    fn reserved_ports_rejected() {
        for port in [0u8, 224, 255] {
            let mut s = settings(48);
            s.port = port;
            assert!(TransferPlan::new(&image(10), s).is_err(), "port {port}");
        }
    }

    #[test]
    fn zero_chunk_size_rejected() {
        assert!(TransferPlan::new(&image(10), settings(0)).is_err());
    }

    #[test]
    fn too_many_chunks_rejected() {
        let err = TransferPlan::new(&image(usize::from(u16::MAX) + 1), settings(1)).unwrap_err();
        assert!(err.to_string().contains("increase the chunk size"));
    }

    #[test]
    fn max_chunk_count_accepted() {
        let plan = TransferPlan::new(&image(usize::from(u16::MAX)), settings(1)).unwrap();
        assert_eq!(plan.total_chunks(), u16::MAX);
    }

    #[test]
    fn check_image_detects_mismatch() {
        let plan = TransferPlan::new(&image(100), settings(48)).unwrap();
        assert!(plan.check_image(&image(100)).is_ok());
        assert!(plan.check_image(&image(99)).is_err());
    }

    proptest! {
        #[test]
        fn plan_matches_chunking(len in 1usize..=20_000, chunk_size in 1usize..=4096) {
            let img = image(len);
            let plan = TransferPlan::new(&img, settings(chunk_size)).unwrap();

            prop_assert_eq!(usize::from(plan.total_chunks()), len.div_ceil(chunk_size));
            prop_assert_eq!(plan.chunk_size().get(), chunk_size);
            prop_assert!((1..=chunk_size).contains(&plan.last_chunk_len()));

            let last = img.chunks(plan.chunk_size()).last().unwrap();
            prop_assert_eq!(usize::from(last.seq) + 1, usize::from(plan.total_chunks()));
            prop_assert_eq!(last.payload.len(), plan.last_chunk_len());
        }
    }
}
