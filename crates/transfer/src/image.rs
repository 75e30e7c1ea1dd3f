use std::num::NonZeroUsize;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::TransferError;

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// FirmwareImage
// ---------------------------------------------------------------------------

/// A firmware binary held in memory for the duration of a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareImage {
    data: Vec<u8>,
}

impl FirmwareImage {
    /// Reads the whole image from `path`.
    pub async fn load(path: &Path) -> Result<Self, TransferError> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|source| TransferError::ReadImage {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_bytes(data)
    }

    /// Wraps an in-memory image.
    ///
    /// The size travels as a 4-byte field in the START frame, so images
    /// must be non-empty and at most `u32::MAX` bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, TransferError> {
        if data.is_empty() {
            return Err(TransferError::EmptyImage);
        }
        if u32::try_from(data.len()).is_err() {
            return Err(TransferError::ImageTooLarge(data.len()));
        }
        Ok(Self { data })
    }

    /// Image length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always `false`; empty images cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw image bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Hex SHA-256 of the image.
    pub fn checksum(&self) -> String {
        checksum_bytes(&self.data)
    }

    /// Iterates the image in `chunk_size` pieces, in sequence order.
    ///
    /// Iteration stops at sequence number `u16::MAX`; plans never need more
    /// chunks than that.
    pub fn chunks(&self, chunk_size: NonZeroUsize) -> Chunks<'_> {
        let chunk_size = chunk_size.get();
        Chunks {
            inner: self.data.chunks(chunk_size).enumerate(),
            chunk_size,
        }
    }
}

// ---------------------------------------------------------------------------
// Chunk
// ---------------------------------------------------------------------------

/// A view of one contiguous slice of a [`FirmwareImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// Zero-based sequence number.
    pub seq: u16,
    /// Byte offset of the first payload byte within the image.
    pub offset: usize,
    /// Chunk bytes; only the last chunk may be shorter than the chunk size.
    pub payload: &'a [u8],
}

/// Iterator over the chunks of an image. See [`FirmwareImage::chunks`].
pub struct Chunks<'a> {
    inner: std::iter::Enumerate<std::slice::Chunks<'a, u8>>,
    chunk_size: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, payload) = self.inner.next()?;
        let seq = u16::try_from(index).ok()?;
        Some(Chunk {
            seq,
            offset: index * self.chunk_size,
            payload,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn image(len: usize) -> FirmwareImage {
        let data = (0..len).map(|i| (i % 251) as u8).collect();
        FirmwareImage::from_bytes(data).unwrap()
    }

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn checksum_bytes_deterministic() {
        let c1 = checksum_bytes(b"firmware");
        let c2 = checksum_bytes(b"firmware");
        assert_eq!(c1, c2);
        assert_eq!(c1.len(), 64); // SHA-256 = 64 hex chars.
    }

    #[test]
    fn empty_image_rejected() {
        let result = FirmwareImage::from_bytes(Vec::new());
        assert!(matches!(result, Err(TransferError::EmptyImage)));
    }

    #[test]
    fn chunks_cover_image_in_order() {
        let img = FirmwareImage::from_bytes(b"AABBCCDDEE".to_vec()).unwrap();
        let chunks: Vec<_> = img.chunks(size(4)).collect();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].seq, 0);
        assert_eq!(chunks[0].payload, b"AABB");
        assert_eq!(chunks[1].offset, 4);
        assert_eq!(chunks[1].payload, b"CCDD");
        assert_eq!(chunks[2].seq, 2);
        assert_eq!(chunks[2].offset, 8);
        assert_eq!(chunks[2].payload, b"EE");
    }

    #[test]
    fn concatenated_chunks_reconstruct_image() {
        for (len, chunk_size) in [(1, 1), (7, 3), (2048, 2048), (2049, 2048), (1000, 48)] {
            let img = image(len);
            let rebuilt: Vec<u8> = img
                .chunks(size(chunk_size))
                .flat_map(|c| c.payload.iter().copied())
                .collect();
            assert_eq!(rebuilt, img.as_bytes(), "len={len} chunk_size={chunk_size}");
        }
    }

    #[test]
    fn last_chunk_is_remainder() {
        let img = image(2049);
        let chunks: Vec<_> = img.chunks(size(2048)).collect();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].payload.len(), 1);
    }

    #[test]
    fn exact_multiple_has_full_last_chunk() {
        let img = image(2048);
        let chunks: Vec<_> = img.chunks(size(2048)).collect();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].payload.len(), 2048);
    }

    #[test]
    fn offsets_follow_chunk_size() {
        let img = image(100);
        for c in img.chunks(size(30)) {
            assert_eq!(c.offset, usize::from(c.seq) * 30);
            assert_eq!(c.payload, &img.as_bytes()[c.offset..c.offset + c.payload.len()]);
        }
    }

    proptest! {
        #[test]
        fn chunking_laws(len in 1usize..=20_000, chunk_size in 1usize..=4096) {
            let img = image(len);
            let chunks: Vec<_> = img.chunks(size(chunk_size)).collect();

            prop_assert_eq!(chunks.len(), len.div_ceil(chunk_size));
            for (i, c) in chunks.iter().enumerate() {
                prop_assert_eq!(usize::from(c.seq), i);
            }

            let last = chunks.last().unwrap();
            prop_assert!((1..=chunk_size).contains(&last.payload.len()));
            prop_assert!(chunks[..chunks.len() - 1]
                .iter()
                .all(|c| c.payload.len() == chunk_size));

            let rebuilt: Vec<u8> = chunks.iter().flat_map(|c| c.payload.iter().copied()).collect();
            prop_assert_eq!(rebuilt.as_slice(), img.as_bytes());
        }
    }

    #[tokio::test]
    async fn load_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fw.bin");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"\x7fELF-ish firmware").unwrap();

        let img = FirmwareImage::load(&path).await.unwrap();
        assert_eq!(img.len(), 17);
        assert_eq!(img.checksum(), checksum_bytes(b"\x7fELF-ish firmware"));
    }

    #[tokio::test]
    async fn load_missing_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.bin");
        let err = FirmwareImage::load(&path).await.unwrap_err();
        assert!(matches!(err, TransferError::ReadImage { .. }));
        assert!(err.to_string().contains("missing.bin"));
    }

    #[tokio::test]
    async fn load_empty_file_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.bin");
        std::fs::File::create(&path).unwrap();
        let err = FirmwareImage::load(&path).await.unwrap_err();
        assert!(matches!(err, TransferError::EmptyImage));
    }
}
