//! Encoding and decoding of OTA frames.

use crate::ProtocolError;
use crate::constants::{Command, DATA_HEADER_LEN, START_FRAME_LEN};

/// A single OTA downlink frame.
///
/// DATA frames borrow their payload so a firmware image can be framed
/// chunk by chunk without copying it first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    /// Announces a transfer of `firmware_size` bytes in `total_chunks` chunks.
    Start { firmware_size: u32, total_chunks: u16 },
    /// One chunk of the image, addressed by its zero-based sequence number.
    Data { seq: u16, payload: &'a [u8] },
    /// All chunks have been queued; the device should verify and flash.
    End,
    /// The transfer was abandoned; the device should discard what it has.
    Abort,
}

impl<'a> Frame<'a> {
    /// Command byte of this frame.
    pub fn command(&self) -> Command {
        match self {
            Self::Start { .. } => Command::Start,
            Self::Data { .. } => Command::Data,
            Self::End => Command::End,
            Self::Abort => Command::Abort,
        }
    }

    /// Encoded length in bytes.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Start { .. } => START_FRAME_LEN,
            Self::Data { payload, .. } => DATA_HEADER_LEN + payload.len(),
            Self::End | Self::Abort => 1,
        }
    }

    /// Serializes the frame into its wire representation.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.push(self.command().as_byte());
        match self {
            Self::Start {
                firmware_size,
                total_chunks,
            } => {
                buf.extend_from_slice(&firmware_size.to_be_bytes());
                buf.extend_from_slice(&total_chunks.to_be_bytes());
            }
            Self::Data { seq, payload } => {
                buf.extend_from_slice(&seq.to_be_bytes());
                buf.extend_from_slice(payload);
            }
            Self::End | Self::Abort => {}
        }
        buf
    }

    /// Parses a frame from raw downlink bytes.
    ///
    /// START, END and ABORT must have exactly their fixed length; a DATA
    /// frame needs its 3-byte header and may carry any payload length.
    pub fn decode(bytes: &'a [u8]) -> Result<Self, ProtocolError> {
        let (&first, _) = bytes.split_first().ok_or(ProtocolError::Empty)?;
        let command = Command::try_from(first)?;

        match command {
            Command::Start => {
                check_exact(command, bytes, START_FRAME_LEN)?;
                let firmware_size = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
                let total_chunks = u16::from_be_bytes([bytes[5], bytes[6]]);
                Ok(Self::Start {
                    firmware_size,
                    total_chunks,
                })
            }
            Command::Data => {
                if bytes.len() < DATA_HEADER_LEN {
                    return Err(ProtocolError::Truncated {
                        command,
                        expected: DATA_HEADER_LEN,
                        actual: bytes.len(),
                    });
                }
                let seq = u16::from_be_bytes([bytes[1], bytes[2]]);
                Ok(Self::Data {
                    seq,
                    payload: &bytes[DATA_HEADER_LEN..],
                })
            }
            Command::End => {
                check_exact(command, bytes, 1)?;
                Ok(Self::End)
            }
            Command::Abort => {
                check_exact(command, bytes, 1)?;
                Ok(Self::Abort)
            }
        }
    }
}

fn check_exact(command: Command, bytes: &[u8], len: usize) -> Result<(), ProtocolError> {
    if bytes.len() < len {
        return Err(ProtocolError::Truncated {
            command,
            expected: len,
            actual: bytes.len(),
        });
    }
    if bytes.len() > len {
        return Err(ProtocolError::TrailingBytes {
            command,
            extra: bytes.len() - len,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_frame_layout() {
        let frame = Frame::Start {
            firmware_size: 0x0001_2345,
            total_chunks: 0x0102,
        };
        assert_eq!(
            frame.encode(),
            vec![0x01, 0x00, 0x01, 0x23, 0x45, 0x01, 0x02]
        );
        assert_eq!(frame.encoded_len(), 7);
    }

    #[test]
    fn data_frame_layout() {
        let frame = Frame::Data {
            seq: 0x0203,
            payload: b"abc",
        };
        assert_eq!(frame.encode(), vec![0x02, 0x02, 0x03, b'a', b'b', b'c']);
        assert_eq!(frame.encoded_len(), 6);
    }

    #[test]
    fn control_frames_are_single_byte() {
        assert_eq!(Frame::End.encode(), vec![0x03]);
        assert_eq!(Frame::Abort.encode(), vec![0x04]);
    }

    #[test]
    fn decode_start() {
        let frame = Frame::decode(&[0x01, 0x00, 0x00, 0x08, 0x01, 0x00, 0x02]).unwrap();
        assert_eq!(
            frame,
            Frame::Start {
                firmware_size: 2049,
                total_chunks: 2
            }
        );
    }

    #[test]
    fn decode_data_borrows_payload() {
        let raw = [0x02, 0x00, 0x07, 0xDE, 0xAD];
        let Frame::Data { seq, payload } = Frame::decode(&raw).unwrap() else {
            panic!("expected DATA frame");
        };
        assert_eq!(seq, 7);
        assert_eq!(payload, &[0xDE, 0xAD]);
    }

    #[test]
    fn decode_data_with_empty_payload() {
        let frame = Frame::decode(&[0x02, 0x00, 0x00]).unwrap();
        assert_eq!(
            frame,
            Frame::Data {
                seq: 0,
                payload: &[]
            }
        );
    }

    #[test]
    fn decode_empty_rejected() {
        assert_eq!(Frame::decode(&[]).unwrap_err(), ProtocolError::Empty);
    }

    #[test]
    fn decode_truncated_start() {
        let err = Frame::decode(&[0x01, 0x00, 0x00]).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::Truncated {
                command: Command::Start,
                expected: 7,
                actual: 3
            }
        );
    }

    #[test]
    fn decode_truncated_data_header() {
        let err = Frame::decode(&[0x02, 0x00]).unwrap_err();
        assert!(matches!(err, ProtocolError::Truncated { command: Command::Data, .. }));
    }

    #[test]
    fn decode_trailing_bytes_on_end() {
        let err = Frame::decode(&[0x03, 0x00]).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::TrailingBytes {
                command: Command::End,
                extra: 1
            }
        );
    }

    #[test]
    fn decode_unknown_command() {
        assert_eq!(
            Frame::decode(&[0x7F]).unwrap_err(),
            ProtocolError::UnknownCommand(0x7F)
        );
    }

    #[test]
    fn max_sequence_number_encodes_big_endian() {
        let frame = Frame::Data {
            seq: u16::MAX,
            payload: &[0x00],
        };
        assert_eq!(&frame.encode()[..3], &[0x02, 0xFF, 0xFF]);
    }
}
