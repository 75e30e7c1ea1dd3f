//! OTA command framing shared by the host tool and the device contract.
//!
//! Every downlink on the OTA application port starts with a single command
//! byte. All multi-byte integers are unsigned big-endian.
//!
//! ```text
//! START  [0x01][firmware_size:4][total_chunks:2]
//! DATA   [0x02][seq:2][payload...]
//! END    [0x03]
//! ABORT  [0x04]
//! ```

pub mod constants;
pub mod frame;

pub use constants::Command;
pub use frame::Frame;

/// Errors produced while decoding OTA frames.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("empty frame")]
    Empty,

    #[error("unknown command byte: {0:#04x}")]
    UnknownCommand(u8),

    #[error("{command} frame truncated: expected at least {expected} bytes, got {actual}")]
    Truncated {
        command: Command,
        expected: usize,
        actual: usize,
    },

    #[error("{command} frame has {extra} trailing bytes")]
    TrailingBytes { command: Command, extra: usize },
}
