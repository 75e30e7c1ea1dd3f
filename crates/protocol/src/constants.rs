use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Length of a START frame: command + size + chunk count.
pub const START_FRAME_LEN: usize = 1 + 4 + 2;

/// Bytes preceding the payload in a DATA frame: command + sequence number.
pub const DATA_HEADER_LEN: usize = 1 + 2;

/// Largest LoRaWAN application payload at the fastest data rates.
///
/// Frames above this size only fit on regional plans with relaxed limits,
/// so callers should warn when a plan exceeds it.
pub const MAX_LORAWAN_PAYLOAD: usize = 242;

/// OTA command identifier carried in the first byte of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Command {
    Start = 0x01,
    Data = 0x02,
    End = 0x03,
    Abort = 0x04,
}

impl Command {
    /// Wire value of this command.
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x01 => Ok(Self::Start),
            0x02 => Ok(Self::Data),
            0x03 => Ok(Self::End),
            0x04 => Ok(Self::Abort),
            other => Err(ProtocolError::UnknownCommand(other)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "START",
            Self::Data => "DATA",
            Self::End => "END",
            Self::Abort => "ABORT",
        };
        f.write_str(name)
    }
}
