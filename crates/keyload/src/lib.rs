//! LoRaWAN OTAA credential injection.
//!
//! Reads `APPEUI`, `DEVEUI` and `APPKEY` from a JSON keys file and writes
//! them into the `PROGMEM` arrays of an LMIC Arduino sketch. The EUIs are
//! stored LSB first on the device, the key MSB first.

mod discover;
mod inject;
mod keys;

use std::path::PathBuf;

pub use discover::find_sketch;
pub use inject::{Field, Injection, inject, inject_file};
pub use keys::{Credentials, Keys, KeysLoad, c_array, load_or_template};

/// Errors from the credential injector.
#[derive(Debug, thiserror::Error)]
pub enum KeyloadError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid keys file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{field} is not valid hex: {source}")]
    InvalidHex {
        field: &'static str,
        #[source]
        source: hex::FromHexError,
    },

    #[error("{field} must be {expected} bytes, got {actual}")]
    WrongLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl KeyloadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
