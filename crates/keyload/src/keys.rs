//! Keys file parsing and C array rendering.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::KeyloadError;

/// Raw keys file contents, hex strings as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keys {
    #[serde(rename = "APPEUI")]
    pub app_eui: String,
    #[serde(rename = "DEVEUI")]
    pub dev_eui: String,
    #[serde(rename = "APPKEY")]
    pub app_key: String,
}

impl Keys {
    /// All-zero keys written when no keys file exists yet.
    pub fn template() -> Self {
        Self {
            app_eui: "0".repeat(16),
            dev_eui: "0".repeat(16),
            app_key: "0".repeat(32),
        }
    }

    /// Decodes and width-checks all three values.
    pub fn parse(&self) -> Result<Credentials, KeyloadError> {
        Ok(Credentials {
            app_eui: parse_hex("APPEUI", &self.app_eui)?,
            dev_eui: parse_hex("DEVEUI", &self.dev_eui)?,
            app_key: parse_hex("APPKEY", &self.app_key)?,
        })
    }
}

/// Decoded credentials, all in MSB order as shown by ChirpStack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credentials {
    pub app_eui: [u8; 8],
    pub dev_eui: [u8; 8],
    pub app_key: [u8; 16],
}

/// Result of [`load_or_template`].
#[derive(Debug)]
pub enum KeysLoad {
    Loaded(Credentials),
    /// The keys file did not exist; a zero template was written here.
    TemplateCreated(PathBuf),
}

/// Loads `path`, or writes a zero template there if it does not exist.
pub fn load_or_template(path: &Path) -> Result<KeysLoad, KeyloadError> {
    if !path.exists() {
        let json = serde_json::to_string_pretty(&Keys::template()).map_err(|source| {
            KeyloadError::Json {
                path: path.to_path_buf(),
                source,
            }
        })?;
        std::fs::write(path, json + "\n").map_err(|e| KeyloadError::io(path, e))?;
        info!(path = %path.display(), "keys file not found, template created");
        return Ok(KeysLoad::TemplateCreated(path.to_path_buf()));
    }

    let text = std::fs::read_to_string(path).map_err(|e| KeyloadError::io(path, e))?;
    let keys: Keys = serde_json::from_str(&text).map_err(|source| KeyloadError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(KeysLoad::Loaded(keys.parse()?))
}

fn parse_hex<const N: usize>(field: &'static str, value: &str) -> Result<[u8; N], KeyloadError> {
    let cleaned: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    let bytes = hex::decode(&cleaned).map_err(|source| KeyloadError::InvalidHex { field, source })?;
    let actual = bytes.len();
    bytes.try_into().map_err(|_| KeyloadError::WrongLength {
        field,
        expected: N,
        actual,
    })
}

/// Renders bytes as a C initializer body: `0x01, 0x02, ...`.
///
/// With `reverse` the bytes are emitted LSB first.
pub fn c_array(bytes: &[u8], reverse: bool) -> String {
    let fmt = |b: &u8| format!("0x{b:02X}");
    let parts: Vec<String> = if reverse {
        bytes.iter().rev().map(fmt).collect()
    } else {
        bytes.iter().map(fmt).collect()
    };
    parts.join(", ")
}
