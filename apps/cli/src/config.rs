//! Uploader configuration.
//!
//! Stored as JSON (the default `config.json`) or TOML when the file name
//! ends in `.toml`:
//!
//! ```json
//! {
//!   "chirpstack": { "api_url": "http://localhost:8090", "api_token": "..." },
//!   "device": { "dev_eui": "0807060504030201" },
//!   "ota": { "port": 10, "chunk_size": 48, "delay_between_chunks": 30 }
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use loraota_chirpstack::ClientConfig;
use loraota_transfer::{DEFAULT_CHUNK_SIZE, DEFAULT_SEND_TIMEOUT, PlanSettings};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub chirpstack: ChirpStackSection,
    pub device: DeviceSection,
    pub ota: OtaSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChirpStackSection {
    pub api_url: String,
    /// May be omitted when passed on the command line or via env.
    #[serde(default)]
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSection {
    pub dev_eui: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtaSection {
    /// LoRaWAN application port the device listens on for OTA commands.
    pub port: u8,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Seconds between consecutive downlinks.
    #[serde(default = "default_delay")]
    pub delay_between_chunks: u64,

    /// Seconds before a single enqueue call is given up.
    #[serde(default = "default_send_timeout")]
    pub send_timeout: u64,

    #[serde(default)]
    pub confirmed: bool,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_delay() -> u64 {
    30
}

fn default_send_timeout() -> u64 {
    DEFAULT_SEND_TIMEOUT.as_secs()
}

impl Config {
    /// Loads the configuration at `path`, picking the format by extension.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let is_toml = path.extension().is_some_and(|ext| ext == "toml");
        Self::parse(&content, is_toml)
            .with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(content: &str, is_toml: bool) -> anyhow::Result<Self> {
        let config: Config = if is_toml {
            toml::from_str(content)?
        } else {
            serde_json::from_str(content)?
        };
        if config.ota.send_timeout == 0 {
            bail!("ota.send_timeout must be at least 1 second");
        }
        Ok(config)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.ota.delay_between_chunks)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.ota.send_timeout)
    }

    /// Transfer settings; port and chunk size are validated by the plan.
    pub fn plan_settings(&self) -> PlanSettings {
        PlanSettings {
            device_id: self.device.dev_eui.clone(),
            port: self.ota.port,
            chunk_size: self.ota.chunk_size,
            delay: self.delay(),
        }
    }

    /// Client settings. `token_override` wins over the file's token.
    pub fn client_config(&self, token_override: Option<&str>) -> anyhow::Result<ClientConfig> {
        let token = token_override
            .or(self.chirpstack.api_token.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .context("no ChirpStack API token (set chirpstack.api_token, --api-token or CHIRPSTACK_API_TOKEN)")?;

        Ok(ClientConfig {
            api_url: self.chirpstack.api_url.clone(),
            api_token: token.to_string(),
            timeout: self.send_timeout(),
            confirmed: self.ota.confirmed,
        })
    }
}
