//! ChirpStack API client.
//!
//! Async HTTP client using `reqwest` with the gRPC-gateway bearer header.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use loraota_transfer::{DownlinkSender, SendError, SendFuture};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::types::{EnqueueRequest, EnqueueResponse, QueueItem};

/// Authorization header understood by the ChirpStack REST gateway.
const AUTH_HEADER: &str = "grpc-metadata-authorization";

/// Default bound on one HTTP request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from the ChirpStack client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid API token")]
    InvalidToken,

    #[error("invalid API URL: {0}")]
    InvalidUrl(String),
}

impl From<Error> for SendError {
    fn from(err: Error) -> Self {
        match err {
            Error::Api { status, body } => SendError::Rejected { status, body },
            Error::Timeout(after) => SendError::Timeout(after),
            other => SendError::Transport(other.to_string()),
        }
    }
}

/// Connection settings for [`Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST API, e.g. `http://chirpstack.local:8090`.
    pub api_url: String,
    /// API token created in the ChirpStack web interface.
    pub api_token: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Queue confirmed downlinks instead of unconfirmed ones.
    pub confirmed: bool,
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_token: api_token.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            confirmed: false,
        }
    }
}

/// ChirpStack device-queue client.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    confirmed: bool,
}

impl Client {
    /// Creates a new client from `config`.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let base_url = config.api_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::InvalidUrl(config.api_url));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(AUTH_HEADER),
            HeaderValue::from_str(&format!("Bearer {}", config.api_token))
                .map_err(|_| Error::InvalidToken)?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            base_url,
            timeout: config.timeout,
            confirmed: config.confirmed,
        })
    }

    /// Base URL with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Queues `data` for `dev_eui` on `f_port`.
    ///
    /// Success means the server answered with a 2xx status, i.e. the item
    /// is in the queue. Delivery to the device is never confirmed here.
    pub async fn enqueue_downlink(
        &self,
        dev_eui: &str,
        f_port: u8,
        data: &[u8],
    ) -> Result<EnqueueResponse, Error> {
        let url = format!(
            "{}/api/devices/{}/queue",
            self.base_url,
            utf8_percent_encode(dev_eui, NON_ALPHANUMERIC)
        );
        let body = EnqueueRequest {
            queue_item: QueueItem {
                confirmed: self.confirmed,
                f_port: u32::from(f_port),
                data: STANDARD.encode(data),
            },
        };

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        let text = resp.text().await.map_err(|e| self.classify(e))?;
        // Some gateway versions answer with an empty body.
        let parsed = serde_json::from_str::<EnqueueResponse>(&text).unwrap_or_default();
        debug!(
            dev_eui,
            f_port,
            bytes = data.len(),
            queue_id = %parsed.id,
            "downlink queued"
        );
        Ok(parsed)
    }

    fn classify(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(self.timeout)
        } else {
            Error::Http(err)
        }
    }
}

impl DownlinkSender for Client {
    fn enqueue<'a>(&'a self, device_id: &'a str, port: u8, payload: &'a [u8]) -> SendFuture<'a> {
        Box::pin(async move {
            self.enqueue_downlink(device_id, port, payload)
                .await
                .map(|_| ())
                .map_err(SendError::from)
        })
    }
}
