//! Request and response bodies of the device queue endpoint.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/devices/{dev_eui}/queue`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueRequest {
    pub queue_item: QueueItem,
}

/// One downlink to queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    /// Request a device acknowledgement at the LoRaWAN layer.
    pub confirmed: bool,
    pub f_port: u32,
    /// Base64-encoded payload.
    pub data: String,
}

/// Response to a successful enqueue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnqueueResponse {
    /// Queue item identifier assigned by the server.
    #[serde(default)]
    pub id: String,
}
