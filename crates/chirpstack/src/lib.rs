//! ChirpStack REST client for queueing OTA downlinks.
//!
//! Implements [`loraota_transfer::DownlinkSender`] on top of the
//! `POST /api/devices/{dev_eui}/queue` endpoint.

pub mod client;
pub mod types;

pub use client::{Client, ClientConfig, DEFAULT_REQUEST_TIMEOUT, Error};
pub use types::{EnqueueRequest, EnqueueResponse, QueueItem};
