use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::frame::{Frame, PixelFormat};

/// An image as it goes out on a publish channel.
#[derive(Clone, Debug)]
pub struct ImageMessage {
    pub utime: i64,
    pub width: u32,
    pub height: u32,
    pub pixel: PixelFormat,
    pub data: Bytes,
}

impl From<&Frame> for ImageMessage {
    fn from(frame: &Frame) -> Self {
        Self {
            utime: frame.timestamp,
            width: frame.width(),
            height: frame.height(),
            pixel: frame.format.pixel,
            data: frame.data.clone(),
        }
    }
}

/// Destination of publish units.
pub trait Transport: Send + Sync {
    fn publish(&self, channel: &str, message: ImageMessage) -> anyhow::Result<()>;
}

/// In-process transport with one broadcast channel per destination name.
/// Messages published before anyone subscribes are dropped.
pub struct BroadcastTransport {
    capacity: usize,
    channels: Mutex<HashMap<String, broadcast::Sender<ImageMessage>>>,
}

impl BroadcastTransport {
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            channels: Mutex::new(HashMap::new()),
        }
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<ImageMessage> {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<ImageMessage> {
        self.sender(channel).subscribe()
    }

    /// Subscribe as a stream; lagged messages are skipped.
    pub fn subscribe_stream(&self, channel: &str) -> impl Stream<Item = ImageMessage> + use<> {
        BroadcastStream::new(self.subscribe(channel)).filter_map(|r| async move { r.ok() })
    }

    pub fn channels(&self) -> Vec<String> {
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = channels.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for BroadcastTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for BroadcastTransport {
    fn publish(&self, channel: &str, message: ImageMessage) -> anyhow::Result<()> {
        // no subscribers is not an error
        let _ = self.sender(channel).send(message);
        Ok(())
    }
}
