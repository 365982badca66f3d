//! Push listener interface boundary.
//!
//! The long-lived notification listener speaks the vendor's binary push
//! transport, which is not part of this crate. This module pins down the
//! seam it plugs into: a transport connects with a parsed
//! [`DeviceIdentity`] (never a raw string) plus the already-seen
//! notification ids, and hands back a stream of events. The in-tree
//! [`StubTransport`] fails cleanly so `fcm-listen` still validates
//! credentials and reports what is missing.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::config::ConfigFile;
use crate::credentials::DeviceIdentity;
use crate::error::{Error, Result};

/// Events surfaced by a connected listener.
#[derive(Debug, Clone)]
pub enum ListenerEvent {
    /// A push notification arrived.
    NotificationReceived {
        /// Vendor id used to de-duplicate re-deliveries across restarts.
        persistent_id: String,
        /// Decoded notification payload.
        payload: serde_json::Value,
    },
    /// The transport hit an error it could not recover from.
    Error {
        /// Human-readable description.
        message: String,
    },
}

/// Receiving side of a connected listener.
#[derive(Debug)]
pub struct ListenerHandle {
    events: mpsc::Receiver<ListenerEvent>,
}

impl ListenerHandle {
    /// Wrap a channel of listener events.
    pub fn new(events: mpsc::Receiver<ListenerEvent>) -> Self {
        Self { events }
    }

    /// Next event, or `None` once the transport closed the stream.
    pub async fn next_event(&mut self) -> Option<ListenerEvent> {
        self.events.recv().await
    }
}

/// A push transport implementation.
#[async_trait]
pub trait PushTransport {
    /// Open the persistent push channel for `identity`, skipping
    /// notifications whose ids appear in `persistent_ids`.
    async fn connect(
        &self,
        identity: &DeviceIdentity,
        persistent_ids: &[String],
    ) -> Result<ListenerHandle>;
}

/// Placeholder for the excluded push transport.
#[derive(Debug, Default)]
pub struct StubTransport;

#[async_trait]
impl PushTransport for StubTransport {
    async fn connect(
        &self,
        _identity: &DeviceIdentity,
        _persistent_ids: &[String],
    ) -> Result<ListenerHandle> {
        Err(Error::Network(
            "the push transport is not included in this build".to_string(),
        ))
    }
}

/// Drive a connected listener until its event stream ends.
///
/// Notifications are printed to stdout as JSON and their persistent ids
/// recorded in the config so a later run skips re-deliveries. Transport
/// errors are logged and do not stop the loop; the transport decides when
/// the stream is over.
pub async fn run_listener<T: PushTransport>(
    transport: &T,
    identity: &DeviceIdentity,
    config: &ConfigFile,
) -> Result<()> {
    let persistent_ids = config.persistent_ids()?;
    let mut handle = transport.connect(identity, &persistent_ids).await?;
    log::info!(
        "[Listener] connected, skipping {} already-seen notification(s)",
        persistent_ids.len()
    );

    while let Some(event) = handle.next_event().await {
        match event {
            ListenerEvent::NotificationReceived {
                persistent_id,
                payload,
            } => {
                println!("{payload}");
                config.append_persistent_id(&persistent_id)?;
            }
            ListenerEvent::Error { message } => {
                log::error!("[Listener] transport error: {message}");
            }
        }
    }

    log::info!("[Listener] stream closed");
    Ok(())
}
