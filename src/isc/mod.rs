use anyhow::{Context, Result};
use futures::StreamExt;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::cache::ObjectCache;
use crate::id::{EntityId, EntityType};

#[cfg(test)]
mod tests;

/// Sub-kind of an `update_object` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOp {
    Invalidate,
    Destroyed,
}

/// Coordination events exchanged between processes sharing one store.
///
/// The channel carries cache-coherence traffic only: join announcements,
/// script-cache flushes, and per-object invalidate/destroy notices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IscEvent {
    Joined,
    InvalidateScript,
    UpdateObject { id: String, op: UpdateOp },
}

/// Wire envelope: every message is tagged with the sending process's
/// instance id so receivers can discard their own broadcasts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IscMessage {
    pub instance: String,
    #[serde(flatten)]
    pub event: IscEvent,
}

/// Handle to the joined coordination channel.
pub struct Isc {
    instance: String,
    channel: String,
}

impl Isc {
    /// Join the coordination channel: subscribe, spawn the reader and
    /// writer loops, and announce ourselves.
    ///
    /// Returns the handle plus the background task handles so the caller
    /// can abort them at shutdown.
    pub async fn join(
        client: &redis::Client,
        conn: ConnectionManager,
        channel: &str,
        cache: Arc<ObjectCache>,
        isc_tx: mpsc::UnboundedSender<IscEvent>,
        isc_rx: mpsc::UnboundedReceiver<IscEvent>,
    ) -> Result<(Isc, Vec<JoinHandle<()>>)> {
        let instance = Uuid::new_v4().to_string();

        let mut pubsub = client
            .get_async_pubsub()
            .await
            .context("Failed to open ISC subscriber connection")?;
        pubsub
            .subscribe(channel)
            .await
            .with_context(|| format!("Failed to subscribe to '{}'", channel))?;

        let reader = tokio::spawn(run_reader(pubsub, instance.clone(), cache));
        let writer = tokio::spawn(run_writer(
            conn,
            channel.to_string(),
            instance.clone(),
            isc_rx,
        ));

        // Announce: informational only, receivers just log it
        if isc_tx.send(IscEvent::Joined).is_err() {
            warn!("ISC writer unavailable at join");
        }

        info!(instance = %instance, channel = %channel, "Joined coordination channel");

        Ok((
            Isc {
                instance,
                channel: channel.to_string(),
            },
            vec![reader, writer],
        ))
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

/// Drain outbound coherence events and publish them on the channel.
async fn run_writer(
    mut conn: ConnectionManager,
    channel: String,
    instance: String,
    mut rx: mpsc::UnboundedReceiver<IscEvent>,
) {
    while let Some(event) = rx.recv().await {
        let message = IscMessage {
            instance: instance.clone(),
            event,
        };
        let payload = match serde_json::to_string(&message) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "Failed to serialize ISC message");
                continue;
            }
        };
        if let Err(e) = redis::AsyncCommands::publish::<_, _, ()>(&mut conn, &channel, payload).await
        {
            error!(error = %e, "Failed to publish ISC message");
        }
    }
}

/// Receive coordination events and apply them to the local cache.
async fn run_reader(mut pubsub: redis::aio::PubSub, instance: String, cache: Arc<ObjectCache>) {
    let mut stream = pubsub.on_message();
    while let Some(msg) = stream.next().await {
        let payload: String = match msg.get_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Unreadable ISC payload, skipping");
                continue;
            }
        };
        let message: IscMessage = match serde_json::from_str(&payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, payload = %payload, "Malformed ISC message, skipping");
                continue;
            }
        };
        // Our own broadcast: the mutation was already applied locally
        if message.instance == instance {
            continue;
        }
        apply(&message, &cache);
    }
    warn!("ISC subscription stream ended");
}

/// Apply one remote coordination event to the local cache.
fn apply(message: &IscMessage, cache: &ObjectCache) {
    match &message.event {
        IscEvent::Joined => {
            info!(instance = %message.instance, "Peer process joined");
        }
        IscEvent::InvalidateScript => {
            cache.invalidate_all(EntityType::Script);
        }
        IscEvent::UpdateObject { id, op } => match EntityId::parse(id) {
            Ok(id) => match op {
                UpdateOp::Invalidate => cache.invalidate_local(&id),
                UpdateOp::Destroyed => cache.post_destroy(&id),
            },
            Err(e) => warn!(id = %id, error = %e, "ISC event for malformed id, skipping"),
        },
    }
}
