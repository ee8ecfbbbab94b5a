//! Publish/subscribe bus over the closed channel set (spec §4.G).
//!
//! Each subscriber is a bounded `tokio::mpsc` queue bound to a
//! [`ConnId`]. Publish is non-blocking per subscriber: a full queue or a
//! closed receiver marks the subscriber for removal rather than
//! stalling the publisher.

use chrono::Utc;
use dashmap::DashMap;
use mcp_core::{Channel, ConnId, UnknownChannel, WsEvent};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

const SUBSCRIBER_QUEUE_CAPACITY: usize = 64;

pub type SubscriberReceiver = mpsc::Receiver<WsEvent>;

struct Subscriber {
    conn_id: ConnId,
    tx: mpsc::Sender<WsEvent>,
}

#[derive(Default)]
pub struct PubSubBus {
    channels: DashMap<Channel, Vec<Subscriber>>,
}

impl PubSubBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { channels: DashMap::new() })
    }

    /// Registers `conn_id` on `channel`, returning the receiving half of
    /// its bounded outbound queue.
    pub fn subscribe(&self, conn_id: ConnId, channel: Channel) -> SubscriberReceiver {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_CAPACITY);
        self.channels.entry(channel).or_default().push(Subscriber { conn_id, tx });
        rx
    }

    /// Parses `channel_name` against the closed set before subscribing,
    /// matching the error-envelope contract transports surface to
    /// clients that request an unknown channel.
    pub fn subscribe_by_name(
        &self,
        conn_id: ConnId,
        channel_name: &str,
    ) -> Result<SubscriberReceiver, UnknownChannel> {
        let channel: Channel = channel_name.parse()?;
        Ok(self.subscribe(conn_id, channel))
    }

    pub fn unsubscribe(&self, conn_id: &ConnId, channel: Channel) {
        if let Some(mut subs) = self.channels.get_mut(&channel) {
            subs.retain(|s| &s.conn_id != conn_id);
        }
    }

    /// Removes every subscription held by `conn_id`, across all channels.
    pub fn disconnect(&self, conn_id: &ConnId) {
        for mut entry in self.channels.iter_mut() {
            entry.value_mut().retain(|s| &s.conn_id != conn_id);
        }
    }

    /// Broadcasts `payload` to every subscriber of `channel`. Subscribers
    /// whose queue is full or whose receiver has dropped are pruned
    /// after the fan-out completes.
    pub fn publish(&self, channel: Channel, event_type: &str, payload: Value) {
        let event = WsEvent {
            event_type: event_type.to_string(),
            channel: channel.as_str().to_string(),
            data: payload,
            timestamp: Utc::now(),
        };

        let Some(mut subs) = self.channels.get_mut(&channel) else {
            return;
        };

        subs.retain(|sub| match sub.tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(channel = %channel, "subscriber queue full, dropping subscriber");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    pub fn subscriber_count(&self, channel: Channel) -> usize {
        self.channels.get(&channel).map(|s| s.len()).unwrap_or(0)
    }
}
